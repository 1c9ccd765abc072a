//! Path predicates and the selective gate built on them.

use std::fmt;
use std::io::Read;
use std::rc::Rc;

use crate::content::{Content, ContentHandler, Handler, Opener};
use crate::error::Result;

/// A test over stream paths.
///
/// The constant variants are known without evaluating anything, which lets
/// [`select`] and the dispatcher skip work entirely.
#[derive(Clone)]
pub enum PathPredicate {
    Always,
    Never,
    Test(Rc<dyn Fn(&str) -> bool>),
}

impl PathPredicate {
    pub fn from_fn<F>(f: F) -> PathPredicate
    where
        F: Fn(&str) -> bool + 'static,
    {
        PathPredicate::Test(Rc::new(f))
    }

    #[inline(always)]
    pub fn test(&self, path: &str) -> bool {
        match self {
            PathPredicate::Always => true,
            PathPredicate::Never => false,
            PathPredicate::Test(f) => f(path),
        }
    }

    pub fn is_never(&self) -> bool {
        matches!(self, PathPredicate::Never)
    }
}

impl Default for PathPredicate {
    fn default() -> Self {
        PathPredicate::Always
    }
}

impl fmt::Debug for PathPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathPredicate::Always => f.write_str("Always"),
            PathPredicate::Never => f.write_str("Never"),
            PathPredicate::Test(_) => f.write_str("Test(..)"),
        }
    }
}

/// Routes each stream to `if_true` or `if_false` depending on its path.
///
/// Only the selected delegate is ever touched. Constant predicates return the
/// matching delegate itself, so gates stacked on static predicates never grow
/// a chain of wrappers.
pub fn select<T: 'static>(
    predicate: PathPredicate,
    if_true: Handler<T>,
    if_false: Handler<T>,
) -> Handler<T> {
    match predicate {
        PathPredicate::Always => if_true,
        PathPredicate::Never => if_false,
        PathPredicate::Test(test) => Rc::new(Selective {
            test,
            if_true,
            if_false,
        }),
    }
}

struct Selective<T> {
    test: Rc<dyn Fn(&str) -> bool>,
    if_true: Handler<T>,
    if_false: Handler<T>,
}

impl<T> ContentHandler<T> for Selective<T> {
    fn process(
        &self,
        path: &str,
        stream: &mut dyn Read,
        content: &Content,
        opener: &dyn Opener,
    ) -> Result<Option<T>> {
        if (self.test)(path) {
            self.if_true.process(path, stream, content, opener)
        } else {
            self.if_false.process(path, stream, content, opener)
        }
    }
}
