//! Tying a dispatcher back into itself.
//!
//! A dispatcher that should recurse needs itself as its archive and
//! compressor delegates before it exists. A [`Knot`] stands in for the
//! finished handler during construction and is tied to it afterwards.

use std::cell::OnceCell;
use std::io::Read;
use std::rc::{Rc, Weak};

use crate::content::{Content, ContentHandler, Handler, Opener};
use crate::dispatch::{DispatchConfig, Dispatcher};
use crate::error::Result;

/// A write-once forward reference to a handler.
///
/// The cell holds a weak reference so that a handler containing its own
/// knot does not keep itself alive forever.
pub struct Knot<T> {
    cell: Rc<OnceCell<Weak<dyn ContentHandler<T>>>>,
}

impl<T: 'static> Knot<T> {
    pub fn new() -> Self {
        Knot {
            cell: Rc::new(OnceCell::new()),
        }
    }

    /// A handler forwarding every call to whatever the knot gets tied to.
    pub fn handler(&self) -> Handler<T> {
        Rc::new(Deferred {
            cell: self.cell.clone(),
        })
    }

    /// Points every handler from [`Knot::handler`] at `target`.
    ///
    /// # Panics
    ///
    /// When the knot was already tied.
    pub fn tie(self, target: &Handler<T>) {
        if self.cell.set(Rc::downgrade(target)).is_err() {
            panic!("recursive handler tied twice");
        }
    }
}

impl<T: 'static> Default for Knot<T> {
    fn default() -> Self {
        Self::new()
    }
}

struct Deferred<T> {
    cell: Rc<OnceCell<Weak<dyn ContentHandler<T>>>>,
}

impl<T> ContentHandler<T> for Deferred<T> {
    fn process(
        &self,
        path: &str,
        stream: &mut dyn Read,
        content: &Content,
        opener: &dyn Opener,
    ) -> Result<Option<T>> {
        let target = self
            .cell
            .get()
            .expect("recursive handler invoked before it was tied")
            .upgrade()
            .expect("recursive handler invoked after it was dropped");
        target.process(path, stream, content, opener)
    }
}

/// Builds the handler that looks into archives and compressed streams to any
/// depth, handing every leaf to `terminal`.
///
/// Each nesting level is the same dispatcher again. Recursion ends at a
/// stream no registered format recognises, or one the look-into predicate
/// declines.
pub fn recursive<T: 'static>(config: DispatchConfig<T>, terminal: Handler<T>) -> Handler<T> {
    let knot = Knot::new();
    let dispatcher: Handler<T> = Rc::new(Dispatcher::new(
        config,
        knot.handler(),
        knot.handler(),
        terminal,
    ));
    knot.tie(&dispatcher);
    dispatcher
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::handler;

    fn empty() -> Result<Box<dyn Read>> {
        Ok(Box::new(std::io::empty()))
    }

    #[test]
    #[should_panic(expected = "before it was tied")]
    fn untied_knot_fails_fast() {
        let knot = Knot::<()>::new();
        let _ = knot
            .handler()
            .process("x", &mut std::io::empty(), &Content::default(), &empty);
    }

    #[test]
    #[should_panic(expected = "tied twice")]
    fn knot_ties_once() {
        let target = handler(|_, _, _, _| Ok(Some(())));
        let knot = Knot::<()>::new();
        let copy = Knot {
            cell: knot.cell.clone(),
        };
        knot.tie(&target);
        copy.tie(&target);
    }

    #[test]
    fn deferred_forwards() {
        let target = handler(|path, _, _, _| Ok(Some(path.len())));
        let knot = Knot::new();
        let deferred = knot.handler();
        knot.tie(&target);

        let result = deferred
            .process("four", &mut std::io::empty(), &Content::default(), &empty)
            .unwrap();
        assert_eq!(result, Some(4));
    }
}
