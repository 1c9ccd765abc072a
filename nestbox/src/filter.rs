//! Glob-based path predicates from the command line.
//!
//! Predicates are not `Send`, so the driver keeps these plain patterns and
//! turns them into predicates on each worker thread.

use glob::Pattern;
use nestbox_format::path::FORMAT_SEP;
use nestbox_format::PathPredicate;

use crate::error::{Error, Result};

/// A `-L FORMAT:GLOB` rule. A format of `*` stands for every format.
#[derive(Debug, Clone)]
pub struct LookInto {
    format: String,
    pattern: Pattern,
}

impl LookInto {
    pub fn parse(rule: &str) -> Result<LookInto> {
        let (format, glob) = rule
            .split_once(FORMAT_SEP)
            .filter(|(format, _)| !format.is_empty())
            .ok_or_else(|| Error::InvalidRule(rule.to_string()))?;

        Ok(LookInto {
            format: format.to_string(),
            pattern: pattern(glob)?,
        })
    }

    fn matches(&self, format: &str, path: &str) -> bool {
        (self.format == "*" || self.format == format) && self.pattern.matches(path)
    }
}

fn pattern(glob: &str) -> Result<Pattern> {
    Pattern::new(glob).map_err(|source| Error::InvalidPattern {
        pattern: glob.to_string(),
        source,
    })
}

#[derive(Debug, Clone)]
pub struct Filters {
    descend: bool,
    look_into: Vec<LookInto>,
    include: Vec<Pattern>,
}

impl Filters {
    pub fn new(no_look_into: bool, look_into: &[String], include: &[String]) -> Result<Filters> {
        Ok(Filters {
            descend: !no_look_into,
            look_into: look_into
                .iter()
                .map(|rule| LookInto::parse(rule))
                .collect::<Result<_>>()?,
            include: include.iter().map(|glob| pattern(glob)).collect::<Result<_>>()?,
        })
    }

    /// Decides descent over `"<format>:<path>"` keys. Without rules every
    /// recognised format is looked into.
    pub fn look_into(&self) -> PathPredicate {
        if !self.descend {
            return PathPredicate::Never;
        }
        if self.look_into.is_empty() {
            return PathPredicate::Always;
        }

        let rules = self.look_into.clone();
        PathPredicate::from_fn(move |key| match key.split_once(FORMAT_SEP) {
            Some((format, path)) => rules.iter().any(|rule| rule.matches(format, path)),
            None => false,
        })
    }

    /// Decides which leaves reach the command. Without patterns, all do.
    pub fn include(&self) -> PathPredicate {
        if self.include.is_empty() {
            return PathPredicate::Always;
        }

        let patterns = self.include.clone();
        PathPredicate::from_fn(move |path| patterns.iter().any(|p| p.matches(path)))
    }
}
