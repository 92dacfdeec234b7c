//! `includeAll` resource filters.
//!
//! A changelog selects a filter by name (`resourceFilter: 'migrationsOnly'`);
//! the name is looked up in a [`FilterRegistry`] that the embedding program
//! (or the config file) populated beforehand.

use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;

/// Decides whether a file found by `includeAll` is parsed.
pub trait IncludeAllFilter {
    fn include(&self, path: &str) -> bool;
}

impl<F> IncludeAllFilter for F
where
    F: Fn(&str) -> bool,
{
    fn include(&self, path: &str) -> bool {
        self(path)
    }
}

type FilterFactory = Box<dyn Fn() -> Box<dyn IncludeAllFilter>>;

/// Named filter factories. A fresh filter is created per `includeAll`.
#[derive(Default)]
pub struct FilterRegistry {
    factories: BTreeMap<String, FilterFactory>,
}

impl FilterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F, T>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> T + 'static,
        T: IncludeAllFilter + 'static,
    {
        self.factories.insert(
            name.into(),
            Box::new(move || Box::new(factory()) as Box<dyn IncludeAllFilter>),
        );
    }

    pub fn create(&self, name: &str) -> Option<Box<dyn IncludeAllFilter>> {
        self.factories.get(name).map(|factory| factory())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}

impl fmt::Debug for FilterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}

/// Regex-based filter: a path passes when it matches `include` (if set)
/// and does not match `exclude` (if set).
#[derive(Debug, Clone)]
pub struct PatternFilter {
    include: Option<Regex>,
    exclude: Option<Regex>,
}

impl PatternFilter {
    pub fn new(include: Option<&str>, exclude: Option<&str>) -> Result<Self, regex::Error> {
        Ok(Self {
            include: include.map(Regex::new).transpose()?,
            exclude: exclude.map(Regex::new).transpose()?,
        })
    }
}

impl IncludeAllFilter for PatternFilter {
    fn include(&self, path: &str) -> bool {
        self.include.as_ref().is_none_or(|re| re.is_match(path))
            && !self.exclude.as_ref().is_some_and(|re| re.is_match(path))
    }
}
