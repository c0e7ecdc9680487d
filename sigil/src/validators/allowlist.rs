use std::{collections::HashSet, fmt, iter::FromIterator, sync::Arc};

use regex::Regex;

type Predicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// A single entry in an [`Allowlist`]
#[derive(Clone)]
pub enum AllowlistEntry {
    /// Matches the exact string
    Exact(String),
    /// Matches any string the pattern matches
    ///
    /// Patterns are not anchored; use `^` and `$` to match whole values.
    Pattern(Regex),
    /// Matches any string for which the predicate returns `true`
    Predicate(Predicate),
}

impl AllowlistEntry {
    /// Wraps a predicate
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Self::Predicate(Arc::new(f))
    }
}

impl From<&'_ str> for AllowlistEntry {
    fn from(s: &str) -> Self {
        Self::Exact(s.to_owned())
    }
}

impl From<String> for AllowlistEntry {
    fn from(s: String) -> Self {
        Self::Exact(s)
    }
}

impl From<Regex> for AllowlistEntry {
    fn from(re: Regex) -> Self {
        Self::Pattern(re)
    }
}

impl fmt::Debug for AllowlistEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Exact(s) => f.debug_tuple("Exact").field(s).finish(),
            Self::Pattern(re) => f.debug_tuple("Pattern").field(&re.as_str()).finish(),
            Self::Predicate(_) => f.write_str("Predicate"),
        }
    }
}

/// A set of acceptable claim values
///
/// Exact strings are looked up in a set; patterns and predicates are
/// tried in the order they were added. An empty allowlist matches
/// nothing.
#[derive(Clone, Default)]
pub struct Allowlist {
    exact: HashSet<String>,
    patterns: Vec<Regex>,
    predicates: Vec<Predicate>,
}

impl Allowlist {
    /// An empty allowlist
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry
    pub fn push(&mut self, entry: impl Into<AllowlistEntry>) {
        match entry.into() {
            AllowlistEntry::Exact(s) => {
                self.exact.insert(s);
            }
            AllowlistEntry::Pattern(re) => self.patterns.push(re),
            AllowlistEntry::Predicate(f) => self.predicates.push(f),
        }
    }

    /// Adds an entry
    #[must_use]
    pub fn with(mut self, entry: impl Into<AllowlistEntry>) -> Self {
        self.push(entry);
        self
    }

    /// Adds a predicate
    #[must_use]
    pub fn with_predicate<F>(self, f: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.with(AllowlistEntry::predicate(f))
    }

    /// Whether any entry matches the value
    #[must_use]
    pub fn matches(&self, value: &str) -> bool {
        self.exact.contains(value)
            || self.patterns.iter().any(|re| re.is_match(value))
            || self.predicates.iter().any(|f| f(value))
    }

    /// Whether the allowlist has no entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.exact.is_empty() && self.patterns.is_empty() && self.predicates.is_empty()
    }
}

impl<E: Into<AllowlistEntry>> FromIterator<E> for Allowlist {
    fn from_iter<I: IntoIterator<Item = E>>(iter: I) -> Self {
        let mut allowlist = Self::new();
        for entry in iter {
            allowlist.push(entry);
        }
        allowlist
    }
}

impl<E: Into<AllowlistEntry>> From<Vec<E>> for Allowlist {
    fn from(entries: Vec<E>) -> Self {
        entries.into_iter().collect()
    }
}

impl fmt::Debug for Allowlist {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Allowlist")
            .field("exact", &self.exact)
            .field(
                "patterns",
                &self.patterns.iter().map(Regex::as_str).collect::<Vec<_>>(),
            )
            .field("predicates", &self.predicates.len())
            .finish()
    }
}
