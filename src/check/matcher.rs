//! Predicates for excluding known or accepted errors from check results.

use regex::Regex;

use super::{CheckError, Validator};

/// Matches a [`CheckError`] when every predicate that is set holds.
///
/// A matcher with no predicates set matches every error.
#[derive(Debug, Clone, Default)]
pub struct ErrorMatcher {
    /// Substring the message must contain.
    pub message: Option<String>,
    /// Regex the json path must match (searched, not anchored).
    pub json_path: Option<Regex>,
    /// Kind of check the error must come from.
    pub validator: Option<Validator>,
}

impl ErrorMatcher {
    /// A matcher with no predicates.
    pub fn new() -> Self {
        Self::default()
    }

    /// Require the message to contain `substring`.
    pub fn message(mut self, substring: impl Into<String>) -> Self {
        self.message = Some(substring.into());
        self
    }

    /// Require the json path to match `pattern`.
    pub fn json_path(mut self, pattern: Regex) -> Self {
        self.json_path = Some(pattern);
        self
    }

    /// Require the error to come from `validator`.
    pub fn validator(mut self, validator: Validator) -> Self {
        self.validator = Some(validator);
        self
    }

    /// True when every set predicate holds for `error`.
    pub fn matches(&self, error: &CheckError) -> bool {
        self.message
            .as_deref()
            .is_none_or(|m| error.message.contains(m))
            && self
                .json_path
                .as_ref()
                .is_none_or(|re| re.is_match(&error.json_path))
            && self.validator.is_none_or(|v| v == error.validator)
    }

    /// Match when both this and `other` match.
    pub fn and(self, other: impl Into<ErrorFilter>) -> ErrorFilter {
        ErrorFilter::from(self).and(other)
    }

    /// Match when this or `other` matches.
    pub fn or(self, other: impl Into<ErrorFilter>) -> ErrorFilter {
        ErrorFilter::from(self).or(other)
    }
}

/// A boolean combination of [`ErrorMatcher`]s.
#[derive(Debug, Clone)]
pub enum ErrorFilter {
    /// A single matcher.
    Match(ErrorMatcher),
    /// Every filter must match. An empty list matches everything.
    All(Vec<ErrorFilter>),
    /// At least one filter must match. An empty list matches nothing.
    Any(Vec<ErrorFilter>),
}

impl ErrorFilter {
    pub fn matches(&self, error: &CheckError) -> bool {
        match self {
            ErrorFilter::Match(m) => m.matches(error),
            ErrorFilter::All(filters) => filters.iter().all(|f| f.matches(error)),
            ErrorFilter::Any(filters) => filters.iter().any(|f| f.matches(error)),
        }
    }

    /// Conjunction; extends an existing `All` rather than nesting.
    pub fn and(self, other: impl Into<ErrorFilter>) -> ErrorFilter {
        match self {
            ErrorFilter::All(mut filters) => {
                filters.push(other.into());
                ErrorFilter::All(filters)
            }
            first => ErrorFilter::All(vec![first, other.into()]),
        }
    }

    /// Disjunction; extends an existing `Any` rather than nesting.
    pub fn or(self, other: impl Into<ErrorFilter>) -> ErrorFilter {
        match self {
            ErrorFilter::Any(mut filters) => {
                filters.push(other.into());
                ErrorFilter::Any(filters)
            }
            first => ErrorFilter::Any(vec![first, other.into()]),
        }
    }
}

impl From<ErrorMatcher> for ErrorFilter {
    fn from(matcher: ErrorMatcher) -> Self {
        ErrorFilter::Match(matcher)
    }
}
