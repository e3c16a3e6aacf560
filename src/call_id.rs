//! Call identifiers and subject classification
//!
//! A call identifier names one instrumented call site. The instrumentation
//! layer conventionally builds it as `"<owner>&<method>"`, e.g.
//! `"com.example.App&onCreate"`.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Separator between owner and method in a call identifier
pub const SEPARATOR: char = '&';

/// Key naming an instrumented call site
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallId(String);

impl CallId {
    /// Build an identifier in the conventional `"<owner>&<method>"` form
    pub fn new(owner: &str, method: &str) -> Self {
        Self(format!("{owner}{SEPARATOR}{method}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Owner part, only when the identifier splits into exactly two parts
    pub fn owner(&self) -> Option<&str> {
        self.split().map(|(owner, _)| owner)
    }

    /// Method suffix, only when the identifier splits into exactly two parts
    ///
    /// `"a&b&c"` and `"plain"` have no recognized method.
    pub fn method(&self) -> Option<&str> {
        self.split().map(|(_, method)| method)
    }

    fn split(&self) -> Option<(&str, &str)> {
        let (owner, method) = self.0.split_once(SEPARATOR)?;
        if method.contains(SEPARATOR) {
            return None;
        }
        Some((owner, method))
    }
}

impl From<&str> for CallId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for CallId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Borrow<str> for CallId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for CallId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Classification of the instrumented call site's owner
///
/// Supplied by the instrumentation layer; only `ApplicationLifecycle` drives
/// phase notifications. Activity and service subjects are timed like any
/// other call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectKind {
    /// Ordinary method or static function
    #[default]
    None,
    /// Application entry point (`onCreate`, `attachBaseContext`, ...)
    ApplicationLifecycle,
    /// Activity lifecycle callback
    ActivityLifecycle,
    /// Service lifecycle callback
    ServiceLifecycle,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_joins_with_separator() {
        let id = CallId::new("com.example.App", "onCreate");
        assert_eq!(id.as_str(), "com.example.App&onCreate");
        assert_eq!(id.owner(), Some("com.example.App"));
        assert_eq!(id.method(), Some("onCreate"));
    }

    #[test]
    fn test_method_requires_exactly_two_parts() {
        assert_eq!(CallId::from("plain").method(), None);
        assert_eq!(CallId::from("a&b&c").method(), None);
        assert_eq!(CallId::from("a&b&c").owner(), None);
    }

    #[test]
    fn test_empty_parts_still_split() {
        assert_eq!(CallId::from("&onCreate").method(), Some("onCreate"));
        assert_eq!(CallId::from("App&").method(), Some(""));
    }

    #[test]
    fn test_display_and_borrow() {
        let id = CallId::from("X&slow".to_string());
        assert_eq!(id.to_string(), "X&slow");
        let borrowed: &str = id.borrow();
        assert_eq!(borrowed, "X&slow");
    }

    #[test]
    fn test_subject_kind_serde_names() {
        let json = serde_json::to_string(&SubjectKind::ApplicationLifecycle).unwrap();
        assert_eq!(json, "\"application_lifecycle\"");
        let kind: SubjectKind = serde_json::from_str("\"service_lifecycle\"").unwrap();
        assert_eq!(kind, SubjectKind::ServiceLifecycle);
        assert_eq!(SubjectKind::default(), SubjectKind::None);
    }
}
