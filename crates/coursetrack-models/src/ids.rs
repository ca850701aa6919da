//! Type-safe ID wrappers for course entities.
//!
//! IDs are assigned by the backend. Some deployments send them as JSON
//! numbers and others as strings, so every ID accepts both and is kept as a
//! string internally.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Raw wire form of an identifier.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(i64),
}

/// Macro to generate ID newtypes with common functionality.
macro_rules! define_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(from = "RawId", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates an ID from an existing string.
            pub fn from_string(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            /// Returns the inner string.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<RawId> for $name {
            fn from(raw: RawId) -> Self {
                match raw {
                    RawId::Text(s) => Self(s),
                    RawId::Number(n) => Self(n.to_string()),
                }
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id!(CourseId);
define_id!(ModuleId);
define_id!(ContentId);
define_id!(VideoId);
define_id!(QuizId);
