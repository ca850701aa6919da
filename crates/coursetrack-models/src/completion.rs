//! Tri-state completion flags.

use serde::{Deserialize, Serialize};

/// A completion flag that may not have been reconciled yet.
///
/// `Unknown` is distinct from `Known(false)`: a category whose
/// items have not all reported is not "incomplete", it is undetermined.
/// Consumers that need a plain boolean use [`Completion::is_complete`],
/// which treats `Unknown` as incomplete.
///
/// Flags form a chain `Unknown < Known(false) < Known(true)`; merges only
/// move upward (see [`Completion::join`]).
///
/// On the wire a flag is an optional boolean: a missing field or `null`
/// decodes as `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "Option<bool>", into = "Option<bool>")]
pub enum Completion {
    /// Not yet reconciled.
    #[default]
    Unknown,
    /// Reconciled to a definite value.
    Known(bool),
}

impl Completion {
    /// Known and complete.
    pub const COMPLETE: Completion = Completion::Known(true);
    /// Known and incomplete.
    pub const INCOMPLETE: Completion = Completion::Known(false);

    /// Returns true if the flag has been reconciled.
    pub fn is_known(self) -> bool {
        matches!(self, Completion::Known(_))
    }

    /// Returns true only for `Known(true)`.
    pub fn is_complete(self) -> bool {
        self == Completion::COMPLETE
    }

    /// Returns the reconciled value, if any.
    pub fn value(self) -> Option<bool> {
        match self {
            Completion::Unknown => None,
            Completion::Known(v) => Some(v),
        }
    }

    /// Least upper bound of two flags.
    pub fn join(self, other: Completion) -> Completion {
        if other.rank() > self.rank() {
            other
        } else {
            self
        }
    }

    /// Three-valued conjunction: `Unknown` if any input is `Unknown`.
    pub fn all<I>(flags: I) -> Completion
    where
        I: IntoIterator<Item = Completion>,
    {
        let mut result = true;
        for flag in flags {
            match flag {
                Completion::Unknown => return Completion::Unknown,
                Completion::Known(v) => result &= v,
            }
        }
        Completion::Known(result)
    }

    fn rank(self) -> u8 {
        match self {
            Completion::Unknown => 0,
            Completion::Known(false) => 1,
            Completion::Known(true) => 2,
        }
    }
}

impl From<Option<bool>> for Completion {
    fn from(value: Option<bool>) -> Self {
        match value {
            Some(v) => Completion::Known(v),
            None => Completion::Unknown,
        }
    }
}

impl From<Completion> for Option<bool> {
    fn from(value: Completion) -> Self {
        value.value()
    }
}

impl From<bool> for Completion {
    fn from(value: bool) -> Self {
        Completion::Known(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_is_not_complete() {
        assert!(!Completion::Unknown.is_complete());
        assert!(!Completion::Unknown.is_known());
        assert!(!Completion::INCOMPLETE.is_complete());
        assert!(Completion::COMPLETE.is_complete());
    }

    #[test]
    fn test_join_only_moves_up() {
        use Completion::*;
        assert_eq!(Unknown.join(Known(false)), Known(false));
        assert_eq!(Known(false).join(Unknown), Known(false));
        assert_eq!(Known(false).join(Known(true)), Known(true));
        assert_eq!(Known(true).join(Known(false)), Known(true));
        assert_eq!(Known(true).join(Unknown), Known(true));
    }

    #[test]
    fn test_all_is_three_valued() {
        use Completion::*;
        assert_eq!(Completion::all([Known(true), Known(true)]), Known(true));
        assert_eq!(Completion::all([Known(true), Known(false)]), Known(false));
        assert_eq!(Completion::all([Known(false), Unknown]), Unknown);
        assert_eq!(Completion::all(Vec::<Completion>::new()), Known(true));
    }

    #[test]
    fn test_wire_format() {
        #[derive(Deserialize)]
        struct Probe {
            #[serde(default)]
            flag: Completion,
        }

        let p: Probe = serde_json::from_str(r#"{"flag": true}"#).unwrap();
        assert_eq!(p.flag, Completion::COMPLETE);
        let p: Probe = serde_json::from_str(r#"{"flag": null}"#).unwrap();
        assert_eq!(p.flag, Completion::Unknown);
        let p: Probe = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(p.flag, Completion::Unknown);

        assert_eq!(serde_json::to_string(&Completion::Unknown).unwrap(), "null");
        assert_eq!(serde_json::to_string(&Completion::INCOMPLETE).unwrap(), "false");
    }
}
