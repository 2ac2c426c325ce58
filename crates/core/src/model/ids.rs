use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

//
// ─── PARSE ERROR ───────────────────────────────────────────────────────────────
//

/// Error type for building an identifier from a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    kind: &'static str,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} cannot be empty", self.kind)
    }
}

impl std::error::Error for ParseIdError {}

//
// ─── STRING IDENTIFIERS ────────────────────────────────────────────────────────
//

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Builds the identifier, trimming surrounding whitespace.
            ///
            /// # Errors
            ///
            /// Returns `ParseIdError` when the trimmed value is empty.
            pub fn new(raw: impl Into<String>) -> Result<Self, ParseIdError> {
                let raw = raw.into();
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    return Err(ParseIdError {
                        kind: stringify!($name),
                    });
                }
                if trimmed.len() == raw.len() {
                    Ok(Self(raw))
                } else {
                    Ok(Self(trimmed.to_owned()))
                }
            }

            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({:?})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl TryFrom<String> for $name {
            type Error = ParseIdError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Username that owns onboarding and knowledge-path progress.
    UserId
);

string_id!(
    /// Unique identifier of a knowledge path in the catalog.
    PathId
);

string_id!(
    /// Identifier of a step, unique within its path.
    StepId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_trims_whitespace() {
        let id = UserId::new("  rakshitha ").unwrap();
        assert_eq!(id.as_str(), "rakshitha");
        assert_eq!(id.to_string(), "rakshitha");
    }

    #[test]
    fn empty_ids_are_rejected() {
        assert!(UserId::new("   ").is_err());
        assert!("".parse::<PathId>().is_err());
        let err = StepId::new("").unwrap_err();
        assert_eq!(err.to_string(), "StepId cannot be empty");
    }

    #[test]
    fn path_id_deserializes_through_validation() {
        let id: PathId = serde_json::from_str("\"api-developer\"").unwrap();
        assert_eq!(id.as_str(), "api-developer");
        assert!(serde_json::from_str::<PathId>("\"  \"").is_err());
    }

    #[test]
    fn debug_names_the_kind() {
        let id = StepId::new("step-1").unwrap();
        assert_eq!(format!("{id:?}"), "StepId(\"step-1\")");
    }
}
