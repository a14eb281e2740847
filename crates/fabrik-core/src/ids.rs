//! Identifier types for the fabrik print agent.
//!
//! Job and file identifiers are opaque strings assigned outside the agent
//! (the job submitter names both); the agent only requires them to be
//! non-empty. They are newtyped so the orchestrator cannot confuse one for
//! the other.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Declare a non-empty, string-backed identifier type.
macro_rules! string_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Create a new identifier.
            ///
            /// # Errors
            ///
            /// Returns [`IdError::Empty`] if the input is empty or whitespace.
            pub fn new(value: impl Into<String>) -> Result<Self, IdError> {
                let value = value.into();
                if value.trim().is_empty() {
                    return Err(IdError::Empty);
                }
                Ok(Self(value))
            }

            /// Return the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdError;

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

string_id! {
    /// Identifier of a print job, assigned by the job submitter.
    JobId
}

string_id! {
    /// Name of a print file, resolvable by the file stager.
    FileId
}

string_id! {
    /// Identity of this device, attached to every telemetry event.
    DeviceId
}

/// Errors that can occur when constructing identifiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    /// The input was empty or contained only whitespace.
    #[error("identifier must not be empty")]
    Empty,
}
