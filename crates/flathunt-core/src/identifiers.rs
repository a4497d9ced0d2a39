//! Validated identifier newtypes shared across the coordination layer.
//!
//! All name-like identifiers go through `parse()` so that a typo'd or
//! hostile string is rejected at the boundary instead of surfacing later
//! as a missed registry lookup or a mangled store key.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum length for any validated identifier, in bytes.
pub const MAX_IDENT_LENGTH: usize = 128;

/// Error type for identifier validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdValidationError {
    /// The identifier string is empty.
    Empty,
    /// The identifier contains only whitespace.
    WhitespaceOnly,
    /// The identifier exceeds [`MAX_IDENT_LENGTH`].
    TooLong(usize),
    /// The identifier contains characters outside the allowed set.
    InvalidCharacters,
}

impl fmt::Display for IdValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "identifier cannot be empty"),
            Self::WhitespaceOnly => write!(f, "identifier cannot be whitespace-only"),
            Self::TooLong(len) => write!(
                f,
                "identifier too long: {len} characters (max {MAX_IDENT_LENGTH})"
            ),
            Self::InvalidCharacters => write!(
                f,
                "identifier can only contain alphanumeric characters, hyphens, underscores, and dots"
            ),
        }
    }
}

impl std::error::Error for IdValidationError {}

fn validate(s: &str, allow_colon: bool) -> Result<(), IdValidationError> {
    if s.is_empty() {
        return Err(IdValidationError::Empty);
    }
    if s.trim().is_empty() {
        return Err(IdValidationError::WhitespaceOnly);
    }
    if s.len() > MAX_IDENT_LENGTH {
        return Err(IdValidationError::TooLong(s.len()));
    }
    let ok = s.chars().all(|c| {
        c.is_alphanumeric() || c == '-' || c == '_' || c == '.' || (allow_colon && c == ':')
    });
    if !ok {
        return Err(IdValidationError::InvalidCharacters);
    }
    Ok(())
}

macro_rules! validated_ident {
    ($(#[$doc:meta])* $name:ident, allow_colon = $colon:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Parse and validate from a string.
            ///
            /// Rejects empty, whitespace-only, over-long input and any
            /// character outside the allowed set.
            pub fn parse(s: impl AsRef<str>) -> Result<Self, IdValidationError> {
                let s = s.as_ref();
                validate(s, $colon)?;
                Ok(Self(s.to_string()))
            }

            /// Get the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl FromStr for $name {
            type Err = IdValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl TryFrom<&str> for $name {
            type Error = IdValidationError;

            fn try_from(s: &str) -> Result<Self, Self::Error> {
                Self::parse(s)
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdValidationError;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                Self::parse(&s)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> String {
                id.0
            }
        }
    };
}

validated_ident!(
    /// Name of a single tool, unique within its server.
    ///
    /// Tool names double as the fully-qualified lookup key in the flat
    /// registry index, so they must also be unique across servers.
    ToolName,
    allow_colon = false
);

validated_ident!(
    /// Name of a tool server, namespacing its tool set.
    ServerName,
    allow_colon = false
);

validated_ident!(
    /// Identifier of an agent participating in a pipeline run.
    AgentId,
    allow_colon = false
);

validated_ident!(
    /// Semantic key of a coordination-store artifact, e.g. `agent1.candidates`.
    ///
    /// Colons are allowed so run namespaces can prefix keys
    /// (`run-<id>:agent1.candidates`) without escaping.
    StoreKey,
    allow_colon = true
);

impl StoreKey {
    /// Prefix this key with a namespace segment, producing `<ns>:<key>`.
    ///
    /// The namespace is validated like any key segment, but the combined
    /// key is exempt from the length cap so a run prefix can never push a
    /// valid key over the limit.
    pub fn namespaced(&self, ns: &str) -> Result<StoreKey, IdValidationError> {
        validate(ns, true)?;
        Ok(StoreKey(format!("{ns}:{}", self.0)))
    }
}

/// Unique per-request identifier used for tracing.
///
/// The dispatcher never deduplicates by request id; it exists so that an
/// invocation attempt can be correlated across logs and audit records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(uuid::Uuid);

impl RequestId {
    /// Generate a fresh request id.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a single pipeline run.
///
/// Each run namespaces its store keys so a completed run's records stay
/// readable for audit without colliding with a later run's versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(uuid::Uuid);

impl RunId {
    /// Generate a fresh run id.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// The store-key namespace segment for this run (`run-<id>`).
    pub fn namespace(&self) -> String {
        format!("run-{}", self.0.simple())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
