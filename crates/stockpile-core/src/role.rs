//! Membership roles.
//!
//! Roles are a closed enumeration. Parsing is strict; decoding a role off a
//! stored document goes through [`GroupRole::decode`], which takes the
//! fallback branch explicitly rather than by swallowing a parse error.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::document::FieldValue;
use crate::error::{Error, Result};

/// A member's role within a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupRole {
    /// The group's owner; exactly one per group.
    Owner,
    /// A member allowed to mutate the item list.
    Editor,
    /// A read-only member.
    Member,
}

impl GroupRole {
    /// Returns the canonical string form stored on membership records.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Editor => "editor",
            Self::Member => "member",
        }
    }

    /// Decodes a role from a stored field value.
    ///
    /// Missing or unrecognized values fall back to [`GroupRole::Member`].
    /// The fallback is logged so silently-coerced records are visible.
    #[must_use]
    pub fn decode(value: Option<&FieldValue>) -> Self {
        match value.and_then(FieldValue::as_str) {
            Some(raw) => match raw.parse() {
                Ok(role) => role,
                Err(_) => {
                    tracing::debug!(role = raw, "unrecognized role value, treating as member");
                    Self::Member
                }
            },
            None => {
                tracing::debug!("membership record has no role field, treating as member");
                Self::Member
            }
        }
    }
}

impl fmt::Display for GroupRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for GroupRole {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "owner" => Ok(Self::Owner),
            "editor" => Ok(Self::Editor),
            "member" => Ok(Self::Member),
            other => Err(Error::InvalidInput(format!("unknown role: {other}"))),
        }
    }
}
