use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Primary keys arrive as integers from the reservation service, but
/// fixtures and older payloads carry them as strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawKey {
    Int(u64),
    Text(String),
}

macro_rules! define_key {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Integer form, only when the key round-trips exactly (no leading zeros).
            fn as_integer(&self) -> Option<u64> {
                self.0
                    .parse::<u64>()
                    .ok()
                    .filter(|n| n.to_string() == self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.pad(&self.0)
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value.to_string())
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                match self.as_integer() {
                    Some(n) => serializer.serialize_u64(n),
                    None => serializer.serialize_str(&self.0),
                }
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                Ok(match RawKey::deserialize(deserializer)? {
                    RawKey::Int(n) => Self(n.to_string()),
                    RawKey::Text(s) => Self(s),
                })
            }
        }
    };
}

define_key!(
    /// Internal id of a booking, assigned by the reservation service
    BookingId
);
define_key!(
    /// Internal id of a screening session
    SessionId
);
define_key!(MovieId);

/// Public reservation code handed to the patron (`codigo_reserva`).
///
/// Opaque to this crate: it is never parsed, only trimmed on input.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReservationCode(String);

impl ReservationCode {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Parse user input; blank input yields `None`.
    pub fn parse(input: &str) -> Option<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReservationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}
