use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Wraps customer contact details so `{:?}` and `{}` never print them.
///
/// Serialization passes the real value through: the reservation service
/// and the local snapshot both need it. Only formatting is masked.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Masked<T>(pub T);

impl<T> fmt::Debug for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Masked(********)")
    }
}

impl<T> fmt::Display for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "********")
    }
}

impl<T: Serialize> Serialize for Masked<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<T> Masked<T> {
    pub fn reveal(&self) -> &T {
        &self.0
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}

impl Masked<String> {
    /// A log-safe hint: first character plus the e-mail domain when present.
    pub fn hint(&self) -> String {
        let first = self.0.chars().next().map(String::from).unwrap_or_default();
        match self.0.split_once('@') {
            Some((_, domain)) => format!("{}***@{}", first, domain),
            None => format!("{}***", first),
        }
    }
}

impl From<String> for Masked<String> {
    fn from(value: String) -> Self {
        Masked(value)
    }
}
