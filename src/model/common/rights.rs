use std::fmt::Display;

use mongodb::bson::{to_bson, Bson};
use serde_repr::{Deserialize_repr, Serialize_repr};

/// Different privilege levels for accounts.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum Rights {
    /// An authenticated end user; no administrative access.
    User = 0,
    /// A staff member; full control over surveys.
    Staff = 1,
}

impl Display for Rights {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            formatter,
            "{}",
            match self {
                Self::User => "user",
                Self::Staff => "staff",
            }
        )
    }
}

impl From<Rights> for Bson {
    fn from(rights: Rights) -> Self {
        to_bson(&rights).expect("Serialisation is infallible")
    }
}
