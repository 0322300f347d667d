use std::{fmt::Display, ops::Deref, str::FromStr};

use mongodb::bson::{doc, oid::ObjectId, Bson, Document};
use rocket::request::FromParam;
use serde::{Deserialize, Serialize};

/// A unique database ID.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Id(ObjectId);

impl Id {
    /// Generate a fresh ID.
    pub fn new() -> Self {
        Self(ObjectId::new())
    }

    /// A filter document matching this ID.
    pub fn as_doc(&self) -> Document {
        doc! { "_id": self.0 }
    }
}

impl Deref for Id {
    type Target = ObjectId;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for Id {
    type Err = mongodb::bson::oid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse::<ObjectId>()?))
    }
}

impl From<ObjectId> for Id {
    fn from(id: ObjectId) -> Self {
        Self(id)
    }
}

impl From<Id> for Bson {
    fn from(id: Id) -> Self {
        Bson::ObjectId(id.0)
    }
}

impl<'a> FromParam<'a> for Id {
    type Error = mongodb::bson::oid::Error;

    fn from_param(param: &'a str) -> Result<Self, Self::Error> {
        param.parse::<Id>()
    }
}
