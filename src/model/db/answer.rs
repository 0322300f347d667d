use std::ops::Deref;

use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// Core answer option data, as stored in the database.
///
/// Answer options only carry meaning for single- and multiple-choice
/// questions; plain-text questions have none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOptionCore {
    /// The question this option belongs to.
    pub question_id: Id,
    /// Option text; submitted answers must match it exactly.
    pub text: String,
}

/// An answer option without an ID, ready for insertion.
pub type NewAnswerOption = AnswerOptionCore;

/// An answer option from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOption {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub option: AnswerOptionCore,
}

impl Deref for AnswerOption {
    type Target = AnswerOptionCore;

    fn deref(&self) -> &Self::Target {
        &self.option
    }
}
