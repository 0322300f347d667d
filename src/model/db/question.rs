use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};

use crate::model::{common::QuestionType, mongodb::Id};

/// Core question data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionCore {
    /// The survey this question belongs to.
    pub survey_id: Id,
    /// Question text.
    pub text: String,
    /// What kind of answers this question accepts.
    pub question_type: QuestionType,
}

/// A question without an ID, ready for insertion.
pub type NewQuestion = QuestionCore;

/// A question from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub question: QuestionCore,
}

impl Deref for Question {
    type Target = QuestionCore;

    fn deref(&self) -> &Self::Target {
        &self.question
    }
}

impl DerefMut for Question {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.question
    }
}
