use std::ops::Deref;

use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// One stored (question, answer) pair within a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedAnswer {
    /// The question this answer responds to.
    pub question_id: Id,
    /// The answer text.
    pub answer: String,
}

/// Core submission data, as stored in the database: one user's completed
/// pass through a survey.
///
/// The answers are embedded in the submission document, so the holder and
/// its answers are always written atomically. Submissions are immutable
/// once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionCore {
    /// The survey that was answered.
    pub survey_id: Id,
    /// The external identifier of the submitting user.
    pub user_id: u32,
    /// The accepted answers, in survey question order.
    pub answers: Vec<SubmittedAnswer>,
}

/// A submission without an ID, ready for insertion.
pub type NewSubmission = SubmissionCore;

/// A submission from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub submission: SubmissionCore,
}

impl Deref for Submission {
    type Target = SubmissionCore;

    fn deref(&self) -> &Self::Target {
        &self.submission
    }
}
