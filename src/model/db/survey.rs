use std::ops::{Deref, DerefMut};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// Core survey data, as stored in the database.
///
/// Dates are date-only and serialize as ISO-8601 strings, so range filters
/// can compare them lexicographically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurveyCore {
    /// Survey title.
    pub title: String,
    /// The date the survey was created; set server-side.
    pub start_date: NaiveDate,
    /// The last date (inclusive) on which the survey accepts submissions.
    pub end_date: NaiveDate,
    /// Survey description.
    pub description: String,
}

/// A survey without an ID, ready for insertion.
pub type NewSurvey = SurveyCore;

/// A survey from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Survey {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub survey: SurveyCore,
}

impl Deref for Survey {
    type Target = SurveyCore;

    fn deref(&self) -> &Self::Target {
        &self.survey
    }
}

impl DerefMut for Survey {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.survey
    }
}
