use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::model::{
    common::QuestionType,
    db::{
        answer::{AnswerOption, NewAnswerOption},
        question::{NewQuestion, Question},
        survey::{NewSurvey, Survey},
    },
    mongodb::Id,
};

pub const MAX_TITLE_LENGTH: usize = 128;
pub const MAX_DESCRIPTION_LENGTH: usize = 2048;
pub const MAX_QUESTION_LENGTH: usize = 256;
pub const MAX_OPTION_LENGTH: usize = 128;

pub const DEFAULT_DESCRIPTION: &str = "No description";

fn default_description() -> String {
    DEFAULT_DESCRIPTION.to_string()
}

fn check_length(what: &str, value: &str, max: usize) -> Result<(), Error> {
    if value.len() > max {
        Err(Error::bad_request(format!(
            "{} must be at most {} bytes",
            what, max
        )))
    } else {
        Ok(())
    }
}

/// Request body wrapper for survey payloads: `{"survey": {...}}`.
#[derive(Debug, Deserialize)]
pub struct SurveyBody<T> {
    pub survey: T,
}

/// Request body wrapper for question payloads: `{"question": {...}}`.
#[derive(Debug, Deserialize)]
pub struct QuestionBody<T> {
    pub question: T,
}

/// Request body wrapper for answer option payloads:
/// `{"question_answer": {...}}`.
#[derive(Debug, Deserialize)]
pub struct AnswerOptionBody<T> {
    pub question_answer: T,
}

/// A survey specification with nested questions, as supplied on creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurveySpec {
    /// Survey title.
    pub title: String,
    /// The last date (inclusive) on which the survey accepts submissions.
    pub end_date: NaiveDate,
    /// Survey description.
    #[serde(default = "default_description")]
    pub description: String,
    /// The survey's questions, in order.
    pub questions: Vec<QuestionSpec>,
}

impl SurveySpec {
    /// Check field constraints on the whole nested payload. Runs before any
    /// persistence, so a failure leaves no partial writes.
    pub fn validate(&self) -> Result<(), Error> {
        check_length("Survey title", &self.title, MAX_TITLE_LENGTH)?;
        check_length(
            "Survey description",
            &self.description,
            MAX_DESCRIPTION_LENGTH,
        )?;
        for question in &self.questions {
            question.validate()?;
        }
        Ok(())
    }

    /// Convert this spec into an insertable survey created today, plus the
    /// question specs still to be persisted.
    pub fn into_parts(self, start_date: NaiveDate) -> (NewSurvey, Vec<QuestionSpec>) {
        let survey = NewSurvey {
            title: self.title,
            start_date,
            end_date: self.end_date,
            description: self.description,
        };
        (survey, self.questions)
    }
}

/// A question specification with nested answer options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionSpec {
    /// Question text.
    pub text: String,
    /// What kind of answers this question accepts.
    pub question_type: QuestionType,
    /// The predefined answer options; ignored for plain-text questions.
    #[serde(default)]
    pub question_answers: Vec<AnswerOptionSpec>,
}

impl QuestionSpec {
    pub fn validate(&self) -> Result<(), Error> {
        check_length("Question text", &self.text, MAX_QUESTION_LENGTH)?;
        for option in &self.question_answers {
            option.validate()?;
        }
        Ok(())
    }

    /// Convert this spec into an insertable question under the given survey,
    /// plus the option specs still to be persisted. Options supplied for a
    /// plain-text question are dropped here.
    pub fn into_parts(self, survey_id: Id) -> (NewQuestion, Vec<AnswerOptionSpec>) {
        let options = if self.question_type.has_options() {
            self.question_answers
        } else {
            Vec::new()
        };
        let question = NewQuestion {
            survey_id,
            text: self.text,
            question_type: self.question_type,
        };
        (question, options)
    }
}

/// An answer option specification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOptionSpec {
    /// Option text.
    pub text: String,
}

impl AnswerOptionSpec {
    pub fn validate(&self) -> Result<(), Error> {
        check_length("Answer option text", &self.text, MAX_OPTION_LENGTH)
    }

    /// Convert this spec into an insertable option under the given question.
    pub fn into_option(self, question_id: Id) -> NewAnswerOption {
        NewAnswerOption {
            question_id,
            text: self.text,
        }
    }
}

/// A partial survey update. Only supplied fields change; a supplied
/// `questions` list replaces the existing question set wholesale.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SurveyUpdate {
    pub title: Option<String>,
    pub end_date: Option<NaiveDate>,
    pub description: Option<String>,
    pub questions: Option<Vec<QuestionSpec>>,
}

impl SurveyUpdate {
    pub fn validate(&self) -> Result<(), Error> {
        if let Some(title) = &self.title {
            check_length("Survey title", title, MAX_TITLE_LENGTH)?;
        }
        if let Some(description) = &self.description {
            check_length("Survey description", description, MAX_DESCRIPTION_LENGTH)?;
        }
        for question in self.questions.iter().flatten() {
            question.validate()?;
        }
        Ok(())
    }

    /// Apply the scalar fields to an existing survey, leaving absent fields
    /// untouched. The question set is handled separately.
    pub fn apply(&self, survey: &mut Survey) {
        if let Some(title) = &self.title {
            survey.title = title.clone();
        }
        if let Some(end_date) = self.end_date {
            survey.end_date = end_date;
        }
        if let Some(description) = &self.description {
            survey.description = description.clone();
        }
    }
}

/// A partial question update. A supplied `question_answers` list replaces
/// the existing options wholesale (unless the resulting type is plain text,
/// in which case all options are dropped regardless).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuestionUpdate {
    pub text: Option<String>,
    pub question_type: Option<QuestionType>,
    pub question_answers: Option<Vec<AnswerOptionSpec>>,
}

impl QuestionUpdate {
    pub fn validate(&self) -> Result<(), Error> {
        if let Some(text) = &self.text {
            check_length("Question text", text, MAX_QUESTION_LENGTH)?;
        }
        for option in self.question_answers.iter().flatten() {
            option.validate()?;
        }
        Ok(())
    }

    /// Apply the scalar fields to an existing question.
    pub fn apply(&self, question: &mut Question) {
        if let Some(text) = &self.text {
            question.text = text.clone();
        }
        if let Some(question_type) = self.question_type {
            question.question_type = question_type;
        }
    }
}

/// A partial answer option update.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnswerOptionUpdate {
    pub text: Option<String>,
}

impl AnswerOptionUpdate {
    pub fn validate(&self) -> Result<(), Error> {
        if let Some(text) = &self.text {
            check_length("Answer option text", text, MAX_OPTION_LENGTH)?;
        }
        Ok(())
    }
}

/// An API-friendly answer option description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOptionDescription {
    pub id: Id,
    pub text: String,
}

impl From<AnswerOption> for AnswerOptionDescription {
    fn from(option: AnswerOption) -> Self {
        Self {
            id: option.id,
            text: option.option.text,
        }
    }
}

/// An API-friendly question description with its nested answer options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionDescription {
    pub id: Id,
    pub text: String,
    pub question_type: QuestionType,
    pub question_answers: Vec<AnswerOptionDescription>,
}

impl QuestionDescription {
    /// Assemble a description from a question and its loaded options.
    pub fn assemble(question: Question, options: Vec<AnswerOption>) -> Self {
        Self {
            id: question.id,
            text: question.question.text,
            question_type: question.question.question_type,
            question_answers: options.into_iter().map(Into::into).collect(),
        }
    }
}

/// An API-friendly survey description with its fully nested questions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurveyDescription {
    pub id: Id,
    pub title: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub description: String,
    pub questions: Vec<QuestionDescription>,
}

impl SurveyDescription {
    /// Assemble a description from a survey and its loaded question
    /// descriptions.
    pub fn assemble(survey: Survey, questions: Vec<QuestionDescription>) -> Self {
        Self {
            id: survey.id,
            title: survey.survey.title,
            start_date: survey.survey.start_date,
            end_date: survey.survey.end_date,
            description: survey.survey.description,
            questions,
        }
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    use chrono::{Duration, Utc};

    impl SurveySpec {
        /// The "Lunch Poll": one single-choice question, open until tomorrow.
        pub fn lunch_poll() -> Self {
            Self {
                title: "Lunch Poll".to_string(),
                end_date: Utc::now().date_naive() + Duration::days(1),
                description: "What should we have for lunch?".to_string(),
                questions: vec![QuestionSpec::pizza_or_salad()],
            }
        }
    }

    impl QuestionSpec {
        pub fn pizza_or_salad() -> Self {
            Self {
                text: "Pizza or Salad?".to_string(),
                question_type: QuestionType::SingleChoice,
                question_answers: vec![
                    AnswerOptionSpec {
                        text: "Pizza".to_string(),
                    },
                    AnswerOptionSpec {
                        text: "Salad".to_string(),
                    },
                ],
            }
        }

        pub fn favourite_colour() -> Self {
            Self {
                text: "Favourite colours?".to_string(),
                question_type: QuestionType::MultipleChoice,
                question_answers: vec![
                    AnswerOptionSpec {
                        text: "Red".to_string(),
                    },
                    AnswerOptionSpec {
                        text: "Green".to_string(),
                    },
                    AnswerOptionSpec {
                        text: "Blue".to_string(),
                    },
                ],
            }
        }

        pub fn free_text() -> Self {
            Self {
                text: "Any other feedback?".to_string(),
                question_type: QuestionType::PlainText,
                question_answers: Vec::new(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Utc;
    use rocket::serde::json::{json, serde_json};

    #[test]
    fn description_defaults_when_absent() {
        let spec: SurveySpec = serde_json::from_value(json!({
            "title": "Minimal",
            "end_date": "2030-01-01",
            "questions": [],
        }))
        .unwrap();
        assert_eq!(spec.description, DEFAULT_DESCRIPTION);
    }

    #[test]
    fn length_limits_are_enforced() {
        let mut spec = SurveySpec::lunch_poll();
        assert!(spec.validate().is_ok());

        spec.title = "t".repeat(MAX_TITLE_LENGTH + 1);
        assert!(spec.validate().is_err());

        let mut spec = SurveySpec::lunch_poll();
        spec.questions[0].question_answers[0].text = "o".repeat(MAX_OPTION_LENGTH + 1);
        assert!(spec.validate().is_err());
    }

    #[test]
    fn plain_text_questions_drop_supplied_options() {
        let mut spec = QuestionSpec::free_text();
        spec.question_answers = vec![AnswerOptionSpec {
            text: "Should be ignored".to_string(),
        }];

        let (question, options) = spec.into_parts(Id::new());
        assert_eq!(question.question_type, QuestionType::PlainText);
        assert!(options.is_empty());
    }

    #[test]
    fn choice_questions_keep_supplied_options() {
        let spec = QuestionSpec::pizza_or_salad();
        let survey_id = Id::new();

        let (question, options) = spec.into_parts(survey_id);
        assert_eq!(question.survey_id, survey_id);
        assert_eq!(options.len(), 2);
    }

    #[test]
    fn update_changes_only_supplied_fields() {
        let today = Utc::now().date_naive();
        let (core, _) = SurveySpec::lunch_poll().into_parts(today);
        let mut survey = Survey {
            id: Id::new(),
            survey: core,
        };
        let original_end = survey.end_date;

        let update = SurveyUpdate {
            title: Some("Dinner Poll".to_string()),
            ..Default::default()
        };
        update.apply(&mut survey);

        assert_eq!(survey.title, "Dinner Poll");
        assert_eq!(survey.end_date, original_end);
        assert_eq!(survey.start_date, today);
    }
}
