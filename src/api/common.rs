use chrono::Utc;
use mongodb::bson::{doc, Document};
use rocket::{
    futures::TryStreamExt,
    serde::json::{json, serde_json, Json, Value},
};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::model::{
    api::survey::{QuestionDescription, SurveyDescription},
    db::{answer::AnswerOption, question::Question, survey::Survey},
    mongodb::{Coll, Id},
};

/// Wrap a payload under its resource label, per the response convention
/// (`{"surveys": [...]}`, `{"survey": {...}}`, ...).
pub fn envelope<T: Serialize>(label: &str, value: T) -> Result<Json<Value>> {
    let mut object = serde_json::Map::new();
    object.insert(label.to_string(), serde_json::to_value(value)?);
    Ok(Json(Value::Object(object)))
}

/// A `{"detail": ...}` confirmation message.
pub fn confirmation(message: impl Into<String>) -> Json<Value> {
    Json(json!({ "detail": message.into() }))
}

/// Filter matching surveys that still accept submissions today (end date on
/// or after the current date). ISO dates compare correctly as strings.
pub fn active_filter() -> Document {
    doc! { "end_date": { "$gte": Utc::now().date_naive().to_string() } }
}

/// Look up any survey by ID, active or not.
pub async fn survey_by_id(survey_id: Id, surveys: &Coll<Survey>) -> Result<Survey> {
    surveys
        .find_one(survey_id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Survey {}", survey_id)))
}

/// Look up an active survey by ID. A survey past its end date is
/// indistinguishable from a nonexistent one here.
pub async fn active_survey_by_id(survey_id: Id, surveys: &Coll<Survey>) -> Result<Survey> {
    let mut filter = active_filter();
    filter.insert("_id", survey_id);
    surveys
        .find_one(filter, None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Survey {}", survey_id)))
}

/// Look up a question by ID, scoped to the given survey.
pub async fn question_in_survey(
    survey_id: Id,
    question_id: Id,
    questions: &Coll<Question>,
) -> Result<Question> {
    let filter = doc! { "_id": question_id, "survey_id": survey_id };
    questions
        .find_one(filter, None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Question {}", question_id)))
}

/// Expand a question into its description by loading its answer options.
pub async fn describe_question(
    question: Question,
    answer_options: &Coll<AnswerOption>,
) -> Result<QuestionDescription> {
    let options = answer_options
        .find(doc! { "question_id": question.id }, None)
        .await?
        .try_collect()
        .await?;
    Ok(QuestionDescription::assemble(question, options))
}

/// Expand a survey into its full nested description.
pub async fn describe_survey(
    survey: Survey,
    questions: &Coll<Question>,
    answer_options: &Coll<AnswerOption>,
) -> Result<SurveyDescription> {
    let survey_questions: Vec<Question> = questions
        .find(doc! { "survey_id": survey.id }, None)
        .await?
        .try_collect()
        .await?;
    let mut descriptions = Vec::with_capacity(survey_questions.len());
    for question in survey_questions {
        descriptions.push(describe_question(question, answer_options).await?);
    }
    Ok(SurveyDescription::assemble(survey, descriptions))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_filter_includes_surveys_ending_today() {
        let today = Utc::now().date_naive().to_string();
        // `$gte` keeps the end date itself in the active window.
        assert_eq!(active_filter(), doc! { "end_date": { "$gte": today } });
    }

    #[test]
    fn iso_date_strings_order_like_dates() {
        // The filter compares strings, which is only sound because ISO
        // dates sort the same way as the dates they encode, including
        // across month and year boundaries.
        let ordered = [
            "2025-12-31",
            "2026-01-01",
            "2026-08-30",
            "2026-09-01",
            "2026-10-09",
        ];
        for pair in ordered.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }
}
