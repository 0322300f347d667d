use std::collections::HashMap;

use mongodb::bson::{doc, Document};
use rocket::{
    futures::TryStreamExt,
    http::Status,
    serde::json::{Json, Value},
    Route,
};

use crate::error::{Error, Result};
use crate::model::{
    api::{
        auth::StaffToken,
        submission::{SubmissionBody, SubmissionDescription},
    },
    db::{
        answer::AnswerOption,
        question::Question,
        submission::{NewSubmission, Submission},
        survey::Survey,
    },
    mongodb::{Coll, Id},
};

use super::common::{
    active_filter, active_survey_by_id, confirmation, describe_survey, envelope, survey_by_id,
};

pub fn routes() -> Vec<Route> {
    routes![
        get_surveys,
        get_survey,
        complete_survey,
        completed_surveys,
        completed_survey,
    ]
}

/// List surveys with their full nested questions. Staff see every survey;
/// everyone else sees only those still accepting submissions.
#[get("/surveys")]
async fn get_surveys(
    token: Option<StaffToken>,
    surveys: Coll<Survey>,
    questions: Coll<Question>,
    answer_options: Coll<AnswerOption>,
) -> Result<Json<Value>> {
    let filter = match token {
        Some(_) => Document::new(),
        None => active_filter(),
    };
    let matched: Vec<Survey> = surveys.find(filter, None).await?.try_collect().await?;
    let mut descriptions = Vec::with_capacity(matched.len());
    for survey in matched {
        descriptions.push(describe_survey(survey, &questions, &answer_options).await?);
    }
    envelope("surveys", descriptions)
}

/// Retrieve a single survey. For non-staff an expired survey is a 404.
#[get("/surveys/<survey_id>")]
async fn get_survey(
    token: Option<StaffToken>,
    survey_id: Id,
    surveys: Coll<Survey>,
    questions: Coll<Question>,
    answer_options: Coll<AnswerOption>,
) -> Result<Json<Value>> {
    let survey = match token {
        Some(_) => survey_by_id(survey_id, &surveys).await?,
        None => active_survey_by_id(survey_id, &surveys).await?,
    };
    envelope(
        "survey",
        describe_survey(survey, &questions, &answer_options).await?,
    )
}

/// Submit an answer set for an active survey. The whole set is validated
/// against the survey's questions before anything is stored; a rejected set
/// leaves no trace.
#[post("/surveys/<survey_id>", data = "<body>", format = "json")]
async fn complete_survey(
    survey_id: Id,
    body: Json<SubmissionBody>,
    surveys: Coll<Survey>,
    questions: Coll<Question>,
    answer_options: Coll<AnswerOption>,
    new_submissions: Coll<NewSubmission>,
) -> Result<(Status, Json<Value>)> {
    // An expired survey must 404 before the payload is even looked at.
    active_survey_by_id(survey_id, &surveys).await?;
    let request = body.0.user_answers;
    request.validate()?;

    let survey_questions: Vec<Question> = questions
        .find(doc! { "survey_id": survey_id }, None)
        .await?
        .try_collect()
        .await?;

    let mut options: HashMap<Id, Vec<AnswerOption>> = HashMap::new();
    for question in &survey_questions {
        if question.question_type.has_options() {
            let question_options = answer_options
                .find(doc! { "question_id": question.id }, None)
                .await?
                .try_collect()
                .await?;
            options.insert(question.id, question_options);
        }
    }

    let submission = request.into_submission(survey_id, &survey_questions, &options)?;
    new_submissions.insert_one(submission, None).await?;

    Ok((Status::Created, confirmation("Your answer was saved")))
}

/// List a user's completed submissions, each with the full survey it
/// answered. Access control for this history is the caller's concern, not
/// ours; user IDs are external identifiers.
#[get("/completed-surveys/<user_id>")]
async fn completed_surveys(
    user_id: u32,
    submissions: Coll<Submission>,
    surveys: Coll<Survey>,
    questions: Coll<Question>,
    answer_options: Coll<AnswerOption>,
) -> Result<Json<Value>> {
    let matched: Vec<Submission> = submissions
        .find(doc! { "user_id": user_id }, None)
        .await?
        .try_collect()
        .await?;
    let mut descriptions = Vec::with_capacity(matched.len());
    for submission in matched {
        // Survey deletion cascades to submissions, so the survey exists.
        let survey = survey_by_id(submission.survey_id, &surveys).await?;
        let survey = describe_survey(survey, &questions, &answer_options).await?;
        descriptions.push(SubmissionDescription::assemble(submission, survey));
    }
    envelope("completed_surveys", descriptions)
}

/// Retrieve a single completed submission of a user.
#[get("/completed-surveys/<user_id>/<submission_id>")]
async fn completed_survey(
    user_id: u32,
    submission_id: Id,
    submissions: Coll<Submission>,
    surveys: Coll<Survey>,
    questions: Coll<Question>,
    answer_options: Coll<AnswerOption>,
) -> Result<Json<Value>> {
    let submission = submissions
        .find_one(doc! { "_id": submission_id, "user_id": user_id }, None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Submission {}", submission_id)))?;

    let survey = survey_by_id(submission.survey_id, &surveys).await?;
    let survey = describe_survey(survey, &questions, &answer_options).await?;
    envelope(
        "completed_survey",
        SubmissionDescription::assemble(submission, survey),
    )
}
