use chrono::Utc;
use mongodb::{
    bson::{doc, Document},
    Client, ClientSession, Database,
};
use rocket::{
    futures::TryStreamExt,
    http::Status,
    serde::json::{Json, Value},
    Route, State,
};
use serde::{de::DeserializeOwned, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    api::{
        auth::StaffToken,
        survey::{
            AnswerOptionBody, AnswerOptionDescription, AnswerOptionSpec, AnswerOptionUpdate,
            QuestionBody, QuestionDescription, QuestionSpec, QuestionUpdate, SurveyBody,
            SurveyDescription, SurveySpec, SurveyUpdate,
        },
    },
    common::QuestionType,
    db::{
        answer::{AnswerOption, NewAnswerOption},
        question::{NewQuestion, Question},
        survey::{NewSurvey, Survey},
        submission::Submission,
    },
    mongodb::{Coll, Id, MongoCollection},
};

use super::common::{
    confirmation, describe_question, describe_survey, envelope, question_in_survey, survey_by_id,
};

pub fn routes() -> Vec<Route> {
    routes![
        create_survey,
        update_survey,
        delete_survey,
        get_questions,
        create_question,
        get_question,
        update_question,
        delete_question,
        get_answers,
        create_answer,
        get_answer,
        update_answer,
        delete_answer,
    ]
}

/// The capabilities shared by every admin-managed entity kind: the stored
/// entity, the API description it expands to, and the label used in
/// response envelopes and confirmation messages.
#[rocket::async_trait]
trait AdminResource {
    type Entity: MongoCollection + DeserializeOwned + Unpin + Send + Sync;
    type Description: Serialize + Send;
    const LABEL: &'static str;

    /// Expand a stored entity into its full description.
    async fn describe(entity: Self::Entity, db: &Database) -> Result<Self::Description>;

    /// The label with a leading capital, for confirmation messages.
    fn capitalised() -> String {
        let mut chars = Self::LABEL.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
            None => String::new(),
        }
    }

    fn not_found(id: Id) -> Error {
        Error::not_found(format!("{} {}", Self::capitalised(), id))
    }

    fn confirmed(id: Id, action: &str) -> Json<Value> {
        confirmation(format!("{} ({}) was {}", Self::capitalised(), id, action))
    }
}

/// List all entities of a kind matching the filter, fully described, under
/// the pluralised label.
async fn list_resources<R: AdminResource>(db: &Database, filter: Document) -> Result<Json<Value>> {
    let coll = Coll::<R::Entity>::from_db(db);
    let entities: Vec<R::Entity> = coll.find(filter, None).await?.try_collect().await?;
    let mut descriptions = Vec::with_capacity(entities.len());
    for entity in entities {
        descriptions.push(R::describe(entity, db).await?);
    }
    envelope(&format!("{}s", R::LABEL), descriptions)
}

/// Retrieve a single entity matching the filter, fully described, under the
/// singular label.
async fn retrieve_resource<R: AdminResource>(
    db: &Database,
    filter: Document,
    id: Id,
) -> Result<Json<Value>> {
    let coll = Coll::<R::Entity>::from_db(db);
    let entity = coll
        .find_one(filter, None)
        .await?
        .ok_or_else(|| R::not_found(id))?;
    envelope(R::LABEL, R::describe(entity, db).await?)
}

struct SurveyResource;

#[rocket::async_trait]
impl AdminResource for SurveyResource {
    type Entity = Survey;
    type Description = SurveyDescription;
    const LABEL: &'static str = "survey";

    async fn describe(entity: Survey, db: &Database) -> Result<SurveyDescription> {
        describe_survey(entity, &Coll::from_db(db), &Coll::from_db(db)).await
    }
}

struct QuestionResource;

#[rocket::async_trait]
impl AdminResource for QuestionResource {
    type Entity = Question;
    type Description = QuestionDescription;
    const LABEL: &'static str = "question";

    async fn describe(entity: Question, db: &Database) -> Result<QuestionDescription> {
        describe_question(entity, &Coll::from_db(db)).await
    }
}

struct AnswerOptionResource;

#[rocket::async_trait]
impl AdminResource for AnswerOptionResource {
    type Entity = AnswerOption;
    type Description = AnswerOptionDescription;
    const LABEL: &'static str = "question_answer";

    async fn describe(entity: AnswerOption, _db: &Database) -> Result<AnswerOptionDescription> {
        Ok(entity.into())
    }
}

/// What an update does to a set of nested children.
#[derive(Debug, PartialEq, Eq)]
enum SetChange<T> {
    /// Delete the existing children and recreate the set from this list.
    Replace(Vec<T>),
    /// Delete every child.
    Clear,
    /// Leave the existing children untouched.
    Keep,
}

/// Decide what happens to a survey's question set: a supplied list replaces
/// it wholesale, an absent one leaves it alone.
fn question_set_change(supplied: Option<Vec<QuestionSpec>>) -> SetChange<QuestionSpec> {
    match supplied {
        Some(specs) => SetChange::Replace(specs),
        None => SetChange::Keep,
    }
}

/// Decide what happens to a question's answer options after an update.
/// Plain-text questions never keep options, whatever the payload supplied;
/// otherwise a supplied list replaces the set wholesale.
fn option_set_change(
    question_type: QuestionType,
    supplied: Option<Vec<AnswerOptionSpec>>,
) -> SetChange<AnswerOptionSpec> {
    if !question_type.has_options() {
        SetChange::Clear
    } else {
        match supplied {
            Some(specs) => SetChange::Replace(specs),
            None => SetChange::Keep,
        }
    }
}

/// Insert the given question specs (and their options) under a survey,
/// within the session's transaction.
async fn insert_question_set(
    specs: Vec<QuestionSpec>,
    survey_id: Id,
    new_questions: &Coll<NewQuestion>,
    new_answer_options: &Coll<NewAnswerOption>,
    session: &mut ClientSession,
) -> Result<()> {
    for spec in specs {
        let (question, option_specs) = spec.into_parts(survey_id);
        let question_id: Id = new_questions
            .insert_one_with_session(&question, None, session)
            .await?
            .inserted_id
            .as_object_id()
            .unwrap() // Valid because the ID comes directly from the DB
            .into();
        if !option_specs.is_empty() {
            let options: Vec<NewAnswerOption> = option_specs
                .into_iter()
                .map(|spec| spec.into_option(question_id))
                .collect();
            new_answer_options
                .insert_many_with_session(&options, None, session)
                .await?;
        }
    }
    Ok(())
}

/// Delete all questions of a survey together with their options, within the
/// session's transaction.
async fn delete_question_set(
    survey_id: Id,
    questions: &Coll<Question>,
    answer_options: &Coll<AnswerOption>,
    session: &mut ClientSession,
) -> Result<()> {
    let by_survey = doc! { "survey_id": survey_id };
    let mut cursor = questions
        .find_with_session(by_survey.clone(), None, session)
        .await?;
    let mut question_ids = Vec::new();
    while let Some(question) = cursor.next(session).await {
        question_ids.push(question?.id);
    }

    answer_options
        .delete_many_with_session(doc! { "question_id": { "$in": question_ids } }, None, session)
        .await?;
    questions
        .delete_many_with_session(by_survey, None, session)
        .await?;
    Ok(())
}

#[post("/surveys", data = "<body>", format = "json")]
async fn create_survey(
    _token: StaffToken,
    body: Json<SurveyBody<SurveySpec>>,
    new_surveys: Coll<NewSurvey>,
    new_questions: Coll<NewQuestion>,
    new_answer_options: Coll<NewAnswerOption>,
    db_client: &State<Client>,
) -> Result<(Status, Json<Value>)> {
    let spec = body.0.survey;
    spec.validate()?;

    let survey_id = {
        let mut session = db_client.start_session(None).await?;
        session.start_transaction(None).await?;

        // Create and insert the survey, then its nested questions.
        let (survey, question_specs) = spec.into_parts(Utc::now().date_naive());
        let survey_id: Id = new_surveys
            .insert_one_with_session(&survey, None, &mut session)
            .await?
            .inserted_id
            .as_object_id()
            .unwrap() // Valid because the ID comes directly from the DB
            .into();
        insert_question_set(
            question_specs,
            survey_id,
            &new_questions,
            &new_answer_options,
            &mut session,
        )
        .await?;

        session.commit_transaction().await?;
        survey_id
    };

    Ok((
        Status::Created,
        SurveyResource::confirmed(survey_id, "created"),
    ))
}

#[put("/surveys/<survey_id>", data = "<body>", format = "json")]
async fn update_survey(
    _token: StaffToken,
    survey_id: Id,
    body: Json<SurveyBody<SurveyUpdate>>,
    surveys: Coll<Survey>,
    new_surveys: Coll<NewSurvey>,
    questions: Coll<Question>,
    new_questions: Coll<NewQuestion>,
    answer_options: Coll<AnswerOption>,
    new_answer_options: Coll<NewAnswerOption>,
    db_client: &State<Client>,
) -> Result<Json<Value>> {
    let update = body.0.survey;
    update.validate()?;

    let mut session = db_client.start_session(None).await?;
    session.start_transaction(None).await?;

    let mut survey = surveys
        .find_one_with_session(survey_id.as_doc(), None, &mut session)
        .await?
        .ok_or_else(|| SurveyResource::not_found(survey_id))?;

    // Scalar fields change only when supplied.
    update.apply(&mut survey);
    new_surveys
        .replace_one_with_session(survey_id.as_doc(), &survey.survey, None, &mut session)
        .await?;

    if let SetChange::Replace(question_specs) = question_set_change(update.questions) {
        delete_question_set(survey_id, &questions, &answer_options, &mut session).await?;
        insert_question_set(
            question_specs,
            survey_id,
            &new_questions,
            &new_answer_options,
            &mut session,
        )
        .await?;
    }

    session.commit_transaction().await?;
    Ok(SurveyResource::confirmed(survey_id, "updated"))
}

#[delete("/surveys/<survey_id>")]
async fn delete_survey(
    _token: StaffToken,
    survey_id: Id,
    surveys: Coll<Survey>,
    questions: Coll<Question>,
    answer_options: Coll<AnswerOption>,
    submissions: Coll<Submission>,
    db_client: &State<Client>,
) -> Result<Json<Value>> {
    let mut session = db_client.start_session(None).await?;
    session.start_transaction(None).await?;

    surveys
        .find_one_with_session(survey_id.as_doc(), None, &mut session)
        .await?
        .ok_or_else(|| SurveyResource::not_found(survey_id))?;

    // Cascade: questions, their options, and the survey's submissions.
    delete_question_set(survey_id, &questions, &answer_options, &mut session).await?;
    submissions
        .delete_many_with_session(doc! { "survey_id": survey_id }, None, &mut session)
        .await?;
    surveys
        .delete_one_with_session(survey_id.as_doc(), None, &mut session)
        .await?;

    session.commit_transaction().await?;
    Ok(SurveyResource::confirmed(survey_id, "deleted"))
}

#[get("/surveys/<survey_id>/questions")]
async fn get_questions(
    _token: StaffToken,
    survey_id: Id,
    surveys: Coll<Survey>,
    db: &State<Database>,
) -> Result<Json<Value>> {
    survey_by_id(survey_id, &surveys).await?;
    list_resources::<QuestionResource>(db, doc! { "survey_id": survey_id }).await
}

#[post("/surveys/<survey_id>/questions", data = "<body>", format = "json")]
async fn create_question(
    _token: StaffToken,
    survey_id: Id,
    body: Json<QuestionBody<QuestionSpec>>,
    surveys: Coll<Survey>,
    new_questions: Coll<NewQuestion>,
    new_answer_options: Coll<NewAnswerOption>,
    db_client: &State<Client>,
) -> Result<(Status, Json<Value>)> {
    let spec = body.0.question;
    spec.validate()?;
    survey_by_id(survey_id, &surveys).await?;

    let question_id = {
        let mut session = db_client.start_session(None).await?;
        session.start_transaction(None).await?;

        let (question, option_specs) = spec.into_parts(survey_id);
        let question_id: Id = new_questions
            .insert_one_with_session(&question, None, &mut session)
            .await?
            .inserted_id
            .as_object_id()
            .unwrap() // Valid because the ID comes directly from the DB
            .into();
        if !option_specs.is_empty() {
            let options: Vec<NewAnswerOption> = option_specs
                .into_iter()
                .map(|spec| spec.into_option(question_id))
                .collect();
            new_answer_options
                .insert_many_with_session(&options, None, &mut session)
                .await?;
        }

        session.commit_transaction().await?;
        question_id
    };

    Ok((
        Status::Created,
        QuestionResource::confirmed(question_id, "created"),
    ))
}

#[get("/surveys/<survey_id>/questions/<question_id>")]
async fn get_question(
    _token: StaffToken,
    survey_id: Id,
    question_id: Id,
    db: &State<Database>,
) -> Result<Json<Value>> {
    let filter = doc! { "_id": question_id, "survey_id": survey_id };
    retrieve_resource::<QuestionResource>(db, filter, question_id).await
}

#[put(
    "/surveys/<survey_id>/questions/<question_id>",
    data = "<body>",
    format = "json"
)]
async fn update_question(
    _token: StaffToken,
    survey_id: Id,
    question_id: Id,
    body: Json<QuestionBody<QuestionUpdate>>,
    questions: Coll<Question>,
    new_questions: Coll<NewQuestion>,
    answer_options: Coll<AnswerOption>,
    new_answer_options: Coll<NewAnswerOption>,
    db_client: &State<Client>,
) -> Result<Json<Value>> {
    let update = body.0.question;
    update.validate()?;

    let mut session = db_client.start_session(None).await?;
    session.start_transaction(None).await?;

    let scoped = doc! { "_id": question_id, "survey_id": survey_id };
    let mut question = questions
        .find_one_with_session(scoped, None, &mut session)
        .await?
        .ok_or_else(|| QuestionResource::not_found(question_id))?;

    update.apply(&mut question);
    new_questions
        .replace_one_with_session(question_id.as_doc(), &question.question, None, &mut session)
        .await?;

    let by_question = doc! { "question_id": question_id };
    match option_set_change(question.question_type, update.question_answers) {
        SetChange::Replace(option_specs) => {
            answer_options
                .delete_many_with_session(by_question, None, &mut session)
                .await?;
            if !option_specs.is_empty() {
                let options: Vec<NewAnswerOption> = option_specs
                    .into_iter()
                    .map(|spec| spec.into_option(question_id))
                    .collect();
                new_answer_options
                    .insert_many_with_session(&options, None, &mut session)
                    .await?;
            }
        }
        SetChange::Clear => {
            answer_options
                .delete_many_with_session(by_question, None, &mut session)
                .await?;
        }
        SetChange::Keep => {}
    }

    session.commit_transaction().await?;
    Ok(QuestionResource::confirmed(question_id, "updated"))
}

#[delete("/surveys/<survey_id>/questions/<question_id>")]
async fn delete_question(
    _token: StaffToken,
    survey_id: Id,
    question_id: Id,
    questions: Coll<Question>,
    answer_options: Coll<AnswerOption>,
    db_client: &State<Client>,
) -> Result<Json<Value>> {
    let mut session = db_client.start_session(None).await?;
    session.start_transaction(None).await?;

    let scoped = doc! { "_id": question_id, "survey_id": survey_id };
    questions
        .find_one_with_session(scoped, None, &mut session)
        .await?
        .ok_or_else(|| QuestionResource::not_found(question_id))?;

    answer_options
        .delete_many_with_session(doc! { "question_id": question_id }, None, &mut session)
        .await?;
    questions
        .delete_one_with_session(question_id.as_doc(), None, &mut session)
        .await?;

    session.commit_transaction().await?;
    Ok(QuestionResource::confirmed(question_id, "deleted"))
}

#[get("/surveys/<survey_id>/questions/<question_id>/questions-answers")]
async fn get_answers(
    _token: StaffToken,
    survey_id: Id,
    question_id: Id,
    questions: Coll<Question>,
    db: &State<Database>,
) -> Result<Json<Value>> {
    question_in_survey(survey_id, question_id, &questions).await?;
    list_resources::<AnswerOptionResource>(db, doc! { "question_id": question_id }).await
}

#[post(
    "/surveys/<survey_id>/questions/<question_id>/questions-answers",
    data = "<body>",
    format = "json"
)]
async fn create_answer(
    _token: StaffToken,
    survey_id: Id,
    question_id: Id,
    body: Json<AnswerOptionBody<AnswerOptionSpec>>,
    questions: Coll<Question>,
    new_answer_options: Coll<NewAnswerOption>,
) -> Result<(Status, Json<Value>)> {
    let spec = body.0.question_answer;
    spec.validate()?;
    question_in_survey(survey_id, question_id, &questions).await?;

    let answer_id: Id = new_answer_options
        .insert_one(spec.into_option(question_id), None)
        .await?
        .inserted_id
        .as_object_id()
        .unwrap() // Valid because the ID comes directly from the DB
        .into();

    Ok((
        Status::Created,
        AnswerOptionResource::confirmed(answer_id, "created"),
    ))
}

#[get("/surveys/<survey_id>/questions/<question_id>/questions-answers/<answer_id>")]
async fn get_answer(
    _token: StaffToken,
    survey_id: Id,
    question_id: Id,
    answer_id: Id,
    questions: Coll<Question>,
    db: &State<Database>,
) -> Result<Json<Value>> {
    question_in_survey(survey_id, question_id, &questions).await?;
    let filter = doc! { "_id": answer_id, "question_id": question_id };
    retrieve_resource::<AnswerOptionResource>(db, filter, answer_id).await
}

#[put(
    "/surveys/<survey_id>/questions/<question_id>/questions-answers/<answer_id>",
    data = "<body>",
    format = "json"
)]
async fn update_answer(
    _token: StaffToken,
    survey_id: Id,
    question_id: Id,
    answer_id: Id,
    body: Json<AnswerOptionBody<AnswerOptionUpdate>>,
    questions: Coll<Question>,
    answer_options: Coll<AnswerOption>,
    new_answer_options: Coll<NewAnswerOption>,
) -> Result<Json<Value>> {
    let update = body.0.question_answer;
    update.validate()?;
    question_in_survey(survey_id, question_id, &questions).await?;

    let scoped = doc! { "_id": answer_id, "question_id": question_id };
    let mut option = answer_options
        .find_one(scoped, None)
        .await?
        .ok_or_else(|| AnswerOptionResource::not_found(answer_id))?;

    if let Some(text) = update.text {
        option.option.text = text;
    }
    new_answer_options
        .replace_one(answer_id.as_doc(), &option.option, None)
        .await?;

    Ok(AnswerOptionResource::confirmed(answer_id, "updated"))
}

#[delete("/surveys/<survey_id>/questions/<question_id>/questions-answers/<answer_id>")]
async fn delete_answer(
    _token: StaffToken,
    survey_id: Id,
    question_id: Id,
    answer_id: Id,
    questions: Coll<Question>,
    answer_options: Coll<AnswerOption>,
) -> Result<Json<Value>> {
    question_in_survey(survey_id, question_id, &questions).await?;

    let scoped = doc! { "_id": answer_id, "question_id": question_id };
    let result = answer_options.delete_one(scoped, None).await?;
    if result.deleted_count == 0 {
        return Err(AnswerOptionResource::not_found(answer_id));
    }

    Ok(AnswerOptionResource::confirmed(answer_id, "deleted"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supplied_question_list_replaces_the_set_wholesale() {
        let specs = vec![QuestionSpec::pizza_or_salad(), QuestionSpec::free_text()];
        assert_eq!(
            question_set_change(Some(specs.clone())),
            SetChange::Replace(specs)
        );
        // Even an empty list is a replacement, leaving the survey with no
        // questions.
        assert_eq!(
            question_set_change(Some(Vec::new())),
            SetChange::Replace(Vec::new())
        );
    }

    #[test]
    fn absent_question_list_leaves_the_set_untouched() {
        assert_eq!(question_set_change(None), SetChange::Keep);
    }

    #[test]
    fn supplied_options_replace_the_set_wholesale() {
        let specs = QuestionSpec::pizza_or_salad().question_answers;
        assert_eq!(
            option_set_change(QuestionType::SingleChoice, Some(specs.clone())),
            SetChange::Replace(specs)
        );
        assert_eq!(
            option_set_change(QuestionType::MultipleChoice, None),
            SetChange::Keep
        );
    }

    #[test]
    fn plain_text_questions_always_lose_their_options() {
        assert_eq!(
            option_set_change(QuestionType::PlainText, None),
            SetChange::Clear
        );
        let supplied = vec![AnswerOptionSpec {
            text: "Ignored".to_string(),
        }];
        assert_eq!(
            option_set_change(QuestionType::PlainText, Some(supplied)),
            SetChange::Clear
        );
    }
}
