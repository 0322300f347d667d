use std::ops::Deref;

use mongodb::{
    bson::doc, error::Error as DbError, options::IndexOptions, Collection, Database, IndexModel,
};
use rocket::{
    request::{self, FromRequest, Request},
    State,
};

use crate::model::db::{
    account::{Account, AccountCore},
    answer::{AnswerOption, AnswerOptionCore},
    question::{Question, QuestionCore},
    submission::{Submission, SubmissionCore},
    survey::{Survey, SurveyCore},
};

/// A type that can be directly inserted/read to/from the database.
pub trait MongoCollection {
    /// The name of the collection.
    const NAME: &'static str;
}

/// A database collection of the given type.
pub struct Coll<T>(Collection<T>);

impl<T> Coll<T>
where
    T: MongoCollection,
{
    /// Get a handle on this collection in the given database.
    pub fn from_db(db: &Database) -> Self {
        Self(db.collection(T::NAME))
    }
}

// `Derive(Clone)` would only derive if `T: Clone`, but we don't need that bound.
impl<T> Clone for Coll<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> Deref for Coll<T> {
    type Target = Collection<T>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[rocket::async_trait]
impl<'r, T> FromRequest<'r> for Coll<T>
where
    T: MongoCollection,
{
    type Error = ();

    /// Get the database connection from the managed state and wrap it in a collection.
    ///
    /// Panics iff the [`Database`] is not managed by [`rocket::Rocket`].
    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let db = req.guard::<&State<Database>>().await.unwrap();
        request::Outcome::Success(Coll::from_db(db))
    }
}

// Survey collections
const SURVEYS: &str = "surveys";
impl MongoCollection for Survey {
    const NAME: &'static str = SURVEYS;
}
impl MongoCollection for SurveyCore {
    const NAME: &'static str = SURVEYS;
}

// Question collections
const QUESTIONS: &str = "questions";
impl MongoCollection for Question {
    const NAME: &'static str = QUESTIONS;
}
impl MongoCollection for QuestionCore {
    const NAME: &'static str = QUESTIONS;
}

// Answer option collections
const QUESTION_ANSWERS: &str = "question_answers";
impl MongoCollection for AnswerOption {
    const NAME: &'static str = QUESTION_ANSWERS;
}
impl MongoCollection for AnswerOptionCore {
    const NAME: &'static str = QUESTION_ANSWERS;
}

// Submission collections
const SUBMISSIONS: &str = "submissions";
impl MongoCollection for Submission {
    const NAME: &'static str = SUBMISSIONS;
}
impl MongoCollection for SubmissionCore {
    const NAME: &'static str = SUBMISSIONS;
}

// Account collections
const ACCOUNTS: &str = "accounts";
impl MongoCollection for Account {
    const NAME: &'static str = ACCOUNTS;
}
impl MongoCollection for AccountCore {
    const NAME: &'static str = ACCOUNTS;
}

/// Ensure that all the required indexes exist on the given database.
///
/// This operation is idempotent.
pub async fn ensure_indexes_exist(db: &Database) -> Result<(), DbError> {
    debug!("Ensuring collection indexes exist");

    let unique = IndexOptions::builder().unique(true).build();

    // Account collection.
    let account_index = IndexModel::builder()
        .keys(doc! {"username": 1})
        .options(unique)
        .build();
    Coll::<Account>::from_db(db)
        .create_index(account_index, None)
        .await?;

    // Question collection.
    let question_index = IndexModel::builder().keys(doc! {"survey_id": 1}).build();
    Coll::<Question>::from_db(db)
        .create_index(question_index, None)
        .await?;

    // Answer option collection.
    let answer_index = IndexModel::builder().keys(doc! {"question_id": 1}).build();
    Coll::<AnswerOption>::from_db(db)
        .create_index(answer_index, None)
        .await?;

    // Submission collection.
    let submission_index = IndexModel::builder()
        .keys(doc! {"user_id": 1, "survey_id": 1})
        .build();
    Coll::<Submission>::from_db(db)
        .create_index(submission_index, None)
        .await?;

    Ok(())
}
