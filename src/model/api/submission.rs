use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::Error;
use crate::model::{
    common::QuestionType,
    db::{
        answer::AnswerOption,
        question::Question,
        submission::{NewSubmission, Submission, SubmittedAnswer},
    },
    mongodb::Id,
};

pub const MAX_ANSWER_LENGTH: usize = 1024;

/// Request body wrapper for submissions: `{"user_answers": {...}}`.
#[derive(Debug, Deserialize)]
pub struct SubmissionBody {
    pub user_answers: SubmissionRequest,
}

/// A proposed set of answers for a survey, as received from a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionRequest {
    /// The external identifier of the submitting user.
    #[serde(rename = "user_ID")]
    pub user_id: u32,
    /// The proposed answers, in submission order.
    pub answers: Vec<ProposedAnswer>,
}

/// One proposed (question, answer) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposedAnswer {
    /// The question being answered.
    pub question: Id,
    /// The answer text.
    pub answer: String,
}

/// Reasons a proposed answer set may be rejected. Detected before anything
/// is persisted, so a failure never leaves a partial submission.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnswerError {
    /// At least one question of the survey has no proposed answer.
    #[error("All questions should be completed!")]
    Incomplete,
    /// A choice answer does not match any option of its question.
    #[error("Choice questions should be chosen correctly!")]
    InvalidChoice,
    /// A proposed answer references a question outside the survey.
    #[error("Question ({0}) does not belong to this survey")]
    UnknownQuestion(Id),
}

impl From<AnswerError> for Error {
    fn from(err: AnswerError) -> Self {
        Error::bad_request(err.to_string())
    }
}

impl SubmissionRequest {
    /// Check field constraints before semantic validation.
    pub fn validate(&self) -> Result<(), Error> {
        for proposed in &self.answers {
            if proposed.answer.len() > MAX_ANSWER_LENGTH {
                return Err(Error::bad_request(format!(
                    "Answers must be at most {} bytes",
                    MAX_ANSWER_LENGTH
                )));
            }
        }
        Ok(())
    }

    /// Decide whether this answer set may be committed against the given
    /// survey questions and their answer options, and if so produce the
    /// submission to store.
    ///
    /// The checks run in a fixed order with no partial effects:
    /// 1. completeness: every question has at least one proposed answer;
    /// 2. known questions: every proposed answer targets a survey question;
    /// 3. choice-correctness: non-plain-text answers exactly match an
    ///    option of their question.
    ///
    /// The commit pass then walks questions in survey order and their
    /// matching answers in submission order: plain-text questions store all
    /// matches, single-choice questions store the first match only, and
    /// multiple-choice questions drop duplicate texts.
    pub fn into_submission(
        self,
        survey_id: Id,
        questions: &[Question],
        options: &HashMap<Id, Vec<AnswerOption>>,
    ) -> Result<NewSubmission, AnswerError> {
        // Completeness check. This short-circuits before choice-correctness
        // is ever evaluated.
        for question in questions {
            if !self.answers.iter().any(|a| a.question == question.id) {
                return Err(AnswerError::Incomplete);
            }
        }

        // Choice-correctness check.
        for proposed in &self.answers {
            let question = questions
                .iter()
                .find(|q| q.id == proposed.question)
                .ok_or(AnswerError::UnknownQuestion(proposed.question))?;
            if question.question_type.has_options() {
                let matches = options
                    .get(&question.id)
                    .map(|opts| opts.iter().any(|opt| opt.text == proposed.answer))
                    .unwrap_or(false);
                if !matches {
                    return Err(AnswerError::InvalidChoice);
                }
            }
        }

        // Commit pass.
        let mut answers = Vec::new();
        for question in questions {
            let mut stored_texts: Vec<&str> = Vec::new();
            for proposed in self.answers.iter().filter(|a| a.question == question.id) {
                match question.question_type {
                    QuestionType::PlainText => {
                        answers.push(SubmittedAnswer {
                            question_id: question.id,
                            answer: proposed.answer.clone(),
                        });
                    }
                    QuestionType::SingleChoice => {
                        answers.push(SubmittedAnswer {
                            question_id: question.id,
                            answer: proposed.answer.clone(),
                        });
                        break;
                    }
                    QuestionType::MultipleChoice => {
                        if stored_texts.contains(&proposed.answer.as_str()) {
                            continue;
                        }
                        stored_texts.push(proposed.answer.as_str());
                        answers.push(SubmittedAnswer {
                            question_id: question.id,
                            answer: proposed.answer.clone(),
                        });
                    }
                }
            }
        }

        Ok(NewSubmission {
            survey_id,
            user_id: self.user_id,
            answers,
        })
    }
}

/// A stored answer as rendered to the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedAnswerDescription {
    pub question: Id,
    pub answer: String,
}

impl From<SubmittedAnswer> for SubmittedAnswerDescription {
    fn from(answer: SubmittedAnswer) -> Self {
        Self {
            question: answer.question_id,
            answer: answer.answer,
        }
    }
}

/// An API-friendly description of a completed submission, with the full
/// survey it answered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionDescription {
    pub id: Id,
    #[serde(rename = "user_ID")]
    pub user_id: u32,
    pub survey: super::survey::SurveyDescription,
    pub answers: Vec<SubmittedAnswerDescription>,
}

impl SubmissionDescription {
    /// Assemble a description from a submission and its loaded survey.
    pub fn assemble(submission: Submission, survey: super::survey::SurveyDescription) -> Self {
        Self {
            id: submission.id,
            user_id: submission.submission.user_id,
            survey,
            answers: submission
                .submission
                .answers
                .into_iter()
                .map(Into::into)
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rocket::serde::json::{json, serde_json};

    use crate::model::{api::survey::QuestionSpec, mongodb::Id};

    /// Materialize question specs into stored questions and their options,
    /// the way the admin creation path would.
    fn materialize(
        survey_id: Id,
        specs: Vec<QuestionSpec>,
    ) -> (Vec<Question>, HashMap<Id, Vec<AnswerOption>>) {
        let mut questions = Vec::new();
        let mut options = HashMap::new();
        for spec in specs {
            let question_id = Id::new();
            let (core, option_specs) = spec.into_parts(survey_id);
            questions.push(Question {
                id: question_id,
                question: core,
            });
            options.insert(
                question_id,
                option_specs
                    .into_iter()
                    .map(|spec| {
                        let core = spec.into_option(question_id);
                        AnswerOption {
                            id: Id::new(),
                            option: core,
                        }
                    })
                    .collect(),
            );
        }
        (questions, options)
    }

    fn request(user_id: u32, answers: Vec<(Id, &str)>) -> SubmissionRequest {
        SubmissionRequest {
            user_id,
            answers: answers
                .into_iter()
                .map(|(question, answer)| ProposedAnswer {
                    question,
                    answer: answer.to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn valid_complete_submission_is_accepted() {
        let survey_id = Id::new();
        let (questions, options) = materialize(
            survey_id,
            vec![QuestionSpec::pizza_or_salad(), QuestionSpec::free_text()],
        );

        let submission = request(
            7,
            vec![
                (questions[0].id, "Pizza"),
                (questions[1].id, "More snacks please"),
            ],
        )
        .into_submission(survey_id, &questions, &options)
        .unwrap();

        assert_eq!(submission.survey_id, survey_id);
        assert_eq!(submission.user_id, 7);
        assert_eq!(submission.answers.len(), 2);
        assert_eq!(submission.answers[0].answer, "Pizza");
    }

    #[test]
    fn missing_question_fails_completeness() {
        let survey_id = Id::new();
        let (questions, options) = materialize(
            survey_id,
            vec![QuestionSpec::pizza_or_salad(), QuestionSpec::free_text()],
        );

        let result = request(7, vec![(questions[0].id, "Pizza")]).into_submission(
            survey_id,
            &questions,
            &options,
        );

        assert_eq!(result.unwrap_err(), AnswerError::Incomplete);
    }

    #[test]
    fn completeness_is_checked_before_choice_correctness() {
        let survey_id = Id::new();
        let (questions, options) = materialize(
            survey_id,
            vec![QuestionSpec::pizza_or_salad(), QuestionSpec::free_text()],
        );

        // The one answer given is also an invalid choice; completeness must
        // still win.
        let result = request(7, vec![(questions[0].id, "Tacos")]).into_submission(
            survey_id,
            &questions,
            &options,
        );

        assert_eq!(result.unwrap_err(), AnswerError::Incomplete);
    }

    #[test]
    fn unmatched_choice_text_is_rejected() {
        let survey_id = Id::new();
        let (questions, options) = materialize(survey_id, vec![QuestionSpec::pizza_or_salad()]);

        let result = request(7, vec![(questions[0].id, "Tacos")]).into_submission(
            survey_id,
            &questions,
            &options,
        );
        assert_eq!(result.unwrap_err(), AnswerError::InvalidChoice);

        // The match is case-sensitive.
        let result = request(7, vec![(questions[0].id, "pizza")]).into_submission(
            survey_id,
            &questions,
            &options,
        );
        assert_eq!(result.unwrap_err(), AnswerError::InvalidChoice);
    }

    #[test]
    fn answer_for_foreign_question_is_rejected() {
        let survey_id = Id::new();
        let (questions, options) = materialize(survey_id, vec![QuestionSpec::pizza_or_salad()]);
        let foreign = Id::new();

        let result = request(7, vec![(questions[0].id, "Pizza"), (foreign, "Anything")])
            .into_submission(survey_id, &questions, &options);

        assert_eq!(result.unwrap_err(), AnswerError::UnknownQuestion(foreign));
    }

    #[test]
    fn single_choice_stores_only_first_answer() {
        let survey_id = Id::new();
        let (questions, options) = materialize(survey_id, vec![QuestionSpec::pizza_or_salad()]);

        let submission = request(
            7,
            vec![(questions[0].id, "Salad"), (questions[0].id, "Pizza")],
        )
        .into_submission(survey_id, &questions, &options)
        .unwrap();

        assert_eq!(submission.answers.len(), 1);
        assert_eq!(submission.answers[0].answer, "Salad");
    }

    #[test]
    fn multiple_choice_collapses_duplicates() {
        let survey_id = Id::new();
        let (questions, options) = materialize(survey_id, vec![QuestionSpec::favourite_colour()]);

        let submission = request(
            7,
            vec![
                (questions[0].id, "Red"),
                (questions[0].id, "Red"),
                (questions[0].id, "Blue"),
            ],
        )
        .into_submission(survey_id, &questions, &options)
        .unwrap();

        let texts: Vec<_> = submission.answers.iter().map(|a| a.answer.as_str()).collect();
        assert_eq!(texts, vec!["Red", "Blue"]);
    }

    #[test]
    fn plain_text_stores_all_answers() {
        let survey_id = Id::new();
        let (questions, options) = materialize(survey_id, vec![QuestionSpec::free_text()]);

        let submission = request(
            7,
            vec![
                (questions[0].id, "First thought"),
                (questions[0].id, "Second thought"),
            ],
        )
        .into_submission(survey_id, &questions, &options)
        .unwrap();

        assert_eq!(submission.answers.len(), 2);
    }

    #[test]
    fn overlong_answer_fails_validation() {
        let question = Id::new();
        let request = request(7, vec![(question, "ok")]);
        assert!(request.validate().is_ok());

        let overlong = SubmissionRequest {
            user_id: 7,
            answers: vec![ProposedAnswer {
                question,
                answer: "a".repeat(MAX_ANSWER_LENGTH + 1),
            }],
        };
        assert!(overlong.validate().is_err());
    }

    #[test]
    fn body_wrapper_matches_wire_format() {
        let body: SubmissionBody = serde_json::from_value(json!({
            "user_answers": {
                "user_ID": 7,
                "answers": [
                    {"question": Id::new(), "answer": "Pizza"},
                ],
            },
        }))
        .unwrap();

        assert_eq!(body.user_answers.user_id, 7);
        assert_eq!(body.user_answers.answers[0].answer, "Pizza");
    }
}
