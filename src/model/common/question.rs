use serde::{Deserialize, Serialize};

/// The kinds of question a survey can contain.
///
/// The wire and database representation uses the two-letter codes
/// `"PT"`/`"SC"`/`"MC"`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuestionType {
    /// Free-form text; any answer is accepted.
    #[serde(rename = "PT")]
    PlainText,
    /// Exactly one of the question's answer options is accepted.
    #[serde(rename = "SC")]
    SingleChoice,
    /// Any subset of the question's answer options is accepted.
    #[serde(rename = "MC")]
    MultipleChoice,
}

impl QuestionType {
    /// Does this question type carry predefined answer options?
    pub fn has_options(self) -> bool {
        !matches!(self, Self::PlainText)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rocket::serde::json::serde_json;

    #[test]
    fn short_codes_round_trip() {
        for (ty, code) in [
            (QuestionType::PlainText, "\"PT\""),
            (QuestionType::SingleChoice, "\"SC\""),
            (QuestionType::MultipleChoice, "\"MC\""),
        ] {
            assert_eq!(serde_json::to_string(&ty).unwrap(), code);
            assert_eq!(serde_json::from_str::<QuestionType>(code).unwrap(), ty);
        }
    }

    #[test]
    fn only_plain_text_lacks_options() {
        assert!(!QuestionType::PlainText.has_options());
        assert!(QuestionType::SingleChoice.has_options());
        assert!(QuestionType::MultipleChoice.has_options());
    }
}
