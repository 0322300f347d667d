mod question;
mod rights;

pub use question::QuestionType;
pub use rights::Rights;
