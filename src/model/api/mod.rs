pub mod account;
pub mod auth;
pub mod submission;
pub mod survey;
