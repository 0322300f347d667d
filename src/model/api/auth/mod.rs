mod token;

pub use token::{AuthToken, StaffToken, AUTH_TOKEN_COOKIE};
