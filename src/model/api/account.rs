use argon2::Config;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::model::{common::Rights, db::account::NewAccount};

pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Raw login credentials, received from a user. These are never stored
/// directly, since the password is in plaintext.
#[derive(Clone, Deserialize, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    /// Convert these credentials into a new account with the given rights
    /// by hashing the password.
    /// This enforces that the username is non-empty, and the password meets
    /// minimum length.
    pub fn into_account(self, rights: Rights) -> Result<NewAccount, ()> {
        // Check credentials are acceptable.
        if self.username.is_empty() || self.password.len() < MIN_PASSWORD_LENGTH {
            return Err(());
        }

        // 16 bytes is recommended for password hashing:
        //  https://en.wikipedia.org/wiki/Argon2
        let mut salt = [0_u8; 16];
        rand::thread_rng().fill(&mut salt);
        let password_hash =
            argon2::hash_encoded(self.password.as_bytes(), &salt, &Config::default()).unwrap(); // Safe because the default `Config` is valid.
        Ok(NewAccount {
            username: self.username,
            password_hash,
            rights,
        })
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl Credentials {
        pub fn example() -> Self {
            Self {
                username: "coordinator".into(),
                password: "surveys4lyfe".into(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashing_round_trip() {
        let credentials = Credentials::example();
        let password = credentials.password.clone();
        let account = credentials.into_account(Rights::Staff).unwrap();
        assert_eq!(account.rights, Rights::Staff);
        assert!(account.verify_password(password));
        assert!(!account.verify_password("wrong password"));
    }

    #[test]
    fn reject_weak_credentials() {
        let no_username = Credentials {
            username: "".into(),
            password: "long enough password".into(),
        };
        assert!(no_username.into_account(Rights::User).is_err());

        let short_password = Credentials {
            username: "someone".into(),
            password: "short".into(),
        };
        assert!(short_password.into_account(Rights::User).is_err());
    }
}
