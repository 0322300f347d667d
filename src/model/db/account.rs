use std::ops::{Deref, DerefMut};

use mongodb::{bson::doc, error::Error as DbError, Database};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::model::{api::account::Credentials, common::Rights, mongodb::Coll, mongodb::Id};

/// Core account data for anyone who can log in.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountCore {
    pub username: String,
    pub password_hash: String,
    pub rights: Rights,
}

impl AccountCore {
    /// Check whether the given password is correct.
    pub fn verify_password<T: AsRef<[u8]>>(&self, password: T) -> bool {
        // Unwrap safe because the only way to create an AccountCore is via
        // `Credentials::into_account`, so the hash is always well-formed.
        argon2::verify_encoded(&self.password_hash, password.as_ref()).unwrap()
    }
}

/// An account without an ID, ready for insertion.
pub type NewAccount = AccountCore;

/// An account from the database, with its unique ID.
#[derive(Debug, Serialize, Deserialize)]
pub struct Account {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub account: AccountCore,
}

impl Deref for Account {
    type Target = AccountCore;

    fn deref(&self) -> &Self::Target {
        &self.account
    }
}

impl DerefMut for Account {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.account
    }
}

/// Ensure at least one staff account exists, seeding the configured default
/// one if necessary.
pub async fn ensure_staff_account_exists(db: &Database, config: &Config) -> Result<(), DbError> {
    let accounts = Coll::<Account>::from_db(db);
    let staff_filter = doc! { "rights": Rights::Staff };
    if accounts.find_one(staff_filter, None).await?.is_none() {
        warn!("No staff account found, seeding the default one");
        let credentials = Credentials {
            username: config.default_admin_username().to_string(),
            password: config.default_admin_password().to_string(),
        };
        let account = credentials.into_account(Rights::Staff).map_err(|_| {
            DbError::custom("Default admin credentials do not meet minimum requirements".to_string())
        })?;
        Coll::<NewAccount>::from_db(db)
            .insert_one(account, None)
            .await?;
    }
    Ok(())
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl AccountCore {
        pub fn staff_example() -> Self {
            Credentials::example()
                .into_account(Rights::Staff)
                .unwrap()
        }
    }
}
