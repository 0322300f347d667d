use chrono::{serde::ts_seconds, DateTime, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, TokenData, Validation};
use mongodb::Database;
use rocket::{
    http::{Cookie, SameSite, Status},
    outcome::try_outcome,
    request::{FromRequest, Outcome},
    time::Duration,
    Request, State,
};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::Error;
use crate::model::{common::Rights, db::account::Account, mongodb::Coll, mongodb::Id};

pub const AUTH_TOKEN_COOKIE: &str = "auth_token";

/// An authentication token representing a specific account with specific
/// rights. As a request guard, it accepts any valid logged-in account and
/// fails with 401 otherwise.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AuthToken {
    pub id: Id,
    #[serde(rename = "rgt")]
    pub rights: Rights,
}

impl AuthToken {
    /// Create a new [`AuthToken`] for the given account.
    pub fn new(account: &Account) -> Self {
        Self {
            id: account.id,
            rights: account.rights,
        }
    }

    /// Serialize this token into a signed JWT with an expiry claim.
    #[allow(clippy::missing_panics_doc)]
    pub fn encode(self, config: &Config) -> String {
        let claims = Claims {
            token: self,
            expire_at: Utc::now() + config.auth_ttl(),
        };
        jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret()),
        )
        .expect("JWT encoding is infallible with default settings")
    }

    /// Serialize this token into a cookie.
    pub fn into_cookie(self, config: &Config) -> Cookie<'static> {
        Cookie::build(AUTH_TOKEN_COOKIE, self.encode(config))
            .max_age(Duration::seconds(config.auth_ttl().num_seconds()))
            .http_only(true)
            .same_site(SameSite::Strict)
            .finish()
    }

    /// Deserialize a token from a cookie.
    pub fn from_cookie(cookie: &Cookie<'_>, config: &Config) -> Result<Self, Error> {
        let token = jsonwebtoken::decode(
            cookie.value(),
            &DecodingKey::from_secret(config.jwt_secret()),
            &Validation::default(),
        )
        .map(|claims: TokenData<Claims>| claims.claims.token)?;
        Ok(token)
    }
}

/// Cookie claims: the token itself plus an expiry datetime.
#[derive(Serialize, Deserialize)]
struct Claims {
    #[serde(flatten)]
    token: AuthToken,
    #[serde(rename = "exp", with = "ts_seconds")]
    expire_at: DateTime<Utc>,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthToken {
    type Error = Error;

    /// Get an [`AuthToken`] from the cookie and verify that the account it
    /// represents still exists.
    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        // Unwrap is safe as `Config` is always managed.
        let config = req.guard::<&State<Config>>().await.unwrap();

        let cookie = match req.cookies().get(AUTH_TOKEN_COOKIE) {
            Some(cookie) => cookie,
            None => {
                return Outcome::Failure((
                    Status::Unauthorized,
                    Error::Status(Status::Unauthorized, "You are not authorized!".to_string()),
                ));
            }
        };

        // Decode the token.
        let token = match Self::from_cookie(cookie, config) {
            Ok(token) => token,
            Err(err) => return Outcome::Failure((Status::Unauthorized, err)),
        };

        // Check the account actually exists.
        let db = req.guard::<&State<Database>>().await.unwrap();
        match Coll::<Account>::from_db(db)
            .find_one(token.id.as_doc(), None)
            .await
        {
            Ok(Some(_)) => Outcome::Success(token),
            Ok(None) => Outcome::Failure((
                Status::Unauthorized,
                Error::Status(Status::Unauthorized, "You are not authorized!".to_string()),
            )),
            Err(e) => Outcome::Failure((Status::InternalServerError, e.into())),
        }
    }
}

/// An [`AuthToken`] that is additionally known to carry staff rights.
/// As a request guard: no valid token fails with 401, a valid token without
/// staff rights fails with 403.
#[derive(Debug, Clone, Copy)]
pub struct StaffToken(pub AuthToken);

impl std::ops::Deref for StaffToken {
    type Target = AuthToken;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for StaffToken {
    type Error = Error;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let token = try_outcome!(req.guard::<AuthToken>().await);
        if token.rights == Rights::Staff {
            Outcome::Success(Self(token))
        } else {
            Outcome::Failure((
                Status::Forbidden,
                Error::Status(
                    Status::Forbidden,
                    "You are not allowed to manage surveys!".to_string(),
                ),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rocket::serde::json::{json, serde_json};

    fn test_config() -> Config {
        serde_json::from_value(json!({
            "auth_ttl": 3600,
            "default_admin_username": "admin",
            "jwt_secret": "super secret test key",
            "default_admin_password": "admin password",
        }))
        .unwrap()
    }

    #[test]
    fn token_round_trip() {
        let config = test_config();
        let token = AuthToken {
            id: Id::new(),
            rights: Rights::Staff,
        };

        let cookie = token.into_cookie(&config);
        assert_eq!(cookie.name(), AUTH_TOKEN_COOKIE);

        let decoded = AuthToken::from_cookie(&cookie, &config).unwrap();
        assert_eq!(decoded.id, token.id);
        assert_eq!(decoded.rights, token.rights);
    }

    #[test]
    fn reject_tampered_token() {
        let config = test_config();
        let token = AuthToken {
            id: Id::new(),
            rights: Rights::User,
        };

        let mut tampered = token.encode(&config);
        tampered.pop();
        let cookie = Cookie::new(AUTH_TOKEN_COOKIE, tampered);
        assert!(AuthToken::from_cookie(&cookie, &config).is_err());
    }
}
