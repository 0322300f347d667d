use mongodb::bson::doc;
use rocket::{
    http::{CookieJar, Status},
    serde::json::{Json, Value},
    Route, State,
};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::{
    api::{account::Credentials, auth::AuthToken},
    db::account::Account,
    mongodb::Coll,
};

use super::common::envelope;

pub fn routes() -> Vec<Route> {
    routes![login]
}

/// Exchange credentials for a signed token, both in the response body and
/// as an auth cookie. Wrong username and wrong password are deliberately
/// indistinguishable.
#[post("/login", data = "<credentials>", format = "json")]
async fn login(
    credentials: Json<Credentials>,
    accounts: Coll<Account>,
    cookies: &CookieJar<'_>,
    config: &State<Config>,
) -> Result<Json<Value>> {
    let account = accounts
        .find_one(doc! { "username": &credentials.username }, None)
        .await?
        .filter(|account| account.verify_password(&credentials.password))
        .ok_or_else(|| {
            Error::Status(
                Status::Unauthorized,
                "Incorrect username or password".to_string(),
            )
        })?;

    let token = AuthToken::new(&account);
    cookies.add(token.into_cookie(config));
    envelope("token", token.encode(config))
}
