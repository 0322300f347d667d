use chrono::Duration;
use mongodb::Client as MongoClient;
use rocket::{
    fairing::{Fairing, Info, Kind},
    Build, Rocket,
};
use serde::Deserialize;

use crate::model::{db::account::ensure_staff_account_exists, mongodb::ensure_indexes_exist};

/// Application configuration, derived from `Rocket.toml` and `ROCKET_*`
/// environment variables. This struct becomes managed state and can be
/// inspected by any endpoint.
#[derive(Deserialize)]
pub struct Config {
    // non-secrets
    auth_ttl: u32,
    default_admin_username: String,
    // secrets
    jwt_secret: String,
    default_admin_password: String,
}

impl Config {
    /// Valid lifetime of auth token cookies in seconds.
    pub fn auth_ttl(&self) -> Duration {
        Duration::seconds(self.auth_ttl.into())
    }

    /// Secret key used to sign JWTs.
    pub fn jwt_secret(&self) -> &[u8] {
        self.jwt_secret.as_bytes()
    }

    /// Username of the staff account seeded on first launch.
    pub fn default_admin_username(&self) -> &str {
        &self.default_admin_username
    }

    /// Password of the staff account seeded on first launch.
    pub fn default_admin_password(&self) -> &str {
        &self.default_admin_password
    }
}

/// A fairing that loads the application config and puts it in managed state.
/// This could easily be achieved using `AdHoc::config`, but is written out
/// explicitly for symmetry with the other fairings and control over error
/// messages.
pub struct ConfigFairing;

#[rocket::async_trait]
impl Fairing for ConfigFairing {
    fn info(&self) -> Info {
        Info {
            name: "Config",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<Config>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load application config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };

        // Manage the state.
        rocket = rocket.manage(config);
        Ok(rocket)
    }
}

/// Configuration for the database.
#[derive(Deserialize)]
struct DbConfig {
    // secrets
    db_uri: String,
}

/// A fairing that loads the MongoDB config, connects to the database,
/// performs any setup necessary, and places both a `Client` and a `Database`
/// into managed state.
pub struct DatabaseFairing;

#[rocket::async_trait]
impl Fairing for DatabaseFairing {
    fn info(&self) -> Info {
        Info {
            name: "MongoDB",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<DbConfig>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load database config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };

        // The application config fairing always runs first.
        let app_config = rocket
            .state::<Config>()
            .expect("Config fairing must be attached before the database fairing");

        // Connect to the database.
        info!("Bringing database connection online...");
        let client = match MongoClient::with_uri_str(&config.db_uri).await {
            Ok(client) => client,
            Err(e) => {
                error!("Failed to connect to database: {e}");
                return Err(rocket);
            }
        };
        let db = client.database(&get_database_name());

        // Ensure the required indexes exist.
        if let Err(e) = ensure_indexes_exist(&db).await {
            error!("Failed to set up database indexes: {e}");
            return Err(rocket);
        }

        // Ensure there is at least one account with staff rights.
        if let Err(e) = ensure_staff_account_exists(&db, app_config).await {
            error!("Failed to seed staff account: {e}");
            return Err(rocket);
        }
        info!("...database connection online!");

        // Manage the state.
        rocket = rocket.manage(client).manage(db);
        Ok(rocket)
    }
}

/// Get the name of the database to use (production version).
#[cfg(not(test))]
fn get_database_name() -> String {
    "surveys".to_string()
}

/// Get the name of the database to use (test version).
/// Use a random name to avoid collisions between tests.
#[cfg(test)]
fn get_database_name() -> String {
    let random: u32 = rand::random();
    let db = format!("test{random}");
    info!("Using database {db}");
    db
}
