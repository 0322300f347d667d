#[macro_use]
extern crate log;
#[macro_use]
extern crate rocket;

use rocket::{Build, Rocket};

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;

pub use config::Config;

/// Construct the rocket instance: all routes mounted at the root, plus the
/// fairings that load config, connect to the database, and log traffic.
pub fn build() -> Rocket<Build> {
    rocket::build()
        .mount("/", api::routes())
        .attach(config::ConfigFairing)
        .attach(config::DatabaseFairing)
        .attach(logging::LoggerFairing)
}
