//! Shared library for the Web Calendar Lambda functions.
//!
//! This crate provides the event model, the store abstraction with its
//! Postgres and in-memory backends, configuration and HTTP helpers.

pub mod config;
pub mod db;
pub mod error;
pub mod http;
pub mod models;
pub mod secrets;
pub mod store;

pub use config::{Config, StoreBackend};
pub use db::PgEventStore;
pub use error::{Error, Result};
pub use models::{parse_iso_date, DateRange, Event, NewEvent};
pub use secrets::{get_database_credentials, get_secret, DatabaseCredentials};
pub use store::{open_store, EventStore, MemoryEventStore};
