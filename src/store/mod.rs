//! Persistence layer: models, schema and the store actor.
//!
//! Layout:
//! - `models.rs`: Rust structs mirroring DB rows
//! - `schema.rs`: SQL DDL for initializing the database (SQLite-first)
//! - `patch.rs`: create/patch payload types
//! - `actor.rs`: ractor actor owning the pool, plus [`StoreHandle`]

pub mod actor;
pub mod models;
pub mod patch;
pub mod schema;

pub use actor::{StoreActorMessage, StoreHandle, spawn};
pub use models::{DbCharadeSet, DbSessionRecord, DbSettingRecord};
pub use patch::{CharadeSetCreate, CharadeSetPatch, SessionCreate, SettingUpsert};
pub use schema::SQLITE_INIT;
