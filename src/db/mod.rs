//! Database module: local accounts and dynamic settings.
//!
//! Layout:
//! - `models.rs`: Rust structs mirroring DB rows
//! - `schema.rs`: SQL DDL for initializing the database (SQLite)
//! - `actor.rs`: the actor serialising all access

pub mod actor;
pub mod models;
pub mod schema;

pub use models::{DbSetting, DbUser, UserCreate};
pub use schema::SQLITE_INIT;

pub use actor::{DbActorHandle, spawn};
