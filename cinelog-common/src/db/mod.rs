//! Database models and queries

pub mod actors;
pub mod init;
pub mod models;
pub mod movies;
pub mod relations;
pub mod users;

pub use init::{connect_in_memory, create_schema, drop_schema, init_database};
pub use models::*;
