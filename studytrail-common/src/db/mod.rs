//! Database access layer
//!
//! Initialization, schema creation, versioned migrations, and the row
//! models shared between the library and the web service.

pub mod init;
pub mod migrations;
pub mod models;

pub use init::{init_database, init_schema};
