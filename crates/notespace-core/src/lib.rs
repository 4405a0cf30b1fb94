//! # notespace-core
//!
//! Core crate for NoteSpace. Contains configuration schemas, shared types
//! (pagination, space identifiers, timestamps), and the unified error system.
//!
//! This crate has **no** internal dependencies on other NoteSpace crates.

pub mod config;
pub mod error;
pub mod logging;
pub mod result;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
