//! Table Storage Module
//!
//! Implements the keyed, column-structured row store owned by each worker.
//!
//! ## Core Concepts
//! - **Rows**: A row key plus named columns holding raw bytes, with a binary-safe encoding
//!   shared by the disk format and the HTTP data plane.
//! - **Versioned tables**: In-memory, every write appends a new version of the row.
//! - **Persistent tables**: Names starting with `pt-`; one file per row, latest write only.
//! - **Catalog**: The concurrent map of named tables, with lazy creation, rename and delete.

pub mod catalog;
pub mod error;
pub mod memory;
pub mod persistent;
pub mod row;
pub mod table;
