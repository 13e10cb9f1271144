//! Storage layer for the bounty dashboard
//!
//! SQLite persistence for every dashboard entity. Tables are described
//! declaratively and a single generic accessor serves all of them.
//!
//! # Module Structure
//! - `database`: Database connection and lifecycle management
//! - `schema`: Table descriptors, DDL generation and migrations
//! - `models`: Entity records and their descriptors
//! - `fields`: JSON field validation and conversion
//! - `operations`: Generic CRUD operations
//! - `dashboard`: Dashboard summary statistics
//! - `error`: Storage error type

mod dashboard;
mod database;
mod error;
mod fields;
pub mod models;
mod operations;
mod schema;

pub use dashboard::{DashboardStats, success_rate};
pub use database::{Database, format_bytes};
pub use error::StoreError;
pub use fields::Fields;
pub use models::Entity;
pub use operations::ListParams;
pub use schema::{SortDirection, TableSchema};
