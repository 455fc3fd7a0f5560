//! # cinelog common library
//!
//! Shared code for the cinelog catalog service:
//! - Database schema, models and queries
//! - Cast reconciliation (movie ↔ actor/director links)
//! - Password hashing
//! - Configuration loading
//! - Box-office analytics (rank, boxplot, regression)

pub mod analytics;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod reconcile;
pub mod seed;

pub use error::{Error, Result};
pub use reconcile::{reconcile_cast, CastEdit, CastSlot, ReconcileReport};
