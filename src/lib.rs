//! Automated Validation Engine
//!
//! This library is the decision core of a product-label certification
//! workflow: it takes a structured laboratory report plus a product's
//! declared claims and produces an approve/reject/review recommendation
//! without human intervention, with retry-safe asynchronous processing.
//!
//! The surrounding service layer (HTTP routes, persistence, report
//! storage, notifications) is reached through the collaborator traits in
//! [`sources`]; this crate owns no wire format or CLI.

pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod sources;
