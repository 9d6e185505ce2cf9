//! Core domain + application logic for the WhatsApp Catalog Bridge.
//!
//! This crate is intentionally framework-agnostic. WhatsApp / the catalog
//! backend live behind ports (traits) implemented in adapter crates.

pub mod aggregator;
pub mod audit;
pub mod commands;
pub mod config;
pub mod dispatcher;
pub mod domain;
pub mod errors;
pub mod events;
pub mod formatting;
pub mod logging;
pub mod ports;
pub mod registry;
pub mod security;

pub use errors::{Error, Result};
