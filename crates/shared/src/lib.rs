//! Shared utilities for the settings administration backend.
//!
//! This crate provides functionality used across the other crates:
//! - Field validators (email, URL, phone, cron, password strength, ...)
//! - Hashing helpers for document fingerprints

pub mod crypto;
pub mod validation;
