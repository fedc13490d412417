//! Dues & Remittance Calculation Engine
//!
//! This crate provides the deterministic financial core of a union membership
//! system: dues calculation under five rule methods, late-fee and arrears
//! handling, batch billing runs with failure isolation, and per-capita
//! remittance aggregation for federations and their affiliates.

#![warn(missing_docs)]

pub mod api;
pub mod batch;
pub mod calculation;
pub mod config;
pub mod error;
pub mod models;
pub mod money;
pub mod providers;
pub mod remittance;
