//! DeepBTC Core: domain types, source fetchers, raw storage, alignment,
//! indicators and feature computation.
//!
//! This crate contains everything that does not need configuration files or
//! a process entry point:
//! - Domain types (bars, time-series tables, trades, source catalogue)
//! - HTTP plumbing with retry and a circuit breaker
//! - The four source fetchers and the live trade stream
//! - The raw CSV store with hashed metadata sidecars
//! - Forward-fill alignment across frequencies
//! - Indicators and the `basic` / `complete` feature sets

pub mod data;
pub mod domain;
pub mod features;
pub mod indicators;
