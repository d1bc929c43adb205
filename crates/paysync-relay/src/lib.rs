//! Payment webhook relay server.
//!
//! Receives signed transaction callbacks from the payment provider,
//! verifies them against the shared merchant secret, keeps the latest
//! transaction in a single authoritative slot, and fans updates out to
//! connected SSE subscribers while polling clients read the same slot.
//! Verification, state, and broadcast semantics live in the core
//! [`paysync`] crate; this crate provides the HTTP surface, configuration,
//! and metrics.
//!
//! # Modules
//!
//! - [`routes`] — HTTP endpoints (callback, status, lifecycle, events, health, metrics)
//! - [`state`] — shared [`AppState`](state::AppState) injected into handlers
//! - [`config`] — environment configuration with fail-closed secret handling
//! - [`metrics`] — Prometheus metrics for relay operations

pub mod config;
pub mod metrics;
pub mod routes;
pub mod state;
