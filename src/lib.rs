//! GymRegister — gym equipment asset tracking with AI-assisted
//! image analysis.
//!
//! The core of this crate is the asynchronous analysis-job pipeline:
//! an uploaded photo becomes a pending job, a background worker sends
//! a normalized copy to a vision model, the structured reply is scored
//! and stored, and findings are merged best-effort into the matching
//! asset record.

pub mod app_state;
pub mod config;
pub mod db;
pub mod models;
pub mod routes;
pub mod services;
