//! Clipwatch Core
//!
//! Core types and abstractions for tracking asynchronous video-generation jobs.
//!
//! This crate contains:
//! - Domain types: the tracked Job, its canonical status, generation requests and log entries
//! - Normalization: provider-native status payloads and the adapters that map
//!   them onto the canonical, provider-agnostic status record

pub mod domain;
pub mod error;
pub mod normalize;

pub use error::ValidationError;
