//! Core domain types
//!
//! This module contains the structures shared by the provider client (which
//! produces them) and the tracker (which owns and mutates them).

pub mod job;
pub mod log;
pub mod request;
