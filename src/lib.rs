//! condition sets for bar visibility
//!
//! the library exposes the condition engine for hosts that render bars; the
//! `barcond` binary wraps it for inspecting and editing configs.

pub mod bars;
pub mod cli;
pub mod conditions;
pub mod config;
pub mod state;
