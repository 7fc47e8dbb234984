//! Shared types for the headset streaming system
//!
//! This crate contains the leaf types used throughout the attention
//! pipeline: channel roles, frequency band definitions, the stream sample
//! event delivered to consumers, and configuration.

pub mod channel;
pub mod config;
pub mod event;

// Re-export commonly used types
pub use channel::*;
pub use config::*;
pub use event::*;
