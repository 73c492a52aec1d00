//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the resolution core:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Event bus system
//!
//! ## Overview
//!
//! This crate contains the runtime utilities the resolver engine depends on.
//! It establishes the logging conventions, configuration surface, and event
//! broadcasting mechanisms used throughout the system.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
