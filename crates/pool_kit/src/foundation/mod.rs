//! Foundation module - Core utilities and types
//!
//! This module provides the small building blocks the pooling and builder
//! subsystems share:
//! - Math aliases for placement data
//! - Contribution tokens
//! - Logging setup

pub mod math;
pub mod token;
pub mod logging;

pub use token::Token;
