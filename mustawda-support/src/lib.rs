//! # Mustawda Support
//!
//! Shared utilities for the Mustawda DI container.
//!
//! This crate provides:
//! - Text rendering for error messages
//! - "Did you mean?" suggestions for unknown names

pub mod rendering;
