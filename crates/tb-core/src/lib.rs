//! # tb-core
//!
//! Core types, traits, and utilities for Taskboard RS.
//!
//! This crate provides the foundational building blocks used across all other crates:
//! - Common error types and the `TbResult` alias
//! - Core traits (Identifiable, Timestamped, UserContext)
//! - Configuration types

pub mod config;
pub mod error;
pub mod traits;

pub use error::*;
pub use traits::*;
