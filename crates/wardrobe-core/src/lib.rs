//! Wardrobe Core - shared types for the wearable catalog builder
//!
//! This crate provides the error taxonomy and the deterministic content
//! addressing every other crate builds on.

pub mod cid;
pub mod error;

pub use cid::{identify, identify_file, identify_named_set, ContentId};
pub use error::{Result, ValidationIssue, WardrobeError};
