//! Utility functions for SiteGraph Core
//!
//! This module provides common utility functions used across the codebase.

pub mod dates;
mod slug;

pub use dates::{is_date_string, parse_date};
pub use slug::slugify;
