//! # Freelist Configuration Module
//!
//! This module centralizes the configuration constants shared between the
//! freelist core and its on-page codec. Constants are grouped by functional
//! area and interdependencies are documented and enforced through
//! compile-time assertions.
//!
//! ## Why Centralization?
//!
//! The codec layout constants and the page geometry depend on each other:
//! the number of page ids that fit a freelist page is derived from the page
//! size, the page header reservation, and the codec header size. Keeping
//! them in one place with compile-time checks prevents the layouts from
//! drifting apart.
//!
//! ## Module Organization
//!
//! - [`constants`]: All numeric configuration values with dependency
//!   documentation

pub mod constants;
pub use constants::*;
