//! Status backend of the Pixel portfolio site.
//!
//! Checks the single upstream API ("Stash"), keeps the last good reading in a
//! TTL cache and reduces the readings into one overall status, served as JSON
//! and as an HTML status page.

pub mod config;
pub mod core;
pub mod handler;
