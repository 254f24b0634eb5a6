//! Configuration management for camscout.
//!
//! Provides XDG-compliant settings lookup and the tunables of a run.

mod settings;

pub use settings::{Paths, Settings};
