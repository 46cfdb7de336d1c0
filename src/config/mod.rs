//! Configuration module for Contactbook
//!
//! This module provides configuration management including:
//! - Store and export path resolution
//! - User settings persistence (backup and encryption preferences)

pub mod paths;
pub mod settings;

pub use paths::ContactbookPaths;
pub use settings::Settings;
