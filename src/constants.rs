//! Constants used throughout the Canopy library.
//!
//! This module provides central definitions for internal strings, especially
//! reserved path segments.

/// Reserved top-level segment under which the typed value layer persists entries.
pub const VALUE_NAMESPACE: &str = "_values";
