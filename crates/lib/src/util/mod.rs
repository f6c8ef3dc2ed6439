//! Shared utilities.
//!
//! Test helpers live here so every module can build projects on disk the same way.
