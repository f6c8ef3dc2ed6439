//! csproj-patcher-lib: Core types and logic for patching C# project files
//!
//! This crate provides the pieces used by the `csproj-patcher` binary:
//! - `OverrideTable`: assembly name to path overrides supplied by the caller
//! - `SolutionFile`: reader for `.sln` manifests, expanding one input into many projects
//! - `XmlDocument`: span-preserving XML tree that supports in-place text edits
//! - `patch`: the engine that inserts or updates `<HintPath>` children of `<Reference>` items

pub mod document;
pub mod overrides;
pub mod patch;
pub mod solution;
pub mod util;
