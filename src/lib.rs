//! Workspace root package.
//!
//! Exists to host workspace-wide dev tooling (git hooks); all functionality
//! lives in the member crates under `crates/`.
