//! Workspace root package. Holds the git hooks installed by `cargo-husky`;
//! the code lives in `crates/`.
