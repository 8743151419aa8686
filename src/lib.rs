//! Workspace-level integration tests for somqc. See `tests/`.
