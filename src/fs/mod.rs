//! Filesystem helpers for backup sources.

pub mod walker;
