//! # Casetrack Test Suite
//!
//! Cross-crate integration tests. Unit tests live next to the code they
//! cover; everything here exercises multiple subsystems together, usually
//! over a file-backed store to include restart behavior.
//!
//! ```bash
//! cargo test -p casetrack-tests
//! ```

#![allow(dead_code)]

pub mod integration;
