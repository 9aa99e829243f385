//! VQueue Integration Tests
//!
//! Merge reads, flush selection and live-count accounting across both buffers.

#[path = "../common/mod.rs"]
mod common;

mod flush;
mod properties;
