//! Plinth benchmarking suite
//!
//! Benchmarks for constraint parsing, version choice, and full solver runs
//! over generated catalogs.

pub mod common;

pub use common::*;
