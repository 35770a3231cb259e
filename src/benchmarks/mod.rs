//! Micro-benchmarks of the harness building blocks
//!
//! These measure the code the harness itself adds around each measured
//! call, plus the embedded engine per index strategy, so that harness
//! overhead can be told apart from engine cost.
//!
//! # Running Benchmarks
//!
//! ```bash
//! cargo bench --features=benchmarks
//! ```
//!
//! Results are written to `target/criterion/`.

pub mod harness;
