//! cmdpipe Benchmarks
//!
//! Criterion benchmarks for the cmdpipe pipeline: invocation overhead as the
//! middleware chain grows, scoped resolution, and concurrent invocations.
//!
//! Run with `cargo bench -p cmdpipe-benchmarks`.

#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![deny(clippy::nursery)]
