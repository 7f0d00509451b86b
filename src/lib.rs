//! This crate renders cross-tabulated datasets as CSV. A tabulated dataset is an ordered
//! sequence of dimensions, each with an ordered list of categories, plus a flat sequence of
//! observation counts stored in row-major order (last dimension varying fastest). The crate
//! recovers the logical coordinates by mixed-radix decomposition and emits one CSV record per
//! observation, either from a fully decoded table or streamed directly out of a GraphQL query
//! response body without materialising the values in memory.
//!
//! The crate is built on top of a number of open source components.
//!
//! * [Serde](serde) performs (de)serialisation of JSON table and response data.
//! * [csv] handles CSV quoting and record formatting.
//! * [Validator](validator) checks table shape invariants before any output is produced.
//! * [tokio-util](tokio_util) provides the cancellation token polled during iteration.
//! * [Tracing](tracing) provides logging for the command line binary.

pub mod cli;
pub mod error;
pub mod iterator;
pub mod models;
pub mod render;
pub mod stream;
#[cfg(test)]
pub mod test_utils;
pub mod tracing;
