//! The opaque watch-capable backend seam and an in-memory implementation.

mod memory;
mod tree_client;

pub use memory::*;
pub use tree_client::*;

#[cfg(test)]
mod memory_test;
