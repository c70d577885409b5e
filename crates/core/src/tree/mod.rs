#![forbid(unsafe_code)]

//! Category forest stored in a workspace document, and the pure operations that
//! rewrite it.
//!
//! Every lookup shares one traversal order: depth-first, parent before its
//! children, siblings in sequence order, first match wins. Ids are expected to
//! be unique, so on malformed input (two nodes sharing an id) all operations
//! deterministically pick the earlier node in that order.

mod mutation;
mod types;
mod walk;

pub use mutation::*;
pub use types::*;

#[cfg(test)]
mod tests;
