#![forbid(unsafe_code)]

pub mod cache;
mod config;
mod store;
mod sync;
mod usage;

pub use config::*;
pub use store::*;
pub use sync::*;
pub use usage::*;
