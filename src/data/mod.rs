//! Data acquisition: override store, remote source, per-category resolution.

pub mod filter;
pub mod remote;
pub mod resolver;
pub mod sample;
pub mod store;

pub use filter::*;
pub use remote::*;
pub use resolver::*;
pub use sample::*;
pub use store::*;
