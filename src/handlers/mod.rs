pub mod adapters;

pub use adapters::*;
