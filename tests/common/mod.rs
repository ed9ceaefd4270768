#![allow(dead_code)]

// Test utilities and common setup
pub mod fixtures;
pub mod mocks;

pub use fixtures::*;
pub use mocks::*;
