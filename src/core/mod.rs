pub mod batch;
pub mod logging;
pub mod pacing;
