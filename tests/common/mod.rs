#![allow(dead_code)]

pub mod mock_facade;
pub mod test_jobs;
pub mod tracing_capture;

pub use mock_facade::*;
pub use test_jobs::*;
pub use tracing_capture::*;
