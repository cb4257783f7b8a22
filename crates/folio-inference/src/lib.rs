pub mod engine;
pub mod mock;

pub use engine::{InferenceEngine, InferenceError, InferenceJob};
pub use mock::MockEngine;
