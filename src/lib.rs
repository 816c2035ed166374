pub mod config;
pub mod decode;
pub mod emoji;
pub mod startup;

// Re-export vision types for convenience
pub use emotune_vision::{
    classifier, pipeline, video, BatchReport, EmotionResult, Error, ModelInfo, Outcome, Pipeline,
};
