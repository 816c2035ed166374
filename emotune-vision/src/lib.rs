pub mod classifier;
pub mod error;
pub mod labels;
pub mod locator;
pub mod model;
pub mod pipeline;
pub mod preprocess;
pub mod region;
pub mod smoothing;
pub mod video;

// Re-export commonly used types
pub use classifier::{ClassifierRuntime, EmotionResult, ModelInfo, PredictionVector};
pub use error::{Error, Result};
pub use labels::LabelMap;
pub use locator::{CascadeLocator, FaceLocator, LocatorSettings};
pub use pipeline::{BatchReport, FaceEmotion, Outcome, Pipeline};
pub use preprocess::{InputSize, InputTensor, TensorPreprocessor};
pub use region::FaceRegion;
pub use smoothing::TemporalSmoother;
pub use video::Camera;
