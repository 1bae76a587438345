pub mod annotate;
pub mod passthrough;
pub mod track_assigner;
#[cfg(feature = "onnx")]
pub mod yolo_engine;

pub use annotate::JpegAnnotator;
pub use passthrough::PassthroughDetector;
pub use track_assigner::IouTrackAssigner;
#[cfg(feature = "onnx")]
pub use yolo_engine::{OnnxYoloEngine, YoloDetector};
