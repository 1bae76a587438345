pub mod detection;
pub mod errors;
pub mod hazard;
pub mod model;
pub mod stream;
pub mod synthesizer;
pub mod tracker;
