pub mod artifact;

pub use artifact::{Artifact, FilteredImage, RadarImage};
