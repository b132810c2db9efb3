pub mod segment;

pub use segment::{SegmentClient, TrackEvent};
