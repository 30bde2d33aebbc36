pub mod util;

pub mod chains;
mod container;
mod dbg;
mod detector;
pub mod edgels;
pub mod quads;
pub mod regions;
pub mod segments;

pub use chains::{Chain, ChainParams};
pub use container::Container;
pub use dbg::{TimeProfile, TimeProfileStatistics};
pub use detector::{
    DetectError, DetectorBuildError, DetectorBuilder, DetectorConfig, QuadDetections, QuadDetector,
};
pub use edgels::{Edgel, EdgelOrientation, EdgelParams};
pub use quads::Quadrangle;
pub use regions::{Insets, Region, RegionId, RegionParams};
pub use segments::corners::CornerParams;
pub use segments::merge::MergeParams;
pub use segments::ransac::RansacParams;
pub use segments::LineSegment;
pub use util::math::{Point2, Vec2};
pub use util::{Image, ImageRGB8};

// stage entry points, for callers driving a Container themselves
pub use chains::detect_chains;
pub use edgels::detect_edgels;
pub use quads::extract_quadrangles;
pub use regions::split_regions;
pub use segments::corners::detect_corners;
pub use segments::extend::extend_segments;
pub use segments::merge::merge_segments;
pub use segments::ransac::find_segments;
