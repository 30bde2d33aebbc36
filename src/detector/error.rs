use rayon::ThreadPoolBuildError;
use thiserror::Error;

/// Error generated when [detecting quadrangles](crate::QuadDetector::detect)
/// or when invoking a pipeline stage directly.
///
/// Every variant is a precondition failure: nothing has run by the time one
/// of these is returned. Geometric degeneracies (parallel lines, flat
/// gradients) are not errors; the affected item is skipped instead.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[non_exhaustive]
pub enum DetectError {
    #[error("{stage} have not been computed yet")]
    MissingStage { stage: &'static str },
    #[error("image too small for the configured insets ({width}x{height})")]
    ImageTooSmall { width: usize, height: usize },
    #[error("region dimensions must be positive (got {width}x{height})")]
    BadRegionSize { width: i32, height: i32 },
    #[error("inset too small (actual: {actual}, minimum: {minimum})")]
    InsetTooSmall { actual: i32, minimum: i32 },
    #[error("scan-line stride must be positive (got {actual})")]
    BadScanStride { actual: i32 },
    #[error("channel threshold too large (actual: {actual}, maximum: {maximum})")]
    ChannelThresholdTooLarge { actual: i32, maximum: i32 },
    #[error("distance threshold must be positive (got {actual})")]
    BadDistanceThreshold { actual: f32 },
}

/// Error generated when attempting to [build](crate::DetectorBuilder::build)
/// a [QuadDetector](crate::QuadDetector)
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DetectorBuildError {
    #[error("there was an error when creating the thread pool")]
    Threadpool(#[from] ThreadPoolBuildError),
}
