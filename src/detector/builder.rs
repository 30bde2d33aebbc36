use super::{DetectorBuildError, DetectorConfig, QuadDetector};

/// Builder for [QuadDetector]
#[derive(Clone, Default)]
pub struct DetectorBuilder {
    /// Configuration parameters
    pub config: DetectorConfig,
}

impl From<QuadDetector> for DetectorBuilder {
    fn from(value: QuadDetector) -> Self {
        Self {
            config: value.params,
        }
    }
}

impl DetectorBuilder {
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }

    /// Fix the RANSAC random source for reproducible runs.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.config.ransac.seed = Some(seed);
        self
    }

    /// Use this many threads (zero autodetects).
    pub fn with_threads(mut self, nthreads: usize) -> Self {
        self.config.nthreads = nthreads;
        self
    }

    /// Build a detector with these options
    pub fn build(self) -> Result<QuadDetector, DetectorBuildError> {
        QuadDetector::new(self.config)
    }
}
