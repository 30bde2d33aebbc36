use std::path::PathBuf;

use crate::chains::ChainParams;
use crate::edgels::EdgelParams;
use crate::regions::RegionParams;
use crate::segments::corners::CornerParams;
use crate::segments::merge::MergeParams;
use crate::segments::ransac::RansacParams;

/// Configuration for [QuadDetector](crate::QuadDetector)
///
/// Every stage's parameters are independently overridable; the defaults
/// reproduce the stock pipeline.
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// How many threads should be used?
    /// - Zero results in autodetection
    /// - One will be single-threaded
    pub nthreads: usize,

    /// Region tiling and image insets
    pub regions: RegionParams,

    /// Scanline edgel detection thresholds and strides
    pub edgels: EdgelParams,

    /// Per-region RANSAC segment fitting
    pub ransac: RansacParams,

    /// Segment merging; the extender shares its edge-evidence gates
    pub merge: MergeParams,

    /// Corner probe color acceptance
    pub corners: CornerParams,

    /// Chain linking thresholds
    pub chains: ChainParams,

    /// When set, write overlay images of every stage to the working
    /// directory (somewhat slow)
    pub debug: bool,

    /// Path to write debug images to
    pub debug_path: Option<PathBuf>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            nthreads: 1,
            regions: RegionParams::default(),
            edgels: EdgelParams::default(),
            ransac: RansacParams::default(),
            merge: MergeParams::default(),
            corners: CornerParams::default(),
            chains: ChainParams::default(),
            debug: false,
            debug_path: None,
        }
    }
}

impl DetectorConfig {
    /// Should debug images be generated
    #[cfg(feature = "debug")]
    pub(crate) const fn generate_debug_image(&self) -> bool {
        self.debug
    }

    /// Should debug images be generated (always false if feature disabled)
    #[cfg(not(feature = "debug"))]
    #[inline(always)]
    pub(crate) const fn generate_debug_image(&self) -> bool {
        false
    }

    /// Generate a debug image with the given name.
    #[cfg(feature = "debug")]
    pub(crate) fn debug_image<E: std::fmt::Debug>(
        &self,
        name: &str,
        callback: impl FnOnce(&std::path::Path) -> Result<(), E>,
    ) {
        if self.debug {
            let path = match &self.debug_path {
                Some(prefix) => prefix.join(name),
                None => PathBuf::from(name),
            };
            callback(&path).unwrap_or_else(|e| panic!("Error writing {name} ({e:?})"));
        }
    }

    #[cfg(not(feature = "debug"))]
    #[inline(always)]
    pub(crate) fn debug_image<E: std::fmt::Debug>(
        &self,
        _name: &str,
        _callback: impl FnOnce(&std::path::Path) -> Result<(), E>,
    ) {
    }
}
