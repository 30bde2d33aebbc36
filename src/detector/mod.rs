mod builder;
pub(crate) mod config;
#[cfg(feature = "debug")]
mod debug;
mod error;

pub use builder::DetectorBuilder;
pub use config::DetectorConfig;
pub use error::{DetectError, DetectorBuildError};

use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::chains::detect_chains;
use crate::container::Container;
use crate::dbg::TimeProfile;
use crate::edgels::detect_edgels;
use crate::quads::{extract_quadrangles, Quadrangle};
use crate::regions::split_regions;
use crate::segments::corners::detect_corners;
use crate::segments::extend::extend_segments;
use crate::segments::merge::merge_segments;
use crate::segments::ransac::find_segments;

/// Result of one detection run.
///
/// Callers that need the intermediate artifacts (edgel maps, segment lists,
/// chains) use [`QuadDetector::detect_with_container`] instead.
#[derive(Debug)]
pub struct QuadDetections {
    /// Per-stage timing of this run
    pub tp: TimeProfile,
    /// How many quadrangles were found
    pub nquads: u32,
    /// The detected quadrangles
    pub quads: Vec<Quadrangle>,
}

/// Quadrangle marker detector.
///
/// Runs the fixed stage sequence region-split -> edgels -> RANSAC segments
/// -> merge -> extend -> corners -> chains -> quadrangles over a worker
/// pool. The per-region stages fan out across threads; the global merge
/// waits for all of them.
pub struct QuadDetector {
    pub params: DetectorConfig,

    // Used to manage multi-threading.
    wp: ThreadPool,
}

impl QuadDetector {
    /// Create a new builder
    pub fn builder() -> DetectorBuilder {
        DetectorBuilder::default()
    }

    pub(crate) fn new(params: DetectorConfig) -> Result<QuadDetector, DetectorBuildError> {
        let wp = {
            let tpb = ThreadPoolBuilder::new().num_threads(params.nthreads);

            match tpb.build() {
                Ok(wp) => wp,
                Err(e) => return Err(DetectorBuildError::Threadpool(e)),
            }
        };

        Ok(Self { params, wp })
    }

    /// Detect quadrangles in the image.
    pub fn detect(&self, image: &crate::util::ImageRGB8) -> Result<QuadDetections, DetectError> {
        let (container, tp) = self.detect_with_container(image.clone())?;

        let quads = container.quadrangles().cloned().unwrap_or_default();
        Ok(QuadDetections {
            tp,
            nquads: quads.len() as u32,
            quads,
        })
    }

    /// Run the full pipeline, returning the container with every stage's
    /// artifact still in place.
    pub fn detect_with_container(
        &self,
        image: crate::util::ImageRGB8,
    ) -> Result<(Container, TimeProfile), DetectError> {
        let mut tp = TimeProfile::default();
        tp.stamp("init");

        let mut container = Container::new(image);
        let params = &self.params;

        self.wp.install(|| -> Result<(), DetectError> {
            split_regions(&mut container, &params.regions)?;
            tp.stamp("regions");

            detect_edgels(&mut container, &params.edgels)?;
            tp.stamp("edgels");

            find_segments(&mut container, &params.ransac)?;
            tp.stamp("segments");

            merge_segments(&mut container, &params.merge)?;
            tp.stamp("merge");

            extend_segments(&mut container, &params.merge)?;
            tp.stamp("extend");

            detect_corners(&mut container, &params.corners)?;
            tp.stamp("corners");

            detect_chains(&mut container, &params.chains)?;
            tp.stamp("chains");

            extract_quadrangles(&mut container)?;
            tp.stamp("quadrangles");

            Ok(())
        })?;

        #[cfg(feature = "extra_debug")]
        {
            let edgels: usize = container.edgels().map_or(0, |m| m.values().map(Vec::len).sum());
            let segments: usize = container
                .segments()
                .map_or(0, |m| m.values().map(Vec::len).sum());
            println!(
                "{} edgels, {} segments, {} merged, {} with corners, {} chains, {} quadrangles",
                edgels,
                segments,
                container.merged_segments().map_or(0, Vec::len),
                container.corner_segments().map_or(0, Vec::len),
                container.chains().map_or(0, Vec::len),
                container.quadrangles().map_or(0, Vec::len),
            );
        }

        #[cfg(feature = "debug")]
        if self.params.generate_debug_image() {
            self.params
                .debug_image("01_debug_regions.pnm", |p| debug::debug_regions(p, &container));
            self.params
                .debug_image("02_debug_edgels.pnm", |p| debug::debug_edgels(p, &container));
            self.params.debug_image("03_debug_segments.pnm", |p| {
                let segments = container.segments().into_iter().flat_map(|m| m.values().flatten());
                debug::debug_segments(p, &container, segments)
            });
            self.params.debug_image("04_debug_merged.pnm", |p| {
                let merged = container.merged_segments().into_iter().flatten();
                debug::debug_segments(p, &container, merged)
            });
            self.params.debug_image("05_debug_corners.pnm", |p| {
                let corners = container.corner_segments().into_iter().flatten();
                debug::debug_segments(p, &container, corners)
            });
            self.params
                .debug_image("06_debug_chains.pnm", |p| debug::debug_chains(p, &container));
            self.params.debug_image("07_debug_quadrangles.pnm", |p| {
                debug::debug_quadrangles(p, &container)
            });
        }

        Ok((container, tp))
    }
}
