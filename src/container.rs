use hashbrown::HashMap;

use crate::chains::Chain;
use crate::detector::DetectError;
use crate::edgels::Edgel;
use crate::quads::Quadrangle;
use crate::regions::{Insets, Region, RegionId};
use crate::segments::LineSegment;
use crate::util::ImageRGB8;

/// Pipeline context: the source raster plus every stage's artifact.
///
/// Each stage consumes the previous stage's output through this container
/// and replaces its own slot; nothing else is shared between stages. A stage
/// invoked before its upstream artifact exists fails with
/// [`DetectError::MissingStage`].
pub struct Container {
    image: ImageRGB8,
    insets: Option<Insets>,
    regions: Option<HashMap<RegionId, Region>>,
    edgels: Option<HashMap<RegionId, Vec<Edgel>>>,
    segments: Option<HashMap<RegionId, Vec<LineSegment>>>,
    merged: Option<Vec<LineSegment>>,
    extended: Option<Vec<LineSegment>>,
    corner_segments: Option<Vec<LineSegment>>,
    chains: Option<Vec<Chain>>,
    quadrangles: Option<Vec<Quadrangle>>,
}

impl Container {
    pub fn new(image: ImageRGB8) -> Self {
        Self {
            image,
            insets: None,
            regions: None,
            edgels: None,
            segments: None,
            merged: None,
            extended: None,
            corner_segments: None,
            chains: None,
            quadrangles: None,
        }
    }

    #[inline]
    pub fn image(&self) -> &ImageRGB8 {
        &self.image
    }

    pub fn insets(&self) -> Option<Insets> {
        self.insets
    }

    pub fn regions(&self) -> Option<&HashMap<RegionId, Region>> {
        self.regions.as_ref()
    }

    pub fn edgels(&self) -> Option<&HashMap<RegionId, Vec<Edgel>>> {
        self.edgels.as_ref()
    }

    pub fn segments(&self) -> Option<&HashMap<RegionId, Vec<LineSegment>>> {
        self.segments.as_ref()
    }

    pub fn merged_segments(&self) -> Option<&Vec<LineSegment>> {
        self.merged.as_ref()
    }

    pub fn extended_segments(&self) -> Option<&Vec<LineSegment>> {
        self.extended.as_ref()
    }

    pub fn corner_segments(&self) -> Option<&Vec<LineSegment>> {
        self.corner_segments.as_ref()
    }

    pub fn chains(&self) -> Option<&Vec<Chain>> {
        self.chains.as_ref()
    }

    pub fn quadrangles(&self) -> Option<&Vec<Quadrangle>> {
        self.quadrangles.as_ref()
    }

    pub(crate) fn set_regions(&mut self, regions: HashMap<RegionId, Region>, insets: Insets) {
        self.insets = Some(insets);
        self.regions = Some(regions);
    }

    pub(crate) fn set_edgels(&mut self, edgels: HashMap<RegionId, Vec<Edgel>>) {
        self.edgels = Some(edgels);
    }

    pub(crate) fn set_segments(&mut self, segments: HashMap<RegionId, Vec<LineSegment>>) {
        self.segments = Some(segments);
    }

    pub(crate) fn set_merged(&mut self, merged: Vec<LineSegment>) {
        self.merged = Some(merged);
    }

    pub(crate) fn set_extended(&mut self, extended: Vec<LineSegment>) {
        self.extended = Some(extended);
    }

    pub(crate) fn set_corner_segments(&mut self, segments: Vec<LineSegment>) {
        self.corner_segments = Some(segments);
    }

    pub(crate) fn set_chains(&mut self, chains: Vec<Chain>) {
        self.chains = Some(chains);
    }

    pub(crate) fn set_quadrangles(&mut self, quadrangles: Vec<Quadrangle>) {
        self.quadrangles = Some(quadrangles);
    }

    pub(crate) fn require_insets(&self) -> Result<Insets, DetectError> {
        self.insets
            .ok_or(DetectError::MissingStage { stage: "regions" })
    }

    pub(crate) fn require_regions(&self) -> Result<&HashMap<RegionId, Region>, DetectError> {
        self.regions
            .as_ref()
            .ok_or(DetectError::MissingStage { stage: "regions" })
    }

    pub(crate) fn require_edgels(&self) -> Result<&HashMap<RegionId, Vec<Edgel>>, DetectError> {
        self.edgels
            .as_ref()
            .ok_or(DetectError::MissingStage { stage: "edgels" })
    }

    pub(crate) fn require_segments(
        &self,
    ) -> Result<&HashMap<RegionId, Vec<LineSegment>>, DetectError> {
        self.segments
            .as_ref()
            .ok_or(DetectError::MissingStage { stage: "segments" })
    }

    pub(crate) fn require_merged(&self) -> Result<&Vec<LineSegment>, DetectError> {
        self.merged.as_ref().ok_or(DetectError::MissingStage {
            stage: "merged segments",
        })
    }

    pub(crate) fn require_extended(&self) -> Result<&Vec<LineSegment>, DetectError> {
        self.extended.as_ref().ok_or(DetectError::MissingStage {
            stage: "extended segments",
        })
    }

    pub(crate) fn require_corner_segments(&self) -> Result<&Vec<LineSegment>, DetectError> {
        self.corner_segments
            .as_ref()
            .ok_or(DetectError::MissingStage {
                stage: "corner segments",
            })
    }

    pub(crate) fn require_chains(&self) -> Result<&Vec<Chain>, DetectError> {
        self.chains
            .as_ref()
            .ok_or(DetectError::MissingStage { stage: "chains" })
    }

    /// Region ids in ascending order.
    ///
    /// Flattening the per-region maps in id order keeps seeded runs
    /// reproducible; map iteration order would shuffle the global merge.
    pub(crate) fn sorted_region_ids(&self) -> Vec<RegionId> {
        let mut ids: Vec<RegionId> = match &self.regions {
            Some(regions) => regions.keys().copied().collect(),
            None => Vec::new(),
        };
        ids.sort_unstable();
        ids
    }
}
