use std::collections::{BTreeMap, VecDeque};

use rayon::prelude::*;

use super::{line_direction, orientation_compatible, squared_distance, LineSegment};
use crate::container::Container;
use crate::detector::DetectError;
use crate::edgels::{sobel_direction, window_response, Edgel, WindowAxis};
use crate::util::math::{Point2, Vec2};
use crate::util::ImageRGB8;

/// Configuration for [`merge_segments`]
#[derive(Debug, Clone, PartialEq)]
pub struct MergeParams {
    /// Two directions count as equal when `1 - dot` is below this
    pub max_direction_diff: f32,
    /// Largest allowed squared gap (px^2) between merge candidates
    pub max_gap_sq: i32,
    /// Direction gate for gradient probes along the connecting line
    pub compatibility: f32,
    /// Minimum kernel response for a gap pixel to count as edge evidence;
    /// half the edgel scan threshold
    pub evidence_threshold: i32,
}

impl Default for MergeParams {
    fn default() -> Self {
        Self {
            max_direction_diff: 0.1,
            max_gap_sq: 625,
            compatibility: 0.38,
            evidence_threshold: 128,
        }
    }
}

/// Collapse nearly-collinear nearby segments into longer ones: once within
/// each region, then once more over the union of all regions.
pub fn merge_segments(container: &mut Container, params: &MergeParams) -> Result<(), DetectError> {
    if params.max_gap_sq <= 0 {
        return Err(DetectError::BadDistanceThreshold {
            actual: params.max_gap_sq as f32,
        });
    }

    let merged = {
        container.require_regions()?;
        container.require_edgels()?;
        let segments = container.require_segments()?;
        let img = container.image();

        // local pass, regions independent
        let ids = container.sorted_region_ids();
        let per_region: Vec<Vec<LineSegment>> = ids
            .par_iter()
            .map(|id| merge_pool(img, segments.get(id).cloned().unwrap_or_default(), params))
            .collect();

        // global pass over everything the local passes produced
        let all: Vec<LineSegment> = per_region.into_iter().flatten().collect();
        merge_pool(img, all, params)
    };

    container.set_merged(merged);
    Ok(())
}

/// One merge pass over a segment pool.
///
/// Segments that grew re-enter the pool (they may grow again); segments that
/// could not grow are finalized with their direction recomputed.
pub(crate) fn merge_pool(
    img: &ImageRGB8,
    segments: Vec<LineSegment>,
    params: &MergeParams,
) -> Vec<LineSegment> {
    let mut pool: VecDeque<LineSegment> = segments.into();
    let mut merged = Vec::new();

    while let Some(seed) = pool.pop_front() {
        let mut clone = seed.detached();

        // step one - rank plausible partners by gap distance. Equal
        // distances collapse onto one slot, keeping the later candidate.
        let mut candidates: BTreeMap<i32, usize> = BTreeMap::new();
        for (idx, other) in pool.iter().enumerate() {
            if !same_direction(clone.dir, other.dir, params) {
                continue;
            }

            let ordered = ordered_endpoints(&clone, other);
            let connect_dir = line_direction(
                ordered[2].x - ordered[1].x,
                ordered[2].y - ordered[1].y,
            );
            // a NaN direction (touching endpoints) fails this gate too
            if !same_direction(clone.dir, connect_dir, params) {
                continue;
            }

            let gap_sq = squared_distance(&ordered[1], &ordered[2]);
            if gap_sq > params.max_gap_sq {
                continue;
            }

            candidates.insert(gap_sq, idx);
        }

        // step two - walk the gap pixels of each candidate, nearest first,
        // and absorb every candidate whose gap is fully backed by edge
        // evidence. Later candidates are evaluated against the grown clone.
        let mut has_grown = false;
        let mut consumed: Vec<usize> = Vec::new();
        for (_, idx) in candidates {
            let candidate = &pool[idx];

            let ordered = ordered_endpoints(&clone, candidate);
            let direction = ordered[1].dir;
            let normal = clone.dir.normal();

            let points = line_points(ordered[1].point(), ordered[2].point());
            let interior = if points.len() > 2 {
                &points[1..points.len() - 1]
            } else {
                &[][..]
            };

            let all_edge = interior
                .iter()
                .all(|p| edge_evidence(img, p.x, p.y, normal, direction, params));
            if !all_edge {
                continue;
            }

            clone.start = ordered[0];
            clone.end = ordered[3];
            clone.inliers = vec![clone.start, clone.end];
            consumed.push(idx);
            has_grown = true;
        }

        consumed.sort_unstable_by(|a, b| b.cmp(a));
        for idx in consumed {
            pool.remove(idx);
        }

        if has_grown {
            pool.push_back(clone);
        } else {
            clone.recompute_dir();
            merged.push(clone);
        }
    }

    merged
}

/// `1 - dot` direction similarity gate.
#[inline]
fn same_direction(a: Vec2, b: Vec2, params: &MergeParams) -> bool {
    1. - a.dot(b) < params.max_direction_diff
}

/// Order the four endpoints as `[outer, inner, inner, outer]`.
///
/// The ordering is right when the first segment's far endpoint falls inside
/// the bounding box of the two outer points; otherwise the segments swap
/// roles.
fn ordered_endpoints(a: &LineSegment, b: &LineSegment) -> [Edgel; 4] {
    let ordered = [a.start, a.end, b.start, b.end];

    let rx1 = i32::min(ordered[0].x, ordered[3].x);
    let ry1 = i32::min(ordered[0].y, ordered[3].y);
    let rx2 = i32::max(ordered[0].x, ordered[3].x);
    let ry2 = i32::max(ordered[0].y, ordered[3].y);
    if ordered[1].x >= rx1 && ordered[1].x <= rx2 && ordered[1].y >= ry1 && ordered[1].y <= ry2 {
        return ordered;
    }

    [b.start, b.end, a.start, a.end]
}

/// Integer pixels on the Bresenham line from `s` to `e`, inclusive.
fn line_points(s: Point2, e: Point2) -> Vec<Point2> {
    let mut result = Vec::new();

    let mut x = s.x;
    let mut y = s.y;
    let w = e.x - x;
    let h = e.y - y;

    let dx1 = w.signum();
    let dy1 = h.signum();
    let mut dx2 = w.signum();
    let mut dy2 = 0;

    let mut longest = w.abs();
    let mut shortest = h.abs();
    if longest <= shortest {
        longest = h.abs();
        shortest = w.abs();
        dy2 = h.signum();
        dx2 = 0;
    }

    let mut numerator = longest >> 1;
    for _ in 0..=longest {
        result.push(Point2::of(x, y));
        numerator += shortest;
        if numerator >= longest {
            numerator -= longest;
            x += dx1;
            y += dy1;
        } else {
            x += dx2;
            y += dy2;
        }
    }

    result
}

/// Does the pixel at `(x, y)` look like part of an edge running through
/// `direction`?
///
/// Requires kernel support in both window axes plus gradient agreement at
/// the pixel and at its two neighbors along `normal`. Probes that leave the
/// raster count as no evidence.
pub(crate) fn edge_evidence(
    img: &ImageRGB8,
    x: i32,
    y: i32,
    normal: Vec2,
    direction: Vec2,
    params: &MergeParams,
) -> bool {
    point_gauss(img, x, y, params)
        && point_direction(img, x, y, direction, params)
        && point_direction(
            img,
            (x as f32 + normal.x()) as i32,
            (y as f32 + normal.y()) as i32,
            direction,
            params,
        )
        && point_direction(
            img,
            (x as f32 - normal.x()) as i32,
            (y as f32 - normal.y()) as i32,
            direction,
            params,
        )
}

/// Kernel response gate in both axes.
fn point_gauss(img: &ImageRGB8, x: i32, y: i32, params: &MergeParams) -> bool {
    let Some(kernel_x) = window_response(img, x, y, WindowAxis::X) else {
        return false;
    };
    if kernel_x < params.evidence_threshold {
        return false;
    }

    let Some(kernel_y) = window_response(img, x, y, WindowAxis::Y) else {
        return false;
    };
    if kernel_y < params.evidence_threshold {
        return false;
    }

    true
}

/// Gradient direction gate at one probe pixel.
fn point_direction(
    img: &ImageRGB8,
    x: i32,
    y: i32,
    direction: Vec2,
    params: &MergeParams,
) -> bool {
    match sobel_direction(img, x, y) {
        Some(point_dir) => orientation_compatible(point_dir, direction, params.compatibility),
        None => false,
    }
}
