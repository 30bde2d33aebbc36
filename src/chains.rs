use std::collections::VecDeque;

use arrayvec::ArrayVec;

use crate::container::Container;
use crate::detector::DetectError;
use crate::segments::{orientation_compatible, squared_distance, LineSegment};

/// Fewest segments a chain may hold.
pub const MIN_CHAIN_SEGMENTS: usize = 3;
/// Most segments a chain may hold.
pub const MAX_CHAIN_SEGMENTS: usize = 4;

/// An ordered run of 3-4 segments whose ends meet, approximating a marker
/// boundary.
///
/// Chains are open paths: the last segment's end is not required to meet the
/// first segment's start, even though the boundary they trace is closed.
#[derive(Debug, Clone, PartialEq)]
pub struct Chain {
    segments: ArrayVec<LineSegment, MAX_CHAIN_SEGMENTS>,
}

impl Chain {
    pub(crate) fn from_segments(
        segments: ArrayVec<LineSegment, MAX_CHAIN_SEGMENTS>,
    ) -> Self {
        debug_assert!((MIN_CHAIN_SEGMENTS..=MAX_CHAIN_SEGMENTS).contains(&segments.len()));
        Self { segments }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    #[inline]
    pub fn segments(&self) -> &[LineSegment] {
        &self.segments
    }
}

/// Configuration for [`detect_chains`]
#[derive(Debug, Clone, PartialEq)]
pub struct ChainParams {
    /// Segments whose direction dot-product exceeds this are near-parallel
    /// and never chained; a boundary has to turn a corner between segments
    pub max_parallel: f32,
    /// Largest allowed squared distance between one segment's end and the
    /// next segment's start
    pub max_join_dist_sq: f32,
}

impl Default for ChainParams {
    fn default() -> Self {
        Self {
            max_parallel: 0.92,
            max_join_dist_sq: 16.,
        }
    }
}

/// Group corner-tagged segments into directed chains of 3-4.
pub fn detect_chains(container: &mut Container, params: &ChainParams) -> Result<(), DetectError> {
    if params.max_join_dist_sq <= 0. {
        return Err(DetectError::BadDistanceThreshold {
            actual: params.max_join_dist_sq,
        });
    }

    let chains = {
        let segments = container.require_corner_segments()?;
        link_chains(segments, params)
    };

    container.set_chains(chains);
    Ok(())
}

/// Build the successor/predecessor relation and walk it into chains.
///
/// Every segment holds at most one predecessor and one successor index;
/// later connections overwrite earlier ones. Chain growth stops at any
/// segment already collected, which keeps closed boundaries from looping
/// forever.
pub(crate) fn link_chains(segments: &[LineSegment], params: &ChainParams) -> Vec<Chain> {
    let n = segments.len();
    let mut prev: Vec<Option<usize>> = vec![None; n];
    let mut next: Vec<Option<usize>> = vec![None; n];

    for i in 0..n {
        for j in (i + 1)..n {
            if connects(&segments[i], &segments[j], params) {
                next[i] = Some(j);
                prev[j] = Some(i);
                // a pair is assumed to connect in one direction only
                continue;
            }

            if connects(&segments[j], &segments[i], params) {
                next[j] = Some(i);
                prev[i] = Some(j);
            }
        }
    }

    let mut consumed = vec![false; n];
    let mut chains = Vec::new();
    for i in 0..n {
        if consumed[i] {
            continue;
        }
        consumed[i] = true;

        // lonely segments are discarded
        if prev[i].is_none() && next[i].is_none() {
            continue;
        }

        let mut members: VecDeque<usize> = VecDeque::new();
        members.push_back(i);

        let mut p = prev[i];
        while let Some(k) = p {
            if members.contains(&k) {
                break;
            }
            members.push_front(k);
            p = prev[k];
        }

        let mut nx = next[i];
        while let Some(k) = nx {
            if members.contains(&k) {
                break;
            }
            members.push_back(k);
            nx = next[k];
        }

        for &k in &members {
            consumed[k] = true;
        }

        if (MIN_CHAIN_SEGMENTS..=MAX_CHAIN_SEGMENTS).contains(&members.len()) {
            let chain: ArrayVec<LineSegment, MAX_CHAIN_SEGMENTS> =
                members.iter().map(|&k| segments[k].clone()).collect();
            chains.push(Chain::from_segments(chain));
        }
    }

    chains
}

/// Does `a`'s end meet `b`'s start around a corner, with consistent winding?
fn connects(a: &LineSegment, b: &LineSegment, params: &ChainParams) -> bool {
    // near-parallel segments cannot be consecutive boundary sides
    if orientation_compatible(a.dir, b.dir, params.max_parallel) {
        return false;
    }

    if squared_distance(&a.end, &b.start) as f32 > params.max_join_dist_sq {
        return false;
    }

    // only clockwise-connected pairs remain
    a.dir.cross(b.dir) >= 0.
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::segments::test_util::segment;

    /// Clockwise square boundary as four segments.
    fn clockwise_square() -> Vec<LineSegment> {
        vec![
            segment(10, 10, 50, 10),
            segment(50, 10, 50, 50),
            segment(50, 50, 10, 50),
            segment(10, 50, 10, 10),
        ]
    }

    #[test]
    fn test_square_forms_one_chain_of_four() {
        let chains = link_chains(&clockwise_square(), &ChainParams::default());
        assert_eq!(chains.len(), 1);
        assert_eq!(chains[0].len(), 4);

        // consecutive chain members actually meet
        let segs = chains[0].segments();
        for pair in segs.windows(2) {
            assert_eq!(
                (pair[0].end.x, pair[0].end.y),
                (pair[1].start.x, pair[1].start.y)
            );
        }
    }

    #[test]
    fn test_no_duplicate_segments_within_chain() {
        let chains = link_chains(&clockwise_square(), &ChainParams::default());
        let segs = chains[0].segments();
        for i in 0..segs.len() {
            for j in (i + 1)..segs.len() {
                assert_ne!(segs[i], segs[j]);
            }
        }
    }

    #[test]
    fn test_three_segment_chain() {
        let mut segments = clockwise_square();
        segments.truncate(3);
        let chains = link_chains(&segments, &ChainParams::default());
        assert_eq!(chains.len(), 1);
        assert_eq!(chains[0].len(), 3);
    }

    #[test]
    fn test_two_segment_run_is_discarded() {
        let mut segments = clockwise_square();
        segments.truncate(2);
        let chains = link_chains(&segments, &ChainParams::default());
        assert!(chains.is_empty());
    }

    #[test]
    fn test_lonely_segments_are_discarded() {
        let segments = vec![segment(10, 10, 50, 10), segment(200, 200, 240, 200)];
        let chains = link_chains(&segments, &ChainParams::default());
        assert!(chains.is_empty());
    }

    #[test]
    fn test_near_parallel_pairs_never_connect() {
        // collinear continuation: directions identical, endpoints touching
        let segments = vec![
            segment(10, 10, 30, 10),
            segment(30, 10, 50, 10),
            segment(50, 10, 50, 30),
        ];
        let chains = link_chains(&segments, &ChainParams::default());
        // only the corner pair links, and a 2-chain is too short
        assert!(chains.is_empty());
    }

    #[test]
    fn test_counterclockwise_winding_is_rejected() {
        let segments = vec![
            segment(50, 10, 10, 10),
            segment(10, 10, 10, 50),
            segment(10, 50, 50, 50),
            segment(50, 50, 50, 10),
        ];
        let chains = link_chains(&segments, &ChainParams::default());
        assert!(chains.is_empty());
    }

    #[test]
    fn test_rejects_bad_distance_config() {
        let img = crate::util::ImageRGB8::create(32, 32);
        let mut container = Container::new(img);
        let params = ChainParams {
            max_join_dist_sq: 0.,
            ..Default::default()
        };
        assert!(matches!(
            detect_chains(&mut container, &params),
            Err(DetectError::BadDistanceThreshold { .. })
        ));
    }
}
