use rayon::prelude::*;

use super::LineSegment;
use crate::container::Container;
use crate::detector::DetectError;
use crate::regions::Insets;
use crate::util::ImageRGB8;

/// Configuration for [`detect_corners`]
#[derive(Debug, Clone, PartialEq)]
pub struct CornerParams {
    /// Inclusive (low, high) acceptance range per channel (R, G, B).
    ///
    /// The defaults describe a bright background: a probe just past a
    /// marker-border endpoint should land on background color. This is a
    /// policy constant tuned for dark markers on bright paper, not a derived
    /// value.
    pub channel_ranges: [(u8, u8); 3],
}

impl Default for CornerParams {
    fn default() -> Self {
        Self {
            channel_ranges: [(128, 255); 3],
        }
    }
}

/// How far past an endpoint the corner probe looks, in pixels.
const PROBE_DISTANCE: f32 = 4.;

/// Classify each extended segment's endpoints as marker-corner candidates
/// and drop segments with no corner endpoint.
pub fn detect_corners(container: &mut Container, params: &CornerParams) -> Result<(), DetectError> {
    let with_corners: Vec<LineSegment> = {
        let insets = container.require_insets()?;
        let extended = container.require_extended()?;
        let img = container.image();

        extended
            .par_iter()
            .filter_map(|seg| {
                let mut seg = seg.clone();
                let dx = seg.dir.x() * PROBE_DISTANCE;
                let dy = seg.dir.y() * PROBE_DISTANCE;

                // probe a few pixels outward past each endpoint
                let x = seg.start.x as f32 - dx;
                let y = seg.start.y as f32 - dy;
                seg.start_corner = probe(img, &insets, x as i32, y as i32, params);

                let x = seg.end.x as f32 + dx;
                let y = seg.end.y as f32 + dy;
                seg.end_corner = probe(img, &insets, x as i32, y as i32, params);

                if seg.start_corner || seg.end_corner {
                    Some(seg)
                } else {
                    None
                }
            })
            .collect()
    };

    container.set_corner_segments(with_corners);
    Ok(())
}

/// Does the probe pixel sit inside the usable area with all three channels
/// in their acceptance range?
fn probe(img: &ImageRGB8, insets: &Insets, x: i32, y: i32, params: &CornerParams) -> bool {
    let x_limit = img.width as i32 - insets.right;
    let y_limit = img.height as i32 - insets.bottom;
    if x < insets.left || x >= x_limit || y < insets.top || y >= y_limit {
        return false;
    }

    let pixel = img[(x as usize, y as usize)];
    for (value, (low, high)) in pixel.iter().zip(params.channel_ranges) {
        if *value < low || *value > high {
            return false;
        }
    }

    true
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::regions::{split_regions, RegionParams};
    use crate::segments::test_util::segment;

    /// White except for a black band covering `x < split`.
    fn split_image(size: usize, split: usize) -> ImageRGB8 {
        let mut im = ImageRGB8::create(size, size);
        for y in 0..size {
            for x in split..size {
                im[(x, y)] = [255, 255, 255];
            }
        }
        im
    }

    fn run(img: ImageRGB8, segments: Vec<LineSegment>) -> Vec<LineSegment> {
        let mut container = Container::new(img);
        split_regions(&mut container, &RegionParams::default()).unwrap();
        container.set_extended(segments);
        detect_corners(&mut container, &CornerParams::default()).unwrap();
        container.corner_segments().unwrap().clone()
    }

    #[test]
    fn test_tags_bright_probes() {
        // rightward segment in the white half: both probes land on white
        let img = split_image(64, 8);
        let kept = run(img, vec![segment(20, 30, 40, 30)]);

        assert_eq!(kept.len(), 1);
        assert!(kept[0].start_corner);
        assert!(kept[0].end_corner);
    }

    #[test]
    fn test_drops_dark_probes() {
        // fully black image: no probe can pass
        let img = ImageRGB8::create(64, 64);
        let kept = run(img, vec![segment(20, 30, 40, 30)]);
        assert!(kept.is_empty());
    }

    #[test]
    fn test_one_corner_is_enough() {
        // start probe (x = 16) falls in the black band, end probe is white
        let img = split_image(64, 18);
        let kept = run(img, vec![segment(20, 30, 40, 30)]);

        assert_eq!(kept.len(), 1);
        assert!(!kept[0].start_corner);
        assert!(kept[0].end_corner);
    }

    #[test]
    fn test_probe_outside_insets_fails() {
        // end probe at x = 63 is past the right inset limit (62)
        let img = split_image(64, 0);
        let kept = run(img, vec![segment(39, 30, 59, 30)]);

        assert_eq!(kept.len(), 1);
        assert!(kept[0].start_corner);
        assert!(!kept[0].end_corner);
    }

    #[test]
    fn test_requires_extended() {
        let img = ImageRGB8::create(32, 32);
        let mut container = Container::new(img);
        container.set_regions(Default::default(), Insets::default());
        assert!(matches!(
            detect_corners(&mut container, &CornerParams::default()),
            Err(DetectError::MissingStage { .. })
        ));
    }
}
