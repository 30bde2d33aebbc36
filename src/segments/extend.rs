use rayon::prelude::*;

use super::merge::{edge_evidence, MergeParams};
use super::LineSegment;
use crate::container::Container;
use crate::detector::DetectError;
use crate::edgels::Edgel;
use crate::util::ImageRGB8;

/// Grow every merged segment's endpoints outward along its own direction,
/// as far as the edge evidence supports, staying inside the insets.
///
/// The two ends extend independently; the evidence gate is the same one the
/// merger applies to gap pixels.
pub fn extend_segments(container: &mut Container, params: &MergeParams) -> Result<(), DetectError> {
    let extended: Vec<LineSegment> = {
        let insets = container.require_insets()?;
        let merged = container.require_merged()?;
        let img = container.image();

        let x_lo = insets.left;
        let y_lo = insets.top;
        let x_hi = img.width as i32 - insets.right;
        let y_hi = img.height as i32 - insets.bottom;

        merged
            .par_iter()
            .map(|seg| {
                let mut clone = seg.detached();
                extend_end(img, &mut clone, true, (x_lo, y_lo, x_hi, y_hi), params);
                extend_end(img, &mut clone, false, (x_lo, y_lo, x_hi, y_hi), params);
                clone.inliers = vec![clone.start, clone.end];
                clone
            })
            .collect()
    };

    container.set_extended(extended);
    Ok(())
}

/// Walk one endpoint outward pixel by pixel.
///
/// Position accumulates in floats and truncates per step; the endpoint
/// settles on the last position whose successor left the usable area or
/// failed the evidence check. The original endpoint's gradient direction and
/// orientation tag carry over.
fn extend_end(
    img: &ImageRGB8,
    seg: &mut LineSegment,
    extend_start: bool,
    (x_lo, y_lo, x_hi, y_hi): (i32, i32, i32, i32),
    params: &MergeParams,
) {
    let mut grow = seg.dir;
    let mut normal = seg.dir.normal();

    let anchor = if extend_start {
        grow = -grow;
        normal = -normal;
        &seg.start
    } else {
        &seg.end
    };
    let mut x = anchor.x as f32;
    let mut y = anchor.y as f32;
    let direction = anchor.dir;
    let orientation = anchor.orientation;

    let mut x_last;
    let mut y_last;
    loop {
        x_last = x as i32;
        y_last = y as i32;
        x += grow.x();
        y += grow.y();

        // goes outside the usable area, stop
        if x < x_lo as f32 || x >= x_hi as f32 || y < y_lo as f32 || y >= y_hi as f32 {
            break;
        }

        if !edge_evidence(img, x as i32, y as i32, normal, direction, params) {
            // end of line reached
            break;
        }
    }

    let new_end = Edgel {
        x: x_last,
        y: y_last,
        dir: direction,
        orientation,
    };
    if extend_start {
        seg.start = new_end;
    } else {
        seg.end = new_end;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::edgels::EdgelOrientation;
    use crate::regions::{split_regions, RegionParams};
    use crate::segments::line_direction;
    use crate::util::math::Vec2;

    /// White at and right of the main diagonal (`x >= y`), black above.
    fn main_diagonal_image(size: usize) -> ImageRGB8 {
        let mut im = ImageRGB8::create(size, size);
        for y in 0..size {
            for x in y..size {
                im[(x, y)] = [255, 255, 255];
            }
        }
        im
    }

    /// Segment lying on the main diagonal with the gradient that boundary
    /// actually has (white side below-right).
    fn diagonal_segment(a: i32, b: i32) -> LineSegment {
        let dir = line_direction(b - a, b - a);
        let grad = Vec2::of(-1., 1.).norm();
        let start = Edgel {
            x: a,
            y: a,
            dir: grad,
            orientation: EdgelOrientation::Vertical,
        };
        let end = Edgel {
            x: b,
            y: b,
            dir: grad,
            orientation: EdgelOrientation::Vertical,
        };
        LineSegment {
            start,
            end,
            dir,
            inliers: vec![start, end],
            start_corner: false,
            end_corner: false,
        }
    }

    fn container_with_merged(img: ImageRGB8, merged: Vec<LineSegment>) -> Container {
        let mut container = Container::new(img);
        split_regions(&mut container, &RegionParams::default()).unwrap();
        container.set_merged(merged);
        container
    }

    #[test]
    fn test_extends_to_insets() {
        let img = main_diagonal_image(64);
        let mut container = container_with_merged(img, vec![diagonal_segment(20, 30)]);

        extend_segments(&mut container, &MergeParams::default()).unwrap();

        let extended = container.extended_segments().unwrap();
        assert_eq!(extended.len(), 1);
        let seg = &extended[0];

        // both ends ride the boundary until the walk leaves the insets
        assert_eq!((seg.start.x, seg.start.y), (2, 2));
        assert_eq!((seg.end.x, seg.end.y), (61, 61));

        // gradient direction and orientation carry over to the new endpoints
        assert_eq!(seg.start.dir, Vec2::of(-1., 1.).norm());
        assert_eq!(seg.start.orientation, EdgelOrientation::Vertical);
    }

    #[test]
    fn test_no_growth_without_evidence() {
        // flat image: the very first probe fails on both ends
        let img = ImageRGB8::create(64, 64);
        let mut container = container_with_merged(img, vec![diagonal_segment(20, 30)]);

        extend_segments(&mut container, &MergeParams::default()).unwrap();

        let seg = &container.extended_segments().unwrap()[0];
        assert_eq!((seg.start.x, seg.start.y), (20, 20));
        assert_eq!((seg.end.x, seg.end.y), (30, 30));
    }

    #[test]
    fn test_requires_merged() {
        let img = ImageRGB8::create(32, 32);
        let mut container = Container::new(img);
        assert!(matches!(
            extend_segments(&mut container, &MergeParams::default()),
            Err(DetectError::MissingStage { .. })
        ));
    }
}
