use hashbrown::HashMap;
use rayon::prelude::*;

use crate::container::Container;
use crate::detector::DetectError;
use crate::regions::{Region, RegionId};
use crate::util::math::{Point2, Vec2};
use crate::util::ImageRGB8;

/// Derivative-of-Gaussian kernel applied along a scanline (center tap unused).
pub(crate) const GAUSS_KERNEL: [i32; 5] = [-3, -5, 0, 5, 3];

/// Pixels on each side of a position the kernel needs to see.
pub(crate) const KERNEL_FRAME: usize = GAUSS_KERNEL.len() / 2;

/// Largest meaningful channel threshold: kernel magnitude (3+5) * 255.
pub const MAX_CHANNEL_THRESHOLD: i32 = 2040;

/// Orientation of the edge an edgel sits on.
///
/// A horizontal scanline crosses vertical edges and vice versa, so edgels
/// found while scanning a row are tagged [`Vertical`](EdgelOrientation::Vertical).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgelOrientation {
    Horizontal,
    Vertical,
}

/// A detected edge point: integer position plus unit gradient direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edgel {
    pub x: i32,
    pub y: i32,
    /// Unit gradient direction (red-channel Sobel)
    pub dir: Vec2,
    pub orientation: EdgelOrientation,
}

impl Edgel {
    #[inline]
    pub fn point(&self) -> Point2 {
        Point2::of(self.x, self.y)
    }
}

/// Configuration for [`detect_edgels`]
#[derive(Debug, Clone, PartialEq)]
pub struct EdgelParams {
    /// Minimum kernel response on the red channel (<= [`MAX_CHANNEL_THRESHOLD`])
    pub threshold_red: i32,
    /// Minimum kernel response on the green channel
    pub threshold_green: i32,
    /// Minimum kernel response on the blue channel
    pub threshold_blue: i32,
    /// Distance between vertical (column) scanlines, in pixels
    pub v_scan_stride: i32,
    /// Distance between horizontal (row) scanlines, in pixels
    pub h_scan_stride: i32,
}

impl Default for EdgelParams {
    fn default() -> Self {
        Self {
            threshold_red: 256,
            threshold_green: 256,
            threshold_blue: 256,
            v_scan_stride: 5,
            h_scan_stride: 5,
        }
    }
}

/// Detect edgels along scanlines, per region.
///
/// Regions are independent; they fan out over the ambient rayon pool.
pub fn detect_edgels(container: &mut Container, params: &EdgelParams) -> Result<(), DetectError> {
    if params.v_scan_stride <= 0 {
        return Err(DetectError::BadScanStride {
            actual: params.v_scan_stride,
        });
    }
    if params.h_scan_stride <= 0 {
        return Err(DetectError::BadScanStride {
            actual: params.h_scan_stride,
        });
    }
    for threshold in [
        params.threshold_red,
        params.threshold_green,
        params.threshold_blue,
    ] {
        if threshold > MAX_CHANNEL_THRESHOLD {
            return Err(DetectError::ChannelThresholdTooLarge {
                actual: threshold,
                maximum: MAX_CHANNEL_THRESHOLD,
            });
        }
    }

    let edgels: HashMap<RegionId, Vec<Edgel>> = {
        let regions = container.require_regions()?;
        let img = container.image();
        regions
            .par_iter()
            .map(|(id, region)| (*id, detect_in_region(img, region, params)))
            .collect()
    };

    container.set_edgels(edgels);
    Ok(())
}

/// All edgels of one region, from column scans then row scans.
pub(crate) fn detect_in_region(
    img: &ImageRGB8,
    region: &Region,
    params: &EdgelParams,
) -> Vec<Edgel> {
    let mut edgels = Vec::new();
    let frame = KERNEL_FRAME as i32;

    // columns: x fixed, y varies; crossings are horizontal edges
    let upper = region.x + region.width;
    let mut x = region.x;
    while x < upper {
        let y0 = region.y - frame;
        let len = region.height as usize + 2 * KERNEL_FRAME;
        let scan: Vec<[u8; 3]> = (0..len)
            .map(|j| img[(x as usize, (y0 + j as i32) as usize)])
            .collect();

        for pos in scanline_positions(&scan, params) {
            let (ex, ey) = (x, y0 + pos as i32);
            if let Some(dir) = sobel_direction(img, ex, ey) {
                edgels.push(Edgel {
                    x: ex,
                    y: ey,
                    dir,
                    orientation: EdgelOrientation::Horizontal,
                });
            }
        }
        x += params.v_scan_stride;
    }

    // rows: y fixed, x varies; crossings are vertical edges
    let upper = region.y + region.height;
    let mut y = region.y;
    while y < upper {
        let x0 = region.x - frame;
        let len = region.width as usize + 2 * KERNEL_FRAME;
        let scan: Vec<[u8; 3]> = (0..len)
            .map(|i| img[((x0 + i as i32) as usize, y as usize)])
            .collect();

        for pos in scanline_positions(&scan, params) {
            let (ex, ey) = (x0 + pos as i32, y);
            if let Some(dir) = sobel_direction(img, ex, ey) {
                edgels.push(Edgel {
                    x: ex,
                    y: ey,
                    dir,
                    orientation: EdgelOrientation::Vertical,
                });
            }
        }
        y += params.h_scan_stride;
    }

    edgels
}

/// Positions of edgels within one scanline.
///
/// A position qualifies only when all three channel responses clear their
/// thresholds; among consecutive qualifying positions, strict local maxima
/// of the red response survive. Positions within [`KERNEL_FRAME`] of either
/// end are never evaluated.
fn scanline_positions(scan: &[[u8; 3]], params: &EdgelParams) -> Vec<usize> {
    let mut found = Vec::new();

    let mut prev2: i32;
    let mut prev1 = 0i32;
    let mut current = 0i32;
    for i in KERNEL_FRAME..scan.len().saturating_sub(KERNEL_FRAME) {
        prev2 = prev1;
        prev1 = current;
        current = 0;

        let red = kernel_response(scan, i, 0);
        if red < params.threshold_red {
            // Not edge for red channel
            continue;
        }

        let green = kernel_response(scan, i, 1);
        if green < params.threshold_green {
            continue;
        }

        let blue = kernel_response(scan, i, 2);
        if blue < params.threshold_blue {
            continue;
        }

        // check for local maxima
        current = red;
        if prev1 > 0 && prev1 >= prev2 && prev1 > current {
            found.push(i - 1);
        }
    }

    found
}

/// Absolute kernel response for one channel at `pos`.
#[inline]
fn kernel_response(scan: &[[u8; 3]], pos: usize, channel: usize) -> i32 {
    let mut output = 0;
    output += scan[pos - 2][channel] as i32 * GAUSS_KERNEL[0];
    output += scan[pos - 1][channel] as i32 * GAUSS_KERNEL[1];
    output += scan[pos + 1][channel] as i32 * GAUSS_KERNEL[3];
    output += scan[pos + 2][channel] as i32 * GAUSS_KERNEL[4];

    output.abs()
}

/// Axis a 5-pixel evidence window runs along.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WindowAxis {
    X,
    Y,
}

/// Red-channel kernel response over a 5-pixel window centered at `(x, y)`.
///
/// `None` when the window leaves the raster: no evidence.
pub(crate) fn window_response(
    img: &ImageRGB8,
    x: i32,
    y: i32,
    axis: WindowAxis,
) -> Option<i32> {
    let mut window = [[0u8; 3]; GAUSS_KERNEL.len()];
    for (j, slot) in window.iter_mut().enumerate() {
        let off = j as i32 - KERNEL_FRAME as i32;
        *slot = *match axis {
            WindowAxis::X => img.get(x + off, y),
            WindowAxis::Y => img.get(x, y + off),
        }?;
    }
    Some(kernel_response(&window, KERNEL_FRAME, 0))
}

/// Unit gradient direction from the 3x3 red-channel Sobel pair at `(x, y)`.
///
/// `None` when the neighborhood leaves the raster or the gradient is zero
/// (flat patch): both are treated as "no direction here".
pub(crate) fn sobel_direction(img: &ImageRGB8, x: i32, y: i32) -> Option<Vec2> {
    let mut a = [0i32; 9];
    for j in 0..3 {
        for i in 0..3 {
            a[j * 3 + i] = img.get(x - 1 + i as i32, y - 1 + j as i32)?[0] as i32;
        }
    }

    let gx = a[0] - a[2] + 2 * a[3] - 2 * a[5] + a[6] - a[8];
    let gy = a[0] + 2 * a[1] + a[2] - a[6] - 2 * a[7] - a[8];

    Vec2::of(gx as f32, gy as f32).try_norm()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::regions::{split_regions, RegionParams};

    /// Black left of `column`, white from `column` on.
    pub(crate) fn vertical_edge_image(width: usize, height: usize, column: usize) -> ImageRGB8 {
        let mut im = ImageRGB8::create(width, height);
        for y in 0..height {
            for x in column..width {
                im[(x, y)] = [255, 255, 255];
            }
        }
        im
    }

    #[test]
    fn test_kernel_response() {
        // step edge: 0 0 255 255 255 -> |5*255 + 3*255| at the step
        let scan: Vec<[u8; 3]> = [0u8, 0, 255, 255, 255]
            .into_iter()
            .map(|v| [v; 3])
            .collect();
        assert_eq!(kernel_response(&scan, 2, 0), 2040);

        // flat line has zero response
        let flat = vec![[128u8; 3]; 5];
        assert_eq!(kernel_response(&flat, 2, 0), 0);
    }

    #[test]
    fn test_vertical_edge_scanline() {
        let img = vertical_edge_image(100, 60, 50);
        let mut container = Container::new(img);
        split_regions(&mut container, &RegionParams::default()).unwrap();
        detect_edgels(&mut container, &EdgelParams::default()).unwrap();

        let vertical: Vec<Edgel> = container
            .edgels()
            .unwrap()
            .values()
            .flatten()
            .filter(|e| e.orientation == EdgelOrientation::Vertical)
            .copied()
            .collect();

        // the middle column of regions scans 12 rows in total (8 + 4)
        assert_eq!(vertical.len(), 12);
        for e in &vertical {
            assert_eq!(e.x, 50);
            assert!(e.dir.x().abs() > 0.99, "direction {:?}", e.dir);
            assert!(e.dir.y().abs() < 0.01, "direction {:?}", e.dir);
        }

        // a column scan runs along the edge and sees a flat profile
        let horizontal = container
            .edgels()
            .unwrap()
            .values()
            .flatten()
            .filter(|e| e.orientation == EdgelOrientation::Horizontal)
            .count();
        assert_eq!(horizontal, 0);
    }

    #[test]
    fn test_rejects_bad_params() {
        let img = vertical_edge_image(60, 60, 30);
        let mut container = Container::new(img);
        split_regions(&mut container, &RegionParams::default()).unwrap();

        let bad_stride = EdgelParams {
            h_scan_stride: 0,
            ..Default::default()
        };
        assert!(matches!(
            detect_edgels(&mut container, &bad_stride),
            Err(DetectError::BadScanStride { .. })
        ));

        let bad_threshold = EdgelParams {
            threshold_green: MAX_CHANNEL_THRESHOLD + 1,
            ..Default::default()
        };
        assert!(matches!(
            detect_edgels(&mut container, &bad_threshold),
            Err(DetectError::ChannelThresholdTooLarge { .. })
        ));
    }

    #[test]
    fn test_requires_regions() {
        let img = vertical_edge_image(60, 60, 30);
        let mut container = Container::new(img);
        assert!(matches!(
            detect_edgels(&mut container, &EdgelParams::default()),
            Err(DetectError::MissingStage { .. })
        ));
    }

    #[test]
    fn test_sobel_direction_flat_patch() {
        let img = ImageRGB8::create(10, 10);
        assert_eq!(sobel_direction(&img, 5, 5), None);
    }

    #[test]
    fn test_sobel_direction_out_of_bounds() {
        let img = vertical_edge_image(10, 10, 5);
        assert_eq!(sobel_direction(&img, 0, 0), None);
        assert!(sobel_direction(&img, 5, 5).is_some());
    }
}
