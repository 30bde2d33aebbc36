use hashbrown::HashMap;

use crate::container::Container;
use crate::detector::DetectError;

/// Regions are numbered in grid order (column-major, top to bottom).
pub type RegionId = u32;

/// Minimum margin kept clear on every image side.
///
/// Scanline extraction and the 3x3 gradient probes read up to two pixels
/// past a region edge, so anything smaller would walk off the raster.
pub const MIN_INSET: i32 = 2;

/// Axis-aligned tile of the image; bounds edgel search, owns no pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub id: RegionId,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// Per-side margins excluded from all scanning and growth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Insets {
    pub top: i32,
    pub left: i32,
    pub bottom: i32,
    pub right: i32,
}

impl Insets {
    pub const fn uniform(v: i32) -> Self {
        Self {
            top: v,
            left: v,
            bottom: v,
            right: v,
        }
    }
}

impl Default for Insets {
    fn default() -> Self {
        Self::uniform(MIN_INSET)
    }
}

/// Configuration for [`split_regions`]
#[derive(Debug, Clone, PartialEq)]
pub struct RegionParams {
    /// Region tile width, in pixels
    pub width: i32,
    /// Region tile height, in pixels
    pub height: i32,
    /// Margins excluded from processing (each at least [`MIN_INSET`])
    pub insets: Insets,
}

impl Default for RegionParams {
    fn default() -> Self {
        Self {
            width: 40,
            height: 40,
            insets: Insets::default(),
        }
    }
}

/// Tile the usable image area (inside the insets) into regions.
///
/// Every in-bounds pixel lands in exactly one region; tiles on the right and
/// bottom edges shrink to fit.
pub fn split_regions(container: &mut Container, params: &RegionParams) -> Result<(), DetectError> {
    if params.width <= 0 || params.height <= 0 {
        return Err(DetectError::BadRegionSize {
            width: params.width,
            height: params.height,
        });
    }

    let insets = params.insets;
    for inset in [insets.top, insets.left, insets.bottom, insets.right] {
        if inset < MIN_INSET {
            return Err(DetectError::InsetTooSmall {
                actual: inset,
                minimum: MIN_INSET,
            });
        }
    }

    let img = container.image();
    let x_limit = img.width as i32 - insets.right;
    let y_limit = img.height as i32 - insets.bottom;
    if insets.left >= x_limit || insets.top >= y_limit {
        return Err(DetectError::ImageTooSmall {
            width: img.width,
            height: img.height,
        });
    }

    let mut regions = HashMap::new();
    let mut id: RegionId = 0;
    let mut x = insets.left;
    while x < x_limit {
        let mut y = insets.top;
        while y < y_limit {
            let region = Region {
                id,
                x,
                y,
                width: i32::min(params.width, x_limit - x),
                height: i32::min(params.height, y_limit - y),
            };
            regions.insert(id, region);
            id += 1;
            y += params.height;
        }
        x += params.width;
    }

    container.set_regions(regions, insets);
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::util::ImageRGB8;

    #[test]
    fn test_full_tiling() {
        let im = ImageRGB8::create(100, 90);
        let mut container = Container::new(im);
        split_regions(&mut container, &RegionParams::default()).unwrap();

        let regions = container.regions().unwrap();

        // every usable pixel belongs to exactly one region
        for x in 2..98i32 {
            for y in 2..88i32 {
                let owners = regions
                    .values()
                    .filter(|r| {
                        x >= r.x && x < r.x + r.width && y >= r.y && y < r.y + r.height
                    })
                    .count();
                assert_eq!(owners, 1, "pixel ({x}, {y}) owned by {owners} regions");
            }
        }
    }

    #[test]
    fn test_edge_tiles_shrink() {
        let im = ImageRGB8::create(100, 90);
        let mut container = Container::new(im);
        split_regions(&mut container, &RegionParams::default()).unwrap();

        let regions = container.regions().unwrap();
        assert!(regions
            .values()
            .all(|r| r.width <= 40 && r.height <= 40 && r.width > 0 && r.height > 0));
        // 96x86 usable -> 3x3 grid
        assert_eq!(regions.len(), 9);
    }

    #[test]
    fn test_rejects_bad_config() {
        let im = ImageRGB8::create(100, 90);
        let mut container = Container::new(im);

        let bad_size = RegionParams {
            width: 0,
            ..Default::default()
        };
        assert!(matches!(
            split_regions(&mut container, &bad_size),
            Err(DetectError::BadRegionSize { .. })
        ));

        let bad_inset = RegionParams {
            insets: Insets::uniform(1),
            ..Default::default()
        };
        assert!(matches!(
            split_regions(&mut container, &bad_inset),
            Err(DetectError::InsetTooSmall { .. })
        ));
    }

    #[test]
    fn test_image_smaller_than_insets() {
        let im = ImageRGB8::create(4, 4);
        let mut container = Container::new(im);
        let params = RegionParams {
            insets: Insets::uniform(2),
            ..Default::default()
        };
        assert!(matches!(
            split_regions(&mut container, &params),
            Err(DetectError::ImageTooSmall { .. })
        ));
    }
}
