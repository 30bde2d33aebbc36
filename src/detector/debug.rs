//! Overlay dumps of each stage's artifact, for eyeballing a detection run.
#![cfg(feature = "debug")]

use std::io;
use std::path::Path;

use crate::container::Container;
use crate::edgels::EdgelOrientation;
use crate::util::math::Point2;

const RED: [u8; 3] = [255, 0, 0];
const GREEN: [u8; 3] = [0, 255, 0];
const BLUE: [u8; 3] = [0, 0, 255];
const YELLOW: [u8; 3] = [255, 255, 0];
const GRID: [u8; 3] = [235, 230, 205];

pub(super) fn debug_regions(path: &Path, container: &Container) -> io::Result<()> {
    let mut img = container.image().clone();
    if let Some(regions) = container.regions() {
        for region in regions.values() {
            let (x0, y0) = (region.x, region.y);
            let (x1, y1) = (region.x + region.width - 1, region.y + region.height - 1);
            img.draw_line(Point2::of(x0, y0), Point2::of(x1, y0), GRID);
            img.draw_line(Point2::of(x0, y0), Point2::of(x0, y1), GRID);
        }
    }
    img.write_pnm(path)
}

pub(super) fn debug_edgels(path: &Path, container: &Container) -> io::Result<()> {
    let mut img = container.image().clone();
    if let Some(edgels) = container.edgels() {
        for edgel in edgels.values().flatten() {
            let color = match edgel.orientation {
                EdgelOrientation::Vertical => RED,
                EdgelOrientation::Horizontal => GREEN,
            };
            img.draw_line(
                Point2::of(edgel.x, edgel.y - 1),
                Point2::of(edgel.x, edgel.y + 1),
                color,
            );
            img.draw_line(
                Point2::of(edgel.x - 1, edgel.y),
                Point2::of(edgel.x + 1, edgel.y),
                color,
            );
        }
    }
    img.write_pnm(path)
}

pub(super) fn debug_segments<'a>(
    path: &Path,
    container: &Container,
    segments: impl Iterator<Item = &'a crate::segments::LineSegment>,
) -> io::Result<()> {
    let mut img = container.image().clone();
    for seg in segments {
        img.draw_line(seg.start.point(), seg.end.point(), RED);
    }
    img.write_pnm(path)
}

pub(super) fn debug_chains(path: &Path, container: &Container) -> io::Result<()> {
    let mut img = container.image().clone();
    if let Some(chains) = container.chains() {
        for chain in chains {
            for seg in chain.segments() {
                img.draw_line(seg.start.point(), seg.end.point(), BLUE);
            }
        }
    }
    img.write_pnm(path)
}

pub(super) fn debug_quadrangles(path: &Path, container: &Container) -> io::Result<()> {
    let mut img = container.image().clone();
    if let Some(quadrangles) = container.quadrangles() {
        for q in quadrangles {
            img.draw_line(q.p1, q.p2, YELLOW);
            img.draw_line(q.p2, q.p3, YELLOW);
            img.draw_line(q.p3, q.p4, YELLOW);
            img.draw_line(q.p4, q.p1, YELLOW);
        }
    }
    img.write_pnm(path)
}
