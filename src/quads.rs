use crate::chains::Chain;
use crate::container::Container;
use crate::detector::DetectError;
use crate::segments::LineSegment;
use crate::util::math::Point2;

/// Four corner points in consistent winding order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Quadrangle {
    pub p1: Point2,
    pub p2: Point2,
    pub p3: Point2,
    pub p4: Point2,
}

impl Quadrangle {
    pub fn corners(&self) -> [Point2; 4] {
        [self.p1, self.p2, self.p3, self.p4]
    }
}

/// Compute each chain's corner points by intersecting consecutive lines.
///
/// A 3-segment chain borrows its two open ends as the missing corners. Any
/// parallel intersection discards the whole chain; degenerate quadrangles
/// are never emitted.
pub fn extract_quadrangles(container: &mut Container) -> Result<(), DetectError> {
    let quadrangles: Vec<Quadrangle> = {
        let chains = container.require_chains()?;
        chains.iter().filter_map(quadrangle_of).collect()
    };

    container.set_quadrangles(quadrangles);
    Ok(())
}

fn quadrangle_of(chain: &Chain) -> Option<Quadrangle> {
    let segments = chain.segments();
    let l1 = &segments[0];
    let l2 = &segments[1];
    let l3 = &segments[2];
    let l4 = segments.get(3);

    let p1 = intersection(l1, l2)?;
    let p2 = intersection(l2, l3)?;
    let (p3, p4) = match l4 {
        Some(l4) => (intersection(l3, l4)?, intersection(l4, l1)?),
        // the chain's two open ends stand in for the missing corners
        None => (l3.end.point(), l1.start.point()),
    };

    Some(Quadrangle { p1, p2, p3, p4 })
}

/// Intersection of the infinite lines through both segments' endpoints.
///
/// Determinant form over the integer endpoints; an exactly-zero determinant
/// means parallel lines. The quotients truncate toward zero, matching the
/// integer corner coordinates downstream consumers expect; the sub-pixel
/// bias this introduces is deliberate.
pub(crate) fn intersection(a: &LineSegment, b: &LineSegment) -> Option<Point2> {
    let (x1, y1) = (a.start.x as i64, a.start.y as i64);
    let (x2, y2) = (a.end.x as i64, a.end.y as i64);
    let (x3, y3) = (b.start.x as i64, b.start.y as i64);
    let (x4, y4) = (b.end.x as i64, b.end.y as i64);

    let d = ((x1 - x2) * (y3 - y4) - (y1 - y2) * (x3 - x4)) as f64;
    if d == 0. {
        return None;
    }

    let cross_a = x1 * y2 - y1 * x2;
    let cross_b = x3 * y4 - y3 * x4;
    let xi = (((x3 - x4) * cross_a - (x1 - x2) * cross_b) as f64 / d) as i32;
    let yi = (((y3 - y4) * cross_a - (y1 - y2) * cross_b) as f64 / d) as i32;

    Some(Point2::of(xi, yi))
}
