//! Polygon triangulation by ear clipping.
//!
//! Holes are first bridged into the outer contour, turning a polygon with
//! holes into a single weakly-simple polygon, which is then clipped ear by
//! ear. Intended for glyph-sized inputs (tens to a few hundred points).

pub type Point2 = [f32; 2];

const EPSILON: f32 = 1e-7;

/// Twice the signed area; positive for counter-clockwise contours
pub fn signed_area(contour: &[Point2]) -> f32 {
    let n = contour.len();
    (0..n)
        .map(|i| {
            let a = contour[i];
            let b = contour[(i + 1) % n];
            a[0] * b[1] - b[0] * a[1]
        })
        .sum::<f32>()
        * 0.5
}

/// Even-odd point in polygon test
pub fn point_in_polygon(p: Point2, polygon: &[Point2]) -> bool {
    let mut inside = false;
    let n = polygon.len();
    let mut j = n.wrapping_sub(1);
    for i in 0..n {
        let (a, b) = (polygon[i], polygon[j]);
        if (a[1] > p[1]) != (b[1] > p[1]) {
            let x = (b[0] - a[0]) * (p[1] - a[1]) / (b[1] - a[1]) + a[0];
            if p[0] < x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

fn cross(o: Point2, a: Point2, b: Point2) -> f32 {
    (a[0] - o[0]) * (b[1] - o[1]) - (a[1] - o[1]) * (b[0] - o[0])
}

fn point_in_triangle(p: Point2, a: Point2, b: Point2, c: Point2) -> bool {
    cross(a, b, p) >= -EPSILON && cross(b, c, p) >= -EPSILON && cross(c, a, p) >= -EPSILON
}

/// Triangulates `outer` with optional `holes`.
///
/// Returned indices address the concatenation `outer ++ holes[0] ++ holes[1] ...`.
/// Triangles are counter-clockwise regardless of the input winding.
pub fn triangulate(outer: &[Point2], holes: &[Vec<Point2>]) -> Vec<[usize; 3]> {
    let mut points: Vec<Point2> = outer.to_vec();
    let mut polygon = oriented_indices(0, outer, true);

    let mut hole_rings: Vec<Vec<usize>> = Vec::with_capacity(holes.len());
    for hole in holes {
        let ring = oriented_indices(points.len(), hole, false);
        points.extend_from_slice(hole);
        if ring.len() >= 3 {
            hole_rings.push(ring);
        }
    }

    if polygon.len() < 3 {
        return Vec::new();
    }

    // Bridge the rightmost holes first so later bridges never cross earlier ones
    hole_rings.sort_by(|a, b| {
        let max_x = |ring: &Vec<usize>| {
            ring.iter()
                .map(|&i| points[i][0])
                .fold(f32::NEG_INFINITY, f32::max)
        };
        max_x(b).total_cmp(&max_x(a))
    });
    for ring in &hole_rings {
        if let Some(merged) = bridge_hole(&points, &polygon, ring) {
            polygon = merged;
        } else {
            log::debug!("hole with {} points is not inside its contour, skipped", ring.len());
        }
    }

    clip_ears(&points, polygon)
}

/// Indices of `contour` offset by `base`, deduplicated and oriented
fn oriented_indices(base: usize, contour: &[Point2], ccw: bool) -> Vec<usize> {
    let mut indices: Vec<usize> = Vec::with_capacity(contour.len());
    for (i, p) in contour.iter().enumerate() {
        if let Some(&last) = indices.last() {
            if contour[last - base] == *p {
                continue;
            }
        }
        indices.push(base + i);
    }
    while indices.len() > 1 && contour[indices[0] - base] == contour[indices[indices.len() - 1] - base] {
        indices.pop();
    }

    let ring: Vec<Point2> = indices.iter().map(|&i| contour[i - base]).collect();
    if (signed_area(&ring) > 0.0) != ccw {
        indices.reverse();
    }
    indices
}

/// Splices `hole` into `polygon` through a mutually visible vertex pair
fn bridge_hole(points: &[Point2], polygon: &[usize], hole: &[usize]) -> Option<Vec<usize>> {
    let (hole_start, &m_idx) = hole
        .iter()
        .enumerate()
        .max_by(|a, b| points[*a.1][0].total_cmp(&points[*b.1][0]))?;
    let m = points[m_idx];

    // Nearest edge hit by a ray cast from M towards +x
    let mut best: Option<(f32, usize)> = None;
    let n = polygon.len();
    for i in 0..n {
        let a = points[polygon[i]];
        let b = points[polygon[(i + 1) % n]];
        if (a[1] > m[1]) == (b[1] > m[1]) && a[1] != m[1] {
            continue;
        }
        if a[1] == b[1] {
            // horizontal edge on the ray: take its nearer endpoint directly
            if a[1] == m[1] {
                for (k, p) in [(i, a), ((i + 1) % n, b)] {
                    if p[0] >= m[0] && best.map_or(true, |(x, _)| p[0] < x) {
                        best = Some((p[0], k));
                    }
                }
            }
            continue;
        }
        let x = a[0] + (m[1] - a[1]) * (b[0] - a[0]) / (b[1] - a[1]);
        if x >= m[0] && best.map_or(true, |(bx, _)| x < bx) {
            let candidate = if a[0] >= b[0] { i } else { (i + 1) % n };
            best = Some((x, candidate));
        }
    }
    let (hit_x, mut bridge) = best?;
    let hit = [hit_x, m[1]];
    let p = points[polygon[bridge]];

    // A vertex inside triangle (M, hit, P) would block visibility; take the
    // one making the smallest angle with the ray instead
    if p != hit {
        let mut best_angle = f32::INFINITY;
        for (k, &vi) in polygon.iter().enumerate() {
            let v = points[vi];
            if v == p || v[0] < m[0] {
                continue;
            }
            let (tri_a, tri_b, tri_c) = if p[1] < m[1] { (m, p, hit) } else { (m, hit, p) };
            if point_in_triangle(v, tri_a, tri_b, tri_c) {
                let angle = ((v[1] - m[1]).abs()).atan2(v[0] - m[0]);
                if angle < best_angle {
                    best_angle = angle;
                    bridge = k;
                }
            }
        }
    }

    let mut merged = Vec::with_capacity(polygon.len() + hole.len() + 2);
    merged.extend_from_slice(&polygon[..=bridge]);
    merged.extend_from_slice(&hole[hole_start..]);
    merged.extend_from_slice(&hole[..=hole_start]);
    merged.extend_from_slice(&polygon[bridge..]);
    Some(merged)
}

fn clip_ears(points: &[Point2], mut polygon: Vec<usize>) -> Vec<[usize; 3]> {
    let mut triangles = Vec::with_capacity(polygon.len().saturating_sub(2));
    let mut i = 0;
    let mut stalled = 0;

    while polygon.len() > 3 {
        let n = polygon.len();
        let (prev, cur, next) = (polygon[(i + n - 1) % n], polygon[i % n], polygon[(i + 1) % n]);
        let (a, b, c) = (points[prev], points[cur], points[next]);
        let turn = cross(a, b, c);

        let is_ear = turn > EPSILON
            && !polygon.iter().any(|&vi| {
                let v = points[vi];
                v != a && v != b && v != c && point_in_triangle(v, a, b, c)
            });

        if is_ear {
            triangles.push([prev, cur, next]);
            polygon.remove(i % n);
            stalled = 0;
        } else if stalled >= n {
            // No clean ear left (self-touching input). Drop a degenerate
            // vertex if there is one, otherwise force the current corner.
            if turn.abs() <= EPSILON {
                polygon.remove(i % n);
            } else {
                triangles.push([prev, cur, next]);
                polygon.remove(i % n);
            }
            stalled = 0;
        } else {
            i += 1;
            stalled += 1;
        }
        if !polygon.is_empty() {
            i %= polygon.len();
        }
    }

    if polygon.len() == 3 && cross(points[polygon[0]], points[polygon[1]], points[polygon[2]]).abs() > EPSILON {
        triangles.push([polygon[0], polygon[1], polygon[2]]);
    }
    triangles
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle_area_sum(points: &[Point2], triangles: &[[usize; 3]]) -> f32 {
        triangles
            .iter()
            .map(|t| cross(points[t[0]], points[t[1]], points[t[2]]) * 0.5)
            .sum()
    }

    fn square(min: f32, max: f32) -> Vec<Point2> {
        vec![[min, min], [max, min], [max, max], [min, max]]
    }

    #[test]
    fn test_square() {
        let outer = square(0.0, 2.0);
        let triangles = triangulate(&outer, &[]);
        assert_eq!(triangles.len(), 2);
        assert!((triangle_area_sum(&outer, &triangles) - 4.0).abs() < 1e-5);
    }

    #[test]
    fn test_clockwise_input_yields_ccw_triangles() {
        let mut outer = square(0.0, 1.0);
        outer.reverse();
        let triangles = triangulate(&outer, &[]);
        for t in &triangles {
            assert!(cross(outer[t[0]], outer[t[1]], outer[t[2]]) > 0.0);
        }
    }

    #[test]
    fn test_square_with_hole() {
        let outer = square(0.0, 4.0);
        let hole = square(1.0, 3.0);
        let triangles = triangulate(&outer, &[hole.clone()]);

        // N + 2h - 2 with N = 8 total points and h = 1 hole
        assert_eq!(triangles.len(), 8);

        let mut all = outer.clone();
        all.extend_from_slice(&hole);
        assert!((triangle_area_sum(&all, &triangles) - 12.0).abs() < 1e-4);
    }

    #[test]
    fn test_concave_polygon() {
        // An "L" shape
        let outer = vec![[0.0, 0.0], [3.0, 0.0], [3.0, 1.0], [1.0, 1.0], [1.0, 3.0], [0.0, 3.0]];
        let triangles = triangulate(&outer, &[]);
        assert_eq!(triangles.len(), 4);
        assert!((triangle_area_sum(&outer, &triangles) - 5.0).abs() < 1e-5);
    }

    #[test]
    fn test_two_holes() {
        let outer = vec![[0.0, 0.0], [10.0, 0.0], [10.0, 4.0], [0.0, 4.0]];
        let left = vec![[1.0, 1.0], [1.0, 3.0], [3.0, 3.0], [3.0, 1.0]];
        let right = vec![[6.0, 1.0], [6.0, 3.0], [8.0, 3.0], [8.0, 1.0]];
        let triangles = triangulate(&outer, &[left.clone(), right.clone()]);
        assert_eq!(triangles.len(), 4 + 8 + 4 - 2);

        let mut all = outer.clone();
        all.extend_from_slice(&left);
        all.extend_from_slice(&right);
        assert!((triangle_area_sum(&all, &triangles) - 32.0).abs() < 1e-3);
    }

    #[test]
    fn test_duplicate_closing_point_is_ignored() {
        let mut outer = square(0.0, 1.0);
        outer.push([0.0, 0.0]);
        assert_eq!(triangulate(&outer, &[]).len(), 2);
    }

    #[test]
    fn test_point_in_polygon() {
        let poly = square(0.0, 2.0);
        assert!(point_in_polygon([1.0, 1.0], &poly));
        assert!(!point_in_polygon([3.0, 1.0], &poly));
    }
}
