//! Extruded glyph meshes.
//!
//! A [`GlyphSource`] turns a character into flattened 2D contours; the
//! functions here sort those contours into solid shapes with holes,
//! triangulate the caps and sweep the side walls through a rounded bevel.

use std::{
    collections::HashMap,
    f32::consts::FRAC_PI_2,
    sync::{Arc, Mutex},
};

use super::triangulate::{point_in_polygon, signed_area, triangulate, Point2};
use super::GeometryData;

/// Parameters of an extruded glyph, in world units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextGeometryOptions {
    /// Em size of the font
    pub size: f32,
    /// Extrusion depth along +Z, not counting the bevel
    pub depth: f32,
    /// Line segments per quadratic or cubic curve
    pub curve_segments: u32,
    pub bevel_enabled: bool,
    pub bevel_thickness: f32,
    pub bevel_size: f32,
    pub bevel_offset: f32,
    pub bevel_segments: u32,
}

impl Default for TextGeometryOptions {
    fn default() -> Self {
        Self {
            size: 3.5,
            depth: 0.6,
            curve_segments: 6,
            bevel_enabled: true,
            bevel_thickness: 0.08,
            bevel_size: 0.08,
            bevel_offset: 0.0,
            bevel_segments: 3,
        }
    }
}

/// Closed contours of a single glyph, scaled to world units
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GlyphOutline {
    pub contours: Vec<Vec<Point2>>,
}

impl GlyphOutline {
    pub fn is_empty(&self) -> bool {
        self.contours.iter().all(|c| c.len() < 3)
    }

    pub fn scaled(&self, scale: f32) -> GlyphOutline {
        GlyphOutline {
            contours: self
                .contours
                .iter()
                .map(|contour| contour.iter().map(|&[x, y]| [x * scale, y * scale]).collect())
                .collect(),
        }
    }
}

/// Anything able to produce glyph outlines
pub trait GlyphSource: Send + Sync {
    /// Outline of `ch` at em size `size`, curves flattened into `curve_segments` lines.
    /// Characters without a glyph yield an empty outline.
    fn glyph_outline(&self, ch: char, size: f32, curve_segments: u32) -> GlyphOutline;
}

/// Flattened outlines in font units, keyed by character and curve segments
#[derive(Debug, Default)]
struct OutlineCache {
    outlines: Mutex<HashMap<(char, u32), Arc<GlyphOutline>>>,
}

impl OutlineCache {
    fn get_or_extract(&self, key: (char, u32), extract: impl FnOnce() -> GlyphOutline) -> Arc<GlyphOutline> {
        let mut outlines = match self.outlines.lock() {
            Ok(outlines) => outlines,
            Err(poisoned) => poisoned.into_inner(),
        };
        let outline = outlines.entry(key).or_insert_with(|| Arc::new(extract()));
        Arc::clone(outline)
    }

    fn len(&self) -> usize {
        match self.outlines.lock() {
            Ok(outlines) => outlines.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }
}

/// A TrueType/OpenType font. The face tables are only read the first time a
/// character is requested; later rebuilds reuse the cached outline.
pub struct Font {
    data: Vec<u8>,
    units_per_em: f32,
    cache: OutlineCache,
}

impl Font {
    pub fn from_bytes(data: Vec<u8>) -> Result<Self, ttf_parser::FaceParsingError> {
        let units_per_em = ttf_parser::Face::parse(&data, 0)?.units_per_em() as f32;
        Ok(Self {
            data,
            units_per_em,
            cache: OutlineCache::default(),
        })
    }

    pub fn units_per_em(&self) -> f32 {
        self.units_per_em
    }

    /// Number of distinct glyph outlines extracted so far
    pub fn cached_glyphs(&self) -> usize {
        self.cache.len()
    }

    fn extract(&self, ch: char, curve_segments: u32) -> GlyphOutline {
        // Parsed once in from_bytes, so this only fails on a corrupted buffer
        let Ok(face) = ttf_parser::Face::parse(&self.data, 0) else {
            return GlyphOutline::default();
        };
        let Some(glyph) = face.glyph_index(ch) else {
            log::debug!("font has no glyph for {:?}", ch);
            return GlyphOutline::default();
        };

        let mut collector = ContourCollector::new(1.0, curve_segments);
        face.outline_glyph(glyph, &mut collector);
        collector.finish()
    }
}

impl std::fmt::Debug for Font {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Font")
            .field("bytes", &self.data.len())
            .field("units_per_em", &self.units_per_em)
            .field("cached_glyphs", &self.cache.len())
            .finish()
    }
}

impl GlyphSource for Font {
    fn glyph_outline(&self, ch: char, size: f32, curve_segments: u32) -> GlyphOutline {
        let segments = curve_segments.max(1);
        let outline = self.cache.get_or_extract((ch, segments), || self.extract(ch, segments));
        outline.scaled(size / self.units_per_em)
    }
}

/// Flattens outline commands into polylines
struct ContourCollector {
    scale: f32,
    segments: u32,
    current: Vec<Point2>,
    contours: Vec<Vec<Point2>>,
}

impl ContourCollector {
    fn new(scale: f32, segments: u32) -> Self {
        Self {
            scale,
            segments,
            current: Vec::new(),
            contours: Vec::new(),
        }
    }

    fn last(&self) -> Point2 {
        self.current.last().copied().unwrap_or([0.0, 0.0])
    }

    fn push(&mut self, x: f32, y: f32) {
        self.current.push([x * self.scale, y * self.scale]);
    }

    fn flush(&mut self) {
        let mut contour = std::mem::take(&mut self.current);
        if contour.len() > 1 && contour.first() == contour.last() {
            contour.pop();
        }
        if contour.len() >= 3 {
            self.contours.push(contour);
        }
    }

    fn finish(mut self) -> GlyphOutline {
        self.flush();
        GlyphOutline {
            contours: self.contours,
        }
    }
}

impl ttf_parser::OutlineBuilder for ContourCollector {
    fn move_to(&mut self, x: f32, y: f32) {
        self.flush();
        self.push(x, y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.push(x, y);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        let p0 = self.last();
        let (c, p) = ([x1 * self.scale, y1 * self.scale], [x * self.scale, y * self.scale]);
        for i in 1..=self.segments {
            let t = i as f32 / self.segments as f32;
            let u = 1.0 - t;
            self.current.push([
                u * u * p0[0] + 2.0 * u * t * c[0] + t * t * p[0],
                u * u * p0[1] + 2.0 * u * t * c[1] + t * t * p[1],
            ]);
        }
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        let p0 = self.last();
        let c1 = [x1 * self.scale, y1 * self.scale];
        let c2 = [x2 * self.scale, y2 * self.scale];
        let p = [x * self.scale, y * self.scale];
        for i in 1..=self.segments {
            let t = i as f32 / self.segments as f32;
            let u = 1.0 - t;
            let (a, b, c, d) = (u * u * u, 3.0 * u * u * t, 3.0 * u * t * t, t * t * t);
            self.current.push([
                a * p0[0] + b * c1[0] + c * c2[0] + d * p[0],
                a * p0[1] + b * c1[1] + c * c2[1] + d * p[1],
            ]);
        }
    }

    fn close(&mut self) {
        self.flush();
    }
}

/// A solid region: counter-clockwise outer contour with clockwise holes
#[derive(Debug, Clone, PartialEq)]
pub struct GlyphShape {
    pub outer: Vec<Point2>,
    pub holes: Vec<Vec<Point2>>,
}

/// Groups contours into shapes by nesting depth.
///
/// A contour enclosed by an odd number of others is a hole of its tightest
/// enclosing outer contour, so fonts of either winding convention work.
pub fn classify_contours(contours: &[Vec<Point2>]) -> Vec<GlyphShape> {
    let contours: Vec<&Vec<Point2>> = contours.iter().filter(|c| c.len() >= 3).collect();
    let areas: Vec<f32> = contours.iter().map(|c| signed_area(c).abs()).collect();

    let containers: Vec<Vec<usize>> = contours
        .iter()
        .enumerate()
        .map(|(i, contour)| {
            (0..contours.len())
                .filter(|&j| j != i && areas[j] > areas[i] && point_in_polygon(contour[0], contours[j]))
                .collect()
        })
        .collect();

    let mut shapes: Vec<GlyphShape> = Vec::new();
    let mut shape_of: Vec<Option<usize>> = vec![None; contours.len()];
    for (i, contour) in contours.iter().enumerate() {
        if containers[i].len() % 2 == 0 {
            shape_of[i] = Some(shapes.len());
            shapes.push(GlyphShape {
                outer: with_winding(contour, true),
                holes: Vec::new(),
            });
        }
    }
    for (i, contour) in contours.iter().enumerate() {
        if containers[i].len() % 2 == 1 {
            let parent = containers[i]
                .iter()
                .filter(|&&j| shape_of[j].is_some())
                .min_by(|&&a, &&b| areas[a].total_cmp(&areas[b]));
            if let Some(shape) = parent.and_then(|&j| shape_of[j]) {
                shapes[shape].holes.push(with_winding(contour, false));
            }
        }
    }
    shapes
}

fn with_winding(contour: &[Point2], ccw: bool) -> Vec<Point2> {
    let mut out = contour.to_vec();
    if (signed_area(&out) > 0.0) != ccw {
        out.reverse();
    }
    out
}

/// Direction each ring vertex moves when the bevel grows by one unit
fn bevel_vectors(ring: &[Point2]) -> Vec<Point2> {
    let n = ring.len();
    let edge_normal = |a: Point2, b: Point2| -> Point2 {
        let (dx, dy) = (b[0] - a[0], b[1] - a[1]);
        let len = (dx * dx + dy * dy).sqrt();
        if len > f32::EPSILON {
            [dy / len, -dx / len]
        } else {
            [0.0, 0.0]
        }
    };

    (0..n)
        .map(|i| {
            let prev = ring[(i + n - 1) % n];
            let cur = ring[i];
            let next = ring[(i + 1) % n];
            let n0 = edge_normal(prev, cur);
            let n1 = edge_normal(cur, next);
            let sum = [n0[0] + n1[0], n0[1] + n1[1]];
            let len = (sum[0] * sum[0] + sum[1] * sum[1]).sqrt();
            if len < 1e-6 {
                return n0;
            }
            let dir = [sum[0] / len, sum[1] / len];
            // keep the offset edges parallel, clamped on spiky corners
            let cos = (dir[0] * n0[0] + dir[1] * n0[1]).max(0.5);
            [dir[0] / cos, dir[1] / cos]
        })
        .collect()
}

/// Z position and outward bevel offset of every ring layer, front to back
fn extrusion_layers(options: &TextGeometryOptions) -> Vec<(f32, f32)> {
    let mut layers = Vec::new();
    let segments = options.bevel_segments.max(1);
    let full = if options.bevel_enabled {
        options.bevel_size + options.bevel_offset
    } else {
        0.0
    };

    let bevel = |b: u32| {
        let t = b as f32 / segments as f32 * FRAC_PI_2;
        (
            options.bevel_thickness * t.cos(),
            options.bevel_size * t.sin() + options.bevel_offset,
        )
    };

    if options.bevel_enabled {
        for b in 0..segments {
            let (z, offset) = bevel(b);
            layers.push((-z, offset));
        }
    }
    layers.push((0.0, full));
    layers.push((options.depth, full));
    if options.bevel_enabled {
        for b in (0..segments).rev() {
            let (z, offset) = bevel(b);
            layers.push((options.depth + z, offset));
        }
    }
    layers
}

/// Builds the extruded mesh of one glyph outline
pub fn extrude_outline(outline: &GlyphOutline, options: &TextGeometryOptions) -> GeometryData {
    let mut geometry = GeometryData::new();
    let layers = extrusion_layers(options);
    let (front, back) = (layers[0], layers[layers.len() - 1]);

    for shape in classify_contours(&outline.contours) {
        let rings: Vec<&Vec<Point2>> = std::iter::once(&shape.outer).chain(shape.holes.iter()).collect();
        let vectors: Vec<Vec<Point2>> = rings.iter().map(|r| bevel_vectors(r)).collect();
        let at = |ring: usize, i: usize, (z, offset): (f32, f32)| -> [f32; 3] {
            let p = rings[ring][i];
            let v = vectors[ring][i];
            [p[0] + v[0] * offset, p[1] + v[1] * offset, z]
        };

        // caps
        let flat: Vec<(usize, usize)> = rings
            .iter()
            .enumerate()
            .flat_map(|(r, ring)| (0..ring.len()).map(move |i| (r, i)))
            .collect();
        for [i0, i1, i2] in triangulate(&shape.outer, &shape.holes) {
            let (a, b, c) = (flat[i0], flat[i1], flat[i2]);
            let uv = |p: [f32; 3]| [p[0], p[1]];

            let (fa, fb, fc) = (at(a.0, a.1, front), at(b.0, b.1, front), at(c.0, c.1, front));
            geometry.push_flat_triangle(fa, fc, fb, [uv(fa), uv(fc), uv(fb)]);

            let (ba, bb, bc) = (at(a.0, a.1, back), at(b.0, b.1, back), at(c.0, c.1, back));
            geometry.push_flat_triangle(ba, bb, bc, [uv(ba), uv(bb), uv(bc)]);
        }

        // side walls
        for (r, ring) in rings.iter().enumerate() {
            let n = ring.len();
            for layer in layers.windows(2) {
                let (near, far) = (layer[0], layer[1]);
                for i in 0..n {
                    let j = (i + 1) % n;
                    let (a0, b0) = (at(r, i, near), at(r, j, near));
                    let (a1, b1) = (at(r, i, far), at(r, j, far));
                    let run = ((b0[0] - a0[0]).powi(2) + (b0[1] - a0[1]).powi(2)).sqrt();
                    let uvs = [[0.0, a0[2]], [run, b0[2]], [run, b1[2]], [0.0, a1[2]]];
                    geometry.push_flat_triangle(a0, b0, b1, [uvs[0], uvs[1], uvs[2]]);
                    geometry.push_flat_triangle(a0, b1, a1, [uvs[0], uvs[2], uvs[3]]);
                }
            }
        }
    }
    geometry
}

/// Extruded mesh of `ch`, or an empty geometry when the glyph has no outline
pub fn glyph_geometry(source: &dyn GlyphSource, ch: char, options: &TextGeometryOptions) -> GeometryData {
    let outline = source.glyph_outline(ch, options.size, options.curve_segments);
    if outline.is_empty() {
        return GeometryData::new();
    }
    extrude_outline(&outline, options)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Block letters: every glyph is a unit square scaled to `size`, 'O' has a
    /// square hole, whitespace has no outline.
    pub(crate) struct BlockFont;

    impl GlyphSource for BlockFont {
        fn glyph_outline(&self, ch: char, size: f32, _curve_segments: u32) -> GlyphOutline {
            if ch.is_whitespace() {
                return GlyphOutline::default();
            }
            let square = |min: f32, max: f32| vec![[min, min], [max, min], [max, max], [min, max]];
            let mut contours = vec![square(0.0, size * 0.5)];
            if ch == 'O' {
                contours.push(square(size * 0.1, size * 0.4));
            }
            GlyphOutline { contours }
        }
    }

    fn no_bevel() -> TextGeometryOptions {
        TextGeometryOptions {
            bevel_enabled: false,
            ..Default::default()
        }
    }

    #[test]
    fn test_default_options() {
        let options = TextGeometryOptions::default();
        assert_eq!(options.size, 3.5);
        assert_eq!(options.depth, 0.6);
        assert_eq!(options.curve_segments, 6);
        assert_eq!(options.bevel_segments, 3);
    }

    #[test]
    fn test_classify_hole() {
        let outer = vec![[0.0, 0.0], [0.0, 4.0], [4.0, 4.0], [4.0, 0.0]];
        let hole = vec![[1.0, 1.0], [3.0, 1.0], [3.0, 3.0], [1.0, 3.0]];
        let shapes = classify_contours(&[hole, outer]);
        assert_eq!(shapes.len(), 1);
        assert_eq!(shapes[0].holes.len(), 1);
        assert!(signed_area(&shapes[0].outer) > 0.0);
        assert!(signed_area(&shapes[0].holes[0]) < 0.0);
    }

    #[test]
    fn test_classify_separate_shapes() {
        // Two dots of an umlaut
        let a = vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];
        let b = vec![[2.0, 0.0], [3.0, 0.0], [3.0, 1.0], [2.0, 1.0]];
        let shapes = classify_contours(&[a, b]);
        assert_eq!(shapes.len(), 2);
        assert!(shapes.iter().all(|s| s.holes.is_empty()));
    }

    #[test]
    fn test_extrusion_without_bevel() {
        let geometry = glyph_geometry(&BlockFont, 'I', &no_bevel());
        // two caps of 2 triangles and 4 side quads
        assert_eq!(geometry.triangle_count(), 4 + 8);
        let bounds = geometry.bounds();
        assert!((bounds.size().x - 1.75).abs() < 1e-5);
        assert!((bounds.min.z - 0.0).abs() < 1e-6);
        assert!((bounds.max.z - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_bevel_widens_and_thickens() {
        let options = TextGeometryOptions::default();
        let bounds = glyph_geometry(&BlockFont, 'I', &options).bounds();
        assert!(bounds.size().x > 1.75);
        assert!(bounds.size().x <= 1.75 + 2.0 * 0.08 * 2.0 + 1e-5);
        assert!((bounds.min.z + 0.08).abs() < 1e-5);
        assert!((bounds.max.z - 0.68).abs() < 1e-5);
    }

    #[test]
    fn test_hole_is_not_capped() {
        let solid = glyph_geometry(&BlockFont, 'I', &no_bevel());
        let ring = glyph_geometry(&BlockFont, 'O', &no_bevel());
        // caps: 8 triangles each side, walls: 8 quads
        assert_eq!(ring.triangle_count(), 16 + 16);
        assert!(ring.triangle_count() > solid.triangle_count());
    }

    #[test]
    fn test_side_normals_point_outward() {
        let geometry = glyph_geometry(&BlockFont, 'I', &no_bevel());
        let center = [0.875, 0.875];
        for (position, normal) in geometry.vertices.iter().zip(&geometry.normals) {
            if normal[2].abs() > 0.5 {
                continue;
            }
            let outward = (position[0] - center[0]) * normal[0] + (position[1] - center[1]) * normal[1];
            assert!(outward > 0.0);
        }
    }

    #[test]
    fn test_caps_face_away_from_each_other() {
        let geometry = glyph_geometry(&BlockFont, 'I', &no_bevel());
        for (position, normal) in geometry.vertices.iter().zip(&geometry.normals) {
            if position[2] == 0.0 && normal[2].abs() > 0.5 {
                assert!(normal[2] < 0.0);
            }
            if position[2] == 0.6 && normal[2].abs() > 0.5 {
                assert!(normal[2] > 0.0);
            }
        }
    }

    #[test]
    fn test_whitespace_is_empty() {
        let geometry = glyph_geometry(&BlockFont, ' ', &TextGeometryOptions::default());
        assert!(geometry.is_empty());
        assert_eq!(geometry.bounds().size().x, 0.0);
    }

    #[test]
    fn test_contour_collector_flattens_quads() {
        use ttf_parser::OutlineBuilder;

        let mut collector = ContourCollector::new(0.5, 4);
        collector.move_to(0.0, 0.0);
        collector.quad_to(2.0, 4.0, 4.0, 0.0);
        collector.line_to(0.0, 0.0);
        collector.close();
        let outline = collector.finish();

        assert_eq!(outline.contours.len(), 1);
        // start + 4 curve points, closing point dropped
        assert_eq!(outline.contours[0].len(), 5);
        assert_eq!(outline.contours[0][4], [2.0, 0.0]);
        assert_eq!(outline.contours[0][2], [1.0, 1.0]);
    }

    #[test]
    fn test_outline_cache_extracts_each_glyph_once() {
        let cache = OutlineCache::default();
        let mut extracted = Vec::new();
        for ch in "Techno".chars().chain("Techno".chars()) {
            cache.get_or_extract((ch, 6), || {
                extracted.push(ch);
                GlyphOutline {
                    contours: vec![vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]]],
                }
            });
        }
        assert_eq!(extracted, vec!['T', 'e', 'c', 'h', 'n', 'o']);
        assert_eq!(cache.len(), 6);

        // a different curve resolution is a separate entry
        cache.get_or_extract(('T', 12), GlyphOutline::default);
        assert_eq!(cache.len(), 7);
    }

    #[test]
    fn test_scaled_outline() {
        let outline = GlyphOutline {
            contours: vec![vec![[0.0, 0.0], [1000.0, 0.0], [0.0, 500.0]]],
        };
        let scaled = outline.scaled(0.5);
        assert_eq!(scaled.contours[0][1], [500.0, 0.0]);
        assert_eq!(scaled.contours[0][2], [0.0, 250.0]);
    }

    #[test]
    fn test_invalid_font_bytes() {
        assert!(Font::from_bytes(vec![0, 1, 2, 3]).is_err());
    }
}
