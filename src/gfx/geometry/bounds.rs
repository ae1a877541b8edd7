//! Axis-aligned bounding boxes.

use cgmath::{Matrix4, Point3, Transform, Vector3};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vector3<f32>,
    pub max: Vector3<f32>,
}

impl Aabb {
    /// The empty box: `min` is +inf and `max` is -inf, so any point expands it
    pub fn empty() -> Self {
        Self {
            min: Vector3::new(f32::INFINITY, f32::INFINITY, f32::INFINITY),
            max: Vector3::new(f32::NEG_INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY),
        }
    }

    pub fn new(min: Vector3<f32>, max: Vector3<f32>) -> Self {
        Self { min, max }
    }

    pub fn from_points(points: &[[f32; 3]]) -> Self {
        let mut aabb = Self::empty();
        for p in points {
            aabb.expand(Vector3::new(p[0], p[1], p[2]));
        }
        aabb
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn expand(&mut self, p: Vector3<f32>) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.min.z = self.min.z.min(p.z);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
        self.max.z = self.max.z.max(p.z);
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        let mut out = *self;
        if !other.is_empty() {
            out.expand(other.min);
            out.expand(other.max);
        }
        out
    }

    /// Extent along each axis; zero for an empty box
    pub fn size(&self) -> Vector3<f32> {
        if self.is_empty() {
            Vector3::new(0.0, 0.0, 0.0)
        } else {
            self.max - self.min
        }
    }

    pub fn max_dimension(&self) -> f32 {
        let size = self.size();
        size.x.max(size.y).max(size.z)
    }

    /// Bounds of this box after an affine transform (all eight corners)
    pub fn transformed(&self, matrix: &Matrix4<f32>) -> Aabb {
        if self.is_empty() {
            return *self;
        }
        let mut out = Aabb::empty();
        for i in 0..8 {
            let corner = Point3::new(
                if i & 1 == 0 { self.min.x } else { self.max.x },
                if i & 2 == 0 { self.min.y } else { self.max.y },
                if i & 4 == 0 { self.min.z } else { self.max.z },
            );
            let p = matrix.transform_point(corner);
            out.expand(Vector3::new(p.x, p.y, p.z));
        }
        out
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aabb_creation() {
        let aabb = Aabb::from_points(&[[0.0, 0.0, 0.0], [1.0, 2.0, 1.0], [-1.0, -1.0, -3.0]]);
        assert_eq!(aabb.min, Vector3::new(-1.0, -1.0, -3.0));
        assert_eq!(aabb.max, Vector3::new(1.0, 2.0, 1.0));
        assert_eq!(aabb.max_dimension(), 4.0);
    }

    #[test]
    fn test_empty_has_zero_size() {
        let aabb = Aabb::from_points(&[]);
        assert!(aabb.is_empty());
        assert_eq!(aabb.size(), Vector3::new(0.0, 0.0, 0.0));
        assert_eq!(aabb.max_dimension(), 0.0);
    }

    #[test]
    fn test_transformed_scales_extent() {
        let aabb = Aabb::new(Vector3::new(-1.0, -1.0, -1.0), Vector3::new(1.0, 1.0, 1.0));
        let moved = aabb.transformed(&(Matrix4::from_translation(Vector3::new(5.0, 0.0, 0.0))
            * Matrix4::from_scale(2.0)));
        assert_eq!(moved.min, Vector3::new(3.0, -2.0, -2.0));
        assert_eq!(moved.max, Vector3::new(7.0, 2.0, 2.0));
    }

    #[test]
    fn test_union_ignores_empty() {
        let a = Aabb::new(Vector3::new(0.0, 0.0, 0.0), Vector3::new(1.0, 1.0, 1.0));
        assert_eq!(a.union(&Aabb::empty()), a);
        assert_eq!(Aabb::empty().union(&a), a);
    }
}
