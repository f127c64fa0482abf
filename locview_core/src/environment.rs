//! Environment model placement and box-based scene queries.

use crate::geo::LocalPosition;
use crate::measure::{Ray, SceneIntersector};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Opacity of a visible environment model.
pub const OPAQUE: f32 = 1.0;

/// Opacity when the environment is shown as a see-through shell.
pub const TRANSPARENT: f32 = 0.2;

pub fn environment_opacity(visible: bool) -> f32 {
    if visible {
        OPAQUE
    } else {
        TRANSPARENT
    }
}

/// Axis-aligned bounding box in renderer space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vector3<f64>,
    pub max: Vector3<f64>,
}

impl Aabb {
    pub fn new(min: Vector3<f64>, max: Vector3<f64>) -> Self {
        Self { min, max }
    }

    /// Tight box around a point cloud, `None` when empty.
    pub fn from_points<'a, I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Vector3<f64>>,
    {
        let mut iter = points.into_iter();
        let first = *iter.next()?;
        Some(iter.fold(Self::new(first, first), |acc, p| Self {
            min: acc.min.inf(p),
            max: acc.max.sup(p),
        }))
    }

    pub fn center(&self) -> Vector3<f64> {
        (self.min + self.max) * 0.5
    }

    /// Translation that centers the box on the root horizontally and rests
    /// its underside on the ground plane.
    pub fn grounding_offset(&self) -> Vector3<f64> {
        let center = self.center();
        Vector3::new(-center.x, -self.min.y, -center.z)
    }

    pub fn translated(&self, offset: &Vector3<f64>) -> Self {
        Self::new(self.min + offset, self.max + offset)
    }

    /// Entry distance along `ray` (slab test), `None` on a miss or when
    /// the box lies behind the origin.
    pub fn intersect_ray(&self, ray: &Ray) -> Option<f64> {
        let mut t_near = f64::NEG_INFINITY;
        let mut t_far = f64::INFINITY;

        for axis in 0..3 {
            let origin = ray.origin[axis];
            let dir = ray.direction[axis];

            if dir == 0.0 {
                if origin < self.min[axis] || origin > self.max[axis] {
                    return None;
                }
                continue;
            }

            let t1 = (self.min[axis] - origin) / dir;
            let t2 = (self.max[axis] - origin) / dir;
            t_near = t_near.max(t1.min(t2));
            t_far = t_far.min(t1.max(t2));

            if t_near > t_far {
                return None;
            }
        }

        if t_far < 0.0 {
            return None;
        }
        // origin inside the box reports the exit
        Some(if t_near >= 0.0 { t_near } else { t_far })
    }
}

impl SceneIntersector for [Aabb] {
    fn nearest_hit(&self, ray: &Ray) -> Option<LocalPosition> {
        self.iter()
            .filter_map(|b| b.intersect_ray(ray))
            .min_by(|a, b| a.total_cmp(b))
            .map(|t| LocalPosition::from_vector(&ray.at(t)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_box_at(x: f64, y: f64, z: f64) -> Aabb {
        Aabb::new(Vector3::new(x - 0.5, y - 0.5, z - 0.5), Vector3::new(x + 0.5, y + 0.5, z + 0.5))
    }

    #[test]
    fn test_opacity() {
        assert_eq!(environment_opacity(true), 1.0);
        assert_eq!(environment_opacity(false), 0.2);
    }

    #[test]
    fn test_grounding_offset_sits_model_on_plane() {
        let points = [Vector3::new(2.0, -3.0, 4.0), Vector3::new(6.0, 1.0, 8.0)];
        let aabb = Aabb::from_points(points.iter()).unwrap();
        let grounded = aabb.translated(&aabb.grounding_offset());

        assert_relative_eq!(grounded.min.y, 0.0);
        assert_relative_eq!(grounded.center().x, 0.0);
        assert_relative_eq!(grounded.center().z, 0.0);
        assert_relative_eq!(grounded.max.y, 4.0);
    }

    #[test]
    fn test_from_points_empty() {
        assert!(Aabb::from_points(std::iter::empty()).is_none());
    }

    #[test]
    fn test_slab_hit_and_miss() {
        let aabb = unit_box_at(0.0, 2.0, 0.0);
        let down = Ray::new(Vector3::new(0.0, 10.0, 0.0), Vector3::new(0.0, -1.0, 0.0));
        let beside = Ray::new(Vector3::new(3.0, 10.0, 0.0), Vector3::new(0.0, -1.0, 0.0));
        let away = Ray::new(Vector3::new(0.0, 10.0, 0.0), Vector3::new(0.0, 1.0, 0.0));

        assert_relative_eq!(aabb.intersect_ray(&down).unwrap(), 7.5);
        assert!(aabb.intersect_ray(&beside).is_none());
        assert!(aabb.intersect_ray(&away).is_none());
    }

    #[test]
    fn test_nearest_box_wins() {
        let boxes = [unit_box_at(0.0, 1.0, 0.0), unit_box_at(0.0, 5.0, 0.0)];
        let down = Ray::new(Vector3::new(0.0, 10.0, 0.0), Vector3::new(0.0, -1.0, 0.0));

        let hit = boxes[..].nearest_hit(&down).unwrap();
        assert_relative_eq!(hit.up, 5.5);
    }
}
