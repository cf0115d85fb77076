use crate::vector::Vector3;
use crate::error::DegenerateVectorError;

/// A half-line starting at `origin`.
///
/// The direction is always a unit vector; every way of constructing or
/// redirecting a `Ray` normalizes it, failing on zero-length input.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Ray {
    pub origin: Vector3,
    direction: Vector3,
}

impl Ray {
    pub fn new(origin: Vector3, direction: Vector3)
        -> Result<Ray, DegenerateVectorError> {
        Ok(Ray { origin, direction: direction.normalize()? })
    }

    /// Creates a ray starting at `from`, pointing at `to`.
    pub fn from_points(from: Vector3, to: Vector3)
        -> Result<Ray, DegenerateVectorError> {
        Ray::new(from, to - from)
    }

    pub fn direction(&self) -> Vector3 {
        self.direction
    }

    pub fn set_direction(&mut self, direction: Vector3)
        -> Result<(), DegenerateVectorError> {
        self.direction = direction.normalize()?;
        Ok(())
    }

    /// The point at distance `t` along the ray.
    pub fn point_at(&self, t: f64) -> Vector3 {
        self.origin + self.direction * t
    }
}

#[test]
fn ray_direction_is_normalized() {
    let r = Ray::new(Vector3::ZERO, Vector3::new(0.0, 0.0, 5.0)).unwrap();
    assert_eq!(r.direction(), Vector3::K);
}

#[test]
fn ray_from_points() {
    let r = Ray::from_points(
        Vector3::new(1.0, 1.0, 1.0),
        Vector3::new(1.0, 4.0, 1.0)
    ).unwrap();

    assert_eq!(r.origin, Vector3::new(1.0, 1.0, 1.0));
    assert_eq!(r.direction(), Vector3::J);
}

#[test]
fn ray_degenerate_direction() {
    let p = Vector3::new(2.0, 3.0, 4.0);
    assert!(Ray::from_points(p, p).is_err());

    let mut r = Ray::new(p, Vector3::I).unwrap();
    assert!(r.set_direction(Vector3::ZERO).is_err());
    assert_eq!(r.direction(), Vector3::I);
}

#[test]
fn ray_position() {
    let r = Ray::new(Vector3::new(2.0, 3.0, 4.0), Vector3::I).unwrap();

    assert_eq!(r.point_at(0.0), Vector3::new(2.0, 3.0, 4.0));
    assert_eq!(r.point_at(1.0), Vector3::new(3.0, 3.0, 4.0));
    assert_eq!(r.point_at(-1.0), Vector3::new(1.0, 3.0, 4.0));
    assert_eq!(r.point_at(2.5), Vector3::new(4.5, 3.0, 4.0));
}
