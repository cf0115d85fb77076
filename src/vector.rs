use std::ops::{ Add, Sub, Neg, Mul, Div };

use crate::feq;
use crate::error::DegenerateVectorError;

/// A vector (or point) in 3D space.
///
/// The same type is used for positions, directions and normals. Whether a
/// `Vector3` is affected by translation depends on how it is handed to a
/// `Transform` (see `Transform::transform_point` and
/// `Transform::transform_direction`).
///
/// # Examples
///
/// ```
/// # use raycaster::vector::Vector3;
/// let v = Vector3::new(3.0, 0.0, 4.0);
/// assert_eq!(v.length(), 5.0);
/// assert_eq!(v.normalize().unwrap(), Vector3::new(0.6, 0.0, 0.8));
/// ```
#[derive(Debug, Default, Copy, Clone, PartialOrd)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl PartialEq for Vector3 {
    fn eq(&self, other: &Vector3) -> bool {
        feq(self.x, other.x) &&
            feq(self.y, other.y) &&
            feq(self.z, other.z)
    }
}

impl Vector3 {
    pub const ZERO: Vector3 = Vector3 { x: 0.0, y: 0.0, z: 0.0 };
    pub const I: Vector3 = Vector3 { x: 1.0, y: 0.0, z: 0.0 };
    pub const J: Vector3 = Vector3 { x: 0.0, y: 1.0, z: 0.0 };
    pub const K: Vector3 = Vector3 { x: 0.0, y: 0.0, z: 1.0 };

    pub fn new(x: f64, y: f64, z: f64) -> Vector3 {
        Vector3 { x, y, z }
    }

    pub fn length_squared(&self) -> f64 {
        self.dot(self)
    }

    pub fn length(&self) -> f64 {
        self.length_squared().sqrt()
    }

    /// Distance between two points.
    pub fn distance(&self, other: &Vector3) -> f64 {
        (*other - *self).length()
    }

    /// Returns the unit vector pointing in the same direction.
    ///
    /// Normalizing a zero-length vector has no meaningful answer, so it
    /// fails with `DegenerateVectorError` instead of producing NaNs.
    pub fn normalize(&self) -> Result<Vector3, DegenerateVectorError> {
        let len = self.length();
        if len == 0.0 || !len.is_finite() {
            return Err(DegenerateVectorError);
        }

        Ok(*self / len)
    }

    pub fn dot(&self, other: &Vector3) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(&self, other: &Vector3) -> Vector3 {
        Vector3 {
            x: self.y * other.z - self.z * other.y,
            y: self.z * other.x - self.x * other.z,
            z: self.x * other.y - self.y * other.x,
        }
    }

    /// Reflects this vector about a normal.
    ///
    /// With `self` pointing away from the surface (toward a light, say), the
    /// result is the mirrored direction `2(self·n)n - self`.
    pub fn reflect(&self, normal: &Vector3) -> Vector3 {
        *normal * (2.0 * self.dot(normal)) - *self
    }
}

impl Add for Vector3 {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            x: self.x + other.x,
            y: self.y + other.y,
            z: self.z + other.z,
        }
    }
}

impl Sub for Vector3 {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self {
            x: self.x - other.x,
            y: self.y - other.y,
            z: self.z - other.z,
        }
    }
}

impl Neg for Vector3 {
    type Output = Self;

    fn neg(self) -> Self {
        Self { x: -self.x, y: -self.y, z: -self.z }
    }
}

/// Implements scalar right-multiplication for a vector.
impl Mul<f64> for Vector3 {
    type Output = Self;

    fn mul(self, other: f64) -> Self {
        Self {
            x: self.x * other,
            y: self.y * other,
            z: self.z * other,
        }
    }
}

/// Implements scalar left-multiplication for a vector.
impl Mul<Vector3> for f64 {
    type Output = Vector3;

    fn mul(self, other: Vector3) -> Vector3 {
        other * self
    }
}

impl Div<f64> for Vector3 {
    type Output = Self;

    fn div(self, other: f64) -> Self {
        Self {
            x: self.x / other,
            y: self.y / other,
            z: self.z / other,
        }
    }
}

impl From<[f64; 3]> for Vector3 {
    fn from(v: [f64; 3]) -> Vector3 {
        Vector3 { x: v[0], y: v[1], z: v[2] }
    }
}

#[test]
fn vector_arithmetic() {
    let a = Vector3::new(3.0, -2.0, 5.0);
    let b = Vector3::new(-2.0, 3.0, 1.0);

    assert_eq!(a + b, Vector3::new(1.0, 1.0, 6.0));
    assert_eq!(a - b, Vector3::new(5.0, -5.0, 4.0));
    assert_eq!(-a, Vector3::new(-3.0, 2.0, -5.0));
    assert_eq!(a * 2.0, Vector3::new(6.0, -4.0, 10.0));
    assert_eq!(0.5 * a, Vector3::new(1.5, -1.0, 2.5));
}

#[test]
fn vector_dot_and_cross() {
    let a = Vector3::new(1.0, 2.0, 3.0);
    let b = Vector3::new(2.0, 3.0, 4.0);

    assert_eq!(a.dot(&b), 20.0);
    assert_eq!(a.cross(&b), Vector3::new(-1.0, 2.0, -1.0));
    assert_eq!(b.cross(&a), Vector3::new(1.0, -2.0, 1.0));
    assert_eq!(Vector3::I.cross(&Vector3::J), Vector3::K);
}

#[test]
fn vector_normalize() {
    let v = Vector3::new(1.0, 2.0, 3.0);
    let n = v.normalize().unwrap();

    assert!(crate::feq(n.length(), 1.0));
    assert_eq!(n, Vector3::new(0.26726, 0.53452, 0.80178));
}

#[test]
fn normalize_zero_vector_fails() {
    assert_eq!(Vector3::ZERO.normalize(), Err(DegenerateVectorError));
}

#[test]
fn vector_reflect() {
    let l = Vector3::new(1.0, 1.0, 0.0);
    let n = Vector3::J;
    assert_eq!(l.reflect(&n), Vector3::new(-1.0, 1.0, 0.0));
}

#[test]
fn vector_distance() {
    let a = Vector3::new(1.0, 1.0, 1.0);
    let b = Vector3::new(1.0, 4.0, 5.0);
    assert_eq!(a.distance(&b), 5.0);
}
