pub mod consts;
pub mod error;

pub mod vector;
pub mod transform;
pub mod ray;

pub mod geometry;
pub mod mesh;
pub mod shape;
pub mod intersect;
pub mod obj;

pub mod light;
pub mod model;
pub mod scene;
pub mod description;

pub mod shading;
pub mod camera;
pub mod parallel;

pub mod color;
pub mod canvas;

use consts::FEQ_EPSILON;

/// Loose floating point equality, used for comparing vectors, colors and
/// transforms in tests.
pub fn feq(left: f64, right: f64) -> bool {
    (left - right).abs() < FEQ_EPSILON
}

/// Epsilon-aware floating point equality used by the intersection routines.
///
/// Exact matches are equal. Values at or near zero are compared against an
/// absolute bound scaled to the smallest normal `f32`; everything else is
/// compared relative to the magnitude of the operands.
///
/// # Examples
///
/// ```
/// # use raycaster::nearly_equal;
/// assert!(nearly_equal(1.0, 1.0 + 1e-16));
/// assert!(!nearly_equal(1.0, 1.1));
/// ```
pub fn nearly_equal(a: f64, b: f64) -> bool {
    if a == b {
        return true;
    }

    let min_normal = f32::MIN_POSITIVE as f64;
    let diff = (a - b).abs();

    if a == 0.0 || b == 0.0 || diff < min_normal {
        diff < f64::EPSILON * min_normal
    } else {
        diff / (a.abs() + b.abs()).min(f64::MAX) < f64::EPSILON
    }
}

#[test]
fn nearly_equal_is_reflexive() {
    for &x in &[0.0, -0.0, 1.0, -3.5, 1e-300, 1e300] {
        assert!(nearly_equal(x, x));
    }
}

#[test]
fn nearly_equal_is_symmetric() {
    let pairs = [(1.0, 1.0 + 1e-16), (1.0, 1.1), (0.0, 1e-40), (-2.0, 2.0)];
    for &(a, b) in &pairs {
        assert_eq!(nearly_equal(a, b), nearly_equal(b, a));
    }
}

#[test]
fn nearly_equal_tolerance() {
    assert!(nearly_equal(1.0, 1.0 + 1e-16));
    assert!(!nearly_equal(1.0, 1.1));
    assert!(!nearly_equal(0.0, 1e-10));
    assert!(nearly_equal(0.0, -0.0));
}
