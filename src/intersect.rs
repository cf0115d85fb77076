use crate::vector::Vector3;
use crate::model::Model;

/// The result of intersecting a ray with a single shape.
///
/// A miss is represented by `Intersection::none()` rather than an `Option`,
/// so callers can always read `point` and `normal` without unwrapping. `t` is
/// the distance along the (unit) ray direction.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Intersection {
    pub is_hit: bool,
    pub point: Vector3,
    pub normal: Vector3,
    pub t: f64,
}

impl Intersection {
    pub fn hit(t: f64, point: Vector3, normal: Vector3) -> Intersection {
        Intersection { is_hit: true, point, normal, t }
    }

    /// The canonical "no hit" value: zero point and normal, infinite `t`.
    pub fn none() -> Intersection {
        Intersection {
            is_hit: false,
            point: Vector3::ZERO,
            normal: Vector3::ZERO,
            t: f64::INFINITY,
        }
    }
}

impl Default for Intersection {
    fn default() -> Intersection {
        Intersection::none()
    }
}

/// The nearest intersection of a ray against a whole scene.
///
/// `model` is an owned copy of the model that was hit, so the hit can
/// outlive any borrow of the scene. Copies are cheap; mesh geometry is
/// shared.
#[derive(Clone, Debug)]
pub struct RaycastHit {
    pub model: Option<Model>,
    pub point: Vector3,
    pub normal: Vector3,
    pub distance: f64,
    pub is_hit: bool,
}

impl RaycastHit {
    pub fn new(model: Model, intersection: &Intersection) -> RaycastHit {
        RaycastHit {
            model: Some(model),
            point: intersection.point,
            normal: intersection.normal,
            distance: intersection.t,
            is_hit: true,
        }
    }

    pub fn miss() -> RaycastHit {
        RaycastHit {
            model: None,
            point: Vector3::ZERO,
            normal: Vector3::ZERO,
            distance: f64::INFINITY,
            is_hit: false,
        }
    }
}

#[test]
fn miss_sentinels() {
    let i = Intersection::none();
    assert!(!i.is_hit);
    assert_eq!(i.point, Vector3::ZERO);
    assert_eq!(i.normal, Vector3::ZERO);
    assert!(i.t.is_infinite());

    let h = RaycastHit::miss();
    assert!(!h.is_hit);
    assert!(h.model.is_none());
}
