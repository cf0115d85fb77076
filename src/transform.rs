use std::ops::{ Index, IndexMut, Mul };

use crate::feq;
use crate::vector::Vector3;

/// A 4x4 affine transformation.
///
/// Transforms position shapes, meshes and cameras in world space. Matrices
/// are stored row-major and applied to column vectors, so in `a * b` the
/// transform `b` is applied first.
///
/// Points and directions are both represented by `Vector3`. Use
/// `transform_point` for positions (translation applies) and
/// `transform_direction` for directions and normals (translation ignored).
///
/// # Examples
///
/// Rotating a point a quarter turn about the Z axis:
///
/// ```
/// # use raycaster::vector::Vector3;
/// # use raycaster::transform::Transform;
/// let m = Transform::rotation_z(std::f64::consts::PI / 2.0);
/// let p = m.transform_point(&Vector3::new(0.0, 1.0, 0.0));
/// assert_eq!(p, Vector3::new(-1.0, 0.0, 0.0));
/// ```
#[derive(Copy, Clone, Debug)]
pub struct Transform {
    data: [f64; 16],
}

/// Transforms are compared element-wise, within `FEQ_EPSILON`.
impl PartialEq for Transform {
    fn eq(&self, other: &Transform) -> bool {
        self.data.iter().zip(other.data.iter()).all(|(x, y)| feq(*x, *y))
    }
}

impl Default for Transform {
    fn default() -> Transform {
        Transform::identity()
    }
}

impl Transform {
    /// Instantiates a 4x4 identity matrix.
    pub fn identity() -> Transform {
        let mut buf = [0.0; 16];
        buf[0] = 1.0; buf[5] = 1.0; buf[10] = 1.0; buf[15] = 1.0;

        Transform { data: buf }
    }

    /// Instantiates a translation by `x`, `y` and `z`.
    pub fn translation(x: f64, y: f64, z: f64) -> Transform {
        let mut trans = Self::identity();
        trans[(0, 3)] = x;
        trans[(1, 3)] = y;
        trans[(2, 3)] = z;

        trans
    }

    /// Instantiates a rotation about the X axis. `r` is in radians.
    pub fn rotation_x(r: f64) -> Transform {
        let mut rotate = Self::identity();
        rotate[(1, 1)] =  r.cos();
        rotate[(1, 2)] = -r.sin();
        rotate[(2, 1)] =  r.sin();
        rotate[(2, 2)] =  r.cos();

        rotate
    }

    /// Instantiates a rotation about the Y axis. `r` is in radians.
    pub fn rotation_y(r: f64) -> Transform {
        let mut rotate = Self::identity();
        rotate[(0, 0)] =  r.cos();
        rotate[(0, 2)] =  r.sin();
        rotate[(2, 0)] = -r.sin();
        rotate[(2, 2)] =  r.cos();

        rotate
    }

    /// Instantiates a rotation about the Z axis. `r` is in radians.
    pub fn rotation_z(r: f64) -> Transform {
        let mut rotate = Self::identity();
        rotate[(0, 0)] =  r.cos();
        rotate[(0, 1)] = -r.sin();
        rotate[(1, 0)] =  r.sin();
        rotate[(1, 1)] =  r.cos();

        rotate
    }

    /// Applies the transform to a position (`w == 1`).
    pub fn transform_point(&self, p: &Vector3) -> Vector3 {
        self.apply(p, 1.0)
    }

    /// Applies the transform to a direction (`w == 0`). Translation is
    /// ignored.
    pub fn transform_direction(&self, d: &Vector3) -> Vector3 {
        self.apply(d, 0.0)
    }

    fn apply(&self, v: &Vector3, w: f64) -> Vector3 {
        let mut buf = [0.0; 3];
        for r in 0..3 {
            buf[r] = self[(r, 0)] * v.x
                + self[(r, 1)] * v.y
                + self[(r, 2)] * v.z
                + self[(r, 3)] * w;
        }

        Vector3::new(buf[0], buf[1], buf[2])
    }

    /// The translation component of the transform, i.e. where the local
    /// origin ends up in world space.
    pub fn translation_part(&self) -> Vector3 {
        Vector3::new(self[(0, 3)], self[(1, 3)], self[(2, 3)])
    }

    /// Moves the transform by `offset` in world space.
    pub fn translate(&mut self, offset: &Vector3) {
        *self = Transform::translation(offset.x, offset.y, offset.z) * *self;
    }

    pub fn rotate_x(&mut self, theta: f64, around_origin: bool) {
        self.rotate(&Transform::rotation_x(theta), around_origin);
    }

    pub fn rotate_y(&mut self, theta: f64, around_origin: bool) {
        self.rotate(&Transform::rotation_y(theta), around_origin);
    }

    pub fn rotate_z(&mut self, theta: f64, around_origin: bool) {
        self.rotate(&Transform::rotation_z(theta), around_origin);
    }

    /// Pre-multiplies a rotation.
    ///
    /// When `around_origin` is false the rotation pivots around the world
    /// origin. Otherwise it pivots around the transform's own origin, which
    /// stays where it is.
    pub fn rotate(&mut self, rotation: &Transform, around_origin: bool) {
        if around_origin {
            let t = self.translation_part();
            let to_world = Transform::translation(-t.x, -t.y, -t.z);
            let back = Transform::translation(t.x, t.y, t.z);
            *self = back * *rotation * to_world * *self;
        } else {
            *self = *rotation * *self;
        }
    }
}

impl Index<(usize, usize)> for Transform {
    type Output = f64;

    fn index(&self, index: (usize, usize)) -> &f64 {
        &self.data[(index.0 * 4) + index.1]
    }
}

impl IndexMut<(usize, usize)> for Transform {
    fn index_mut(&mut self, index: (usize, usize)) -> &mut f64 {
        &mut self.data[(index.0 * 4) + index.1]
    }
}

impl Mul<Transform> for Transform {
    type Output = Transform;

    fn mul(self, other: Transform) -> Transform {
        let mut res = Transform { data: [0.0; 16] };

        for r in 0..4 {
            for c in 0..4 {
                res[(r, c)] = self[(r, 0)] * other[(0, c)]
                    + self[(r, 1)] * other[(1, c)]
                    + self[(r, 2)] * other[(2, c)]
                    + self[(r, 3)] * other[(3, c)]
            }
        }

        res
    }
}

#[test]
fn identity_is_neutral() {
    let m = Transform::rotation_x(0.3) * Transform::translation(1.0, 2.0, 3.0);
    assert_eq!(m * Transform::identity(), m);
    assert_eq!(Transform::identity() * m, m);
}

#[test]
fn translation_moves_points_not_directions() {
    let m = Transform::translation(5.0, -3.0, 2.0);
    let v = Vector3::new(-3.0, 4.0, 5.0);

    assert_eq!(m.transform_point(&v), Vector3::new(2.0, 1.0, 7.0));
    assert_eq!(m.transform_direction(&v), v);
}

#[test]
fn rotations_quarter_turn() {
    use std::f64::consts::FRAC_PI_2;

    let rx = Transform::rotation_x(FRAC_PI_2);
    let ry = Transform::rotation_y(FRAC_PI_2);
    let rz = Transform::rotation_z(FRAC_PI_2);

    assert_eq!(rx.transform_point(&Vector3::J), Vector3::K);
    assert_eq!(ry.transform_point(&Vector3::K), Vector3::I);
    assert_eq!(rz.transform_point(&Vector3::I), Vector3::J);
}

#[test]
fn rotate_about_world_origin_moves_translation() {
    use std::f64::consts::FRAC_PI_2;

    let mut m = Transform::translation(1.0, 0.0, 0.0);
    m.rotate_z(FRAC_PI_2, false);
    assert_eq!(m.translation_part(), Vector3::new(0.0, 1.0, 0.0));
}

#[test]
fn rotate_about_own_origin_keeps_translation() {
    use std::f64::consts::FRAC_PI_2;

    let mut m = Transform::translation(1.0, 0.0, 0.0);
    m.rotate_z(FRAC_PI_2, true);

    assert_eq!(m.translation_part(), Vector3::new(1.0, 0.0, 0.0));
    assert_eq!(m.transform_direction(&Vector3::I), Vector3::J);
    assert_eq!(m.transform_point(&Vector3::I), Vector3::new(1.0, 1.0, 0.0));
}

#[test]
fn translate_accumulates() {
    let mut m = Transform::identity();
    m.translate(&Vector3::new(1.0, 2.0, 3.0));
    m.translate(&Vector3::new(1.0, 0.0, -1.0));
    assert_eq!(m, Transform::translation(2.0, 2.0, 2.0));
}
