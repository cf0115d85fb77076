use crate::vector::Vector3;
use crate::transform::Transform;
use crate::ray::Ray;
use crate::intersect::Intersection;
use crate::geometry::{ Sphere, Plane, Triangle };
use crate::mesh::Mesh;

/// Rigid transformations shared by shapes, models and cameras.
///
/// Rotations take an angle in radians. With `around_origin == false` the
/// rotation pivots around the world origin; otherwise around the object's
/// own origin (a sphere's center, a triangle's centroid, a mesh's local
/// origin, a plane's anchor point).
pub trait Transformable {
    fn translate(&mut self, offset: &Vector3);
    fn rotate_x(&mut self, theta: f64, around_origin: bool);
    fn rotate_y(&mut self, theta: f64, around_origin: bool);
    fn rotate_z(&mut self, theta: f64, around_origin: bool);
}

/// Every kind of geometry a scene can contain.
#[derive(Clone, Debug)]
pub enum Shape {
    Sphere(Sphere),
    Plane(Plane),
    Triangle(Triangle),
    Mesh(Mesh),
}

impl Shape {
    /// Intersects a ray with the shape, returning `Intersection::none()` on
    /// a miss.
    pub fn intersects(&self, ray: &Ray) -> Intersection {
        match self {
            Shape::Sphere(s) => s.intersect(ray),
            Shape::Plane(p) => p.intersect(ray),
            Shape::Triangle(t) => t.intersect(ray),
            Shape::Mesh(m) => m.intersect(ray),
        }
    }

    /// The surface normal at a point on the shape, or `None` where the
    /// normal is undefined (the center of a zero-radius sphere, or a point
    /// that is not on a mesh).
    pub fn normal_at(&self, point: &Vector3) -> Option<Vector3> {
        match self {
            Shape::Sphere(s) => s.normal_at(point),
            Shape::Plane(p) => p.normal_at(point),
            Shape::Triangle(t) => t.normal_at(point),
            Shape::Mesh(m) => m.normal_at(point),
        }
    }

    fn rotate(&mut self, rotation: &Transform, around_origin: bool) {
        match self {
            Shape::Sphere(s) => s.rotate(rotation, around_origin),
            Shape::Plane(p) => p.rotate(rotation, around_origin),
            Shape::Triangle(t) => t.rotate(rotation, around_origin),
            Shape::Mesh(m) => m.rotate(rotation, around_origin),
        }
    }
}

impl Transformable for Shape {
    fn translate(&mut self, offset: &Vector3) {
        match self {
            Shape::Sphere(s) => s.translate(offset),
            Shape::Plane(p) => p.translate(offset),
            Shape::Triangle(t) => t.translate(offset),
            Shape::Mesh(m) => m.translate(offset),
        }
    }

    fn rotate_x(&mut self, theta: f64, around_origin: bool) {
        self.rotate(&Transform::rotation_x(theta), around_origin);
    }

    fn rotate_y(&mut self, theta: f64, around_origin: bool) {
        self.rotate(&Transform::rotation_y(theta), around_origin);
    }

    fn rotate_z(&mut self, theta: f64, around_origin: bool) {
        self.rotate(&Transform::rotation_z(theta), around_origin);
    }
}

impl From<Sphere> for Shape {
    fn from(s: Sphere) -> Shape {
        Shape::Sphere(s)
    }
}

impl From<Plane> for Shape {
    fn from(p: Plane) -> Shape {
        Shape::Plane(p)
    }
}

impl From<Triangle> for Shape {
    fn from(t: Triangle) -> Shape {
        Shape::Triangle(t)
    }
}

impl From<Mesh> for Shape {
    fn from(m: Mesh) -> Shape {
        Shape::Mesh(m)
    }
}

#[test]
fn shape_dispatches_intersection() {
    let shapes: Vec<Shape> = vec![
        Sphere::new(Vector3::new(0.0, 0.0, 5.0), 1.0).into(),
        Plane::new(Vector3::new(0.0, 0.0, 4.0), -Vector3::K).unwrap().into(),
        Triangle::new(
            Vector3::new(0.0, 1.0, 6.0),
            Vector3::new(-1.0, -1.0, 6.0),
            Vector3::new(1.0, -1.0, 6.0),
        ).unwrap().into(),
    ];

    let r = Ray::new(Vector3::ZERO, Vector3::K).unwrap();
    let ts: Vec<f64> = shapes.iter().map(|s| s.intersects(&r).t).collect();
    assert!(crate::feq(ts[0], 4.0));
    assert!(crate::feq(ts[1], 4.0));
    assert!(crate::feq(ts[2], 6.0));
}

#[test]
fn translated_sphere_normal() {
    let mut s: Shape = Sphere::new(Vector3::ZERO, 1.0).into();
    s.translate(&Vector3::new(0.0, 1.0, 0.0));

    let n = s.normal_at(&Vector3::new(0.0, 1.70711, -0.70711)).unwrap();
    assert_eq!(n, Vector3::new(0.0, 0.70711, -0.70711));
}

#[test]
fn rotate_sphere_around_center_then_world() {
    use std::f64::consts::FRAC_PI_2;

    let mut s: Shape = Sphere::new(Vector3::new(2.0, 0.0, 0.0), 1.0).into();
    s.rotate_z(FRAC_PI_2, true);
    match &s {
        Shape::Sphere(sphere) => assert_eq!(sphere.center, Vector3::new(2.0, 0.0, 0.0)),
        _ => unreachable!(),
    }

    s.rotate_z(FRAC_PI_2, false);
    match &s {
        Shape::Sphere(sphere) => assert_eq!(sphere.center, Vector3::new(0.0, 2.0, 0.0)),
        _ => unreachable!(),
    }
}

#[test]
fn rotate_plane_keeps_anchor_around_origin() {
    use std::f64::consts::FRAC_PI_2;

    let mut p: Shape = Plane::new(Vector3::new(0.0, -1.0, 0.0), Vector3::J)
        .unwrap().into();
    p.rotate_x(FRAC_PI_2, true);

    assert_eq!(p.normal_at(&Vector3::ZERO), Some(Vector3::K));
    let r = Ray::new(Vector3::new(0.0, -1.0, -2.0), Vector3::K).unwrap();
    let i = p.intersects(&r);
    assert!(i.is_hit);
    assert_eq!(i.point, Vector3::new(0.0, -1.0, 0.0));
}
