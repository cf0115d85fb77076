use crate::nearly_equal;
use crate::vector::Vector3;
use crate::transform::Transform;
use crate::ray::Ray;
use crate::intersect::Intersection;
use crate::error::DegenerateVectorError;

/// Intersects a ray with the triangle `p1`, `p2`, `p3` (Möller-Trumbore).
///
/// Returns the ray parameter `t` and the barycentric coordinates `u` and `v`
/// of the hit (weights of `p2` and `p3` respectively), or `None` if the ray
/// is parallel to the triangle, passes outside of it, or hits it at or
/// behind its origin.
pub fn intersect_triangle(p1: &Vector3, p2: &Vector3, p3: &Vector3,
    ray: &Ray) -> Option<(f64, f64, f64)> {
    let e1 = *p2 - *p1;
    let e2 = *p3 - *p1;

    let dir_cross_e2 = ray.direction().cross(&e2);
    let determinant = e1.dot(&dir_cross_e2);

    // The ray is parallel to the triangle's plane.
    if nearly_equal(determinant, 0.0) {
        return None;
    }

    let f = 1.0 / determinant;
    let p1_to_origin = ray.origin - *p1;
    let u = f * p1_to_origin.dot(&dir_cross_e2);
    if u < 0.0 || u > 1.0 {
        return None;
    }

    let origin_cross_e1 = p1_to_origin.cross(&e1);
    let v = f * ray.direction().dot(&origin_cross_e1);
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = f * e2.dot(&origin_cross_e1);
    if t <= 0.0 {
        return None;
    }

    Some((t, u, v))
}

/// A sphere with a center and radius.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Sphere {
    pub center: Vector3,
    pub radius: f64,
}

impl Sphere {
    pub fn new(center: Vector3, radius: f64) -> Sphere {
        Sphere { center, radius }
    }

    /// Intersects a ray with the sphere.
    ///
    /// The ray equation is substituted into the sphere equation and the
    /// resulting quadratic is solved. The smaller strictly positive root is
    /// the hit; if neither root is positive, the sphere is behind the ray.
    ///
    /// # Examples
    ///
    /// ```
    /// # use raycaster::vector::Vector3;
    /// # use raycaster::ray::Ray;
    /// # use raycaster::geometry::Sphere;
    /// let s = Sphere::new(Vector3::ZERO, 1.0);
    /// let r = Ray::new(Vector3::new(0.0, 0.0, -5.0), Vector3::K).unwrap();
    /// let i = s.intersect(&r);
    /// assert!(i.is_hit);
    /// assert_eq!(i.t, 4.0);
    /// ```
    pub fn intersect(&self, ray: &Ray) -> Intersection {
        let sphere_to_ray = ray.origin - self.center;

        // The direction is a unit vector, so the quadratic's `a` is 1.
        let b = 2.0 * ray.direction().dot(&sphere_to_ray);
        let c = sphere_to_ray.dot(&sphere_to_ray) - self.radius.powi(2);

        let discriminant = b.powi(2) - 4.0 * c;
        if discriminant < 0.0 {
            return Intersection::none();
        }

        let t1 = (-b - discriminant.sqrt()) / 2.0;
        let t2 = (-b + discriminant.sqrt()) / 2.0;
        if t2 <= 0.0 {
            return Intersection::none();
        }

        let t = if t1 > 0.0 { t1 } else { t2 };
        let point = ray.point_at(t);
        match self.normal_at(&point) {
            Some(normal) => Intersection::hit(t, point, normal),
            None => Intersection::none(),
        }
    }

    /// The outward normal at a point on the sphere.
    pub fn normal_at(&self, point: &Vector3) -> Option<Vector3> {
        (*point - self.center).normalize().ok()
    }

    pub fn translate(&mut self, offset: &Vector3) {
        self.center = self.center + *offset;
    }

    /// Rotating a sphere about its own center changes nothing; rotating it
    /// about the world origin moves its center.
    pub fn rotate(&mut self, rotation: &Transform, around_origin: bool) {
        if !around_origin {
            self.center = rotation.transform_point(&self.center);
        }
    }
}

/// An infinite plane through `point`, facing along `normal`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Plane {
    pub point: Vector3,
    normal: Vector3,
}

impl Plane {
    pub fn new(point: Vector3, normal: Vector3)
        -> Result<Plane, DegenerateVectorError> {
        Ok(Plane { point, normal: normal.normalize()? })
    }

    /// Creates the plane through three points, with the normal following the
    /// right-hand rule from `p` to `q` to `r`.
    pub fn through(p: Vector3, q: Vector3, r: Vector3)
        -> Result<Plane, DegenerateVectorError> {
        Plane::new(p, (q - p).cross(&(r - p)))
    }

    pub fn normal(&self) -> Vector3 {
        self.normal
    }

    /// Checks whether a point lies on the plane.
    pub fn contains(&self, point: &Vector3) -> bool {
        nearly_equal(self.normal.dot(&(*point - self.point)), 0.0)
    }

    pub fn intersect(&self, ray: &Ray) -> Intersection {
        let denominator = self.normal.dot(&ray.direction());

        // Rays parallel to the plane never hit it.
        if nearly_equal(denominator, 0.0) {
            return Intersection::none();
        }

        let t = self.normal.dot(&(self.point - ray.origin)) / denominator;
        if t <= 0.0 {
            return Intersection::none();
        }

        Intersection::hit(t, ray.point_at(t), self.normal)
    }

    /// A plane has the same normal everywhere.
    pub fn normal_at(&self, _point: &Vector3) -> Option<Vector3> {
        Some(self.normal)
    }

    pub fn translate(&mut self, offset: &Vector3) {
        self.point = self.point + *offset;
    }

    pub fn rotate(&mut self, rotation: &Transform, around_origin: bool) {
        self.normal = rotation.transform_direction(&self.normal);
        if !around_origin {
            self.point = rotation.transform_point(&self.point);
        }
    }
}

/// A single triangle.
///
/// The normal is computed once from the edges, following the right-hand rule
/// from `p1` to `p2` to `p3`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Triangle {
    pub p1: Vector3,
    pub p2: Vector3,
    pub p3: Vector3,
    normal: Vector3,
}

impl Triangle {
    /// Fails on degenerate (zero-area) triangles, which have no normal.
    pub fn new(p1: Vector3, p2: Vector3, p3: Vector3)
        -> Result<Triangle, DegenerateVectorError> {
        let normal = (p2 - p1).cross(&(p3 - p1)).normalize()?;
        Ok(Triangle { p1, p2, p3, normal })
    }

    pub fn normal(&self) -> Vector3 {
        self.normal
    }

    pub fn centroid(&self) -> Vector3 {
        (self.p1 + self.p2 + self.p3) / 3.0
    }

    pub fn intersect(&self, ray: &Ray) -> Intersection {
        match intersect_triangle(&self.p1, &self.p2, &self.p3, ray) {
            Some((t, _, _)) => Intersection::hit(t, ray.point_at(t), self.normal),
            None => Intersection::none(),
        }
    }

    pub fn normal_at(&self, _point: &Vector3) -> Option<Vector3> {
        Some(self.normal)
    }

    pub fn translate(&mut self, offset: &Vector3) {
        self.p1 = self.p1 + *offset;
        self.p2 = self.p2 + *offset;
        self.p3 = self.p3 + *offset;
    }

    /// Rotates the vertices about the world origin, or about the triangle's
    /// centroid when `around_origin` is set.
    pub fn rotate(&mut self, rotation: &Transform, around_origin: bool) {
        let pivot = if around_origin { self.centroid() } else { Vector3::ZERO };
        let turn = |p: Vector3| rotation.transform_point(&(p - pivot)) + pivot;

        self.p1 = turn(self.p1);
        self.p2 = turn(self.p2);
        self.p3 = turn(self.p3);
        self.normal = rotation.transform_direction(&self.normal);
    }
}

#[test]
fn ray_misses_sphere_behind() {
    let s = Sphere::new(Vector3::new(0.0, 0.0, 5.0), 1.0);
    let r = Ray::new(Vector3::ZERO, Vector3::new(0.0, 0.0, -1.0)).unwrap();
    assert!(!s.intersect(&r).is_hit);
}

#[test]
fn ray_pointing_away_from_sphere_center_misses() {
    let s = Sphere::new(Vector3::new(0.0, 0.0, 5.0), 1.0);
    let origin = Vector3::new(0.0, 3.0, 0.0);

    for d in &[Vector3::J, Vector3::new(1.0, 0.0, -1.0), Vector3::new(0.0, 1.0, -1.0)] {
        let r = Ray::new(origin, *d).unwrap();
        // Every direction here has a non-positive dot with (center - origin)
        // while the origin is outside the sphere.
        assert!((s.center - origin).dot(&r.direction()) <= 0.0);
        assert!(!s.intersect(&r).is_hit);
    }
}

#[test]
fn ray_at_sphere_center_hits_near_side() {
    let center = Vector3::new(1.0, -2.0, 3.0);
    let s = Sphere::new(center, 1.5);
    let origin = Vector3::new(4.0, 2.0, 3.0);
    let r = Ray::from_points(origin, center).unwrap();
    let i = s.intersect(&r);

    assert!(i.is_hit);
    assert!(crate::feq(i.t, origin.distance(&center) - 1.5));
    assert_eq!(i.normal, (origin - center).normalize().unwrap());
}

#[test]
fn ray_inside_sphere_hits_far_side() {
    let s = Sphere::new(Vector3::ZERO, 1.0);
    let r = Ray::new(Vector3::ZERO, Vector3::K).unwrap();
    let i = s.intersect(&r);

    assert!(i.is_hit);
    assert!(crate::feq(i.t, 1.0));
    assert_eq!(i.point, Vector3::K);
}

#[test]
fn ray_tangent_to_sphere() {
    let s = Sphere::new(Vector3::ZERO, 1.0);
    let r = Ray::new(Vector3::new(0.0, 1.0, -5.0), Vector3::K).unwrap();
    let i = s.intersect(&r);

    assert!(i.is_hit);
    assert_eq!(i.point, Vector3::J);
}

#[test]
fn plane_intersection() {
    let p = Plane::new(Vector3::ZERO, Vector3::J).unwrap();

    let down = Ray::new(Vector3::new(0.0, 2.0, 0.0), -Vector3::J).unwrap();
    let i = p.intersect(&down);
    assert!(i.is_hit);
    assert!(crate::feq(i.t, 2.0));
    assert_eq!(i.normal, Vector3::J);

    let parallel = Ray::new(Vector3::new(0.0, 2.0, 0.0), Vector3::I).unwrap();
    assert!(!p.intersect(&parallel).is_hit);

    let up = Ray::new(Vector3::new(0.0, 2.0, 0.0), Vector3::J).unwrap();
    assert!(!p.intersect(&up).is_hit);
}

#[test]
fn plane_through_points() {
    let p = Plane::through(Vector3::ZERO, Vector3::I, Vector3::J).unwrap();
    assert_eq!(p.normal(), Vector3::K);
    assert!(p.contains(&Vector3::new(3.0, -4.0, 0.0)));
    assert!(Plane::through(Vector3::ZERO, Vector3::I, Vector3::I * 2.0).is_err());
}

#[test]
fn ray_through_triangle_centroid() {
    let t = Triangle::new(
        Vector3::new(0.0, 1.0, 0.0),
        Vector3::new(-1.0, 0.0, 0.0),
        Vector3::new(1.0, 0.0, 0.0)
    ).unwrap();
    let c = t.centroid();

    let r = Ray::new(c + Vector3::new(0.0, 0.0, -2.0), Vector3::K).unwrap();
    let i = t.intersect(&r);
    assert!(i.is_hit);
    assert!(crate::feq(i.t, 2.0));
    assert_eq!(i.point, c);
}

#[test]
fn ray_outside_triangle_misses() {
    let t = Triangle::new(
        Vector3::new(0.0, 1.0, 0.0),
        Vector3::new(-1.0, 0.0, 0.0),
        Vector3::new(1.0, 0.0, 0.0)
    ).unwrap();

    for origin in &[
        Vector3::new(1.0, 1.0, -2.0),
        Vector3::new(-1.0, 1.0, -2.0),
        Vector3::new(0.0, -1.0, -2.0),
    ] {
        let r = Ray::new(*origin, Vector3::K).unwrap();
        assert!(!t.intersect(&r).is_hit);
    }

    let parallel = Ray::new(Vector3::new(0.0, -1.0, -2.0), Vector3::J).unwrap();
    assert!(!t.intersect(&parallel).is_hit);
}

#[test]
fn degenerate_triangle_is_rejected() {
    let p = Vector3::new(1.0, 1.0, 1.0);
    assert!(Triangle::new(p, p, Vector3::ZERO).is_err());
}

#[test]
fn rotate_triangle_around_centroid() {
    use std::f64::consts::PI;

    let mut t = Triangle::new(
        Vector3::new(1.0, 1.0, 0.0),
        Vector3::new(2.0, 1.0, 0.0),
        Vector3::new(1.0, 2.0, 0.0)
    ).unwrap();
    let before = t.centroid();
    t.rotate(&Transform::rotation_y(PI), true);

    assert_eq!(t.centroid(), before);
    assert_eq!(t.normal(), -Vector3::K);
}
