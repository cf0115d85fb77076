use std::sync::Arc;

use crate::consts::FEQ_EPSILON;
use crate::vector::Vector3;
use crate::transform::Transform;
use crate::ray::Ray;
use crate::geometry::{ Sphere, intersect_triangle };
use crate::intersect::Intersection;
use crate::error::MeshError;

/// A triangular face of a mesh.
///
/// Indices are zero-based positions in the mesh's vertex and normal lists.
/// Faces loaded without normal references have `normals == None`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Face {
    pub vertices: [usize; 3],
    pub normals: Option<[usize; 3]>,
}

#[derive(Debug)]
struct MeshData {
    vertices: Vec<Vector3>,
    normals: Vec<Vector3>,
    faces: Vec<Face>,
}

/// A triangle mesh.
///
/// Vertex, normal and face data live in object space and are shared between
/// clones; each clone carries its own `Transform`. Intersection is culled by
/// a bounding sphere centered at the object-space origin, with a radius
/// reaching the farthest vertex.
#[derive(Clone, Debug)]
pub struct Mesh {
    data: Arc<MeshData>,
    transform: Transform,
    radius: f64,
}

impl Mesh {
    /// Builds a mesh, checking that every face refers to existing vertices
    /// and normals.
    pub fn new(vertices: Vec<Vector3>, normals: Vec<Vector3>, faces: Vec<Face>)
        -> Result<Mesh, MeshError> {
        if vertices.is_empty() {
            return Err(MeshError::NoVertices);
        }

        for (face, f) in faces.iter().enumerate() {
            if let Some(&index) = f.vertices.iter().find(|&&i| i >= vertices.len()) {
                return Err(MeshError::BadVertexIndex {
                    face, index, count: vertices.len()
                });
            }

            if let Some(ref ns) = f.normals {
                if let Some(&index) = ns.iter().find(|&&i| i >= normals.len()) {
                    return Err(MeshError::BadNormalIndex {
                        face, index, count: normals.len()
                    });
                }
            }
        }

        let radius = vertices.iter()
            .map(|v| v.length())
            .fold(0.0, f64::max);

        Ok(Mesh {
            data: Arc::new(MeshData { vertices, normals, faces }),
            transform: Transform::identity(),
            radius,
        })
    }

    pub fn vertices(&self) -> &[Vector3] {
        &self.data.vertices
    }

    pub fn faces(&self) -> &[Face] {
        &self.data.faces
    }

    /// The culling sphere in world space.
    pub fn bounding_sphere(&self) -> Sphere {
        Sphere::new(self.transform.transform_point(&Vector3::ZERO), self.radius)
    }

    fn world_vertices(&self, face: &Face) -> [Vector3; 3] {
        let v = &self.data.vertices;
        [
            self.transform.transform_point(&v[face.vertices[0]]),
            self.transform.transform_point(&v[face.vertices[1]]),
            self.transform.transform_point(&v[face.vertices[2]]),
        ]
    }

    /// Surface normal of a face at barycentric coordinates `u`, `v`.
    ///
    /// Stored vertex normals are interpolated across the face. Faces without
    /// normals, or whose interpolated normal vanishes, use the winding order
    /// of their vertices instead.
    fn face_normal(&self, face: &Face, corners: &[Vector3; 3], u: f64, v: f64)
        -> Option<Vector3> {
        if let Some(ns) = face.normals {
            let n = &self.data.normals;
            let local = n[ns[0]] * (1.0 - u - v) + n[ns[1]] * u + n[ns[2]] * v;
            if let Ok(normal) = self.transform.transform_direction(&local).normalize() {
                return Some(normal);
            }
        }

        (corners[1] - corners[0]).cross(&(corners[2] - corners[0])).normalize().ok()
    }

    /// Intersects a ray with the mesh.
    ///
    /// Rays missing the bounding sphere skip the mesh entirely. Otherwise
    /// every face is tested and the closest positive hit wins.
    pub fn intersect(&self, ray: &Ray) -> Intersection {
        if !self.bounding_sphere().intersect(ray).is_hit {
            return Intersection::none();
        }

        let mut closest: Option<(f64, f64, f64, &Face, [Vector3; 3])> = None;
        for face in self.data.faces.iter() {
            let corners = self.world_vertices(face);
            if let Some((t, u, v)) =
                intersect_triangle(&corners[0], &corners[1], &corners[2], ray) {
                if closest.map_or(true, |c| t < c.0) {
                    closest = Some((t, u, v, face, corners));
                }
            }
        }

        match closest {
            Some((t, u, v, face, corners)) => {
                match self.face_normal(face, &corners, u, v) {
                    Some(normal) => Intersection::hit(t, ray.point_at(t), normal),
                    None => Intersection::none(),
                }
            },
            None => Intersection::none(),
        }
    }

    /// The normal at a world-space point on the mesh's surface.
    ///
    /// Returns `None` if the point does not lie on any face.
    pub fn normal_at(&self, point: &Vector3) -> Option<Vector3> {
        self.data.faces.iter().find_map(|face| {
            let corners = self.world_vertices(face);
            barycentric(point, &corners)
                .and_then(|(u, v)| self.face_normal(face, &corners, u, v))
        })
    }

    pub fn translate(&mut self, offset: &Vector3) {
        self.transform.translate(offset);
    }

    /// Rotates the whole mesh. The mesh's own origin is its object-space
    /// origin, which is also the center of its bounding sphere.
    pub fn rotate(&mut self, rotation: &Transform, around_origin: bool) {
        self.transform.rotate(rotation, around_origin);
    }
}

/// Barycentric coordinates of `p` on triangle `corners`, if `p` lies on it.
fn barycentric(p: &Vector3, corners: &[Vector3; 3]) -> Option<(f64, f64)> {
    let e1 = corners[1] - corners[0];
    let e2 = corners[2] - corners[0];
    let normal = e1.cross(&e2);
    let area = normal.length_squared();
    if area == 0.0 {
        return None;
    }

    let rel = *p - corners[0];
    if (rel.dot(&normal) / area.sqrt()).abs() > FEQ_EPSILON {
        return None;
    }

    let u = rel.cross(&e2).dot(&normal) / area;
    let v = e1.cross(&rel).dot(&normal) / area;
    let inside = |x: f64| x >= -FEQ_EPSILON && x <= 1.0 + FEQ_EPSILON;
    if inside(u) && inside(v) && inside(u + v) {
        Some((u, v))
    } else {
        None
    }
}

#[cfg(test)]
fn unit_quad() -> Mesh {
    // Two triangles covering [-1, 1] x [-1, 1] on the z = 0 plane, facing -Z.
    let vertices = vec![
        Vector3::new(-1.0, -1.0, 0.0),
        Vector3::new(1.0, -1.0, 0.0),
        Vector3::new(1.0, 1.0, 0.0),
        Vector3::new(-1.0, 1.0, 0.0),
    ];
    let normals = vec![-Vector3::K];
    let faces = vec![
        Face { vertices: [0, 2, 1], normals: Some([0, 0, 0]) },
        Face { vertices: [0, 3, 2], normals: Some([0, 0, 0]) },
    ];

    Mesh::new(vertices, normals, faces).unwrap()
}

#[test]
fn mesh_bounding_radius() {
    let m = unit_quad();
    let b = m.bounding_sphere();
    assert_eq!(b.center, Vector3::ZERO);
    assert!(crate::feq(b.radius, 2f64.sqrt()));
}

#[test]
fn mesh_rejects_bad_indices() {
    let vertices = vec![Vector3::ZERO, Vector3::I, Vector3::J];
    let faces = vec![Face { vertices: [0, 1, 3], normals: None }];
    assert_eq!(
        Mesh::new(vertices.clone(), vec![], faces).unwrap_err(),
        MeshError::BadVertexIndex { face: 0, index: 3, count: 3 }
    );

    let faces = vec![Face { vertices: [0, 1, 2], normals: Some([0, 0, 0]) }];
    assert!(Mesh::new(vertices, vec![], faces).is_err());
    assert_eq!(Mesh::new(vec![], vec![], vec![]).unwrap_err(), MeshError::NoVertices);
}

#[test]
fn ray_hits_mesh_face() {
    let m = unit_quad();
    let r = Ray::new(Vector3::new(0.5, 0.25, -3.0), Vector3::K).unwrap();
    let i = m.intersect(&r);

    assert!(i.is_hit);
    assert!(crate::feq(i.t, 3.0));
    assert_eq!(i.point, Vector3::new(0.5, 0.25, 0.0));
    assert_eq!(i.normal, -Vector3::K);
}

#[test]
fn ray_misses_mesh_bounds() {
    let m = unit_quad();
    let r = Ray::new(Vector3::new(5.0, 5.0, -3.0), Vector3::K).unwrap();
    assert!(!m.intersect(&r).is_hit);
}

#[test]
fn translated_mesh_moves_its_bounds() {
    let mut m = unit_quad();
    m.translate(&Vector3::new(0.0, 0.0, 4.0));

    assert_eq!(m.bounding_sphere().center, Vector3::new(0.0, 0.0, 4.0));

    let r = Ray::new(Vector3::new(0.0, 0.5, -3.0), Vector3::K).unwrap();
    let i = m.intersect(&r);
    assert!(i.is_hit);
    assert!(crate::feq(i.t, 7.0));
}

#[test]
fn rotated_mesh_rotates_normals() {
    use std::f64::consts::PI;

    let mut m = unit_quad();
    m.rotate(&Transform::rotation_y(PI), true);

    let r = Ray::new(Vector3::new(0.2, 0.2, 3.0), -Vector3::K).unwrap();
    let i = m.intersect(&r);
    assert!(i.is_hit);
    assert_eq!(i.normal, Vector3::K);
}

#[test]
fn mesh_normal_at_surface_point() {
    let m = unit_quad();
    assert_eq!(m.normal_at(&Vector3::new(-0.5, 0.5, 0.0)), Some(-Vector3::K));
    assert_eq!(m.normal_at(&Vector3::new(-0.5, 0.5, 1.0)), None);
}

#[test]
fn mesh_without_normals_uses_winding() {
    let vertices = vec![
        Vector3::new(0.0, 1.0, 0.0),
        Vector3::new(-1.0, 0.0, 0.0),
        Vector3::new(1.0, 0.0, 0.0),
    ];
    let faces = vec![Face { vertices: [0, 1, 2], normals: None }];
    let m = Mesh::new(vertices, vec![], faces).unwrap();

    let r = Ray::new(Vector3::new(0.0, 0.3, -1.0), Vector3::K).unwrap();
    let i = m.intersect(&r);
    assert!(i.is_hit);
    assert_eq!(i.normal, Vector3::K);
}

#[test]
fn stored_normal_wins_over_winding() {
    // Winding alone would give +Z.
    let vertices = vec![
        Vector3::new(0.0, 1.0, 0.0),
        Vector3::new(-1.0, 0.0, 0.0),
        Vector3::new(1.0, 0.0, 0.0),
    ];
    let normals = vec![Vector3::new(0.0, 1.0, -1.0)];
    let faces = vec![Face { vertices: [0, 1, 2], normals: Some([0, 0, 0]) }];
    let m = Mesh::new(vertices, normals, faces).unwrap();

    let expected = Vector3::new(0.0, 1.0, -1.0).normalize().unwrap();
    let r = Ray::new(Vector3::new(0.0, 0.3, -1.0), Vector3::K).unwrap();
    let i = m.intersect(&r);
    assert!(i.is_hit);
    assert_eq!(i.normal, expected);
    assert_eq!(m.normal_at(&Vector3::new(0.0, 0.3, 0.0)), Some(expected));
}

#[test]
fn vertex_normals_are_interpolated() {
    let vertices = vec![Vector3::ZERO, Vector3::I, Vector3::J];
    let normals = vec![Vector3::I, Vector3::J, Vector3::K];
    let faces = vec![Face { vertices: [0, 1, 2], normals: Some([0, 1, 2]) }];
    let m = Mesh::new(vertices, normals, faces).unwrap();

    // At u = v = 0.25 the first corner weighs 0.5 and the others 0.25 each.
    let expected = Vector3::new(0.5, 0.25, 0.25).normalize().unwrap();
    let r = Ray::new(Vector3::new(0.25, 0.25, -1.0), Vector3::K).unwrap();
    let i = m.intersect(&r);
    assert!(i.is_hit);
    assert_eq!(i.point, Vector3::new(0.25, 0.25, 0.0));
    assert_eq!(i.normal, expected);
    assert_eq!(m.normal_at(&Vector3::new(0.25, 0.25, 0.0)), Some(expected));

    // At a corner only that corner's normal counts.
    assert_eq!(m.normal_at(&Vector3::I), Some(Vector3::J));
}
