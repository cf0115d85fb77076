use crate::vector::Vector3;
use crate::ray::Ray;
use crate::intersect::Intersection;
use crate::light::Material;
use crate::shape::{ Shape, Transformable };

/// A shape with a material: anything the camera can see.
#[derive(Clone, Debug)]
pub struct Model {
    pub shape: Shape,
    pub material: Material,
}

impl Model {
    pub fn new<S: Into<Shape>>(shape: S, material: Material) -> Model {
        Model { shape: shape.into(), material }
    }

    pub fn intersects(&self, ray: &Ray) -> Intersection {
        self.shape.intersects(ray)
    }

    pub fn normal_at(&self, point: &Vector3) -> Option<Vector3> {
        self.shape.normal_at(point)
    }
}

impl Transformable for Model {
    fn translate(&mut self, offset: &Vector3) {
        self.shape.translate(offset);
    }

    fn rotate_x(&mut self, theta: f64, around_origin: bool) {
        self.shape.rotate_x(theta, around_origin);
    }

    fn rotate_y(&mut self, theta: f64, around_origin: bool) {
        self.shape.rotate_y(theta, around_origin);
    }

    fn rotate_z(&mut self, theta: f64, around_origin: bool) {
        self.shape.rotate_z(theta, around_origin);
    }
}

#[test]
fn cloned_mesh_model_shares_geometry() {
    use crate::mesh::{ Mesh, Face };

    let mesh = Mesh::new(
        vec![Vector3::ZERO, Vector3::I, Vector3::J],
        vec![],
        vec![Face { vertices: [0, 1, 2], normals: None }]
    ).unwrap();
    let a = Model::new(mesh, Material::default());
    let mut b = a.clone();
    b.translate(&Vector3::K);

    match (&a.shape, &b.shape) {
        (Shape::Mesh(ma), Shape::Mesh(mb)) => {
            assert!(std::ptr::eq(ma.vertices(), mb.vertices()));
            assert_eq!(ma.bounding_sphere().center, Vector3::ZERO);
            assert_eq!(mb.bounding_sphere().center, Vector3::K);
        },
        _ => unreachable!(),
    }
}
