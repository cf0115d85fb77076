use std::io::{ self, prelude::* };
use std::path::Path;
use std::fs::File;

use log::debug;

use crate::vector::Vector3;
use crate::mesh::{ Face, Mesh };
use crate::error::ObjError;

/// A vertex reference of a face: one-based vertex index and optional
/// one-based normal index, as written in the file.
type ObjVertex = (usize, Option<usize>);

/// A parser for OBJ files.
///
/// Only geometry is read: vertices (`v`), vertex normals (`vn`) and faces
/// (`f`). Everything else (texture coordinates, groups, materials, comments)
/// is skipped, and each skipped line increments `ignored_lines` by 1.
#[derive(Clone, Debug, Default)]
pub struct ObjParser {
    pub ignored_lines: usize,

    pub vertices: Vec<Vector3>,
    pub normals: Vec<Vector3>,
    pub faces: Vec<Face>,
}

impl ObjParser {
    /// Creates an empty `ObjParser`.
    pub fn new() -> ObjParser {
        ObjParser::default()
    }

    /// Parses OBJ records from `reader`, appending to what was parsed so far.
    pub fn parse<R: BufRead>(&mut self, reader: R) -> Result<(), ObjError> {
        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();

            // Ignore empty lines.
            if line.is_empty() {
                continue;
            }

            // Line numbers in errors are one-based, like in an editor.
            self.handle_command(i + 1, line)?;
        }

        debug!(
            "parsed {} vertices, {} normals and {} faces ({} lines ignored)",
            self.vertices.len(), self.normals.len(), self.faces.len(),
            self.ignored_lines
        );
        Ok(())
    }

    /// Parses OBJ records held in a string.
    pub fn parse_str(&mut self, text: &str) -> Result<(), ObjError> {
        self.parse(text.as_bytes())
    }

    /// Builds a `Mesh` from everything parsed so far.
    pub fn into_mesh(self) -> Result<Mesh, ObjError> {
        Ok(Mesh::new(self.vertices, self.normals, self.faces)?)
    }

    /// Parses a line of an OBJ file.
    ///
    /// A sample OBJ file may look like the following:
    ///
    /// ```obj
    /// v -1 1 0
    /// v -1 0 0
    /// v 1 0 0
    /// v 1 1 0
    /// vn 0 0 -1
    ///
    /// f 1//1 2//1 3//1
    /// f 1/7/1 3/8/1 4/9/1
    /// ```
    ///
    /// The first word of each line stands for a function, and all words after
    /// it are arguments to said function.
    ///
    /// Function `v` specifies a **v**ertex in space, as a point. Function `vn`
    /// specifies a **v**ertex **n**ormal, which is normalized on load.
    /// Function `f` specifies a **f**ace, composed of vertices. Each vertex
    /// of a face is written `v`, `v/vt`, `v//vn` or `v/vt/vn`, where all
    /// indices start at 1. Texture indices are accepted and dropped.
    fn handle_command(&mut self, line_no: usize, line: &str) -> Result<(), ObjError> {
        let mut params = line.split_whitespace();
        match params.next() {
            Some("v") => {
                let v = parse_vector(line_no, params)?;
                self.vertices.push(v);
            },

            Some("vn") => {
                let n = parse_vector(line_no, params)?;
                // A zero normal cannot be normalized; keep it as written and
                // let the mesh fall back to the face winding.
                self.normals.push(n.normalize().unwrap_or(n));
            },

            Some("f") => {
                let mut face: Vec<ObjVertex> = Vec::new();
                for vertex in params {
                    face.push(self.parse_face_vertex(line_no, vertex)?);
                }

                if face.len() < 3 {
                    return Err(ObjError::TooFewVertices { line: line_no });
                }

                let triangles = fan_triangulation(&face);
                self.faces.extend(triangles);
            },

            // If this line has an unrecognized function, ignore it.
            _ => self.ignored_lines += 1,
        }

        Ok(())
    }

    /// Parses one `v[/vt][/vn]` reference of a face, checking that it refers
    /// to vertices and normals defined earlier in the file.
    fn parse_face_vertex(&self, line_no: usize, token: &str)
        -> Result<ObjVertex, ObjError> {
        let attributes: Vec<&str> = token.split('/').collect();
        if attributes.len() > 3 {
            return Err(ObjError::BadNumber { line: line_no, token: token.into() });
        }

        let v = parse_index(line_no, attributes[0])?;
        if v == 0 || v > self.vertices.len() {
            return Err(ObjError::BadIndex { line: line_no, index: v, kind: "vertex" });
        }

        let n = match attributes.get(2) {
            Some(s) if !s.is_empty() => {
                let n = parse_index(line_no, s)?;
                if n == 0 || n > self.normals.len() {
                    return Err(ObjError::BadIndex {
                        line: line_no, index: n, kind: "normal"
                    });
                }
                Some(n)
            },
            _ => None,
        };

        Ok((v, n))
    }
}

/// Loads an OBJ file from disk into a `Mesh`.
pub fn load(path: &Path) -> Result<Mesh, ObjError> {
    let obj_file = File::open(path)?;
    let mut parser = ObjParser::new();
    parser.parse(io::BufReader::new(obj_file))?;

    debug!("loaded mesh from {:?}", path);
    parser.into_mesh()
}

fn parse_index(line_no: usize, token: &str) -> Result<usize, ObjError> {
    token.parse().map_err(|_| ObjError::BadNumber {
        line: line_no, token: token.into()
    })
}

/// Parses the first three numbers of a `v` or `vn` record. A fourth
/// (homogeneous) component, if present, is dropped.
fn parse_vector<'a, I>(line_no: usize, params: I) -> Result<Vector3, ObjError>
    where I: Iterator<Item = &'a str> {
    let mut xyz = [0.0; 3];
    let mut count = 0;
    for token in params.take(3) {
        xyz[count] = token.parse().map_err(|_| ObjError::BadNumber {
            line: line_no, token: token.into()
        })?;
        count += 1;
    }

    if count < 3 {
        return Err(ObjError::MissingComponents { line: line_no, expected: 3 });
    }

    Ok(Vector3::from(xyz))
}

/// Partitions a list of vertices into triangles.
///
/// In an OBJ file, faces can be specified like so:
///
/// ```obj
/// f 1 2 3 4 5
/// ```
///
/// This face references vertices 1, 2, 3, 4 and 5. Typically, these
/// vertices would make a pentagon of some sort.
///
/// Since meshes are made of triangles only, a polygon is split with a "fan
/// triangulation":
///
/// ```text
///         B *
///          / \
///         /   \
///        /     \
///     A *       * C
///       |       |
///       |       |
///       |       |
///     E * ----- * D
/// ```
///
/// Starting at `A`, we make a triangle `A-B-C`, then `A-C-D`, and finally
/// `A-D-E`. The first vertex stays fixed while the other two "ride" the
/// edges of the polygon.
///
/// The returned faces use zero-based indices. A triangle only keeps normal
/// indices when all three of its corners have one.
fn fan_triangulation(face: &[ObjVertex]) -> Vec<Face> {
    let mut triangles = Vec::new();

    for i in 1..(face.len() - 1) {
        let corners = [face[0], face[i], face[i + 1]];
        let normals = match (corners[0].1, corners[1].1, corners[2].1) {
            (Some(n1), Some(n2), Some(n3)) => Some([n1 - 1, n2 - 1, n3 - 1]),
            _ => None,
        };

        triangles.push(Face {
            vertices: [corners[0].0 - 1, corners[1].0 - 1, corners[2].0 - 1],
            normals,
        });
    }

    triangles
}

#[test]
fn ignoring_unrecognized_lines() {
    let gibberish = "\
There was a young lady named Bright
who traveled much faster than light.
She set out one day
in a relative way,
and came back the previous night.
";

    let mut obj_parser = ObjParser::new();
    obj_parser.parse_str(gibberish).unwrap();

    assert_eq!(obj_parser.ignored_lines, 5);
    assert!(obj_parser.vertices.is_empty());
}

#[test]
fn vertex_records() {
    let mut obj_parser = ObjParser::new();
    obj_parser.parse_str("v -1 1 0\nv -1.0000 0.5000 0.0000\nv 1 0 0\nv 1 1 0\n")
        .unwrap();

    assert_eq!(obj_parser.vertices[0], Vector3::new(-1.0, 1.0, 0.0));
    assert_eq!(obj_parser.vertices[1], Vector3::new(-1.0, 0.5, 0.0));
    assert_eq!(obj_parser.vertices[2], Vector3::new( 1.0, 0.0, 0.0));
    assert_eq!(obj_parser.vertices[3], Vector3::new( 1.0, 1.0, 0.0));
    assert_eq!(obj_parser.ignored_lines, 0);
}

#[test]
fn parsing_triangle_faces() {
    let mut obj_parser = ObjParser::new();
    obj_parser.parse_str("\
v -1 1 0
v -1 0 0
v 1 0 0
v 1 1 0

f 1 2 3
f 1 3 4
").unwrap();

    assert_eq!(obj_parser.faces, vec![
        Face { vertices: [0, 1, 2], normals: None },
        Face { vertices: [0, 2, 3], normals: None },
    ]);
}

#[test]
fn triangulating_polygons() {
    let mut obj_parser = ObjParser::new();
    obj_parser.parse_str("\
v -1 1 0
v -1 0 0
v 1 0 0
v 1 1 0
v 0 2 0

f 1 2 3 4 5
").unwrap();

    assert_eq!(obj_parser.faces, vec![
        Face { vertices: [0, 1, 2], normals: None },
        Face { vertices: [0, 2, 3], normals: None },
        Face { vertices: [0, 3, 4], normals: None },
    ]);
}

#[test]
fn vertex_normal_records() {
    let mut obj_parser = ObjParser::new();
    obj_parser.parse_str("vn 0 0 1\nvn 0.707 0 -0.707\nvn 1 2 3\n").unwrap();

    assert_eq!(obj_parser.normals[0], Vector3::new(0.0, 0.0, 1.0));
    assert_eq!(obj_parser.normals[1], Vector3::new(0.70711, 0.0, -0.70711));
    assert_eq!(obj_parser.normals[2], Vector3::new(1.0, 2.0, 3.0).normalize().unwrap());
}

#[test]
fn faces_with_normals() {
    let mut obj_parser = ObjParser::new();
    obj_parser.parse_str("\
v 0 1 0
v -1 0 0
v 1 0 0

vn -1 0 0
vn 1 0 0
vn 0 1 0

f 1//3 2//1 3//2
f 1/0/3 2/102/1 3/14/2
").unwrap();

    let expected = Face { vertices: [0, 1, 2], normals: Some([2, 0, 1]) };
    assert_eq!(obj_parser.faces, vec![expected, expected]);
}

#[test]
fn mixed_normals_drop_to_winding() {
    let mut obj_parser = ObjParser::new();
    obj_parser.parse_str("v 0 1 0\nv -1 0 0\nv 1 0 0\nvn 0 0 1\nf 1//1 2 3//1\n")
        .unwrap();

    assert_eq!(obj_parser.faces[0].normals, None);
}

#[test]
fn malformed_records_are_errors() {
    let mut p = ObjParser::new();
    match p.parse_str("v 1 zero 0\n") {
        Err(ObjError::BadNumber { line: 1, token }) => assert_eq!(token, "zero"),
        other => panic!("unexpected result {:?}", other),
    }

    let mut p = ObjParser::new();
    match p.parse_str("v 1 0\n") {
        Err(ObjError::MissingComponents { line: 1, expected: 3 }) => (),
        other => panic!("unexpected result {:?}", other),
    }

    let mut p = ObjParser::new();
    match p.parse_str("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 4\n") {
        Err(ObjError::BadIndex { line: 4, index: 4, kind: "vertex" }) => (),
        other => panic!("unexpected result {:?}", other),
    }

    let mut p = ObjParser::new();
    match p.parse_str("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 0 1 2\n") {
        Err(ObjError::BadIndex { line: 4, index: 0, kind: "vertex" }) => (),
        other => panic!("unexpected result {:?}", other),
    }

    let mut p = ObjParser::new();
    match p.parse_str("v 0 0 0\nv 1 0 0\nf 1//1 2//1 1//1\n") {
        Err(ObjError::BadIndex { line: 3, index: 1, kind: "normal" }) => (),
        other => panic!("unexpected result {:?}", other),
    }

    let mut p = ObjParser::new();
    match p.parse_str("v 0 0 0\nv 1 0 0\nf 1 2\n") {
        Err(ObjError::TooFewVertices { line: 3 }) => (),
        other => panic!("unexpected result {:?}", other),
    }
}

#[test]
fn parsed_mesh_has_bounds_and_intersects() {
    use crate::ray::Ray;

    let mut obj_parser = ObjParser::new();
    obj_parser.parse_str("\
# a unit square facing the camera
v -1 -1 0
v 1 -1 0
v 1 1 0
v -1 1 0
vn 0 0 -1
f 1//1 3//1 2//1
f 1//1 4//1 3//1
").unwrap();
    assert_eq!(obj_parser.ignored_lines, 1);

    let mesh = obj_parser.into_mesh().unwrap();
    assert_eq!(mesh.faces().len(), 2);
    assert!(crate::feq(mesh.bounding_sphere().radius, 2f64.sqrt()));

    let r = Ray::new(Vector3::new(0.5, 0.25, -2.0), Vector3::K).unwrap();
    let i = mesh.intersect(&r);
    assert!(i.is_hit);
    assert!(crate::feq(i.t, 2.0));
    assert_eq!(i.normal, -Vector3::K);
}

#[test]
fn loading_a_missing_file_fails() {
    match load(Path::new("./does/not/exist.obj")) {
        Err(ObjError::Io(_)) => (),
        other => panic!("unexpected result {:?}", other),
    }
}
