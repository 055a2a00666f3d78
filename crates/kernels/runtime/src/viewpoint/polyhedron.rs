//! Geodesic camera shells built from subdivided regular polyhedra.
//!
//! # Algorithm
//!
//! 1. Start from a base solid projected onto the unit sphere. Solids with
//!    non-triangular faces are fanned into triangles around face centres
//!    (cube: 14 vertices / 24 triangles, dodecahedron: 32 / 60).
//! 2. For each subdivision, split every triangle into four through its edge
//!    midpoints, re-projected onto the sphere. Shared edges reuse the same
//!    midpoint, so vertices stay unique.
//! 3. Rotate the mesh so the centroid of its first face points along `+y`.
//! 4. Emit one location per vertex on every radius layer.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use vantage_foundation::vector_ops::{add, normalize, scale};
use vantage_foundation::{Quat, Vec3};

use super::{BASE_DIRECTION, Direction, Location, Viewpoint};
use crate::error::{Error, Result};

/// Base solid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RegularPolyhedron {
    Tetrahedron,
    Hexahedron,
    Octahedron,
    Dodecahedron,
    Icosahedron,
}

impl RegularPolyhedron {
    /// Solid with the given number of faces.
    pub fn from_faces(faces: usize) -> Option<Self> {
        match faces {
            4 => Some(Self::Tetrahedron),
            6 => Some(Self::Hexahedron),
            8 => Some(Self::Octahedron),
            12 => Some(Self::Dodecahedron),
            20 => Some(Self::Icosahedron),
            _ => None,
        }
    }

    /// Unit-sphere triangle mesh for this solid.
    pub fn mesh(&self) -> SphereMesh {
        match self {
            Self::Tetrahedron => SphereMesh::from_table(
                &[[-1.0, -1.0, 1.0], [1.0, 1.0, 1.0], [-1.0, 1.0, -1.0], [1.0, -1.0, -1.0]],
                &[[0, 1, 2], [0, 1, 3], [1, 2, 3], [0, 2, 3]],
            ),
            Self::Hexahedron => hexahedron(),
            Self::Octahedron => SphereMesh::from_table(
                &[
                    [0.0, 1.0, 0.0],
                    [1.0, 0.0, -1.0],
                    [-1.0, 0.0, -1.0],
                    [-1.0, 0.0, 1.0],
                    [1.0, 0.0, 1.0],
                    [0.0, -1.0, 0.0],
                ],
                &[
                    [0, 1, 2],
                    [0, 2, 3],
                    [0, 3, 4],
                    [0, 1, 4],
                    [1, 2, 5],
                    [2, 3, 5],
                    [3, 4, 5],
                    [1, 4, 5],
                ],
            ),
            Self::Dodecahedron => dodecahedron(),
            Self::Icosahedron => icosahedron(),
        }
    }
}

/// Triangle mesh whose vertices lie on the unit sphere.
#[derive(Debug, Clone, PartialEq)]
pub struct SphereMesh {
    pub vertices: Vec<Vec3>,
    pub faces: Vec<[usize; 3]>,
}

impl SphereMesh {
    fn from_table(vertices: &[Vec3], faces: &[[usize; 3]]) -> Self {
        Self {
            vertices: vertices.iter().map(|v| unit(*v)).collect(),
            faces: faces.to_vec(),
        }
    }

    /// Split each triangle into four, sharing midpoints across edges.
    pub fn subdivide(&self) -> SphereMesh {
        let mut vertices = self.vertices.clone();
        let mut midpoints: HashMap<(usize, usize), usize> = HashMap::new();
        let mut midpoint = |a: usize, b: usize, vertices: &mut Vec<Vec3>| -> usize {
            let key = (a.min(b), a.max(b));
            *midpoints.entry(key).or_insert_with(|| {
                let m = unit(scale(add(vertices[a], vertices[b]), 0.5));
                vertices.push(m);
                vertices.len() - 1
            })
        };

        let mut faces = Vec::with_capacity(self.faces.len() * 4);
        for &[a, b, c] in &self.faces {
            let ab = midpoint(a, b, &mut vertices);
            let bc = midpoint(b, c, &mut vertices);
            let ca = midpoint(c, a, &mut vertices);
            faces.push([a, ab, ca]);
            faces.push([b, ab, bc]);
            faces.push([c, bc, ca]);
            faces.push([ab, bc, ca]);
        }
        SphereMesh { vertices, faces }
    }

    /// Centroid direction of face `i`.
    pub fn face_normal(&self, i: usize) -> Vec3 {
        let [a, b, c] = self.faces[i];
        unit(add(add(self.vertices[a], self.vertices[b]), self.vertices[c]))
    }
}

fn unit(v: Vec3) -> Vec3 {
    normalize(v).unwrap_or(BASE_DIRECTION)
}

fn hexahedron() -> SphereMesh {
    let mut vertices: Vec<Vec3> = Vec::with_capacity(14);
    for z in [-1.0, 1.0] {
        for y in [-1.0, 1.0] {
            for x in [-1.0, 1.0] {
                vertices.push(unit([x, y, z]));
            }
        }
    }
    let corner = |x: usize, y: usize, z: usize| x + 2 * y + 4 * z;
    // Each cube face as its four corners in cyclic order.
    let quads: [[usize; 4]; 6] = [
        [corner(1, 0, 0), corner(1, 1, 0), corner(1, 1, 1), corner(1, 0, 1)],
        [corner(0, 0, 0), corner(0, 0, 1), corner(0, 1, 1), corner(0, 1, 0)],
        [corner(0, 1, 0), corner(0, 1, 1), corner(1, 1, 1), corner(1, 1, 0)],
        [corner(0, 0, 0), corner(1, 0, 0), corner(1, 0, 1), corner(0, 0, 1)],
        [corner(0, 0, 1), corner(1, 0, 1), corner(1, 1, 1), corner(0, 1, 1)],
        [corner(0, 0, 0), corner(0, 1, 0), corner(1, 1, 0), corner(1, 0, 0)],
    ];
    let mut faces = Vec::with_capacity(24);
    for quad in quads {
        let centre = quad
            .iter()
            .fold([0.0; 3], |acc, &i| add(acc, vertices[i]));
        vertices.push(unit(centre));
        let c = vertices.len() - 1;
        for k in 0..4 {
            faces.push([c, quad[k], quad[(k + 1) % 4]]);
        }
    }
    SphereMesh { vertices, faces }
}

fn icosahedron() -> SphereMesh {
    let tau = (1.0 + 5.0_f64.sqrt()) * 0.5;
    SphereMesh::from_table(
        &[
            [0.0, 1.0, tau],
            [1.0, tau, 0.0],
            [-1.0, tau, 0.0],
            [tau, 0.0, 1.0],
            [0.0, 1.0, -tau],
            [-tau, 0.0, 1.0],
            [0.0, -1.0, tau],
            [tau, 0.0, -1.0],
            [-tau, 0.0, -1.0],
            [1.0, -tau, 0.0],
            [0.0, -1.0, -tau],
            [-1.0, -tau, 0.0],
        ],
        &[
            [0, 1, 2],
            [0, 1, 3],
            [1, 2, 4],
            [0, 2, 5],
            [0, 3, 6],
            [1, 3, 7],
            [1, 4, 7],
            [2, 4, 8],
            [2, 5, 8],
            [0, 5, 6],
            [3, 6, 9],
            [3, 7, 9],
            [4, 7, 10],
            [4, 8, 10],
            [5, 8, 11],
            [5, 6, 11],
            [7, 9, 10],
            [8, 10, 11],
            [6, 9, 11],
            [9, 10, 11],
        ],
    )
}

/// Dodecahedron as the dual of the icosahedron, each pentagon fanned
/// around its centre (the dual icosahedron vertex).
fn dodecahedron() -> SphereMesh {
    let ico = icosahedron();
    let mut vertices = ico.vertices.clone();
    let offset = vertices.len();
    vertices.extend((0..ico.faces.len()).map(|i| ico.face_normal(i)));

    let mut edge_faces: HashMap<(usize, usize), Vec<usize>> = HashMap::new();
    for (f, &[a, b, c]) in ico.faces.iter().enumerate() {
        for (u, v) in [(a, b), (b, c), (c, a)] {
            edge_faces.entry((u.min(v), u.max(v))).or_default().push(f);
        }
    }
    let mut edges: Vec<_> = edge_faces.into_iter().collect();
    edges.sort_by_key(|(edge, _)| *edge);

    let mut faces = Vec::with_capacity(60);
    for ((u, v), adjacent) in edges {
        if let [f1, f2] = adjacent[..] {
            faces.push([u, offset + f1, offset + f2]);
            faces.push([v, offset + f1, offset + f2]);
        }
    }
    SphereMesh { vertices, faces }
}

/// Regular-polyhedron based shell generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PolyhedronGrid {
    pub solid: RegularPolyhedron,
    pub subdivisions: usize,
    /// Number of concentric radius layers.
    pub layers: usize,
    pub min_coord: [f64; 3],
    pub max_coord: [f64; 3],
}

impl Default for PolyhedronGrid {
    fn default() -> Self {
        Self {
            solid: RegularPolyhedron::Icosahedron,
            subdivisions: 0,
            layers: 1,
            min_coord: [-12.0; 3],
            max_coord: [12.0; 3],
        }
    }
}

impl PolyhedronGrid {
    /// Subdivided unit mesh after alignment.
    pub fn mesh(&self) -> SphereMesh {
        let mut mesh = self.solid.mesh();
        for _ in 0..self.subdivisions {
            mesh = mesh.subdivide();
        }
        let align = Quat::rotation_between(mesh.face_normal(0), BASE_DIRECTION);
        for v in &mut mesh.vertices {
            *v = align.rotate(*v);
        }
        mesh
    }

    pub fn generate(&self, direction: Direction) -> Result<Viewpoint> {
        if self.layers == 0 {
            return Err(Error::InvalidConfig(
                "polyhedron layers must be > 0".to_string(),
            ));
        }
        let mesh = self.mesh();
        let extent = self.max_coord[0] - self.min_coord[0];
        let mut viewpoint = Viewpoint::new();
        for layer in 0..self.layers {
            let r = extent * 0.5 * (layer + 1) as f64 / self.layers as f64;
            for v in &mesh.vertices {
                viewpoint.add(Location::facing_origin(direction, scale(*v, r)))?;
            }
        }
        Ok(viewpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vantage_foundation::vector_ops::length;

    fn count(solid: RegularPolyhedron, subdivisions: usize) -> (usize, usize) {
        let grid = PolyhedronGrid {
            solid,
            subdivisions,
            ..PolyhedronGrid::default()
        };
        let mesh = grid.mesh();
        (mesh.vertices.len(), mesh.faces.len())
    }

    #[test]
    fn test_base_solid_sizes() {
        assert_eq!(count(RegularPolyhedron::Tetrahedron, 0), (4, 4));
        assert_eq!(count(RegularPolyhedron::Hexahedron, 0), (14, 24));
        assert_eq!(count(RegularPolyhedron::Octahedron, 0), (6, 8));
        assert_eq!(count(RegularPolyhedron::Dodecahedron, 0), (32, 60));
        assert_eq!(count(RegularPolyhedron::Icosahedron, 0), (12, 20));
    }

    #[test]
    fn test_subdivision_shares_midpoints() {
        assert_eq!(count(RegularPolyhedron::Icosahedron, 1), (42, 80));
        assert_eq!(count(RegularPolyhedron::Icosahedron, 2), (162, 320));
        assert_eq!(count(RegularPolyhedron::Octahedron, 1), (18, 32));
    }

    #[test]
    fn test_layers_and_radius() {
        let grid = PolyhedronGrid {
            layers: 2,
            ..PolyhedronGrid::default()
        };
        let vp = grid.generate(Direction::Uni).unwrap();
        assert_eq!(vp.len(), 24);
        assert!((length(vp.at(0).unwrap().position) - 6.0).abs() < 1e-9);
        assert!((length(vp.at(12).unwrap().position) - 12.0).abs() < 1e-9);
        assert_eq!(vp.at(23).unwrap().index, 23);
    }

    #[test]
    fn test_first_face_aligned_up() {
        let mesh = PolyhedronGrid::default().mesh();
        let n = mesh.face_normal(0);
        assert!((n[1] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_from_faces() {
        assert_eq!(RegularPolyhedron::from_faces(20), Some(RegularPolyhedron::Icosahedron));
        assert_eq!(RegularPolyhedron::from_faces(7), None);
    }
}
