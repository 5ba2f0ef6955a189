//! Structured 2-D reference mesh split into rectangular rank blocks.
//!
//! The global `nx × ny` grid of quadrilaterals covers `[0, lx] × [0, ly]` and is
//! cut into `px × py` blocks; rank `bx + px * by` owns block `(bx, by)`. Cells
//! have four vertices (`0 = (x0, y0)`, `1 = (x1, y0)`, `2 = (x0, y1)`,
//! `3 = (x1, y1)`) and four faces (west, east, south, north).

use std::collections::HashMap;

use super::{FaceNeighbor, PartitionMesh};
use crate::error::SchurError;

pub const WEST: usize = 0;
pub const EAST: usize = 1;
pub const SOUTH: usize = 2;
pub const NORTH: usize = 3;

const FACE_VERTICES: [[usize; 2]; 4] = [[0, 2], [1, 3], [0, 1], [2, 3]];
const OUTWARD_NORMALS: [[f64; 2]; 4] = [[-1.0, 0.0], [1.0, 0.0], [0.0, -1.0], [0.0, 1.0]];

/// Discrete ordinates in the plane.
#[derive(Debug, Clone, PartialEq)]
pub struct Quadrature {
    directions: Vec<[f64; 2]>,
    weights: Vec<f64>,
}

impl Quadrature {
    /// `n` equally spaced polar angles per quadrant, `4n` directions in total,
    /// equal weights summing to one.
    pub fn product(n: usize) -> Result<Self, SchurError> {
        if n == 0 {
            return Err(SchurError::Mesh("quadrature needs at least one angle per quadrant".into()));
        }
        let signs = [[1.0, 1.0], [-1.0, 1.0], [-1.0, -1.0], [1.0, -1.0]];
        let mut directions = Vec::with_capacity(4 * n);
        for [sx, sy] in signs {
            for k in 0..n {
                let theta = (k as f64 + 0.5) * std::f64::consts::FRAC_PI_2 / n as f64;
                directions.push([sx * theta.cos(), sy * theta.sin()]);
            }
        }
        let weights = vec![1.0 / (4 * n) as f64; 4 * n];
        Ok(Self { directions, weights })
    }

    pub fn len(&self) -> usize {
        self.directions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.directions.is_empty()
    }

    pub fn direction(&self, angle: usize) -> [f64; 2] {
        self.directions[angle]
    }

    pub fn weight(&self, angle: usize) -> f64 {
        self.weights[angle]
    }
}

#[derive(Debug, Clone)]
pub struct CartesianMesh {
    nx: usize,
    ny: usize,
    px: usize,
    py: usize,
    rank: usize,
    dx: f64,
    dy: f64,
    // global index of the first local cell in x and y
    i0: usize,
    j0: usize,
    lnx: usize,
    lny: usize,
    quadrature: Quadrature,
    // side index per (cell, face), None for interior faces
    side_of: Vec<Option<usize>>,
    sides: Vec<(usize, usize)>,
    global_sides: Vec<u64>,
    side_lookup: HashMap<u64, usize>,
}

fn block_start(block: usize, n: usize, parts: usize) -> usize {
    block * n / parts
}

fn owning_block(index: usize, n: usize, parts: usize) -> usize {
    (0..parts)
        .find(|&b| index < block_start(b + 1, n, parts))
        .unwrap_or(parts - 1)
}

impl CartesianMesh {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        nx: usize,
        ny: usize,
        lx: f64,
        ly: f64,
        px: usize,
        py: usize,
        rank: usize,
        quadrature: Quadrature,
    ) -> Result<Self, SchurError> {
        if px == 0 || py == 0 || nx < px || ny < py {
            return Err(SchurError::Mesh(format!(
                "cannot split a {nx}x{ny} grid into {px}x{py} blocks"
            )));
        }
        if rank >= px * py {
            return Err(SchurError::Mesh(format!("rank {rank} outside a {px}x{py} decomposition")));
        }
        if !(lx > 0.0 && ly > 0.0) {
            return Err(SchurError::Mesh(format!("domain {lx}x{ly} must have positive extent")));
        }
        let (bx, by) = (rank % px, rank / px);
        let i0 = block_start(bx, nx, px);
        let j0 = block_start(by, ny, py);
        let lnx = block_start(bx + 1, nx, px) - i0;
        let lny = block_start(by + 1, ny, py) - j0;

        let mut mesh = Self {
            nx,
            ny,
            px,
            py,
            rank,
            dx: lx / nx as f64,
            dy: ly / ny as f64,
            i0,
            j0,
            lnx,
            lny,
            quadrature,
            side_of: vec![None; lnx * lny * 4],
            sides: Vec::new(),
            global_sides: Vec::new(),
            side_lookup: HashMap::new(),
        };
        for cell in 0..lnx * lny {
            for face in 0..4 {
                if mesh.local_neighbor(cell, face).is_none() {
                    let side = mesh.sides.len();
                    let gid = mesh.global_side_of(cell, face);
                    mesh.side_of[cell * 4 + face] = Some(side);
                    mesh.sides.push((cell, face));
                    mesh.global_sides.push(gid);
                    mesh.side_lookup.insert(gid, side);
                }
            }
        }
        Ok(mesh)
    }

    pub fn rank(&self) -> usize {
        self.rank
    }
    pub fn dx(&self) -> f64 {
        self.dx
    }
    pub fn dy(&self) -> f64 {
        self.dy
    }
    pub fn local_extent(&self) -> (usize, usize) {
        (self.lnx, self.lny)
    }
    pub fn global_extent(&self) -> (usize, usize) {
        (self.nx, self.ny)
    }
    pub fn quadrature(&self) -> &Quadrature {
        &self.quadrature
    }

    pub fn cell_index(&self, i: usize, j: usize) -> usize {
        i + self.lnx * j
    }

    pub fn cell_ij(&self, cell: usize) -> (usize, usize) {
        (cell % self.lnx, cell / self.lnx)
    }

    /// Row-major index of a local cell in the undivided grid.
    pub fn global_cell(&self, cell: usize) -> usize {
        let (i, j) = self.cell_ij(cell);
        (self.i0 + i) + self.nx * (self.j0 + j)
    }

    /// Local side index of a boundary face of this block.
    pub fn side(&self, cell: usize, face: usize) -> Option<usize> {
        self.side_of[cell * 4 + face]
    }

    fn local_neighbor(&self, cell: usize, face: usize) -> Option<usize> {
        let (i, j) = self.cell_ij(cell);
        match face {
            WEST if i > 0 => Some(self.cell_index(i - 1, j)),
            EAST if i + 1 < self.lnx => Some(self.cell_index(i + 1, j)),
            SOUTH if j > 0 => Some(self.cell_index(i, j - 1)),
            NORTH if j + 1 < self.lny => Some(self.cell_index(i, j + 1)),
            _ => None,
        }
    }

    /// Global coordinates of the cell across `face`, if inside the domain.
    fn global_neighbor(&self, cell: usize, face: usize) -> Option<(usize, usize)> {
        let (i, j) = self.cell_ij(cell);
        let (gi, gj) = (self.i0 + i, self.j0 + j);
        match face {
            WEST => gi.checked_sub(1).map(|g| (g, gj)),
            EAST => (gi + 1 < self.nx).then_some((gi + 1, gj)),
            SOUTH => gj.checked_sub(1).map(|g| (gi, g)),
            _ => (gj + 1 < self.ny).then_some((gi, gj + 1)),
        }
    }

    fn global_side_of(&self, cell: usize, face: usize) -> u64 {
        let (i, j) = self.cell_ij(cell);
        let (gi, gj) = (self.i0 + i, self.j0 + j);
        let n_x_faces = (self.nx + 1) * self.ny;
        let id = match face {
            WEST => gi + (self.nx + 1) * gj,
            EAST => gi + 1 + (self.nx + 1) * gj,
            SOUTH => n_x_faces + gi + self.nx * gj,
            _ => n_x_faces + gi + self.nx * (gj + 1),
        };
        id as u64
    }
}

impl PartitionMesh for CartesianMesh {
    fn n_cells(&self) -> usize {
        self.lnx * self.lny
    }
    fn n_faces_per_cell(&self) -> usize {
        4
    }
    fn n_vertices_per_cell(&self) -> usize {
        4
    }
    fn n_vertices_per_face(&self) -> usize {
        2
    }
    fn n_sides(&self) -> usize {
        self.sides.len()
    }
    fn n_angles(&self) -> usize {
        self.quadrature.len()
    }

    fn neighbor(&self, cell: usize, face: usize) -> FaceNeighbor {
        if let Some(adj) = self.local_neighbor(cell, face) {
            return FaceNeighbor::Cell(adj);
        }
        // every non-local face was given a side in `new`
        let side = self.side_of[cell * 4 + face].unwrap_or(usize::MAX);
        match self.global_neighbor(cell, face) {
            Some((gi, gj)) => {
                let bx = owning_block(gi, self.nx, self.px);
                let by = owning_block(gj, self.ny, self.py);
                FaceNeighbor::Partition { rank: bx + self.px * by, side }
            }
            None => FaceNeighbor::Domain { side },
        }
    }

    fn is_incoming(&self, angle: usize, _cell: usize, face: usize) -> bool {
        let [mu, eta] = self.quadrature.direction(angle);
        let [nx, ny] = OUTWARD_NORMALS[face];
        mu * nx + eta * ny < 0.0
    }

    fn face_vertex(&self, _cell: usize, face: usize, fvrtx: usize) -> usize {
        FACE_VERTICES[face][fvrtx]
    }

    fn global_side(&self, side: usize) -> u64 {
        self.global_sides[side]
    }

    fn local_side(&self, global: u64) -> Option<usize> {
        self.side_lookup.get(&global).copied()
    }
}
