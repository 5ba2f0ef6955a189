//! Angular flux storage.
//!
//! [`PsiData`] holds the volumetric angular flux, vertex fastest then angle,
//! cell, group. [`PsiBoundData`] holds the flux on partition sides, group
//! fastest then face vertex, angle, side, so that one `(side, angle)` block is
//! a contiguous run of `n_groups * n_face_vertices` values.

use std::ops::{Index, IndexMut};

/// Volumetric angular flux indexed by `(vertex, angle, cell, group)`.
#[derive(Debug, Clone, PartialEq)]
pub struct PsiData {
    n_vertices: usize,
    n_angles: usize,
    n_cells: usize,
    n_groups: usize,
    data: Vec<f64>,
}

impl PsiData {
    pub fn new(n_vertices: usize, n_angles: usize, n_cells: usize, n_groups: usize) -> Self {
        Self {
            n_vertices,
            n_angles,
            n_cells,
            n_groups,
            data: vec![0.0; n_vertices * n_angles * n_cells * n_groups],
        }
    }

    pub fn zeros_like(other: &PsiData) -> Self {
        Self::new(other.n_vertices, other.n_angles, other.n_cells, other.n_groups)
    }

    pub fn n_vertices(&self) -> usize {
        self.n_vertices
    }
    pub fn n_angles(&self) -> usize {
        self.n_angles
    }
    pub fn n_cells(&self) -> usize {
        self.n_cells
    }
    pub fn n_groups(&self) -> usize {
        self.n_groups
    }

    #[inline]
    fn offset(&self, vertex: usize, angle: usize, cell: usize, group: usize) -> usize {
        debug_assert!(vertex < self.n_vertices && angle < self.n_angles);
        debug_assert!(cell < self.n_cells && group < self.n_groups);
        vertex + self.n_vertices * (angle + self.n_angles * (cell + self.n_cells * group))
    }

    pub fn set_to_value(&mut self, value: f64) {
        self.data.fill(value);
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// Values of one `(angle, cell, group)` across the cell's vertices.
    pub fn vertices(&self, angle: usize, cell: usize, group: usize) -> &[f64] {
        let start = self.offset(0, angle, cell, group);
        &self.data[start..start + self.n_vertices]
    }

    pub fn vertices_mut(&mut self, angle: usize, cell: usize, group: usize) -> &mut [f64] {
        let start = self.offset(0, angle, cell, group);
        &mut self.data[start..start + self.n_vertices]
    }
}

impl Index<(usize, usize, usize, usize)> for PsiData {
    type Output = f64;
    fn index(&self, (v, a, c, g): (usize, usize, usize, usize)) -> &f64 {
        &self.data[self.offset(v, a, c, g)]
    }
}

impl IndexMut<(usize, usize, usize, usize)> for PsiData {
    fn index_mut(&mut self, (v, a, c, g): (usize, usize, usize, usize)) -> &mut f64 {
        let i = self.offset(v, a, c, g);
        &mut self.data[i]
    }
}

/// Side angular flux indexed by `(group, face_vertex, angle, side)`.
#[derive(Debug, Clone, PartialEq)]
pub struct PsiBoundData {
    n_groups: usize,
    n_face_vertices: usize,
    n_angles: usize,
    n_sides: usize,
    data: Vec<f64>,
}

impl PsiBoundData {
    pub fn new(n_groups: usize, n_face_vertices: usize, n_angles: usize, n_sides: usize) -> Self {
        Self {
            n_groups,
            n_face_vertices,
            n_angles,
            n_sides,
            data: vec![0.0; n_groups * n_face_vertices * n_angles * n_sides],
        }
    }

    pub fn zeros_like(other: &PsiBoundData) -> Self {
        Self::new(other.n_groups, other.n_face_vertices, other.n_angles, other.n_sides)
    }

    pub fn n_groups(&self) -> usize {
        self.n_groups
    }
    pub fn n_face_vertices(&self) -> usize {
        self.n_face_vertices
    }
    pub fn n_angles(&self) -> usize {
        self.n_angles
    }
    pub fn n_sides(&self) -> usize {
        self.n_sides
    }

    /// Length of one `(side, angle)` block.
    pub fn block_len(&self) -> usize {
        self.n_groups * self.n_face_vertices
    }

    #[inline]
    fn offset(&self, group: usize, fvrtx: usize, angle: usize, side: usize) -> usize {
        debug_assert!(group < self.n_groups && fvrtx < self.n_face_vertices);
        debug_assert!(angle < self.n_angles && side < self.n_sides);
        group + self.n_groups * (fvrtx + self.n_face_vertices * (angle + self.n_angles * side))
    }

    pub fn set_to_value(&mut self, value: f64) {
        self.data.fill(value);
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn side_data(&self, side: usize, angle: usize) -> &[f64] {
        let start = self.offset(0, 0, angle, side);
        &self.data[start..start + self.block_len()]
    }

    pub fn side_data_mut(&mut self, side: usize, angle: usize) -> &mut [f64] {
        let start = self.offset(0, 0, angle, side);
        let len = self.block_len();
        &mut self.data[start..start + len]
    }
}

impl Index<(usize, usize, usize, usize)> for PsiBoundData {
    type Output = f64;
    fn index(&self, (g, fv, a, s): (usize, usize, usize, usize)) -> &f64 {
        &self.data[self.offset(g, fv, a, s)]
    }
}

impl IndexMut<(usize, usize, usize, usize)> for PsiBoundData {
    fn index_mut(&mut self, (g, fv, a, s): (usize, usize, usize, usize)) -> &mut f64 {
        let i = self.offset(g, fv, a, s);
        &mut self.data[i]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn psi_layout_is_vertex_fastest() {
        let mut psi = PsiData::new(4, 3, 2, 2);
        psi[(1, 0, 0, 0)] = 1.0;
        psi[(0, 1, 0, 0)] = 2.0;
        psi[(0, 0, 1, 0)] = 3.0;
        psi[(0, 0, 0, 1)] = 4.0;
        let s = psi.as_slice();
        assert_eq!(s[1], 1.0);
        assert_eq!(s[4], 2.0);
        assert_eq!(s[12], 3.0);
        assert_eq!(s[24], 4.0);
        assert_eq!(psi.vertices(1, 0, 0), &[2.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn side_block_is_contiguous() {
        let mut bound = PsiBoundData::new(2, 2, 3, 5);
        bound[(1, 1, 2, 4)] = 7.0;
        bound[(0, 0, 2, 4)] = 5.0;
        assert_eq!(bound.block_len(), 4);
        assert_eq!(bound.side_data(4, 2), &[5.0, 0.0, 0.0, 7.0]);
        bound.side_data_mut(0, 0).fill(1.0);
        assert_eq!(bound[(1, 1, 0, 0)], 1.0);
        assert_eq!(bound[(0, 0, 1, 0)], 0.0);
    }
}
