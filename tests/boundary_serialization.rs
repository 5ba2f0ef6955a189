//! Boundary vector layout: sizes for serial, single-face and multi-face
//! partitions, and exact transfer between the vector and the side field.

mod common;

use common::block_mesh;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use schur_sweep::schur::vector_size;
use schur_sweep::transport::new_psi_bound;
use schur_sweep::{BoundaryLayout, FaceNeighbor, PartitionMesh, SchurError};

/// No partition faces, no unknowns.
#[test]
fn serial_partition_has_empty_vector() {
    let mesh = block_mesh(5, 3, 1, 1, 0, 2);
    let layout = BoundaryLayout::new(&mesh, 3).unwrap();
    assert_eq!(vector_size(&mesh, 3), 0);
    assert!(layout.is_empty());
    assert!(layout.to_vector(&new_psi_bound(&mesh, 3)).is_empty());
}

/// One cell per rank in a 2x1 split: a single partition face, incoming for
/// half of the directions.
#[test]
fn single_partition_face() {
    let (ng, per_quadrant) = (3, 2);
    for rank in 0..2 {
        let mesh = block_mesh(2, 1, 2, 1, rank, per_quadrant);
        let partition_faces = (0..4)
            .filter(|&f| matches!(mesh.neighbor(0, f), FaceNeighbor::Partition { .. }))
            .count();
        assert_eq!(partition_faces, 1);
        let incoming_angles = mesh.n_angles() / 2;
        let expected = incoming_angles * ng * mesh.n_vertices_per_face();
        assert_eq!(vector_size(&mesh, ng), expected);
        assert_eq!(BoundaryLayout::new(&mesh, ng).unwrap().len(), expected);
    }
}

/// Building the layout twice gives the same slots, and the size matches the
/// enumeration on every rank of a 3x2 split.
#[test]
fn layout_is_deterministic() {
    for rank in 0..6 {
        let mesh = block_mesh(7, 5, 3, 2, rank, 1);
        let a = BoundaryLayout::new(&mesh, 2).unwrap();
        let b = BoundaryLayout::new(&mesh, 2).unwrap();
        assert_eq!(a.slots(), b.slots());
        assert_eq!(a.len(), vector_size(&mesh, 2));
        assert!(a.len() > 0, "rank {rank}");
    }
}

/// Reading a vector into a side field and writing it back is exact.
#[test]
fn vector_survives_side_field() {
    let mut rng = StdRng::seed_from_u64(42);
    let mesh = block_mesh(6, 6, 3, 2, 4, 2);
    let ng = 2;
    let layout = BoundaryLayout::new(&mesh, ng).unwrap();
    let x: Vec<f64> = (0..layout.len()).map(|_| rng.gen_range(-1.0..1.0)).collect();

    let mut psi_bound = new_psi_bound(&mesh, ng);
    layout.read_vector(&x, &mut psi_bound).unwrap();
    let mut y = vec![0.0; layout.len()];
    layout.write_vector(&psi_bound, &mut y).unwrap();
    assert_eq!(x, y);
    assert_eq!(layout.to_vector(&psi_bound), x);
}

/// Only unknown slots are touched: domain sides and outgoing partition
/// entries keep their values.
#[test]
fn read_leaves_other_entries_alone() {
    let mesh = block_mesh(4, 4, 2, 2, 3, 1);
    let ng = 1;
    let layout = BoundaryLayout::new(&mesh, ng).unwrap();
    let mut psi_bound = new_psi_bound(&mesh, ng);
    psi_bound.set_to_value(7.0);
    layout.read_vector(&vec![0.0; layout.len()], &mut psi_bound).unwrap();

    let zeros = psi_bound.as_slice().iter().filter(|&&v| v == 0.0).count();
    let sevens = psi_bound.as_slice().iter().filter(|&&v| v == 7.0).count();
    assert_eq!(zeros, layout.len());
    assert_eq!(zeros + sevens, psi_bound.as_slice().len());
}

/// Side field to vector to fresh side field reproduces the unknown slots.
#[test]
fn side_field_survives_vector() {
    let mut rng = StdRng::seed_from_u64(7);
    let mesh = block_mesh(4, 6, 2, 3, 2, 1);
    let ng = 2;
    let layout = BoundaryLayout::new(&mesh, ng).unwrap();
    let mut original = new_psi_bound(&mesh, ng);
    for side in 0..mesh.n_sides() {
        for angle in 0..mesh.n_angles() {
            for v in original.side_data_mut(side, angle) {
                *v = rng.r#gen();
            }
        }
    }
    let x = layout.to_vector(&original);
    let mut copy = new_psi_bound(&mesh, ng);
    layout.read_vector(&x, &mut copy).unwrap();
    for s in layout.slots() {
        let key = (s.group, s.fvrtx, s.angle, s.side);
        assert_eq!(copy[key], original[key]);
    }
}

/// A vector of the wrong length is refused without touching the field.
#[test]
fn wrong_length_is_rejected() {
    let mesh = block_mesh(4, 4, 2, 2, 0, 1);
    let layout = BoundaryLayout::new(&mesh, 1).unwrap();
    let mut psi_bound = new_psi_bound(&mesh, 1);
    match layout.read_vector(&vec![1.0; layout.len() + 1], &mut psi_bound) {
        Err(SchurError::VectorSize { expected, actual }) => {
            assert_eq!(expected, layout.len());
            assert_eq!(actual, layout.len() + 1);
        }
        other => panic!("expected a size error, got {other:?}"),
    }
    assert!(psi_bound.as_slice().iter().all(|&v| v == 0.0));
}
