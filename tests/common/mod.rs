//! Helpers shared by the integration tests: thread-backed ranks and small
//! block-decomposed Cartesian problems.
#![allow(dead_code)]

use schur_sweep::{CartesianMesh, Quadrature, StepTransport, ThreadComm};

/// Run `f` once per rank, each on its own thread, and collect the results in
/// rank order.
pub fn run_ranks<R, F>(n: usize, f: F) -> Vec<R>
where
    F: Fn(ThreadComm) -> R + Sync,
    R: Send,
{
    let comms = ThreadComm::universe(n);
    std::thread::scope(|s| {
        let handles: Vec<_> = comms
            .into_iter()
            .map(|comm| {
                let f = &f;
                s.spawn(move || f(comm))
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("rank panicked"))
            .collect()
    })
}

pub fn block_mesh(nx: usize, ny: usize, px: usize, py: usize, rank: usize, n_quad: usize) -> CartesianMesh {
    CartesianMesh::new(nx, ny, 1.0, 1.0, px, py, rank, Quadrature::product(n_quad).unwrap()).unwrap()
}

/// One-group problem with isotropic scattering.
pub fn scattering_transport(mesh: CartesianMesh) -> StepTransport {
    StepTransport::new(mesh, vec![1.0], vec![0.5], vec![1.0], vec![0.3]).unwrap()
}
