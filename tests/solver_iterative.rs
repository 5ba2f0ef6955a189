//! GMRES and Richardson against a direct solve, serial and split across
//! thread-backed ranks.
//!
//! The distributed cases use block-diagonal systems: each rank owns one block,
//! so the only coupling between ranks is through the global inner products.
//! A correct distributed GMRES then matches the serial solve of the stacked
//! system iteration for iteration.

mod common;

use approx::assert_abs_diff_eq;
use common::run_ranks;
use faer::Mat;
use faer::linalg::solvers::SolveCore;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use schur_sweep::solver::{GmresSolver, RichardsonSolver};
use schur_sweep::{Comm, LinearSolver, SerialComm};

/// Random non-symmetric matrix `I + 0.4 M / n` and right-hand side.
fn random_system(n: usize, seed: u64) -> (Mat<f64>, Vec<f64>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let data: Vec<f64> = (0..n * n).map(|_| rng.r#gen()).collect();
    let a = Mat::from_fn(n, n, |i, j| {
        let m = 0.4 * data[j * n + i] / n as f64;
        if i == j { 1.0 + m } else { m }
    });
    let b: Vec<f64> = (0..n).map(|_| rng.r#gen()).collect();
    (a, b)
}

fn direct(a: &Mat<f64>, b: &[f64]) -> Vec<f64> {
    let n = b.len();
    let mut x = b.to_vec();
    let lu = faer::linalg::solvers::FullPivLu::new(a.as_ref());
    let x_mat = faer::MatMut::from_column_major_slice_mut(&mut x, n, 1);
    lu.solve_in_place_with_conj(faer::Conj::No, x_mat);
    x
}

/// GMRES with a short restart matches the LU solution.
#[test]
fn gmres_vs_direct_on_nonsymmetric() {
    let n = 20;
    let (mut a, b) = random_system(n, 3);
    let x_direct = direct(&a, &b);
    let mut x = vec![0.0; n];
    let stats = GmresSolver::new(5, 1e-12, 500)
        .solve(&mut a, &SerialComm, &b, &mut x)
        .unwrap();
    assert!(stats.converged);
    assert_eq!(stats.residual_history.len(), stats.iterations + 1);
    for i in 0..n {
        assert_abs_diff_eq!(x[i], x_direct[i], epsilon = 1e-9);
    }
}

/// Richardson converges on the same contraction.
#[test]
fn richardson_vs_direct_on_contraction() {
    let n = 12;
    let (mut a, b) = random_system(n, 9);
    let x_direct = direct(&a, &b);
    let mut x = vec![0.0; n];
    let stats = RichardsonSolver::new(1e-12, 1000)
        .solve(&mut a, &SerialComm, &b, &mut x)
        .unwrap();
    assert!(stats.converged);
    for i in 0..n {
        assert_abs_diff_eq!(x[i], x_direct[i], epsilon = 1e-9);
    }
}

/// Three ranks with one block each reproduce the serial solve of the stacked
/// block-diagonal system.
#[test]
fn distributed_gmres_matches_serial() {
    let (nb, ranks) = (6, 3);
    let blocks: Vec<(Mat<f64>, Vec<f64>)> = (0..ranks).map(|r| random_system(nb, 100 + r as u64)).collect();

    let n = nb * ranks;
    let mut stacked = Mat::<f64>::zeros(n, n);
    let mut b = vec![0.0; n];
    for (r, (a, br)) in blocks.iter().enumerate() {
        for i in 0..nb {
            b[r * nb + i] = br[i];
            for j in 0..nb {
                stacked[(r * nb + i, r * nb + j)] = a[(i, j)];
            }
        }
    }
    let mut x_serial = vec![0.0; n];
    let serial = GmresSolver::new(4, 1e-10, 200)
        .solve(&mut stacked, &SerialComm, &b, &mut x_serial)
        .unwrap();

    let results = run_ranks(ranks, |comm| {
        let (a, b) = &blocks[comm.rank()];
        let mut a = a.clone();
        let mut x = vec![0.0; nb];
        let stats = GmresSolver::new(4, 1e-10, 200).solve(&mut a, &comm, b, &mut x).unwrap();
        (stats.iterations, x)
    });
    for (r, (iterations, x)) in results.iter().enumerate() {
        assert_eq!(*iterations, serial.iterations);
        for i in 0..nb {
            assert_abs_diff_eq!(x[i], x_serial[r * nb + i], epsilon = 1e-8);
        }
    }
}
