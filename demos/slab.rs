use std::path::PathBuf;

use schur_sweep::utils::write_psi_file;
use schur_sweep::{
    CartesianMesh, Comm, Quadrature, SchurError, SchurOptions, SchurOuterSweeper, SchurSweeper, StepTransport,
    ThreadComm,
};

// usage: slab [plain|outer] [ranks per side] [output dir]
fn main() -> Result<(), SchurError> {
    let mut args = std::env::args().skip(1);
    let variant = args.next().unwrap_or_else(|| "plain".into());
    let p: usize = args.next().and_then(|s| s.parse().ok()).unwrap_or(2);
    let out_dir = args.next().map(PathBuf::from);
    let n = 16;

    let comms = ThreadComm::universe(p * p);
    let results: Vec<Result<(), SchurError>> = std::thread::scope(|s| {
        let handles: Vec<_> = comms
            .into_iter()
            .map(|comm| {
                let (variant, out_dir) = (&variant, &out_dir);
                s.spawn(move || run_rank(comm, variant, n, p, out_dir.as_deref()))
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap_or_else(|_| Err(SchurError::SolveError("rank panicked".into()))))
            .collect()
    });
    results.into_iter().collect()
}

fn run_rank(
    comm: ThreadComm,
    variant: &str,
    n: usize,
    p: usize,
    out_dir: Option<&std::path::Path>,
) -> Result<(), SchurError> {
    let rank = comm.rank();
    let mesh = CartesianMesh::new(n, n, 1.0, 1.0, p, p, rank, Quadrature::product(2)?)?;
    let transport = StepTransport::new(mesh.clone(), vec![1.0], vec![0.9], vec![1.0], vec![0.0])?;
    let options = SchurOptions::default().with_dd_tol(1e-10);

    let psi = match variant {
        "outer" => {
            let mut driver = SchurOuterSweeper::new(mesh, transport, &comm, options)?;
            let report = driver.solve()?;
            if rank == 0 {
                println!("outer: {report:?}");
            }
            driver.psi().clone()
        }
        _ => {
            let mut driver = SchurSweeper::new(mesh, transport, &comm, options)?;
            let report = driver.solve()?;
            if rank == 0 {
                println!("plain: {report:?}");
            }
            driver.psi().clone()
        }
    };
    if let Some(dir) = out_dir {
        write_psi_file(dir.join(format!("psi_{rank}.txt")), &psi)?;
    }
    Ok(())
}
