//! Plain-text flux dumps.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::data::PsiData;
use crate::error::SchurError;

/// One value per line, looping group, cell, angle, vertex (vertex fastest).
pub fn write_psi<W: Write>(out: &mut W, psi: &PsiData) -> Result<(), SchurError> {
    for group in 0..psi.n_groups() {
        for cell in 0..psi.n_cells() {
            for angle in 0..psi.n_angles() {
                for &v in psi.vertices(angle, cell, group) {
                    writeln!(out, "{v:.17e}")?;
                }
            }
        }
    }
    Ok(())
}

pub fn write_psi_file(path: impl AsRef<Path>, psi: &PsiData) -> Result<(), SchurError> {
    let mut out = BufWriter::new(File::create(path)?);
    write_psi(&mut out, psi)?;
    out.flush()?;
    Ok(())
}
