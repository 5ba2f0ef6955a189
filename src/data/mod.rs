//! Flux fields owned by the drivers.

pub mod psi;
pub use psi::{PsiBoundData, PsiData};
