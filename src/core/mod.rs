pub mod traits;
pub mod wrappers;

pub use traits::Operator;
pub use wrappers::{assemble_dense, FnOperator};
