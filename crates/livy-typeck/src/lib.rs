// Livy typeck -- Hindley-Milner type inference for Livy.

pub mod error;
pub mod exhaustiveness;
pub mod infer;
pub mod printer;
pub mod subst;
pub mod typed;

pub use error::TypeError;
pub use exhaustiveness::{check_exhaustiveness, RefutablePatternError};
pub use infer::infer_types;
