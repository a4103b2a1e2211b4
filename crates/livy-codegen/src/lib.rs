// Livy codegen -- lowering, optimisation passes, and bytecode encoding.

pub mod encode;
pub mod fold;
pub mod inline;
pub mod instr;
pub mod lower;
pub mod lowered;
pub mod rle;

pub use encode::{to_bytecode, EncodeError};
pub use fold::fold_constants;
pub use inline::expand_inline;
pub use instr::{generate_instructions, Instruction};
pub use lower::lower;
pub use lowered::{Lowered, NativeOp};
