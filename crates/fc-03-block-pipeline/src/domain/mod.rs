//! Block pipeline domain logic: the assignment filter and the assembler.

pub mod assembler;
pub mod assignment;

pub use assembler::BlockAssembler;
pub use assignment::filter_assigned;
