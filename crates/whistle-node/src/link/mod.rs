//! ArtifactLinker: library placeholder resolution and the generated
//! permutation primitive.

mod bytecode;
mod evm_asm;
mod linker;
mod primitive;
mod table;

#[cfg(test)]
mod interp;

pub use bytecode::{
    bare_name, placeholder_hash, LinkReference, Placeholder, UnlinkedBytecode, PLACEHOLDER_LEN,
};
pub use evm_asm::{deployable, Assembler, Opcode};
pub use linker::ArtifactLinker;
pub use primitive::{
    generate_primitive_bytecode, primitive_runtime, primitive_selector, PRIMITIVE_ABI,
    PRIMITIVE_SIGNATURE,
};
pub use table::LinkTable;
