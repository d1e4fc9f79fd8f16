//! Procedural bytecode for the MiMC sponge permutation contract.
//!
//! The contract has no source form. Its single entry point is
//! `MiMCSponge(uint256 xL, uint256 xR, uint256 k) returns (uint256 xL, uint256 xR)`,
//! computing the same Feistel permutation as [`whistle_crypto::MimcSponge::permute`]
//! with the round constants fully unrolled into the code.

use super::evm_asm::{deployable, Assembler, Opcode};
use whistle_crypto::{fr_to_be_bytes, keccak256, modulus_be_bytes, round_constants};
use whistle_types::{WhistleError, WhistleResult};

pub const PRIMITIVE_SIGNATURE: &str = "MiMCSponge(uint256,uint256,uint256)";

pub const PRIMITIVE_ABI: &str = r#"[{"type":"function","name":"MiMCSponge","stateMutability":"pure","inputs":[{"name":"xL","type":"uint256"},{"name":"xR","type":"uint256"},{"name":"k","type":"uint256"}],"outputs":[{"name":"xL","type":"uint256"},{"name":"xR","type":"uint256"}]}]"#;

pub fn primitive_selector() -> [u8; 4] {
    let digest = keccak256(PRIMITIVE_SIGNATURE.as_bytes());
    [digest[0], digest[1], digest[2], digest[3]]
}

/// Deployable init code for the permutation contract. Same inputs, same bytes.
pub fn generate_primitive_bytecode(seed: &str, rounds: usize) -> WhistleResult<Vec<u8>> {
    deployable(&primitive_runtime(seed, rounds)?)
}

pub fn primitive_runtime(seed: &str, rounds: usize) -> WhistleResult<Vec<u8>> {
    if rounds < 2 {
        return Err(WhistleError::Contract(format!(
            "Permutation needs at least 2 rounds, got {}",
            rounds
        )));
    }

    let mut selector_shift = [0u8; 29];
    selector_shift[0] = 1;

    let mut asm = Assembler::new();

    // Dispatch: selector = calldata[0..32] / 2^224.
    asm.push_u8(0x64).push_u8(0).push_u8(0).op(Opcode::CallDataCopy);
    asm.push_bytes(&selector_shift)?;
    asm.push_u8(0).op(Opcode::MLoad).op(Opcode::Div);
    asm.push_bytes(&primitive_selector())?;
    asm.op(Opcode::Eq);
    asm.push_label("sponge").op(Opcode::JumpI);
    asm.op(Opcode::Invalid);

    // Stack from here on, top first: xR xL k q.
    asm.label("sponge")?;
    asm.push_word(&modulus_be_bytes());
    asm.dup(1)?.push_u8(0x44).op(Opcode::MLoad).op(Opcode::Mod);
    asm.dup(2)?.push_u8(0x04).op(Opcode::MLoad).op(Opcode::Mod);
    asm.dup(3)?.push_u8(0x24).op(Opcode::MLoad).op(Opcode::Mod);

    let constants = round_constants(seed, rounds);
    let last = constants.len() - 1;
    for (i, c) in constants.iter().enumerate() {
        // t = xL + k (+ c)
        asm.dup(4)?.dup(4)?.dup(4)?.op(Opcode::AddMod);
        let word = fr_to_be_bytes(c);
        if word != [0u8; 32] {
            asm.dup(5)?.swap(1)?.push_word(&word).op(Opcode::AddMod);
        }

        // t^5
        asm.dup(5)?.dup(2)?.dup(1)?.op(Opcode::MulMod);
        asm.dup(6)?.dup(2)?.dup(1)?.op(Opcode::MulMod);
        asm.swap(1)?.op(Opcode::Pop);
        asm.swap(1)?.dup(6)?.swap(2)?.op(Opcode::MulMod);

        // xR + t^5, then swap halves on every round but the last.
        asm.dup(5)?.swap(2)?.op(Opcode::AddMod);
        if i != last {
            asm.swap(1)?;
        }
    }

    asm.push_u8(0x20).op(Opcode::MStore);
    asm.push_u8(0x00).op(Opcode::MStore);
    asm.push_u8(0x40).push_u8(0x00).op(Opcode::Return);

    asm.finish()
}
