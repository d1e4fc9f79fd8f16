//! A label-resolving assembler for the handful of opcodes the generated
//! primitive needs.

use std::collections::HashMap;
use whistle_types::{WhistleError, WhistleResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    Stop = 0x00,
    Div = 0x04,
    Mod = 0x06,
    AddMod = 0x08,
    MulMod = 0x09,
    Eq = 0x14,
    CallDataCopy = 0x37,
    CodeCopy = 0x39,
    Pop = 0x50,
    MLoad = 0x51,
    MStore = 0x52,
    JumpI = 0x57,
    JumpDest = 0x5b,
    Return = 0xf3,
    Invalid = 0xfe,
}

pub const PUSH1: u8 = 0x60;
pub const PUSH32: u8 = 0x7f;
pub const DUP1: u8 = 0x80;
pub const SWAP1: u8 = 0x90;

#[derive(Debug, Default)]
pub struct Assembler {
    code: Vec<u8>,
    labels: HashMap<String, usize>,
    fixups: Vec<(usize, String)>,
}

impl Assembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn op(&mut self, op: Opcode) -> &mut Self {
        self.code.push(op as u8);
        self
    }

    /// `PUSHn` where n is the length of `bytes`, kept verbatim.
    pub fn push_bytes(&mut self, bytes: &[u8]) -> WhistleResult<&mut Self> {
        if bytes.is_empty() || bytes.len() > 32 {
            return Err(WhistleError::Contract(format!(
                "Cannot push {} bytes",
                bytes.len()
            )));
        }
        self.code.push(PUSH1 + (bytes.len() as u8 - 1));
        self.code.extend_from_slice(bytes);
        Ok(self)
    }

    pub fn push_u8(&mut self, value: u8) -> &mut Self {
        self.code.extend_from_slice(&[PUSH1, value]);
        self
    }

    pub fn push_word(&mut self, word: &[u8; 32]) -> &mut Self {
        self.code.push(PUSH32);
        self.code.extend_from_slice(word);
        self
    }

    /// `PUSH2` of a label's offset, patched in [`Assembler::finish`].
    pub fn push_label(&mut self, label: &str) -> &mut Self {
        self.code.push(PUSH1 + 1);
        self.fixups.push((self.code.len(), label.to_string()));
        self.code.extend_from_slice(&[0, 0]);
        self
    }

    pub fn dup(&mut self, n: u8) -> WhistleResult<&mut Self> {
        if !(1..=16).contains(&n) {
            return Err(WhistleError::Contract(format!("DUP{} does not exist", n)));
        }
        self.code.push(DUP1 + n - 1);
        Ok(self)
    }

    pub fn swap(&mut self, n: u8) -> WhistleResult<&mut Self> {
        if !(1..=16).contains(&n) {
            return Err(WhistleError::Contract(format!("SWAP{} does not exist", n)));
        }
        self.code.push(SWAP1 + n - 1);
        Ok(self)
    }

    /// Marks the current offset with a `JUMPDEST`.
    pub fn label(&mut self, name: &str) -> WhistleResult<&mut Self> {
        if self.labels.insert(name.to_string(), self.code.len()).is_some() {
            return Err(WhistleError::Contract(format!("Duplicate label {}", name)));
        }
        self.code.push(Opcode::JumpDest as u8);
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    pub fn finish(mut self) -> WhistleResult<Vec<u8>> {
        for (at, name) in &self.fixups {
            let target = *self
                .labels
                .get(name)
                .ok_or_else(|| WhistleError::Contract(format!("Unknown label {}", name)))?;
            let target = u16::try_from(target).map_err(|_| {
                WhistleError::Contract(format!("Label {} beyond PUSH2 range", name))
            })?;
            self.code[*at..*at + 2].copy_from_slice(&target.to_be_bytes());
        }
        Ok(self.code)
    }
}

/// Wraps runtime code in a prologue that copies it to memory and returns it.
pub fn deployable(runtime: &[u8]) -> WhistleResult<Vec<u8>> {
    const PROLOGUE_LEN: u16 = 13;

    let len = u16::try_from(runtime.len())
        .map_err(|_| WhistleError::Contract("Runtime code exceeds 64 KiB".into()))?;

    let mut asm = Assembler::new();
    asm.push_bytes(&len.to_be_bytes())?;
    asm.dup(1)?;
    asm.push_bytes(&PROLOGUE_LEN.to_be_bytes())?;
    asm.push_u8(0).op(Opcode::CodeCopy);
    asm.push_u8(0).op(Opcode::Return);
    debug_assert_eq!(asm.len(), PROLOGUE_LEN as usize);

    let mut code = asm.finish()?;
    code.extend_from_slice(runtime);
    Ok(code)
}
