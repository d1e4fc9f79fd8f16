//! Just enough of an EVM to execute generated code in tests.

use ethers::types::{U256, U512};

const STEP_LIMIT: usize = 2_000_000;
const STACK_LIMIT: usize = 1024;

pub fn execute(code: &[u8], calldata: &[u8]) -> Result<Vec<u8>, String> {
    Machine {
        code,
        calldata,
        memory: Vec::new(),
        stack: Vec::new(),
        pc: 0,
    }
    .run()
}

struct Machine<'a> {
    code: &'a [u8],
    calldata: &'a [u8],
    memory: Vec<u8>,
    stack: Vec<U256>,
    pc: usize,
}

fn offset(v: U256) -> Result<usize, String> {
    if v > U256::from(1u64 << 24) {
        return Err(format!("offset {} out of range", v));
    }
    Ok(v.low_u64() as usize)
}

fn narrow(v: U512) -> U256 {
    U256::try_from(v).unwrap_or_default()
}

impl Machine<'_> {
    fn pop(&mut self) -> Result<U256, String> {
        self.stack.pop().ok_or_else(|| format!("stack underflow at {}", self.pc))
    }

    fn push(&mut self, v: U256) -> Result<(), String> {
        if self.stack.len() == STACK_LIMIT {
            return Err("stack overflow".into());
        }
        self.stack.push(v);
        Ok(())
    }

    fn touch(&mut self, end: usize) {
        if self.memory.len() < end {
            self.memory.resize(end.div_ceil(32) * 32, 0);
        }
    }

    fn run(mut self) -> Result<Vec<u8>, String> {
        for _ in 0..STEP_LIMIT {
            let Some(&op) = self.code.get(self.pc) else {
                return Ok(Vec::new());
            };
            self.pc += 1;

            match op {
                0x00 => return Ok(Vec::new()),
                0x04 | 0x06 => {
                    let (a, b) = (self.pop()?, self.pop()?);
                    let r = if b.is_zero() {
                        U256::zero()
                    } else if op == 0x04 {
                        a / b
                    } else {
                        a % b
                    };
                    self.push(r)?;
                }
                0x08 | 0x09 => {
                    let (a, b, n) = (self.pop()?, self.pop()?, self.pop()?);
                    let r = if n.is_zero() {
                        U256::zero()
                    } else if op == 0x08 {
                        narrow((U512::from(a) + U512::from(b)) % U512::from(n))
                    } else {
                        narrow(a.full_mul(b) % U512::from(n))
                    };
                    self.push(r)?;
                }
                0x14 => {
                    let (a, b) = (self.pop()?, self.pop()?);
                    self.push(if a == b { U256::one() } else { U256::zero() })?;
                }
                0x37 | 0x39 => {
                    let (dest, src, size) =
                        (offset(self.pop()?)?, offset(self.pop()?)?, offset(self.pop()?)?);
                    self.touch(dest + size);
                    let source = if op == 0x37 { self.calldata } else { self.code };
                    for i in 0..size {
                        self.memory[dest + i] = source.get(src + i).copied().unwrap_or(0);
                    }
                }
                0x50 => {
                    self.pop()?;
                }
                0x51 => {
                    let at = offset(self.pop()?)?;
                    self.touch(at + 32);
                    let word = U256::from_big_endian(&self.memory[at..at + 32]);
                    self.push(word)?;
                }
                0x52 => {
                    let (at, value) = (offset(self.pop()?)?, self.pop()?);
                    self.touch(at + 32);
                    value.to_big_endian(&mut self.memory[at..at + 32]);
                }
                0x57 => {
                    let (dest, cond) = (offset(self.pop()?)?, self.pop()?);
                    if !cond.is_zero() {
                        if self.code.get(dest) != Some(&0x5b) {
                            return Err(format!("bad jump destination {}", dest));
                        }
                        self.pc = dest;
                    }
                }
                0x5b => {}
                0x60..=0x7f => {
                    let n = (op - 0x5f) as usize;
                    let mut word = [0u8; 32];
                    for i in 0..n {
                        word[32 - n + i] = self.code.get(self.pc + i).copied().unwrap_or(0);
                    }
                    self.pc += n;
                    self.push(U256::from_big_endian(&word))?;
                }
                0x80..=0x8f => {
                    let n = (op - 0x7f) as usize;
                    let len = self.stack.len();
                    if n > len {
                        return Err(format!("DUP{} underflow", n));
                    }
                    self.push(self.stack[len - n])?;
                }
                0x90..=0x9f => {
                    let n = (op - 0x8f) as usize;
                    let len = self.stack.len();
                    if n >= len {
                        return Err(format!("SWAP{} underflow", n));
                    }
                    self.stack.swap(len - 1, len - 1 - n);
                }
                0xf3 => {
                    let (at, size) = (offset(self.pop()?)?, offset(self.pop()?)?);
                    self.touch(at + size);
                    return Ok(self.memory[at..at + size].to_vec());
                }
                0xfe => return Err("invalid opcode".into()),
                other => return Err(format!("unsupported opcode {:#04x}", other)),
            }
        }
        Err("step limit exceeded".into())
    }
}
