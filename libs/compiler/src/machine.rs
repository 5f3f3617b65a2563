//! In-process reference implementation of the target machine.

use crate::instruction::{self, Instruction, Target};
use quick_error::quick_error;
use std::collections::{HashMap, VecDeque};

quick_error! {
    #[derive(Debug)]
    pub enum Error {
        ParseError(err: instruction::ParseError) {
            from()
            display("{}", err)
            source(err)
        }
        NoInput(line: usize) {
            display("line {line}: GET with no input left")
        }
        StepLimit(limit: u64) {
            display("Program did not halt within {limit} steps")
        }
        InvalidJump(line: usize) {
            display("line {line}: jump target is outside the program")
        }
        InvalidAddress(line: usize, address: i64) {
            display("line {line}: {address} is not a memory address")
        }
        Overflow(line: usize) {
            display("line {line}: arithmetic overflow")
        }
        NoHalt {
            display("Program ran past its last instruction")
        }
    }
}

/// Runs programs with 64-bit cells. Cells never written read as zero.
pub struct Machine {
    step_limit: u64,
    input: Vec<i64>,
}

impl Default for Machine {
    fn default() -> Self {
        Self::new(10_000_000)
    }
}

impl Machine {
    pub fn new(step_limit: u64) -> Self {
        Self {
            step_limit,
            input: Vec::new(),
        }
    }

    /// Values consumed by `GET`, in order.
    pub fn with_input(mut self, input: impl IntoIterator<Item = i64>) -> Self {
        self.input = input.into_iter().collect();
        self
    }

    pub fn run_text(&self, text: &str) -> Result<Vec<i64>, Error> {
        self.run(&instruction::parse_program(text)?)
    }

    /// Executes `program` from line 0 until `HALT` and returns everything it `PUT`.
    pub fn run(&self, program: &[Instruction]) -> Result<Vec<i64>, Error> {
        let mut memory: HashMap<u64, i64> = HashMap::new();
        let mut input: VecDeque<i64> = self.input.iter().copied().collect();
        let mut output = Vec::new();
        let mut pc = 0usize;
        let mut steps = 0u64;

        macro_rules! cell {
            ($address:expr) => {
                memory.get(&$address).copied().unwrap_or_default()
            };
        }

        macro_rules! address {
            ($value:expr) => {{
                let value = $value;
                u64::try_from(value).map_err(|_| Error::InvalidAddress(pc, value))?
            }};
        }

        macro_rules! jump_to {
            ($target:expr) => {
                match $target {
                    Target::Line(line) if line < program.len() => {
                        pc = line;
                        continue;
                    }
                    _ => return Err(Error::InvalidJump(pc)),
                }
            };
        }

        loop {
            let Some(instruction) = program.get(pc) else {
                return Err(Error::NoHalt);
            };

            steps += 1;
            if steps > self.step_limit {
                return Err(Error::StepLimit(self.step_limit));
            }

            let acc = cell!(0);

            match *instruction {
                Instruction::Get => {
                    let value = input.pop_front().ok_or(Error::NoInput(pc))?;
                    memory.insert(0, value);
                }
                Instruction::Put => output.push(acc),
                Instruction::Load(i) => {
                    memory.insert(0, cell!(i));
                }
                Instruction::Loadi(i) => {
                    let address = address!(cell!(i));
                    memory.insert(0, cell!(address));
                }
                Instruction::Store(i) => {
                    memory.insert(i, acc);
                }
                Instruction::Storei(i) => {
                    let address = address!(cell!(i));
                    memory.insert(address, acc);
                }
                Instruction::Add(i) => {
                    let value = acc.checked_add(cell!(i)).ok_or(Error::Overflow(pc))?;
                    memory.insert(0, value);
                }
                Instruction::Sub(i) => {
                    let value = acc.checked_sub(cell!(i)).ok_or(Error::Overflow(pc))?;
                    memory.insert(0, value);
                }
                Instruction::Shift(i) => {
                    let value = shift(acc, cell!(i)).ok_or(Error::Overflow(pc))?;
                    memory.insert(0, value);
                }
                Instruction::Inc => {
                    let value = acc.checked_add(1).ok_or(Error::Overflow(pc))?;
                    memory.insert(0, value);
                }
                Instruction::Dec => {
                    let value = acc.checked_sub(1).ok_or(Error::Overflow(pc))?;
                    memory.insert(0, value);
                }
                Instruction::Jump(target) => jump_to!(target),
                Instruction::Jpos(target) if acc > 0 => jump_to!(target),
                Instruction::Jzero(target) if acc == 0 => jump_to!(target),
                Instruction::Jneg(target) if acc < 0 => jump_to!(target),
                Instruction::Jpos(_) | Instruction::Jzero(_) | Instruction::Jneg(_) => {}
                Instruction::Halt => return Ok(output),
            }

            pc += 1;
        }
    }
}

/// `floor(value * 2^amount)`
fn shift(value: i64, amount: i64) -> Option<i64> {
    if value == 0 {
        return Some(0);
    }
    if amount >= 0 {
        let factor = 1i64.checked_shl(u32::try_from(amount).ok()?)?;
        if factor <= 0 {
            return None;
        }
        value.checked_mul(factor)
    } else {
        let amount = amount.unsigned_abs().min(63) as u32;
        Some(value >> amount)
    }
}
