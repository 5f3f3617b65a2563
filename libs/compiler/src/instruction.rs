use crate::labels::Label;
use quick_error::quick_error;
use std::{
    collections::BTreeMap,
    fmt,
    io::{BufWriter, Write},
    ops::Deref,
    str::FromStr,
};

/// Comments start after this many columns of instruction text.
const COMMENT_COLUMN: usize = 20;

quick_error! {
    #[derive(Debug, PartialEq, Eq)]
    pub enum ParseError {
        UnknownMnemonic(line: usize, mnemonic: String) {
            display("line {line}: unknown instruction `{mnemonic}`")
        }
        MissingOperand(line: usize, mnemonic: String) {
            display("line {line}: `{mnemonic}` needs an operand")
        }
        InvalidOperand(line: usize, operand: String) {
            display("line {line}: invalid operand `{operand}`")
        }
        UnexpectedOperand(line: usize, mnemonic: String) {
            display("line {line}: `{mnemonic}` takes no operand")
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Not yet resolved; only exists while the owning label scope is open.
    Label(Label),
    Line(usize),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Label(label) => write!(f, "{label}"),
            Target::Line(line) => write!(f, "{line}"),
        }
    }
}

/// One instruction of the accumulator machine. Operands are memory cells, except for
/// jumps whose operand is an instruction index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    Get,
    Put,
    Load(u64),
    Loadi(u64),
    Store(u64),
    Storei(u64),
    Add(u64),
    Sub(u64),
    /// `p0 := floor(p0 * 2^p(i))`
    Shift(u64),
    Inc,
    Dec,
    Jump(Target),
    Jpos(Target),
    Jzero(Target),
    Jneg(Target),
    Halt,
}

impl Instruction {
    pub fn target_mut(&mut self) -> Option<&mut Target> {
        match self {
            Instruction::Jump(target)
            | Instruction::Jpos(target)
            | Instruction::Jzero(target)
            | Instruction::Jneg(target) => Some(target),
            _ => None,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Get => write!(f, "GET"),
            Instruction::Put => write!(f, "PUT"),
            Instruction::Load(i) => write!(f, "LOAD {i}"),
            Instruction::Loadi(i) => write!(f, "LOADI {i}"),
            Instruction::Store(i) => write!(f, "STORE {i}"),
            Instruction::Storei(i) => write!(f, "STOREI {i}"),
            Instruction::Add(i) => write!(f, "ADD {i}"),
            Instruction::Sub(i) => write!(f, "SUB {i}"),
            Instruction::Shift(i) => write!(f, "SHIFT {i}"),
            Instruction::Inc => write!(f, "INC"),
            Instruction::Dec => write!(f, "DEC"),
            Instruction::Jump(j) => write!(f, "JUMP {j}"),
            Instruction::Jpos(j) => write!(f, "JPOS {j}"),
            Instruction::Jzero(j) => write!(f, "JZERO {j}"),
            Instruction::Jneg(j) => write!(f, "JNEG {j}"),
            Instruction::Halt => write!(f, "HALT"),
        }
    }
}

/// The emitted program plus the comments attached to its lines.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Instructions {
    code: Vec<Instruction>,
    comments: BTreeMap<usize, String>,
}

impl Deref for Instructions {
    type Target = Vec<Instruction>;

    fn deref(&self) -> &Self::Target {
        &self.code
    }
}

impl Instructions {
    pub fn push(&mut self, instruction: Instruction) {
        self.code.push(instruction);
    }

    pub fn code_mut(&mut self) -> &mut [Instruction] {
        &mut self.code
    }

    /// Attaches `message` to the next instruction pushed.
    pub fn comment(&mut self, message: impl Into<String>) {
        let message = message.into();
        self.comments
            .entry(self.code.len())
            .and_modify(|existing| {
                existing.push_str(" | ");
                existing.push_str(&message);
            })
            .or_insert(message);
    }

    pub fn into_inner(self) -> Vec<Instruction> {
        self.code
    }

    pub fn write<W: Write>(&self, writer: &mut BufWriter<W>) -> Result<(), std::io::Error> {
        writer.write_all(self.to_string().as_bytes())?;
        writer.flush()
    }
}

impl From<Vec<Instruction>> for Instructions {
    fn from(code: Vec<Instruction>) -> Self {
        Self {
            code,
            comments: BTreeMap::new(),
        }
    }
}

impl fmt::Display for Instructions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, instruction) in self.code.iter().enumerate() {
            match self.comments.get(&index) {
                Some(comment) => {
                    let text = instruction.to_string();
                    writeln!(f, "{text:<width$} # {comment}", width = COMMENT_COLUMN)?
                }
                None => writeln!(f, "{instruction}")?,
            }
        }
        Ok(())
    }
}

/// Parses program text back into instructions. Blank lines are skipped and everything
/// after a `#` is a comment.
pub fn parse_program(text: &str) -> Result<Vec<Instruction>, ParseError> {
    let mut program = Vec::new();

    for (index, line) in text.lines().enumerate() {
        let line = line.split('#').next().unwrap_or_default().trim();
        if line.is_empty() {
            continue;
        }
        program.push(parse_line(index + 1, line)?);
    }

    Ok(program)
}

fn parse_line(line_number: usize, line: &str) -> Result<Instruction, ParseError> {
    let mut parts = line.split_whitespace();
    let mnemonic = parts.next().unwrap_or_default().to_uppercase();
    let operand = parts.next();

    if let Some(extra) = parts.next() {
        return Err(ParseError::InvalidOperand(line_number, extra.to_string()));
    }

    macro_rules! operand {
        () => {
            match operand {
                Some(operand) => u64::from_str(operand)
                    .map_err(|_| ParseError::InvalidOperand(line_number, operand.to_string()))?,
                None => return Err(ParseError::MissingOperand(line_number, mnemonic.clone())),
            }
        };
    }

    macro_rules! target {
        () => {
            Target::Line(operand!() as usize)
        };
    }

    let instruction = match mnemonic.as_str() {
        "GET" => Instruction::Get,
        "PUT" => Instruction::Put,
        "INC" => Instruction::Inc,
        "DEC" => Instruction::Dec,
        "HALT" => Instruction::Halt,
        "LOAD" => return Ok(Instruction::Load(operand!())),
        "LOADI" => return Ok(Instruction::Loadi(operand!())),
        "STORE" => return Ok(Instruction::Store(operand!())),
        "STOREI" => return Ok(Instruction::Storei(operand!())),
        "ADD" => return Ok(Instruction::Add(operand!())),
        "SUB" => return Ok(Instruction::Sub(operand!())),
        "SHIFT" => return Ok(Instruction::Shift(operand!())),
        "JUMP" => return Ok(Instruction::Jump(target!())),
        "JPOS" => return Ok(Instruction::Jpos(target!())),
        "JZERO" => return Ok(Instruction::Jzero(target!())),
        "JNEG" => return Ok(Instruction::Jneg(target!())),
        _ => return Err(ParseError::UnknownMnemonic(line_number, mnemonic.clone())),
    };

    match operand {
        Some(_) => Err(ParseError::UnexpectedOperand(line_number, mnemonic)),
        None => Ok(instruction),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_render_with_comments() {
        let mut code = Instructions::default();
        code.comment("BEGIN");
        code.push(Instruction::Sub(0));
        code.push(Instruction::Inc);
        code.comment("x := 1");
        code.comment("store");
        code.push(Instruction::Store(16));
        code.push(Instruction::Jump(Target::Line(0)));

        let expected = format!(
            "{:<20} # BEGIN\nINC\n{:<20} # x := 1 | store\nJUMP 0\n",
            "SUB 0", "STORE 16"
        );
        assert_eq!(expected, code.to_string());
    }

    #[test]
    fn test_parse_program() -> anyhow::Result<()> {
        let program = parse_program("SUB 0   # zero\n\n  inc\nJPOS 0\nHALT\n")?;

        assert_eq!(
            vec![
                Instruction::Sub(0),
                Instruction::Inc,
                Instruction::Jpos(Target::Line(0)),
                Instruction::Halt
            ],
            program
        );

        Ok(())
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            Err(ParseError::MissingOperand(1, "LOAD".into())),
            parse_program("LOAD")
        );
        assert_eq!(
            Err(ParseError::UnexpectedOperand(2, "HALT".into())),
            parse_program("INC\nHALT 3")
        );
        assert_eq!(
            Err(ParseError::InvalidOperand(1, "-1".into())),
            parse_program("STORE -1")
        );
        assert_eq!(
            Err(ParseError::UnknownMnemonic(1, "MUL".into())),
            parse_program("MUL 3")
        );
    }
}
