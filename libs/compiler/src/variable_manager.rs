// Cells 0..16 : register bank, see `registers`
// Cells 16..  : declared variables, then literal cells, then loop iterators

use crate::registers::FIRST_VARIABLE;
use parser::tree_node::{Identifier, IdentifierKind};
use quick_error::quick_error;
use std::collections::HashMap;

quick_error! {
    #[derive(Debug)]
    pub enum Error {
        UnknownVariable(name: String) {
            display("`{name}` has no memory assigned")
        }
        UnknownConstant(value: i64) {
            display("No memory cell holds the literal {value}")
        }
        NotAnArray(name: String) {
            display("`{name}` is not an array")
        }
        DynamicAddress(name: String) {
            display("The address of `{name}` is only known at run time")
        }
        AddressOutOfRange(name: String, index: i64) {
            display("`{name}({index})` lies outside of the array")
        }
        OutOfMemory {
            display("Declared variables do not fit in memory")
        }
    }
}

/// Hands out memory cells by moving a watermark. Releasing is strictly last-in first-out.
pub struct Memory {
    watermark: u64,
}

impl Default for Memory {
    fn default() -> Self {
        Self {
            watermark: FIRST_VARIABLE,
        }
    }
}

impl Memory {
    /// Reserves `size` consecutive cells and returns the first one.
    pub fn allocate(&mut self, size: u64) -> Result<u64, Error> {
        let offset = self.watermark;
        self.watermark = offset.checked_add(size).ok_or(Error::OutOfMemory)?;
        Ok(offset)
    }

    /// Gives back the last `size` cells allocated.
    pub fn release(&mut self, size: u64) {
        self.watermark = self.watermark.saturating_sub(size).max(FIRST_VARIABLE);
    }

    pub fn watermark(&self) -> u64 {
        self.watermark
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableKind {
    Number,
    /// The first cell holds `offset + 1 - begin`, the elements follow it.
    Array { begin: i64 },
    Const,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Variable {
    pub kind: VariableKind,
    pub offset: u64,
    pub size: u64,
}

impl Variable {
    /// Value kept in the first cell of an array so that `p(offset) + i` addresses element `i`.
    pub fn bias(&self) -> Option<i64> {
        let VariableKind::Array { begin } = self.kind else {
            return None;
        };
        i64::try_from(self.offset)
            .ok()?
            .checked_add(1)?
            .checked_sub(begin)
    }
}

/// Memory layout of every variable visible at the current point of code generation.
#[derive(Default)]
pub struct Variables {
    memory: Memory,
    named: HashMap<String, Variable>,
    constants: HashMap<i64, Variable>,
}

impl Variables {
    pub fn declare_number(&mut self, name: &str) -> Result<Variable, Error> {
        self.declare(name, VariableKind::Number, 1)
    }

    pub fn declare_array(&mut self, name: &str, begin: i64, end: i64) -> Result<Variable, Error> {
        // one cell for the bias, then `end - begin + 1` elements
        let size = end
            .checked_sub(begin)
            .and_then(|len| len.checked_add(2))
            .and_then(|size| u64::try_from(size).ok())
            .ok_or(Error::OutOfMemory)?;

        self.declare(name, VariableKind::Array { begin }, size)
    }

    pub fn declare_const(&mut self, value: i64) -> Result<Variable, Error> {
        let variable = Variable {
            kind: VariableKind::Const,
            offset: self.memory.allocate(1)?,
            size: 1,
        };
        self.constants.insert(value, variable);
        Ok(variable)
    }

    /// Reserves the iterator cell followed by the cell holding the loop limit.
    pub fn declare_iterator(&mut self, name: &str) -> Result<Variable, Error> {
        self.declare(name, VariableKind::Number, 2)
    }

    /// Drops the iterator declared last and reclaims its cells.
    pub fn remove_iterator(&mut self, name: &str) -> Result<(), Error> {
        let variable = self
            .named
            .remove(name)
            .ok_or_else(|| Error::UnknownVariable(name.to_string()))?;
        self.memory.release(variable.size);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&Variable, Error> {
        self.named
            .get(name)
            .ok_or_else(|| Error::UnknownVariable(name.to_string()))
    }

    pub fn constant(&self, value: i64) -> Result<&Variable, Error> {
        self.constants
            .get(&value)
            .ok_or(Error::UnknownConstant(value))
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    /// The cell behind `id`. Fails for `t(i)`, whose address is computed at run time.
    pub fn address_of(&self, id: &Identifier) -> Result<u64, Error> {
        let variable = self.get(&id.name)?;

        match (&id.kind, variable.kind) {
            (IdentifierKind::Scalar, _) => Ok(variable.offset),
            (IdentifierKind::IndexedByNumber(index), VariableKind::Array { begin }) => {
                let out_of_range = || Error::AddressOutOfRange(id.name.clone(), *index);
                let position = index
                    .checked_sub(begin)
                    .and_then(|position| u64::try_from(position).ok())
                    .filter(|position| position + 1 < variable.size)
                    .ok_or_else(out_of_range)?;
                Ok(variable.offset + 1 + position)
            }
            (IdentifierKind::IndexedByVariable(_), VariableKind::Array { .. }) => {
                Err(Error::DynamicAddress(id.name.clone()))
            }
            _ => Err(Error::NotAnArray(id.name.clone())),
        }
    }

    fn declare(&mut self, name: &str, kind: VariableKind, size: u64) -> Result<Variable, Error> {
        let variable = Variable {
            kind,
            offset: self.memory.allocate(size)?,
            size,
        };
        self.named.insert(name.to_string(), variable);
        Ok(variable)
    }
}
