use crate::instruction::{Instruction, Target};
use quick_error::quick_error;
use std::fmt;

quick_error! {
    #[derive(Debug)]
    pub enum Error {
        NoScope {
            display("No label scope is open")
        }
        UnclosedScope {
            display("A label scope was left open")
        }
        ForeignLabel(label: Label) {
            display("Label `{label}` does not belong to the innermost scope")
        }
        UnresolvedLabel(label: Label) {
            display("Label `{label}` was jumped to but never placed")
        }
        NotAJump(index: usize) {
            display("Instruction {index} is not a jump")
        }
    }
}

/// A jump target local to one label scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Label {
    scope: usize,
    slot: usize,
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}.{}", self.scope, self.slot)
    }
}

struct Scope {
    id: usize,
    addresses: Vec<Option<usize>>,
    /// `(instruction index, label)` pairs still waiting for an address
    jumps: Vec<(usize, Label)>,
}

/// Nested label scopes. Every construct that needs internal control flow opens a scope,
/// allocates its labels there and closes it once all of its code is emitted, at which
/// point every pending jump is patched with an absolute line.
#[derive(Default)]
pub struct LabelStack {
    scopes: Vec<Scope>,
    next_id: usize,
}

impl LabelStack {
    pub fn begin(&mut self) {
        self.scopes.push(Scope {
            id: self.next_id,
            addresses: Vec::new(),
            jumps: Vec::new(),
        });
        self.next_id += 1;
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    pub fn label(&mut self) -> Result<Label, Error> {
        let scope = self.scopes.last_mut().ok_or(Error::NoScope)?;
        scope.addresses.push(None);

        Ok(Label {
            scope: scope.id,
            slot: scope.addresses.len() - 1,
        })
    }

    /// Binds `label` to `address`, the index of the next instruction to be emitted.
    pub fn place(&mut self, label: Label, address: usize) -> Result<(), Error> {
        let scope = self.owning_scope(label)?;
        scope.addresses[label.slot] = Some(address);
        Ok(())
    }

    /// Records that the instruction at `index` jumps to `label`.
    pub fn jump(&mut self, label: Label, index: usize) -> Result<(), Error> {
        let scope = self.owning_scope(label)?;
        scope.jumps.push((index, label));
        Ok(())
    }

    /// Closes the innermost scope, rewriting its pending jumps inside `code`.
    pub fn end(&mut self, code: &mut [Instruction]) -> Result<(), Error> {
        let scope = self.scopes.pop().ok_or(Error::NoScope)?;

        for (index, label) in scope.jumps {
            let address = scope.addresses[label.slot].ok_or(Error::UnresolvedLabel(label))?;

            match code.get_mut(index).and_then(Instruction::target_mut) {
                Some(target) => *target = Target::Line(address),
                None => return Err(Error::NotAJump(index)),
            }
        }

        Ok(())
    }

    fn owning_scope(&mut self, label: Label) -> Result<&mut Scope, Error> {
        match self.scopes.last_mut() {
            Some(scope) if scope.id == label.scope => Ok(scope),
            Some(_) => Err(Error::ForeignLabel(label)),
            None => Err(Error::NoScope),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patches_forward_and_backward_jumps() -> anyhow::Result<()> {
        let mut stack = LabelStack::default();
        let mut code = vec![Instruction::Inc; 4];

        stack.begin();
        let top = stack.label()?;
        let bottom = stack.label()?;
        stack.place(top, 0)?;
        code[1] = Instruction::Jzero(Target::Label(bottom));
        stack.jump(bottom, 1)?;
        code[2] = Instruction::Jump(Target::Label(top));
        stack.jump(top, 2)?;
        stack.place(bottom, 3)?;
        stack.end(&mut code)?;

        assert_eq!(Instruction::Jzero(Target::Line(3)), code[1]);
        assert_eq!(Instruction::Jump(Target::Line(0)), code[2]);
        assert_eq!(0, stack.depth());

        Ok(())
    }

    #[test]
    fn test_inner_scope_cannot_use_outer_label() -> anyhow::Result<()> {
        let mut stack = LabelStack::default();

        stack.begin();
        let outer = stack.label()?;
        stack.begin();

        assert!(matches!(stack.jump(outer, 0), Err(Error::ForeignLabel(_))));
        assert!(matches!(stack.place(outer, 0), Err(Error::ForeignLabel(_))));

        Ok(())
    }

    #[test]
    fn test_unplaced_label_fails_on_close() -> anyhow::Result<()> {
        let mut stack = LabelStack::default();
        let mut code = vec![Instruction::Halt];

        stack.begin();
        let nowhere = stack.label()?;
        code[0] = Instruction::Jump(Target::Label(nowhere));
        stack.jump(nowhere, 0)?;

        assert!(matches!(
            stack.end(&mut code),
            Err(Error::UnresolvedLabel(label)) if label == nowhere
        ));

        Ok(())
    }

    #[test]
    fn test_same_slot_in_sibling_scopes_does_not_collide() -> anyhow::Result<()> {
        let mut stack = LabelStack::default();

        stack.begin();
        let first = stack.label()?;
        stack.end(&mut [])?;

        stack.begin();
        let second = stack.label()?;

        assert_ne!(first, second);
        assert_eq!("L0.0", first.to_string());
        assert_eq!("L1.0", second.to_string());

        Ok(())
    }
}
