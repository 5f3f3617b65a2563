use crate::{
    instruction::{Instruction, Instructions, Target},
    labels::{self, Label, LabelStack},
    registers::ACC,
};

/// Appends instructions to the program under construction and owns the label scopes
/// used to resolve its jumps.
#[derive(Default)]
pub struct Emitter {
    code: Instructions,
    labels: LabelStack,
    comments: bool,
}

impl Emitter {
    pub fn new(comments: bool) -> Self {
        Self {
            comments,
            ..Default::default()
        }
    }

    pub fn comment(&mut self, message: impl Into<String>) {
        if self.comments {
            self.code.comment(message);
        }
    }

    /// The finished program. Every label scope must have been closed.
    pub fn finish(self) -> Result<Instructions, labels::Error> {
        if self.labels.depth() != 0 {
            return Err(labels::Error::UnclosedScope);
        }
        Ok(self.code)
    }

    pub fn begin_labels(&mut self) {
        self.labels.begin();
    }

    /// Closes the innermost label scope, patching its jumps.
    pub fn end_labels(&mut self) -> Result<(), labels::Error> {
        self.labels.end(self.code.code_mut())
    }

    /// Runs `body` inside a fresh label scope.
    pub fn scoped<T>(
        &mut self,
        body: impl FnOnce(&mut Self) -> Result<T, labels::Error>,
    ) -> Result<T, labels::Error> {
        self.begin_labels();
        let result = body(self)?;
        self.end_labels()?;
        Ok(result)
    }

    pub fn label(&mut self) -> Result<Label, labels::Error> {
        self.labels.label()
    }

    pub fn place(&mut self, label: Label) -> Result<(), labels::Error> {
        self.labels.place(label, self.code.len())
    }

    pub fn push(&mut self, instruction: Instruction) {
        self.code.push(instruction);
    }

    pub fn get(&mut self) {
        self.push(Instruction::Get);
    }

    pub fn put(&mut self) {
        self.push(Instruction::Put);
    }

    pub fn load(&mut self, cell: u64) {
        self.push(Instruction::Load(cell));
    }

    pub fn loadi(&mut self, cell: u64) {
        self.push(Instruction::Loadi(cell));
    }

    pub fn store(&mut self, cell: u64) {
        self.push(Instruction::Store(cell));
    }

    pub fn storei(&mut self, cell: u64) {
        self.push(Instruction::Storei(cell));
    }

    pub fn add(&mut self, cell: u64) {
        self.push(Instruction::Add(cell));
    }

    pub fn sub(&mut self, cell: u64) {
        self.push(Instruction::Sub(cell));
    }

    /// `SUB 0`
    pub fn zero(&mut self) {
        self.sub(ACC);
    }

    pub fn shift(&mut self, cell: u64) {
        self.push(Instruction::Shift(cell));
    }

    pub fn inc(&mut self) {
        self.push(Instruction::Inc);
    }

    pub fn dec(&mut self) {
        self.push(Instruction::Dec);
    }

    pub fn halt(&mut self) {
        self.push(Instruction::Halt);
    }

    pub fn jump(&mut self, label: Label) -> Result<(), labels::Error> {
        self.jump_with(label, Instruction::Jump)
    }

    pub fn jpos(&mut self, label: Label) -> Result<(), labels::Error> {
        self.jump_with(label, Instruction::Jpos)
    }

    pub fn jzero(&mut self, label: Label) -> Result<(), labels::Error> {
        self.jump_with(label, Instruction::Jzero)
    }

    pub fn jneg(&mut self, label: Label) -> Result<(), labels::Error> {
        self.jump_with(label, Instruction::Jneg)
    }

    fn jump_with(
        &mut self,
        label: Label,
        jump: fn(Target) -> Instruction,
    ) -> Result<(), labels::Error> {
        self.labels.jump(label, self.code.len())?;
        self.push(jump(Target::Label(label)));
        Ok(())
    }
}
