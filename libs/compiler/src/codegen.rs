use crate::{
    analyzer::Analysis,
    emitter::Emitter,
    instruction::Instructions,
    labels,
    registers::{ACC, ADDR, NEG_ONE, ONE, RHS},
    variable_manager::{self, Variables},
};
use parser::tree_node::*;
use quick_error::quick_error;
use tracing::debug;

macro_rules! comment {
    ($self:expr, $($message:tt)*) => {
        if $self.config.debug {
            $self.emitter.comment(format!($($message)*));
        }
    };
}

quick_error! {
    #[derive(Debug)]
    pub enum Error {
        LabelError(error: labels::Error) {
            from()
            display("Internal label error: {}", error)
            source(error)
        }
        MemoryError(error: variable_manager::Error) {
            from()
            display("Internal memory error: {}", error)
            source(error)
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct CompilerConfig {
    /// Annotate the output with `# comments` naming the source construct of each line.
    pub debug: bool,
}

/// Translates an analyzed program into machine instructions.
pub struct Compiler<'a> {
    analysis: &'a Analysis,
    emitter: Emitter,
    variables: Variables,
    config: CompilerConfig,
}

impl<'a> Compiler<'a> {
    pub fn new(analysis: &'a Analysis, config: Option<CompilerConfig>) -> Self {
        let config = config.unwrap_or_default();
        Self {
            analysis,
            emitter: Emitter::new(config.debug),
            variables: Variables::default(),
            config,
        }
    }

    pub fn compile(mut self, program: &Program) -> Result<Instructions, Error> {
        program.accept(&mut self)?;
        let code = self.emitter.finish()?;

        debug!(
            instructions = code.len(),
            memory = self.variables.memory().watermark(),
            "code generation finished"
        );
        Ok(code)
    }

    /// Runs `body` inside a fresh label scope.
    fn scoped<T>(&mut self, body: impl FnOnce(&mut Self) -> Result<T, Error>) -> Result<T, Error> {
        self.emitter.begin_labels();
        let result = body(self)?;
        self.emitter.end_labels()?;
        Ok(result)
    }

    fn statements(&mut self, statements: &[Statement]) -> Result<(), Error> {
        for statement in statements {
            statement.accept(self)?;
        }
        Ok(())
    }

    /// Loads `p(base) + p(index)`, the address of `array(index)`.
    fn element_address(&mut self, array: &str, index: &Identifier) -> Result<(), Error> {
        let base = self.variables.get(array)?.offset;
        let index = self.variables.address_of(index)?;
        self.emitter.load(base);
        self.emitter.add(index);
        Ok(())
    }

    /// Stores whatever `source` leaves in the accumulator into `target`.
    fn assign(
        &mut self,
        target: &Identifier,
        source: impl FnOnce(&mut Self) -> Result<(), Error>,
    ) -> Result<(), Error> {
        match &target.kind {
            IdentifierKind::IndexedByVariable(index) => {
                self.element_address(&target.name, index)?;
                self.emitter.store(ADDR);
                source(self)?;
                self.emitter.storei(ADDR);
            }
            _ => {
                let address = self.variables.address_of(target)?;
                source(self)?;
                self.emitter.store(address);
            }
        }
        Ok(())
    }

    /// Literals live in their own cell, built the first time the load runs.
    fn load_number(&mut self, value: i64) -> Result<(), Error> {
        if value == 0 {
            self.emitter.zero();
            return Ok(());
        }

        let cell = self.variables.constant(value)?.offset;
        self.emitter.scoped(|e| {
            let generate = e.label()?;
            let end = e.label()?;

            e.load(cell);
            e.jzero(generate)?;
            e.jump(end)?;
            e.place(generate)?;
            e.materialize(value, true);
            e.store(cell);
            e.place(end)
        })?;
        Ok(())
    }

    fn if_statement(
        &mut self,
        condition: &Condition,
        then_branch: &[Statement],
        else_branch: Option<&[Statement]>,
    ) -> Result<(), Error> {
        comment!(self, "IF {condition}");

        self.scoped(|c| {
            let otherwise = c.emitter.label()?;
            let end = c.emitter.label()?;

            condition.accept(c)?;
            c.emitter.jzero(otherwise)?;
            c.statements(then_branch)?;

            if let Some(else_branch) = else_branch {
                c.emitter.jump(end)?;
                comment!(c, "ELSE");
                c.emitter.place(otherwise)?;
                c.statements(else_branch)?;
            } else {
                c.emitter.place(otherwise)?;
            }

            c.emitter.place(end)?;
            comment!(c, "ENDIF");
            Ok(())
        })
    }

    fn while_loop(&mut self, condition: &Condition, body: &[Statement]) -> Result<(), Error> {
        comment!(self, "WHILE {condition}");

        self.scoped(|c| {
            let head = c.emitter.label()?;
            let end = c.emitter.label()?;

            c.emitter.place(head)?;
            condition.accept(c)?;
            c.emitter.jzero(end)?;
            c.statements(body)?;
            c.emitter.jump(head)?;
            c.emitter.place(end)?;
            comment!(c, "ENDWHILE");
            Ok(())
        })
    }

    fn do_while_loop(&mut self, body: &[Statement], condition: &Condition) -> Result<(), Error> {
        comment!(self, "DO");

        self.scoped(|c| {
            let head = c.emitter.label()?;

            c.emitter.place(head)?;
            c.statements(body)?;
            comment!(c, "WHILE {condition}");
            condition.accept(c)?;
            c.emitter.jpos(head)?;
            c.emitter.jneg(head)?;
            comment!(c, "ENDDO");
            Ok(())
        })
    }

    fn for_loop(
        &mut self,
        iterator: &Identifier,
        from: &Value,
        to: &Value,
        direction: Direction,
        body: &[Statement],
    ) -> Result<(), Error> {
        let cells = self.variables.declare_iterator(&iterator.name)?;
        let (current, limit) = (cells.offset, cells.offset + 1);

        to.accept(self)?;
        self.emitter.store(limit);
        from.accept(self)?;
        self.emitter.store(current);

        self.scoped(|c| {
            let head = c.emitter.label()?;
            let end = c.emitter.label()?;

            // the accumulator holds the iterator whenever the head is reached
            c.emitter.place(head)?;
            c.emitter.sub(limit);
            match direction {
                Direction::Up => c.emitter.jpos(end)?,
                Direction::Down => c.emitter.jneg(end)?,
            }

            c.statements(body)?;

            c.emitter.load(current);
            match direction {
                Direction::Up => c.emitter.inc(),
                Direction::Down => c.emitter.dec(),
            }
            c.emitter.store(current);
            comment!(c, "ENDFOR");
            c.emitter.jump(head)?;
            c.emitter.place(end)?;
            Ok(())
        })?;

        self.variables.remove_iterator(&iterator.name)?;
        Ok(())
    }

    fn condition(&mut self, condition: &Condition) -> Result<(), Error> {
        let Condition {
            relation,
            left,
            right,
        } = condition;

        if let (Some(l), Some(r)) = (left.as_number(), right.as_number()) {
            let holds = relation.evaluate(l, r);
            comment!(self, "{condition} is {holds}");
            self.emitter.zero();
            if holds {
                self.emitter.inc();
            }
            return Ok(());
        }

        match (left.as_number(), right.as_number()) {
            (_, Some(0)) => return self.compare_with_zero(*relation, left),
            (Some(0), _) => return self.compare_with_zero(relation.mirrored(), right),
            _ => {}
        }

        match right.as_direct() {
            Some(id) => {
                let address = self.variables.address_of(id)?;
                left.accept(self)?;
                self.emitter.sub(address);
            }
            None => {
                right.accept(self)?;
                self.emitter.store(RHS);
                left.accept(self)?;
                self.emitter.sub(RHS);
            }
        }

        self.branch_on_difference(*relation)
    }

    /// Turns `left - right` in the accumulator into 1 or 0. A non-zero difference already
    /// means `!=` holds.
    fn branch_on_difference(&mut self, relation: Relation) -> Result<(), Error> {
        if relation == Relation::NotEqual {
            return Ok(());
        }

        self.scoped(|c| {
            let holds = c.emitter.label()?;
            let end = c.emitter.label()?;

            match relation {
                Relation::Equal => c.emitter.jzero(holds)?,
                Relation::Less => c.emitter.jneg(holds)?,
                Relation::Greater => c.emitter.jpos(holds)?,
                Relation::LessOrEqual => {
                    c.emitter.jneg(holds)?;
                    c.emitter.jzero(holds)?;
                }
                Relation::GreaterOrEqual => {
                    c.emitter.jpos(holds)?;
                    c.emitter.jzero(holds)?;
                }
                Relation::NotEqual => {}
            }

            c.emitter.zero();
            c.emitter.jump(end)?;
            c.emitter.place(holds)?;
            c.emitter.load(ONE);
            c.emitter.place(end)?;
            Ok(())
        })
    }

    /// `value <relation> 0`. A positive or negative accumulator already counts as true.
    fn compare_with_zero(&mut self, relation: Relation, value: &Value) -> Result<(), Error> {
        value.accept(self)?;

        self.scoped(|c| {
            let one = c.emitter.label()?;
            let end = c.emitter.label()?;

            match relation {
                Relation::NotEqual => return Ok(()),
                Relation::Greater => {
                    c.emitter.jpos(end)?;
                    c.emitter.zero();
                    c.emitter.place(end)?;
                    return Ok(());
                }
                Relation::Less => {
                    c.emitter.jneg(end)?;
                    c.emitter.zero();
                    c.emitter.place(end)?;
                    return Ok(());
                }
                Relation::GreaterOrEqual => c.emitter.jpos(end)?,
                Relation::LessOrEqual => c.emitter.jneg(end)?,
                Relation::Equal => {}
            }

            c.emitter.jzero(one)?;
            c.emitter.zero();
            c.emitter.jump(end)?;
            c.emitter.place(one)?;
            c.emitter.inc();
            c.emitter.place(end)?;
            Ok(())
        })
    }

    fn binary(&mut self, op: Operator, left: &Value, right: &Value) -> Result<(), Error> {
        if self.reduce_operation(op, left, right)? {
            return Ok(());
        }

        right.accept(self)?;
        self.emitter.store(RHS);
        left.accept(self)?;

        match op {
            Operator::Add => self.emitter.add(RHS),
            Operator::Subtract => self.emitter.sub(RHS),
            Operator::Multiply => self.emitter.multiply()?,
            Operator::Divide => self.emitter.divide()?,
            Operator::Modulo => self.emitter.modulo()?,
        }
        Ok(())
    }

    /// Emits a cheaper equivalent of `left op right` when one exists. Returns false when
    /// the general routine is needed.
    fn reduce_operation(
        &mut self,
        op: Operator,
        left: &Value,
        right: &Value,
    ) -> Result<bool, Error> {
        let (left_number, right_number) = (left.as_number(), right.as_number());

        if let (Some(l), Some(r)) = (left_number, right_number) {
            // an overflowing fold is left to the machine
            if let Some(result) = op.apply(l, r) {
                comment!(self, "{l} {op} {r} = {result}");
                self.emitter.materialize(result, false);
                return Ok(true);
            }
        }

        let reduced = match (op, left_number, right_number) {
            (Operator::Multiply, Some(k), _) => self.multiply_by(right, k)?,
            (Operator::Multiply, _, Some(k)) => self.multiply_by(left, k)?,
            (Operator::Divide, _, Some(k)) => self.divide_by(left, k)?,
            (Operator::Divide | Operator::Modulo, Some(0), _) => {
                self.emitter.zero();
                true
            }
            _ => false,
        };
        if reduced {
            return Ok(true);
        }

        if let (Some(a), Some(b)) = (left.as_direct(), right.as_direct()) {
            if a.name == b.name && a.kind == b.kind {
                match op {
                    Operator::Add => {
                        left.accept(self)?;
                        self.emitter.shift(ONE);
                        return Ok(true);
                    }
                    Operator::Subtract => {
                        self.emitter.zero();
                        return Ok(true);
                    }
                    _ => {}
                }
            }
        }

        if let (Operator::Modulo, Some(k)) = (op, right_number) {
            if self.modulo_by(left, k)? {
                return Ok(true);
            }
        }

        let step = match (op, left_number, right_number) {
            (Operator::Add, Some(k @ (1 | -1)), _) => Some((right, k)),
            (Operator::Add, _, Some(k @ (1 | -1))) => Some((left, k)),
            (Operator::Subtract, _, Some(k @ (1 | -1))) => Some((left, -k)),
            _ => None,
        };
        if let Some((value, k)) = step {
            value.accept(self)?;
            if k == 1 {
                self.emitter.inc();
            } else {
                self.emitter.dec();
            }
            return Ok(true);
        }

        // operate on a variable's cell in place instead of staging it in a register
        match (op, right.as_direct(), left.as_direct()) {
            (Operator::Add | Operator::Subtract, Some(id), _) => {
                let address = self.variables.address_of(id)?;
                left.accept(self)?;
                if op == Operator::Add {
                    self.emitter.add(address);
                } else {
                    self.emitter.sub(address);
                }
                Ok(true)
            }
            (Operator::Add, None, Some(id)) => {
                let address = self.variables.address_of(id)?;
                right.accept(self)?;
                self.emitter.add(address);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn multiply_by(&mut self, value: &Value, k: i64) -> Result<bool, Error> {
        match k {
            0 => self.emitter.zero(),
            1 => value.accept(self)?,
            -1 => {
                value.accept(self)?;
                self.emitter.negate();
            }
            2 => {
                value.accept(self)?;
                self.emitter.shift(ONE);
            }
            -2 => {
                value.accept(self)?;
                self.emitter.shift(ONE);
                self.emitter.negate();
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn divide_by(&mut self, value: &Value, k: i64) -> Result<bool, Error> {
        match k {
            0 => self.emitter.zero(),
            1 => value.accept(self)?,
            -1 => {
                value.accept(self)?;
                self.emitter.negate();
            }
            2 => {
                value.accept(self)?;
                self.emitter.shift(NEG_ONE);
            }
            -2 => {
                value.accept(self)?;
                self.emitter.negate();
                self.emitter.shift(NEG_ONE);
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn modulo_by(&mut self, value: &Value, k: i64) -> Result<bool, Error> {
        match k {
            0 | 1 | -1 => self.emitter.zero(),
            2 => {
                value.accept(self)?;
                comment!(self, "parity");
                self.emitter.parity();
            }
            -2 => {
                value.accept(self)?;
                self.emitter.parity();
                self.emitter.negate();
            }
            _ => return Ok(false),
        }
        Ok(true)
    }
}

impl Visitor for Compiler<'_> {
    type Error = Error;

    fn pre_visit_program(&mut self, program: &Program) -> Result<bool, Error> {
        comment!(self, "BEGIN");
        self.emitter.zero();
        self.emitter.inc();
        self.emitter.store(ONE);
        self.emitter.dec();
        self.emitter.dec();
        self.emitter.store(NEG_ONE);

        for declaration in &program.declarations {
            declaration.accept(self)?;
        }

        // literal cells start at zero, meaning "not built yet"; zero itself needs no cell
        let analysis = self.analysis;
        let mut constants = analysis.constants.iter().filter(|&&value| value != 0);
        if let Some(&first) = constants.next() {
            self.emitter.zero();
            Declaration::Const(first).accept(self)?;
            for &value in constants {
                Declaration::Const(value).accept(self)?;
            }
        }

        self.statements(&program.statements)?;

        comment!(self, "END");
        self.emitter.halt();

        // the whole program was emitted by hand
        Ok(false)
    }

    fn visit_declaration(&mut self, declaration: &Declaration) -> Result<(), Error> {
        match declaration {
            Declaration::Number { name, .. } => {
                self.variables.declare_number(name)?;
            }
            Declaration::Array {
                name, begin, end, ..
            } => {
                let array = self.variables.declare_array(name, *begin, *end)?;
                let bias = array.bias().ok_or(variable_manager::Error::OutOfMemory)?;
                comment!(self, "{declaration}");
                self.emitter.materialize(bias, false);
                self.emitter.store(array.offset);
            }
            Declaration::Const(value) => {
                let cell = self.variables.declare_const(*value)?;
                comment!(self, "cell for {value}");
                self.emitter.store(cell.offset);
            }
        }
        Ok(())
    }

    fn pre_visit_statement(&mut self, statement: &Statement) -> Result<bool, Error> {
        match statement {
            Statement::Assign { target, expression } => {
                comment!(self, "{statement}");
                self.assign(target, |c| expression.accept(c))?;
            }
            Statement::Read(target) => {
                comment!(self, "{statement}");
                self.assign(target, |c| {
                    c.emitter.get();
                    Ok(())
                })?;
            }
            Statement::Write(expression) => {
                comment!(self, "{statement}");
                expression.accept(self)?;
                self.emitter.put();
            }
            Statement::If {
                condition,
                then_branch,
                else_branch,
            } => self.if_statement(condition, then_branch, else_branch.as_deref())?,
            Statement::While { condition, body } => self.while_loop(condition, body)?,
            Statement::DoWhile { body, condition } => self.do_while_loop(body, condition)?,
            Statement::For {
                iterator,
                from,
                to,
                direction,
                body,
            } => {
                comment!(self, "{statement}");
                self.for_loop(iterator, from, to, *direction, body)?
            }
        }
        Ok(false)
    }

    fn pre_visit_condition(&mut self, condition: &Condition) -> Result<bool, Error> {
        self.condition(condition)?;
        Ok(false)
    }

    fn pre_visit_expression(&mut self, expression: &Expression) -> Result<bool, Error> {
        match expression {
            Expression::Value(value) => value.accept(self)?,
            Expression::Binary { op, left, right } => self.binary(*op, left, right)?,
        }
        Ok(false)
    }

    fn visit_number(&mut self, value: i64) -> Result<(), Error> {
        self.load_number(value)
    }

    fn pre_visit_identifier_value(&mut self, id: &Identifier) -> Result<bool, Error> {
        match &id.kind {
            IdentifierKind::IndexedByVariable(index) => {
                self.element_address(&id.name, index)?;
                self.emitter.loadi(ACC);
            }
            _ => {
                let address = self.variables.address_of(id)?;
                self.emitter.load(address);
            }
        }
        Ok(false)
    }
}
