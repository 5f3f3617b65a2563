use std::fmt::{self, Display};
use tokenizer::token::Token;

/// A source region, 1-based, used to underline offending code in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub line: usize,
    pub column: usize,
    pub length: usize,
}

impl Span {
    pub fn new(line: usize, column: usize, length: usize) -> Self {
        Self {
            line,
            column,
            length,
        }
    }

    /// Extends this span up to the end of `other` when both sit on the same line.
    pub fn to(self, other: Span) -> Span {
        if other.line != self.line || other.column < self.column {
            return self;
        }
        Span {
            length: other.column + other.length - self.column,
            ..self
        }
    }
}

impl From<&Token> for Span {
    fn from(token: &Token) -> Self {
        Span::new(token.line, token.column, token.length)
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Program {
    pub declarations: Vec<Declaration>,
    pub statements: Vec<Statement>,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Declaration {
    Number {
        name: String,
        span: Span,
    },
    /// `name(begin:end)`, both bounds inclusive
    Array {
        name: String,
        begin: i64,
        end: i64,
        span: Span,
    },
    /// Never produced by the parser. Stands for the memory cell that caches a literal value.
    Const(i64),
}

impl Display for Declaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Declaration::Number { name, .. } => write!(f, "{name}"),
            Declaration::Array {
                name, begin, end, ..
            } => write!(f, "{name}({begin}:{end})"),
            Declaration::Const(value) => write!(f, "{value}"),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum IdentifierKind {
    /// `n`
    Scalar,
    /// `t(5)`
    IndexedByNumber(i64),
    /// `t(i)`, the index is always a scalar identifier
    IndexedByVariable(Box<Identifier>),
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Identifier {
    pub name: String,
    pub kind: IdentifierKind,
    pub span: Span,
}

impl Identifier {
    pub fn scalar(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            kind: IdentifierKind::Scalar,
            span,
        }
    }

    /// True when the memory address of this identifier is known at compile time.
    pub fn is_direct(&self) -> bool {
        !matches!(self.kind, IdentifierKind::IndexedByVariable(_))
    }
}

impl Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            IdentifierKind::Scalar => write!(f, "{}", self.name),
            IdentifierKind::IndexedByNumber(index) => write!(f, "{}({index})", self.name),
            IdentifierKind::IndexedByVariable(index) => write!(f, "{}({index})", self.name),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Value {
    Number(i64),
    Identifier(Identifier),
}

impl Value {
    pub fn as_number(&self) -> Option<i64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Identifier(_) => None,
        }
    }

    /// The identifier behind this value if its address is static.
    pub fn as_direct(&self) -> Option<&Identifier> {
        match self {
            Value::Identifier(id) if id.is_direct() => Some(id),
            _ => None,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{n}"),
            Value::Identifier(id) => write!(f, "{id}"),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Operator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
}

impl Operator {
    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Add => "+",
            Operator::Subtract => "-",
            Operator::Multiply => "*",
            Operator::Divide => "/",
            Operator::Modulo => "%",
        }
    }

    /// Evaluates the operator the way the target machine does. Division rounds toward
    /// negative infinity, the remainder takes the sign of the divisor, and a zero divisor
    /// yields zero. Returns `None` on overflow.
    pub fn apply(&self, left: i64, right: i64) -> Option<i64> {
        match self {
            Operator::Add => left.checked_add(right),
            Operator::Subtract => left.checked_sub(right),
            Operator::Multiply => left.checked_mul(right),
            Operator::Divide if right == 0 => Some(0),
            Operator::Divide => {
                let quotient = left.checked_div(right)?;
                if left % right != 0 && (left < 0) != (right < 0) {
                    quotient.checked_sub(1)
                } else {
                    Some(quotient)
                }
            }
            Operator::Modulo if right == 0 => Some(0),
            Operator::Modulo => {
                let remainder = left.checked_rem(right)?;
                if remainder != 0 && (remainder < 0) != (right < 0) {
                    Some(remainder + right)
                } else {
                    Some(remainder)
                }
            }
        }
    }
}

impl Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Relation {
    Equal,
    NotEqual,
    Less,
    Greater,
    LessOrEqual,
    GreaterOrEqual,
}

impl Relation {
    pub fn symbol(&self) -> &'static str {
        match self {
            Relation::Equal => "=",
            Relation::NotEqual => "!=",
            Relation::Less => "<",
            Relation::Greater => ">",
            Relation::LessOrEqual => "<=",
            Relation::GreaterOrEqual => ">=",
        }
    }

    pub fn evaluate(&self, left: i64, right: i64) -> bool {
        match self {
            Relation::Equal => left == right,
            Relation::NotEqual => left != right,
            Relation::Less => left < right,
            Relation::Greater => left > right,
            Relation::LessOrEqual => left <= right,
            Relation::GreaterOrEqual => left >= right,
        }
    }

    /// The relation that holds after swapping both operands: `a < b` <=> `b > a`.
    pub fn mirrored(&self) -> Self {
        match self {
            Relation::Less => Relation::Greater,
            Relation::Greater => Relation::Less,
            Relation::LessOrEqual => Relation::GreaterOrEqual,
            Relation::GreaterOrEqual => Relation::LessOrEqual,
            other => *other,
        }
    }
}

impl Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Expression {
    Value(Value),
    Binary {
        op: Operator,
        left: Value,
        right: Value,
    },
}

impl Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Value(value) => write!(f, "{value}"),
            Expression::Binary { op, left, right } => write!(f, "{left} {op} {right}"),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Condition {
    pub relation: Relation,
    pub left: Value,
    pub right: Value,
}

impl Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.left, self.relation, self.right)
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Direction {
    /// `FOR i FROM a TO b`
    Up,
    /// `FOR i FROM a DOWNTO b`
    Down,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Statement {
    Assign {
        target: Identifier,
        expression: Expression,
    },
    If {
        condition: Condition,
        then_branch: Vec<Statement>,
        else_branch: Option<Vec<Statement>>,
    },
    While {
        condition: Condition,
        body: Vec<Statement>,
    },
    DoWhile {
        body: Vec<Statement>,
        condition: Condition,
    },
    For {
        iterator: Identifier,
        from: Value,
        to: Value,
        direction: Direction,
        body: Vec<Statement>,
    },
    Read(Identifier),
    Write(Expression),
}

/// Only the header line of compound statements is printed.
impl Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Assign { target, expression } => write!(f, "{target} := {expression}"),
            Statement::If { condition, .. } => write!(f, "IF {condition}"),
            Statement::While { condition, .. } => write!(f, "WHILE {condition}"),
            Statement::DoWhile { condition, .. } => write!(f, "DO WHILE {condition}"),
            Statement::For {
                iterator,
                from,
                to,
                direction,
                ..
            } => {
                let direction = match direction {
                    Direction::Up => "TO",
                    Direction::Down => "DOWNTO",
                };
                write!(f, "FOR {iterator} FROM {from} {direction} {to}")
            }
            Statement::Read(target) => write!(f, "READ {target}"),
            Statement::Write(expression) => write!(f, "WRITE {expression}"),
        }
    }
}

/// Double-dispatch traversal over the tree.
///
/// Composite nodes call `pre_visit_*` first. Returning `false` hands the whole subtree to
/// the visitor: children are not traversed and `post_visit_*` is not called. Leaves call a
/// single `visit_*`. Every hook defaults to a pass-through.
pub trait Visitor {
    type Error;

    fn pre_visit_program(&mut self, _program: &Program) -> Result<bool, Self::Error> {
        Ok(true)
    }
    fn post_visit_program(&mut self, _program: &Program) -> Result<(), Self::Error> {
        Ok(())
    }

    fn visit_declaration(&mut self, _declaration: &Declaration) -> Result<(), Self::Error> {
        Ok(())
    }

    fn pre_visit_statement(&mut self, _statement: &Statement) -> Result<bool, Self::Error> {
        Ok(true)
    }
    fn post_visit_statement(&mut self, _statement: &Statement) -> Result<(), Self::Error> {
        Ok(())
    }

    fn pre_visit_condition(&mut self, _condition: &Condition) -> Result<bool, Self::Error> {
        Ok(true)
    }
    fn post_visit_condition(&mut self, _condition: &Condition) -> Result<(), Self::Error> {
        Ok(())
    }

    fn pre_visit_expression(&mut self, _expression: &Expression) -> Result<bool, Self::Error> {
        Ok(true)
    }
    fn post_visit_expression(&mut self, _expression: &Expression) -> Result<(), Self::Error> {
        Ok(())
    }

    fn visit_number(&mut self, _value: i64) -> Result<(), Self::Error> {
        Ok(())
    }

    /// An identifier read for its value.
    fn pre_visit_identifier_value(&mut self, _id: &Identifier) -> Result<bool, Self::Error> {
        Ok(true)
    }
    fn post_visit_identifier_value(&mut self, _id: &Identifier) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Called for every identifier, before the index of a variable-indexed one.
    fn visit_identifier(&mut self, _id: &Identifier) -> Result<(), Self::Error> {
        Ok(())
    }
    fn pre_visit_indexed_identifier(&mut self, _id: &Identifier) -> Result<bool, Self::Error> {
        Ok(true)
    }
    fn post_visit_indexed_identifier(&mut self, _id: &Identifier) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl Program {
    pub fn accept<V: Visitor + ?Sized>(&self, visitor: &mut V) -> Result<(), V::Error> {
        if !visitor.pre_visit_program(self)? {
            return Ok(());
        }
        for declaration in &self.declarations {
            declaration.accept(visitor)?;
        }
        for statement in &self.statements {
            statement.accept(visitor)?;
        }
        visitor.post_visit_program(self)
    }
}

impl Declaration {
    pub fn accept<V: Visitor + ?Sized>(&self, visitor: &mut V) -> Result<(), V::Error> {
        visitor.visit_declaration(self)
    }
}

impl Statement {
    pub fn accept<V: Visitor + ?Sized>(&self, visitor: &mut V) -> Result<(), V::Error> {
        if !visitor.pre_visit_statement(self)? {
            return Ok(());
        }

        match self {
            Statement::Assign { target, expression } => {
                target.accept(visitor)?;
                expression.accept(visitor)?;
            }
            Statement::If {
                condition,
                then_branch,
                else_branch,
            } => {
                condition.accept(visitor)?;
                for statement in then_branch {
                    statement.accept(visitor)?;
                }
                for statement in else_branch.iter().flatten() {
                    statement.accept(visitor)?;
                }
            }
            Statement::While { condition, body } => {
                condition.accept(visitor)?;
                for statement in body {
                    statement.accept(visitor)?;
                }
            }
            Statement::DoWhile { body, condition } => {
                for statement in body {
                    statement.accept(visitor)?;
                }
                condition.accept(visitor)?;
            }
            Statement::For { from, to, body, .. } => {
                from.accept(visitor)?;
                to.accept(visitor)?;
                for statement in body {
                    statement.accept(visitor)?;
                }
            }
            Statement::Read(target) => target.accept(visitor)?,
            Statement::Write(expression) => expression.accept(visitor)?,
        }

        visitor.post_visit_statement(self)
    }
}

impl Condition {
    pub fn accept<V: Visitor + ?Sized>(&self, visitor: &mut V) -> Result<(), V::Error> {
        if !visitor.pre_visit_condition(self)? {
            return Ok(());
        }
        self.left.accept(visitor)?;
        self.right.accept(visitor)?;
        visitor.post_visit_condition(self)
    }
}

impl Expression {
    pub fn accept<V: Visitor + ?Sized>(&self, visitor: &mut V) -> Result<(), V::Error> {
        if !visitor.pre_visit_expression(self)? {
            return Ok(());
        }
        match self {
            Expression::Value(value) => value.accept(visitor)?,
            Expression::Binary { left, right, .. } => {
                left.accept(visitor)?;
                right.accept(visitor)?;
            }
        }
        visitor.post_visit_expression(self)
    }
}

impl Value {
    pub fn accept<V: Visitor + ?Sized>(&self, visitor: &mut V) -> Result<(), V::Error> {
        match self {
            Value::Number(n) => visitor.visit_number(*n),
            Value::Identifier(id) => {
                if !visitor.pre_visit_identifier_value(id)? {
                    return Ok(());
                }
                id.accept(visitor)?;
                visitor.post_visit_identifier_value(id)
            }
        }
    }
}

impl Identifier {
    pub fn accept<V: Visitor + ?Sized>(&self, visitor: &mut V) -> Result<(), V::Error> {
        visitor.visit_identifier(self)?;

        if let IdentifierKind::IndexedByVariable(index) = &self.kind {
            if !visitor.pre_visit_indexed_identifier(self)? {
                return Ok(());
            }
            index.accept(visitor)?;
            visitor.post_visit_indexed_identifier(self)?;
        }

        Ok(())
    }
}
