use parser::tree_node::*;
use quick_error::quick_error;
use std::collections::{HashMap, HashSet};
use tracing::debug;

quick_error! {
    #[derive(Debug, PartialEq, Eq)]
    pub enum Error {
        DuplicateDeclaration(name: String, span: Span) {
            display("Variable '{name}' is already declared.")
        }
        InvalidRange(name: String, span: Span) {
            display("Array '{name}' has an incorrect index range.")
        }
        IteratorShadowing(name: String, span: Span) {
            display("For-Loop iterator '{name}' is already declared.")
        }
        UndeclaredVariable(name: String, span: Span) {
            display("Undeclared variable: '{name}'")
        }
        ArrayUsedAsNumber(name: String, span: Span) {
            display("Array variable '{name}' used in a context of a number.")
        }
        NumberUsedAsArray(name: String, span: Span) {
            display("Number variable '{name}' used in a context of an array.")
        }
        IndexOutOfBounds(name: String, index: i64, span: Span) {
            display("Index {index} is out of bounds for array '{name}'.")
        }
        IteratorIsReadOnly(name: String, span: Span) {
            display("Cannot READ value into For-Loop iterator '{name}'.")
        }
        IteratorIsAssignTarget(name: String, span: Span) {
            display("Cannot ASSIGN value into For-Loop iterator '{name}'.")
        }
        UseBeforeAssignment(name: String, span: Span) {
            display("Variable '{name}' is used before being assigned.")
        }
    }
}

impl Error {
    pub fn title(&self) -> &'static str {
        match self {
            Error::DuplicateDeclaration(..) => "duplicate declaration",
            Error::InvalidRange(..) => "invalid range",
            Error::IteratorShadowing(..) => "iterator shadowing",
            Error::UndeclaredVariable(..) => "undeclared variable",
            Error::ArrayUsedAsNumber(..) | Error::NumberUsedAsArray(..) => "type mismatch",
            Error::IndexOutOfBounds(..) => "index out of bounds",
            Error::IteratorIsReadOnly(..) | Error::IteratorIsAssignTarget(..) => {
                "read-only iterator"
            }
            Error::UseBeforeAssignment(..) => "use before assignment",
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Error::DuplicateDeclaration(_, span)
            | Error::InvalidRange(_, span)
            | Error::IteratorShadowing(_, span)
            | Error::UndeclaredVariable(_, span)
            | Error::ArrayUsedAsNumber(_, span)
            | Error::NumberUsedAsArray(_, span)
            | Error::IndexOutOfBounds(_, _, span)
            | Error::IteratorIsReadOnly(_, span)
            | Error::IteratorIsAssignTarget(_, span)
            | Error::UseBeforeAssignment(_, span) => *span,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SymbolKind {
    Number,
    Array { begin: i64, end: i64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SymbolScope {
    Global,
    LoopIterator,
}

#[derive(Debug)]
struct Symbol {
    kind: SymbolKind,
    scope: SymbolScope,
    assigned: bool,
}

/// What later phases need to know about a program that passed analysis.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Analysis {
    /// Every literal value in the program, once each, in order of first appearance.
    pub constants: Vec<i64>,
    /// Whether a `READ` appears anywhere.
    pub reads_input: bool,
}

/// Checks scoping, identifier kinds and definite assignment, stopping at the first
/// violation. All names share one flat namespace; a loop iterator lives only inside its
/// loop body.
#[derive(Default)]
pub struct Analyzer {
    symbols: HashMap<String, Symbol>,
    constants: Vec<i64>,
    seen_constants: HashSet<i64>,
    reads_input: bool,
}

impl Analyzer {
    pub fn analyze(program: &Program) -> Result<Analysis, Error> {
        let mut analyzer = Analyzer::default();
        program.accept(&mut analyzer)?;

        debug!(
            symbols = analyzer.symbols.len(),
            constants = analyzer.constants.len(),
            reads_input = analyzer.reads_input,
            "analysis finished"
        );

        Ok(Analysis {
            constants: analyzer.constants,
            reads_input: analyzer.reads_input,
        })
    }

    fn declare(&mut self, name: &str, span: Span, kind: SymbolKind) -> Result<(), Error> {
        if self.symbols.contains_key(name) {
            return Err(Error::DuplicateDeclaration(name.to_string(), span));
        }

        self.symbols.insert(
            name.to_string(),
            Symbol {
                kind,
                scope: SymbolScope::Global,
                assigned: false,
            },
        );
        Ok(())
    }

    fn symbol(&self, id: &Identifier) -> Result<&Symbol, Error> {
        self.symbols
            .get(&id.name)
            .ok_or_else(|| Error::UndeclaredVariable(id.name.clone(), id.span))
    }

    fn require_assigned(&self, id: &Identifier) -> Result<(), Error> {
        if !self.symbol(id)?.assigned {
            return Err(Error::UseBeforeAssignment(id.name.clone(), id.span));
        }
        Ok(())
    }

    fn require_assigned_index(&self, id: &Identifier) -> Result<(), Error> {
        match &id.kind {
            IdentifierKind::IndexedByVariable(index) => self.require_assigned(index),
            _ => Ok(()),
        }
    }

    /// Rules shared by `READ` and assignment targets, applied once the whole statement
    /// has been checked.
    fn write_target(
        &mut self,
        target: &Identifier,
        iterator_error: fn(String, Span) -> Error,
    ) -> Result<(), Error> {
        self.require_assigned_index(target)?;

        let span = target.span;
        let symbol = self
            .symbols
            .get_mut(&target.name)
            .ok_or_else(|| Error::UndeclaredVariable(target.name.clone(), span))?;

        if symbol.scope == SymbolScope::LoopIterator {
            return Err(iterator_error(target.name.clone(), span));
        }
        symbol.assigned = true;
        Ok(())
    }

    fn for_loop(
        &mut self,
        iterator: &Identifier,
        from: &Value,
        to: &Value,
        body: &[Statement],
    ) -> Result<(), Error> {
        if self.symbols.contains_key(&iterator.name) {
            return Err(Error::IteratorShadowing(
                iterator.name.clone(),
                iterator.span,
            ));
        }

        from.accept(self)?;
        to.accept(self)?;

        self.symbols.insert(
            iterator.name.clone(),
            Symbol {
                kind: SymbolKind::Number,
                scope: SymbolScope::LoopIterator,
                assigned: true,
            },
        );

        for statement in body {
            statement.accept(self)?;
        }

        self.symbols.remove(&iterator.name);
        Ok(())
    }
}

impl Visitor for Analyzer {
    type Error = Error;

    fn visit_declaration(&mut self, declaration: &Declaration) -> Result<(), Error> {
        match declaration {
            Declaration::Number { name, span } => self.declare(name, *span, SymbolKind::Number),
            Declaration::Array {
                name,
                begin,
                end,
                span,
            } => {
                if self.symbols.contains_key(name) {
                    return Err(Error::DuplicateDeclaration(name.clone(), *span));
                }
                if begin > end {
                    return Err(Error::InvalidRange(name.clone(), *span));
                }
                self.declare(
                    name,
                    *span,
                    SymbolKind::Array {
                        begin: *begin,
                        end: *end,
                    },
                )
            }
            Declaration::Const(_) => Ok(()),
        }
    }

    fn pre_visit_statement(&mut self, statement: &Statement) -> Result<bool, Error> {
        match statement {
            Statement::Assign { target, expression } => {
                target.accept(self)?;
                expression.accept(self)?;
                self.write_target(target, Error::IteratorIsAssignTarget)?;
                Ok(false)
            }
            Statement::Read(target) => {
                self.reads_input = true;
                target.accept(self)?;
                self.write_target(target, Error::IteratorIsReadOnly)?;
                Ok(false)
            }
            Statement::For {
                iterator,
                from,
                to,
                body,
                ..
            } => {
                self.for_loop(iterator, from, to, body)?;
                Ok(false)
            }
            _ => Ok(true),
        }
    }

    fn visit_number(&mut self, value: i64) -> Result<(), Error> {
        if self.seen_constants.insert(value) {
            self.constants.push(value);
        }
        Ok(())
    }

    fn visit_identifier(&mut self, id: &Identifier) -> Result<(), Error> {
        let symbol = self.symbol(id)?;

        match (&id.kind, symbol.kind) {
            (IdentifierKind::Scalar, SymbolKind::Array { .. }) => {
                Err(Error::ArrayUsedAsNumber(id.name.clone(), id.span))
            }
            (IdentifierKind::Scalar, SymbolKind::Number) => Ok(()),
            (_, SymbolKind::Number) => Err(Error::NumberUsedAsArray(id.name.clone(), id.span)),
            (IdentifierKind::IndexedByNumber(index), SymbolKind::Array { begin, end }) => {
                if !(begin..=end).contains(index) {
                    return Err(Error::IndexOutOfBounds(id.name.clone(), *index, id.span));
                }
                Ok(())
            }
            (IdentifierKind::IndexedByVariable(_), SymbolKind::Array { .. }) => Ok(()),
        }
    }

    fn post_visit_identifier_value(&mut self, id: &Identifier) -> Result<(), Error> {
        self.require_assigned(id)?;
        self.require_assigned_index(id)
    }
}
