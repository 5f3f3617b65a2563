use compiler::{
    Analyzer, Compiler, CompilerConfig, Instructions,
    folder::{ConstantFolder, FolderConfig, ProcessInterpreter},
    machine::Machine,
};
use parser::{Parser, tree_node::Span};
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};
use thiserror::Error;
use tokenizer::Tokenizer;
use tracing::debug;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Parser(#[from] parser::Error),

    #[error(transparent)]
    Analysis(#[from] compiler::analyzer::Error),

    #[error(transparent)]
    Compile(#[from] compiler::Error),

    #[error(transparent)]
    IO(#[from] std::io::Error),
}

impl Error {
    /// Short category shown in front of the message.
    pub fn title(&self) -> &'static str {
        match self {
            Error::Parser(parser::Error::TokenizerError(_)) => "lexical error",
            Error::Parser(_) => "syntax error",
            Error::Analysis(error) => error.title(),
            Error::Compile(_) => "internal error",
            Error::IO(_) => "error",
        }
    }

    pub fn span(&self) -> Option<Span> {
        match self {
            Error::Parser(error) => error.span(),
            Error::Analysis(error) => Some(error.span()),
            Error::Compile(_) | Error::IO(_) => None,
        }
    }
}

/// Which interpreter, if any, runs the program for whole-program folding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Folding {
    Disabled,
    Builtin,
    Process(PathBuf),
}

#[derive(Debug, Clone)]
pub struct Options {
    pub compiler: CompilerConfig,
    pub folding: Folding,
    pub folder: FolderConfig,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            compiler: CompilerConfig::default(),
            folding: Folding::Process(PathBuf::from("./lib/interpreter")),
            folder: FolderConfig::default(),
        }
    }
}

/// Runs every phase over `source` and returns the final program.
pub fn compile(source: &str, options: &Options) -> Result<Instructions, Error> {
    let program = Parser::new(Tokenizer::from(source)).parse_all()?;
    let analysis = Analyzer::analyze(&program)?;
    let code = Compiler::new(&analysis, Some(options.compiler)).compile(&program)?;

    let folded = match &options.folding {
        Folding::Disabled => None,
        Folding::Builtin => {
            let machine = Machine::new(options.folder.step_limit);
            ConstantFolder::new(machine, Some(options.folder)).fold(&code.to_string(), &analysis)
        }
        Folding::Process(path) => {
            let interpreter = ProcessInterpreter::new(path, options.folder.timeout);
            ConstantFolder::new(interpreter, Some(options.folder))
                .fold(&code.to_string(), &analysis)
        }
    };

    Ok(folded.unwrap_or(code))
}

/// Compiles `input` into `output`. Nothing is written unless every phase succeeds.
pub fn compile_file(input: &Path, output: &Path, options: &Options) -> Result<(), Error> {
    let source = std::fs::read_to_string(input)?;
    let code = compile(&source, options)?;

    let mut writer = BufWriter::new(File::create(output)?);
    code.write(&mut writer)?;

    debug!(output = %output.display(), lines = code.len(), "program written");
    Ok(())
}

/// Prints diagnostics as `file:line:column: title: message`, followed by the source lines
/// leading up to the error and a marker under the offending token.
pub struct Reporter<W: Write> {
    out: W,
    file: PathBuf,
    source: Option<String>,
    errors: usize,
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W, file: impl Into<PathBuf>) -> Self {
        Self {
            out,
            file: file.into(),
            source: None,
            errors: 0,
        }
    }

    /// Source text to quote from. Without it the file is read when needed.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn errors(&self) -> usize {
        self.errors
    }

    pub fn report(&mut self, error: &Error) -> std::io::Result<()> {
        self.errors += 1;

        let file = self.file.display();
        let Some(span) = error.span() else {
            return writeln!(self.out, "{file}: {}: {error}", error.title());
        };

        writeln!(
            self.out,
            "{file}:{}:{}: {}: {error}",
            span.line,
            span.column,
            error.title()
        )?;
        self.excerpt(span)
    }

    fn excerpt(&mut self, span: Span) -> std::io::Result<()> {
        if self.source.is_none() {
            self.source = std::fs::read_to_string(&self.file).ok();
        }
        let Some(source) = &self.source else {
            return Ok(());
        };

        let first = span.line.saturating_sub(3);
        let lines: Vec<&str> = source
            .lines()
            .skip(first)
            .take(span.line - first)
            .collect();
        let Some(last) = lines.last() else {
            return Ok(());
        };

        for line in &lines {
            writeln!(self.out, "{line}")?;
        }

        // keep tabs so the marker lines up with the quoted text
        let indent: String = last
            .chars()
            .take(span.column.saturating_sub(1))
            .map(|c| if c == '\t' { '\t' } else { ' ' })
            .collect();
        let underline = "~".repeat(span.length.saturating_sub(1));
        writeln!(self.out, "{indent}^{underline}")
    }

    /// Prints the error count and returns the process exit code.
    pub fn finish(mut self) -> std::io::Result<i32> {
        match self.errors {
            0 => {}
            1 => writeln!(self.out, "1 error occurred.")?,
            n => writeln!(self.out, "{n} errors occurred.")?,
        }
        self.out.flush()?;
        Ok(i32::try_from(self.errors).unwrap_or(i32::MAX))
    }
}
