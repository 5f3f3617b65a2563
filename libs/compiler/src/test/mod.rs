use crate::{Analyzer, Compiler, CompilerConfig, Instructions, machine::Machine};
use parser::Parser;
use tokenizer::Tokenizer;

pub(crate) fn build(source: &str, config: Option<CompilerConfig>) -> anyhow::Result<Instructions> {
    let program = Parser::new(Tokenizer::from(source)).parse_all()?;
    let analysis = Analyzer::analyze(&program)?;
    Ok(Compiler::new(&analysis, config).compile(&program)?)
}

/// Compiles and runs `source` on the reference machine, feeding it `input`.
pub(crate) fn run(source: &str, input: &[i64]) -> anyhow::Result<Vec<i64>> {
    let code = build(source, None)?;
    Ok(Machine::default()
        .with_input(input.iter().copied())
        .run(&code)?)
}

#[macro_export]
macro_rules! compile {
    ($source:expr) => {
        crate::test::build($source, None)?.to_string()
    };

    (debug $source:expr) => {
        crate::test::build($source, Some(crate::CompilerConfig { debug: true }))?.to_string()
    };
}

mod analysis;
mod arithmetic;
mod control_flow;
