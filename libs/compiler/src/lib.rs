#[cfg(test)]
mod test;

pub mod analyzer;
pub mod arithmetic;
pub mod emitter;
pub mod folder;
pub mod instruction;
pub mod labels;
pub mod machine;
pub mod registers;
pub mod variable_manager;

mod codegen;

pub use analyzer::{Analysis, Analyzer};
pub use codegen::{Compiler, CompilerConfig, Error};
pub use instruction::Instructions;
