use acclang::{Folding, Options, Reporter};
use clap::Parser;
use compiler::{CompilerConfig, folder::FolderConfig};
use std::{io::stdout, path::PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Source file to compile
    input: PathBuf,
    /// Where the machine program is written
    output: PathBuf,
    /// Interpreter binary used to fold programs that read no input
    #[arg(long, default_value = "./lib/interpreter")]
    interpreter: PathBuf,
    /// Fold with the built-in machine instead of the interpreter binary
    #[arg(long)]
    builtin_interpreter: bool,
    /// Never replace the program with its precomputed output
    #[arg(long)]
    no_fold: bool,
    /// Annotate the output with the source construct of each line
    #[arg(short, long)]
    debug: bool,
    /// Log what every phase is doing
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn options(&self) -> Options {
        let folding = if self.no_fold {
            Folding::Disabled
        } else if self.builtin_interpreter {
            Folding::Builtin
        } else {
            Folding::Process(self.interpreter.clone())
        };

        Options {
            compiler: CompilerConfig { debug: self.debug },
            folding,
            folder: FolderConfig::default(),
        }
    }
}

fn run_logic(args: &Args) -> anyhow::Result<i32> {
    let mut reporter = Reporter::new(stdout(), &args.input);

    if let Err(error) = acclang::compile_file(&args.input, &args.output, &args.options()) {
        reporter.report(&error)?;
    }

    Ok(reporter.finish()?)
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let code = run_logic(&args)?;
    if code != 0 {
        std::process::exit(code);
    }

    Ok(())
}
