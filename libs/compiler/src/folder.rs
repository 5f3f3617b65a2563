//! Whole-program folding: a program that never reads input always prints the same
//! numbers, so once it has been run those numbers can replace it.

use crate::{
    analyzer::Analysis,
    emitter::Emitter,
    instruction::Instructions,
    machine::{self, Machine},
    registers::ONE,
};
use quick_error::quick_error;
use std::{
    io::Read,
    path::{Path, PathBuf},
    process::{Command, ExitStatus, Stdio},
    sync::atomic::{AtomicUsize, Ordering},
    thread,
    time::{Duration, Instant},
};
use tracing::debug;

quick_error! {
    #[derive(Debug)]
    pub enum Error {
        IoError(error: std::io::Error) {
            from()
            display("{error}")
            source(error)
        }
        MachineError(error: machine::Error) {
            from()
            display("{error}")
            source(error)
        }
        Timeout(limit: Duration) {
            display("Interpreter did not finish within {limit:?}")
        }
        Failed(status: ExitStatus, stderr: String) {
            display("Interpreter exited with {status}: {stderr}")
        }
        ReaderPanicked {
            display("Reading the interpreter output failed")
        }
    }
}

/// Something that can run an emitted program and report what it printed, one value per line.
pub trait Interpreter {
    fn execute(&self, program: &str) -> Result<String, Error>;
}

static SCRATCH_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Runs the external interpreter binary as `<path> <program file>`.
pub struct ProcessInterpreter {
    path: PathBuf,
    timeout: Duration,
}

impl ProcessInterpreter {
    pub fn new(path: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            path: path.into(),
            timeout,
        }
    }

    /// A program file no other `execute` call in any process is using.
    fn scratch_path() -> PathBuf {
        let id = SCRATCH_COUNTER.fetch_add(1, Ordering::Relaxed);
        std::env::temp_dir().join(format!("acclang-fold-{}-{id}.mr", std::process::id()))
    }

    fn run(&self, scratch: &Path) -> Result<String, Error> {
        let mut child = Command::new(&self.path)
            .arg(scratch)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        // drained on their own threads so a chatty child never blocks on a full pipe
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if Instant::now() >= deadline {
                child.kill()?;
                child.wait()?;
                return Err(Error::Timeout(self.timeout));
            }
            thread::sleep(Duration::from_millis(5));
        };

        let stdout = collect(stdout)?;
        let stderr = collect(stderr)?;

        if !status.success() {
            return Err(Error::Failed(status, stderr));
        }
        Ok(stdout)
    }
}

impl Interpreter for ProcessInterpreter {
    fn execute(&self, program: &str) -> Result<String, Error> {
        let scratch = Self::scratch_path();
        std::fs::write(&scratch, program)?;
        let result = self.run(&scratch);

        if let Err(error) = std::fs::remove_file(&scratch) {
            debug!(%error, path = %scratch.display(), "could not remove scratch file");
        }
        result
    }
}

fn drain(mut source: impl Read + Send + 'static) -> thread::JoinHandle<std::io::Result<String>> {
    thread::spawn(move || {
        let mut buffer = String::new();
        source.read_to_string(&mut buffer)?;
        Ok(buffer)
    })
}

fn collect(reader: Option<thread::JoinHandle<std::io::Result<String>>>) -> Result<String, Error> {
    match reader {
        Some(handle) => Ok(handle.join().map_err(|_| Error::ReaderPanicked)??),
        None => Ok(String::new()),
    }
}

/// The reference machine stands in for the external binary. It has no input to offer.
impl Interpreter for Machine {
    fn execute(&self, program: &str) -> Result<String, Error> {
        let output = self.run_text(program)?;

        Ok(output
            .iter()
            .map(|value| format!("{value}\n"))
            .collect())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FolderConfig {
    /// Longest output still worth replacing the program with.
    pub max_lines: usize,
    pub timeout: Duration,
    /// Budget for the in-process machine.
    pub step_limit: u64,
}

impl Default for FolderConfig {
    fn default() -> Self {
        Self {
            max_lines: 15,
            timeout: Duration::from_secs(5),
            step_limit: 10_000_000,
        }
    }
}

pub struct ConstantFolder<I: Interpreter> {
    interpreter: I,
    config: FolderConfig,
}

impl<I: Interpreter> ConstantFolder<I> {
    pub fn new(interpreter: I, config: Option<FolderConfig>) -> Self {
        Self {
            interpreter,
            config: config.unwrap_or_default(),
        }
    }

    /// A program printing the same values as `program`, or `None` when it cannot be
    /// folded. Never fails: every problem just keeps the original.
    pub fn fold(&self, program: &str, analysis: &Analysis) -> Option<Instructions> {
        if analysis.reads_input {
            debug!("program reads input, not folding");
            return None;
        }

        let output = match self.interpreter.execute(program) {
            Ok(output) => output,
            Err(error) => {
                debug!(%error, "interpreter failed, not folding");
                return None;
            }
        };

        let values = match self.parse_output(&output) {
            Some(values) => values,
            None => {
                debug!(output = %output.trim_end(), "unusable interpreter output, not folding");
                return None;
            }
        };

        debug!(values = values.len(), "program folded");
        Some(Self::printer(&values))
    }

    fn parse_output(&self, output: &str) -> Option<Vec<i64>> {
        let values = output
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| line.parse::<i64>().ok())
            .collect::<Option<Vec<_>>>()?;

        if values.len() > self.config.max_lines {
            return None;
        }
        Some(values)
    }

    /// `SUB 0; INC; STORE 1`, then every value built from zero and printed, then `HALT`.
    fn printer(values: &[i64]) -> Instructions {
        let mut emitter = Emitter::default();

        emitter.zero();
        emitter.inc();
        emitter.store(ONE);
        for &value in values {
            emitter.materialize(value, false);
            emitter.put();
        }
        emitter.halt();

        // no labels are ever opened here
        emitter.finish().unwrap_or_default()
    }
}
