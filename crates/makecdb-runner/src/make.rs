//! The two make runs: a dry run that is parsed into the database, and an
//! optional real build whose output is passed through.

use crate::driver::{drive, CancelFlag, Outcome};
use crate::error::Result;
use crate::process::ProcessRunner;
use makecdb_build::{Database, MakeConfig};
use makecdb_parser::ParseSession;
use std::io::Write;
use tracing::{info, warn};

/// Result of the observation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DryRunSummary {
    pub outcome: Outcome,
    /// Compiler invocations recorded, counting repeats of the same file.
    pub recorded: usize,
}

/// Runs make through a [`ProcessRunner`].
#[derive(Debug)]
pub struct MakeRunner<R> {
    runner: R,
    config: MakeConfig,
    cancel: CancelFlag,
}

impl<R: ProcessRunner> MakeRunner<R> {
    pub fn new(runner: R, config: MakeConfig) -> Self {
        Self {
            runner,
            config,
            cancel: CancelFlag::new(),
        }
    }

    /// Observe `cancel` in every run.
    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Run make with the dry-run flags appended and record every compiler
    /// invocation it prints into `db`. make's stderr goes to `diagnostics`.
    ///
    /// On error the database keeps whatever was merged before the failing
    /// line; the caller decides whether to keep it.
    pub fn dry_run(&self, db: &mut Database, args: &[String], diagnostics: impl Write) -> Result<DryRunSummary> {
        let mut full_args = args.to_vec();
        full_args.extend(self.config.dry_run_flags.iter().cloned());

        let mut process = self.start(&full_args)?;
        let mut session = ParseSession::new(db);

        let outcome = drive(
            &mut process,
            self.config.poll_interval(),
            &self.cancel,
            |line| {
                session.feed(line)?;
                Ok(())
            },
            diagnostics,
        )?;

        let recorded = session.recorded();
        if !outcome.is_interrupted() {
            session.finish();
        }
        self.report(&outcome);

        Ok(DryRunSummary { outcome, recorded })
    }

    /// Run the real build, echoing its stdout to `output` and its stderr to
    /// `diagnostics`.
    pub fn wet_run(&self, args: &[String], mut output: impl Write, diagnostics: impl Write) -> Result<Outcome> {
        let mut process = self.start(args)?;

        let outcome = drive(
            &mut process,
            self.config.poll_interval(),
            &self.cancel,
            |line| {
                writeln!(output, "{}", line)?;
                Ok(())
            },
            diagnostics,
        )?;
        output.flush()?;

        self.report(&outcome);
        Ok(outcome)
    }

    fn start(&self, args: &[String]) -> Result<R::Process> {
        info!("** running: {} {}", self.config.program, args.join(" "));
        self.runner.start(&self.config.program, args)
    }

    fn report(&self, outcome: &Outcome) {
        match outcome {
            Outcome::Completed(Some(status)) if !status.success() => {
                warn!("{} exited with {}", self.config.program, status);
            }
            Outcome::Interrupted => warn!("{} was interrupted", self.config.program),
            _ => {}
        }
    }
}
