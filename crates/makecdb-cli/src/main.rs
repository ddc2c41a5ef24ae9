use clap::{ArgAction, Parser};
use makecdb_build::{Config, Database};
use makecdb_runner::{CancelFlag, MakeRunner, SystemRunner};
use miette::{IntoDiagnostic, Result};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Exit status after an interrupt, as a shell would report SIGINT.
const EXIT_INTERRUPTED: u8 = 130;

/// Long options of ours that take a value, either as the next argument or
/// after `=`.
const VALUE_OPTIONS: [&str; 3] = ["--output", "--config", "--make"];

/// Options of ours that take no value.
const FLAG_OPTIONS: [&str; 8] = ["-n", "--dry-run", "--build", "--verbose", "--quiet", "-h", "--help", "--version"];

/// Short options of ours whose value may be attached or the next argument.
const EXTRA_FLAG_OPTIONS: [&str; 3] = ["-I", "-D", "-W"];

#[derive(Parser, Debug)]
#[command(name = "makecdb")]
#[command(author, version, about = "Generate compile_commands.json from make output")]
#[command(disable_version_flag = true)]
#[command(override_usage = "makecdb [OPTIONS] [--] [MAKE_ARGS]...")]
#[command(after_help = "\
The first unknown argument, or all arguments after '--', are passed to make.
Apart from -n, -I, -D and -W every option is long-only, so make's own short
flags such as -o, -v, -q and -k reach make unchanged. To pass -n, -I, -D or
-W to make itself, put them after '--':

    makecdb -Iextra_include/ -- -Iaoeu foo")]
struct Cli {
    /// Print the database instead of writing it
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Add -I<PATH> to every entry
    #[arg(short = 'I', value_name = "PATH", allow_hyphen_values = true)]
    include: Vec<String>,

    /// Add -D<DEF> to every entry
    #[arg(short = 'D', value_name = "DEF", allow_hyphen_values = true)]
    define: Vec<String>,

    /// Add -W<FLAG> to every entry
    #[arg(short = 'W', value_name = "FLAG", allow_hyphen_values = true)]
    warning: Vec<String>,

    /// Database path [default: compile_commands.json]
    #[arg(long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Config file [default: ./makecdb.toml if present]
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Build tool to run [default: make]
    #[arg(long, value_name = "PROGRAM")]
    make: Option<String>,

    /// Run the real build after recording the commands
    #[arg(long)]
    build: bool,

    /// More logging (once for debug, twice for trace)
    #[arg(long, action = ArgAction::Count, conflicts_with = "quiet")]
    verbose: u8,

    /// Only log warnings and errors
    #[arg(long)]
    quiet: bool,

    /// Print version
    #[arg(long, action = ArgAction::Version)]
    version: Option<bool>,

    /// Arguments for make, split off before clap sees the rest
    #[arg(skip)]
    make_args: Vec<String>,
}

/// Split the command line (without the program name) into our options and
/// make's arguments. Our options end at `--`, which is dropped, or at the
/// first argument we don't recognize, which is kept for make.
fn split_args<I>(args: I) -> (Vec<String>, Vec<String>)
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    let mut ours = Vec::new();

    while let Some(arg) = args.next() {
        if arg == "--" {
            break;
        }
        if EXTRA_FLAG_OPTIONS.contains(&arg.as_str()) || VALUE_OPTIONS.contains(&arg.as_str()) {
            ours.push(arg);
            ours.extend(args.next());
        } else if is_own_option(&arg) {
            ours.push(arg);
        } else {
            let mut make_args = vec![arg];
            make_args.extend(args);
            return (ours, make_args);
        }
    }

    (ours, args.collect())
}

fn is_own_option(arg: &str) -> bool {
    FLAG_OPTIONS.contains(&arg)
        || EXTRA_FLAG_OPTIONS.iter().any(|prefix| arg.starts_with(prefix))
        || VALUE_OPTIONS
            .iter()
            .any(|option| arg.strip_prefix(option).is_some_and(|rest| rest.starts_with('=')))
}

impl Cli {
    /// Parse a command line, program name excluded.
    fn try_from_args<I>(args: I) -> std::result::Result<Self, clap::Error>
    where
        I: IntoIterator<Item = String>,
    {
        let (ours, make_args) = split_args(args);
        let mut cli = Self::try_parse_from(std::iter::once("makecdb".to_string()).chain(ours))?;
        cli.make_args = make_args;
        Ok(cli)
    }

    /// Arguments appended to every database entry: the configured ones, then
    /// -I, -D and -W from the command line.
    fn extra_args(&self, configured: &[String]) -> Vec<String> {
        let mut extra = configured.to_vec();
        extra.extend(self.include.iter().map(|p| format!("-I{}", p)));
        extra.extend(self.define.iter().map(|d| format!("-D{}", d)));
        extra.extend(self.warning.iter().map(|w| format!("-W{}", w)));
        extra
    }

    fn log_level(&self) -> &'static str {
        if self.quiet {
            return "warn";
        }
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_env("MAKECDB_LOG").unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .without_time(),
        )
        .with(filter)
        .init();
}

fn main() -> Result<ExitCode> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))?;

    let cli = Cli::try_from_args(std::env::args().skip(1)).unwrap_or_else(|e| e.exit());
    init_tracing(cli.log_level());

    run(cli)
}

fn run(cli: Cli) -> Result<ExitCode> {
    let cwd = std::env::current_dir().into_diagnostic()?;
    let mut config = Config::discover(cli.config.as_deref(), &cwd)?;
    if let Some(program) = &cli.make {
        config.make.program = program.clone();
    }

    let db_path = cli.output.clone().unwrap_or_else(|| config.database.path.clone());
    let extra_args = cli.extra_args(&config.database.extra_args);

    let mut db = Database::load(&db_path)?;
    debug!(entries = db.len(), path = %db_path.display(), "loaded compilation database");

    let cancel = CancelFlag::new();
    {
        let cancel = cancel.clone();
        ctrlc::set_handler(move || cancel.cancel()).into_diagnostic()?;
    }

    // Directory announcements are only recognized untranslated.
    let observer = MakeRunner::new(SystemRunner::new().env("LC_ALL", "C"), config.make.clone())
        .with_cancel_flag(cancel.clone());
    let summary = observer.dry_run(&mut db, &cli.make_args, std::io::stderr())?;
    info!(recorded = summary.recorded, entries = db.len(), "parsed build output");

    let mut interrupted = summary.outcome.is_interrupted();
    if cli.build && !interrupted {
        let builder = MakeRunner::new(SystemRunner::new(), config.make.clone()).with_cancel_flag(cancel);
        interrupted = builder
            .wet_run(&cli.make_args, std::io::stdout(), std::io::stderr())?
            .is_interrupted();
    }

    db.apply_extra_args(&extra_args);

    if cli.dry_run {
        println!("{}", db.to_json()?);
    } else {
        db.store(&db_path)?;
        info!("wrote {} entries to {}", db.len(), db_path.display());
    }

    if interrupted {
        warn!("interrupted; the database holds the commands seen so far");
        return Ok(ExitCode::from(EXIT_INTERRUPTED));
    }
    Ok(ExitCode::SUCCESS)
}
