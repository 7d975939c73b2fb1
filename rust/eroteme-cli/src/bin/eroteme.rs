//! `eroteme` command line: expands `//?` directives into Go error checks.

use clap::Parser as ClapParser;
use eroteme_cli::batch::{self, BatchOptions, Mode};
use eroteme_cli::config::ErotemeConfig;
use eroteme_cli::logging;
use eroteme_cli::report::{MessageFormat, Reporter, Style};
use eroteme_cli::walk::Walker;
use std::io::{IsTerminal, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(ClapParser)]
#[command(
    name = "eroteme",
    version,
    about = "Rewrite `v, _ := f() //?` into Go error checks",
    after_help = "Exit status: 0 on success, 1 if a file failed (or would change with --check), \
                  2 on usage or config errors."
)]
struct Cli {
    /// Go files or directories to process
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Don't write; exit 1 if any file would change
    #[arg(long, conflicts_with = "stdout")]
    check: bool,

    /// Print transformed sources instead of writing them
    #[arg(long)]
    stdout: bool,

    /// Worker threads (default: config, then one per CPU)
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Config file (default: nearest eroteme.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output format for results and diagnostics
    #[arg(long, value_enum, default_value_t = MessageFormat::Human)]
    message_format: MessageFormat,
}

fn fail_usage(message: &str) -> ! {
    eprintln!("{} {}", Style::Red.paint("error:"), message);
    std::process::exit(2);
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let (config_path, config) = match ErotemeConfig::load(cli.config.as_deref()) {
        Ok(loaded) => loaded,
        Err(e) => fail_usage(&e.to_string()),
    };
    if let Some(path) = &config_path {
        debug!(config = %path.display(), "loaded config");
    }

    let walker = match Walker::new(&config.walk) {
        Ok(walker) => walker,
        Err(e) => fail_usage(&e.to_string()),
    };

    let mode = if cli.check {
        Mode::Check
    } else if cli.stdout {
        Mode::Stdout
    } else {
        Mode::Write
    };
    let options = BatchOptions {
        mode,
        jobs: cli.jobs.unwrap_or(config.batch.jobs),
        transform: config.transform_options(),
    };

    let stop = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&stop);
    if let Err(e) = ctrlc::set_handler(move || handler_flag.store(true, Ordering::Release)) {
        warn!(error = %e, "cannot install Ctrl-C handler");
    }

    let files = walker.collect(&cli.paths);
    let reports = batch::run(files, &options, &stop);

    let reporter = Reporter {
        format: cli.message_format,
        mode,
        color: std::io::stderr().is_terminal(),
    };
    {
        let (mut out, mut err) = (std::io::stdout().lock(), std::io::stderr().lock());
        if let Err(e) = reporter.render(&reports, &mut out, &mut err).and_then(|()| out.flush()) {
            warn!(error = %e, "cannot write report");
        }
    }

    std::process::exit(batch::exit_code(&reports, mode));
}
