use std::io::{stderr, stdout};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use color_eyre::Result;
use color_eyre::eyre::WrapErr;
use hostprobe::config::{Config, load_config, load_config_from_path};
use hostprobe::logging::init_tracing;
use hostprobe::report::{ReportDriver, Section};
use hostprobe::system::procfs::ProcFs;
use hostprobe::system::relay::ShellRelay;
use hostprobe::system::summary::SysinfoSummary;
use tracing::info;

#[derive(Parser)]
#[command(
    name = "hostprobe",
    about = "Print a one-shot diagnostics report for this Linux host"
)]
struct Cli {
    /// Path to config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Process to inspect in detail
    #[arg(long)]
    pid: Option<u32>,

    /// Root of the procfs mount
    #[arg(long)]
    proc_root: Option<PathBuf>,

    /// Seconds to wait for each external tool; 0 waits forever
    #[arg(long, value_name = "SECS")]
    tool_timeout: Option<u64>,

    /// Leave a section out of the report (repeatable)
    #[arg(long, value_enum, value_name = "SECTION")]
    skip: Vec<Section>,

    /// Exit with status 1 when any section fails
    #[arg(long, default_value_t = false)]
    strict: bool,

    /// Increase log verbosity on stderr (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_tracing(cli.verbose)?;
    let config = load_config_for_cli(&cli);

    let procfs = ProcFs::new(&config.general.proc_root)
        .with_ticks_per_second(config.general.clock_ticks_per_second);
    let relay = ShellRelay::new(&config.tools.shell, config.tools.timeout());
    let mut driver = ReportDriver::new(&procfs, SysinfoSummary::new(), relay, &config)
        .skip(cli.skip.iter().copied());

    let outcome = driver
        .run(&mut stdout().lock(), &mut stderr().lock())
        .await
        .wrap_err("failed to write report")?;

    if !outcome.is_clean() {
        info!(failed = ?outcome.failed, "report finished with failed sections");
        if config.general.strict_exit {
            return Ok(ExitCode::FAILURE);
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn load_config_for_cli(cli: &Cli) -> Config {
    let mut config = match &cli.config {
        Some(path) => load_config_from_path(path),
        None => load_config(),
    };

    if let Some(pid) = cli.pid {
        config.general.pid = pid;
    }
    if let Some(ref root) = cli.proc_root {
        config.general.proc_root = root.clone();
    }
    if let Some(secs) = cli.tool_timeout {
        config.tools.timeout_secs = secs;
    }
    if cli.strict {
        config.general.strict_exit = true;
    }

    config
}
