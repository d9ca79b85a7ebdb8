/*
 * SimOS Shell
 *
 * Interactive front end for the simulated kernel. Builds the configuration
 * from the command line, boots the kernel library, and feeds stdin lines to
 * the kernel shell until `exit` or end of input.
 *
 * Log output (core narration, subsystem messages) goes to stderr; command
 * output goes to stdout.
 */

use std::io::{self, BufRead, Write};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::LevelFilter;

use simos_kernel::Kernel;
use simos_kernel::config::SimConfig;
use simos_kernel::scheduler::{BatteryMode, PolicyKind, StartOutcome};
use simos_kernel::utils::debug::logger;
use simos_kernel::utils::ui::{KShell, ShellStatus};

#[derive(Parser, Debug)]
#[command(name = "simos-shell")]
#[command(about = "Interactive operating system simulator")]
struct Args {
    /// Number of simulated cores
    #[arg(short, long, default_value = "1")]
    cores: usize,

    /// Scheduler at boot (FIFO, RR, MLFQ, POWER)
    #[arg(short, long, default_value = "FIFO")]
    policy: PolicyKind,

    /// Length of one simulated tick in milliseconds
    #[arg(long, default_value = "500")]
    tick_ms: u64,

    /// Pause of an idle core between polls in milliseconds
    #[arg(long, default_value = "100")]
    idle_ms: u64,

    /// Battery level (1-100) or "sim" for a random level per decision
    #[arg(short, long, default_value = "sim", value_parser = parse_battery)]
    battery: BatteryMode,

    /// Number of physical frames
    #[arg(long, default_value = "8")]
    frames: usize,

    /// Page and frame size in bytes
    #[arg(long, default_value = "1024")]
    page_size: u64,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(short, long, default_value = "info")]
    log_level: LevelFilter,

    /// Start the core workers right after boot
    #[arg(long)]
    start: bool,
}

fn parse_battery(s: &str) -> Result<BatteryMode, String> {
    if s.eq_ignore_ascii_case("sim") {
        return Ok(BatteryMode::Simulated);
    }
    match s.parse::<u8>() {
        Ok(level @ 1..=100) => Ok(BatteryMode::Fixed(level)),
        _ => Err(format!("'{}' is neither 1-100 nor 'sim'", s)),
    }
}

impl Args {
    fn into_config(self) -> SimConfig {
        let mut config = SimConfig::default();
        let tick = Duration::from_millis(self.tick_ms);

        config.sched.cores = self.cores;
        config.sched.policy = self.policy;
        config.sched.tick = tick;
        config.sched.idle_pause = Duration::from_millis(self.idle_ms);
        config.sched.stop_timeout = config.sched.slice_duration(config.sched.longest_quantum()) * 2;
        config.sched.battery = self.battery;
        config.memory.num_frames = self.frames;
        config.memory.page_size = self.page_size;
        config.log_level = self.log_level;
        config
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let start = args.start;
    let config = args.into_config();

    logger::init(config.log_level).context("Failed to install logger")?;

    let mut kernel = Kernel::boot(config).context("Invalid configuration")?;
    if start {
        if let StartOutcome::Started { cores } = kernel.processes.start_cores()? {
            log::info!("{} core(s) running", cores);
        }
    }

    let mut shell = KShell::new(kernel);
    run(&mut shell)?;

    shell
        .kernel_mut()
        .processes
        .stop_cores()
        .context("Failed to stop cores")?;
    Ok(())
}

fn run(shell: &mut KShell) -> Result<()> {
    println!("SimOS Shell v{}", env!("CARGO_PKG_VERSION"));
    println!("Type 'help' for available commands");

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut line = String::new();
    loop {
        print!("simos> ");
        stdout.flush()?;

        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            println!();
            return Ok(());
        }

        let mut output = String::new();
        let status = match shell.execute_command(&line, &mut output) {
            Ok(status) => status,
            Err(_) => bail!("Failed to render command output"),
        };
        print!("{}", output);

        if status == ShellStatus::Exit {
            return Ok(());
        }
    }
}
