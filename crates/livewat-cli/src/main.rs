use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::rc::Rc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use livewat::output::outcome_json;
use livewat::platform::native::{FileSource, IntervalFrames, LocalTasks, WasmtimeSandbox};
use livewat::{
    Assembler, CycleId, FrameScheduler, HostConfig, LiveHost, ModuleHandle, Outcome, OutputSink,
    WatAssembler, render,
};
use log::info;

#[derive(Parser)]
#[command(name = "livewat")]
#[command(about = "Assemble and run WebAssembly text whenever it changes")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// TOML host configuration
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print outcomes as JSON lines
    #[arg(long, global = true)]
    json: bool,

    /// Log every detected change
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Re-run the file every time it changes
    Watch {
        /// Path to .wat file
        file: PathBuf,

        /// Polling interval in milliseconds
        #[arg(long)]
        interval: Option<u64>,
    },
    /// Assemble and run the file once
    Run {
        /// Path to .wat file
        file: PathBuf,
    },
    /// Assemble the file without running it
    Check {
        /// Path to .wat file
        file: PathBuf,
    },
}

/// Prints one line per reported cycle.
struct ConsoleSink {
    json: bool,
    error_prefix: String,
}

impl OutputSink for ConsoleSink {
    fn report(&self, cycle: CycleId, outcome: &Outcome) {
        if self.json {
            println!("{}", outcome_json(cycle, outcome));
        } else {
            println!("{}", render(outcome, &self.error_prefix).text);
        }
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "livewat=debug" } else { "livewat=info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let mut config = match &cli.config {
        Some(path) => HostConfig::load(path)?,
        None => HostConfig::default(),
    };

    match cli.command {
        Commands::Watch { file, interval } => {
            if let Some(interval) = interval {
                config.frame_interval_ms = interval;
            }
            watch(&file, &config, cli.json)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Run { file } => run(&file, &config, cli.json),
        Commands::Check { file } => check(&file, &config, cli.json),
    }
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start tokio runtime")
}

type ConsoleHost = LiveHost<FileSource, WatAssembler, WasmtimeSandbox, ConsoleSink>;

fn console_host(file: &Path, config: &HostConfig, json: bool) -> Result<ConsoleHost> {
    let sandbox = WasmtimeSandbox::new(config).context("failed to create wasmtime engine")?;
    let sink = ConsoleSink {
        json,
        error_prefix: config.error_prefix.clone(),
    };
    Ok(LiveHost::new(FileSource::new(file), WatAssembler, sandbox, sink, config))
}

fn watch(file: &Path, config: &HostConfig, json: bool) -> Result<()> {
    let host = Rc::new(console_host(file, config, json)?);
    let frames = IntervalFrames::new(config.frame_interval());
    info!(
        "Watching {} every {}ms",
        file.display(),
        frames.period().as_millis()
    );

    let local = tokio::task::LocalSet::new();
    runtime()?.block_on(local.run_until(async move {
        let scheduler = FrameScheduler::new(host, frames, LocalTasks);
        scheduler.start();
        tokio::signal::ctrl_c()
            .await
            .context("failed to listen for Ctrl-C")?;
        info!("Stopped after {} ticks", scheduler.ticks());
        Ok::<_, anyhow::Error>(())
    }))
}

fn run(file: &Path, config: &HostConfig, json: bool) -> Result<ExitCode> {
    let host = console_host(file, config, json)?;
    let Some(cycle) = host.detect() else {
        bail!("{} is empty or unreadable", file.display());
    };
    let outcome = runtime()?.block_on(host.run_cycle(cycle));
    Ok(if outcome.is_ok() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn check(file: &Path, config: &HostConfig, json: bool) -> Result<ExitCode> {
    let text = fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let name = file.display().to_string();

    let assembled = WatAssembler
        .parse(&config.module_name, &text, &config.parse_options())
        .and_then(|module| {
            let bytes = module.to_binary();
            module.destroy();
            bytes
        });

    match assembled {
        Ok(bytes) => {
            if json {
                println!("{}", serde_json::json!({ "status": "ok", "bytes": bytes.len() }));
            } else {
                println!("{name}: ok ({} bytes)", bytes.len());
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(diagnostic) => {
            if json {
                println!(
                    "{}",
                    serde_json::json!({
                        "status": "error",
                        "kind": "assembly",
                        "error": diagnostic.to_string(),
                    })
                );
            } else {
                eprint!("{}", diagnostic.render(&name, &text));
            }
            Ok(ExitCode::FAILURE)
        }
    }
}
