mod cli;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use hf_av::{EncodePlan, FfmpegEncoder, ToolRegistry};
use hf_core::config::{Config, OutputDirPolicy};
use hf_core::events::EventSender;
use hf_core::RenditionLadder;
use hf_media::build_master_playlist;
use hf_pipeline::{LocalFs, Supervisor, TranscodeJob, TranscodeOptions};
use hlsforge::ladder;
use tokio_util::sync::CancellationToken;

/// Crates that log under the default filter.
const LOG_TARGETS: &[&str] = &["hlsforge", "hf_core", "hf_av", "hf_media", "hf_pipeline"];

struct TranscodeArgs<'a> {
    input: &'a Path,
    output: &'a Path,
    ladder: Option<&'a Path>,
    timeout: Option<u64>,
    require_empty: bool,
    events: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Respect RUST_LOG if set. Logs go to stderr; stdout carries command output.
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        let level = if cli.verbose { "debug" } else { "info" };
        LOG_TARGETS
            .iter()
            .map(|target| format!("{target}={level}"))
            .collect::<Vec<_>>()
            .join(",")
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            let code = e
                .downcast_ref::<hf_core::Error>()
                .map_or(1, hf_core::Error::exit_code);
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Transcode {
            ref input,
            ref output,
            ref ladder,
            timeout,
            require_empty,
            events,
        } => {
            let args = TranscodeArgs {
                input,
                output,
                ladder: ladder.as_deref(),
                timeout,
                require_empty,
                events,
            };
            let rt = tokio::runtime::Runtime::new()?;
            let master = rt.block_on(transcode(args, config_path))?;
            println!("{}", master.display());
            Ok(())
        }
        Commands::Plan {
            ref input,
            ref output,
            ref ladder,
        } => print_plan(input, output, ladder.as_deref(), config_path),
        Commands::Playlist { ref ladder } => print_playlist(ladder.as_deref(), config_path),
        Commands::DefaultLadder => {
            let json = serde_json::to_string_pretty(&RenditionLadder::default_ladder())?;
            println!("{json}");
            Ok(())
        }
        Commands::CheckTools => check_tools(config_path),
        Commands::Validate { ref config } => validate_config(config.as_deref().or(config_path)),
        Commands::Version => {
            println!("hlsforge {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

async fn transcode(args: TranscodeArgs<'_>, config_path: Option<&Path>) -> Result<PathBuf> {
    let config = Config::load_or_default(config_path);
    for warning in config.validate() {
        tracing::warn!("{warning}");
    }

    // Resolve the ladder before looking for ffmpeg so a bad ladder is
    // reported as such.
    let ladder = ladder::select_ladder(args.ladder, config.transcode.renditions.as_deref())?;

    let mut options = TranscodeOptions::from(&config.transcode).with_renditions(ladder.as_slice().to_vec());
    if let Some(secs) = args.timeout {
        options = options.with_timeout(Duration::from_secs(secs));
    }
    if args.require_empty {
        options = options.with_output_policy(OutputDirPolicy::RequireEmpty);
    }

    let tools = ToolRegistry::discover(&config.tools);
    let encoder = FfmpegEncoder::from_registry(&tools)?;

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, stopping transcode");
            interrupt.cancel();
        }
    });

    let events = if args.events {
        EventSender::new(|event| match serde_json::to_string(event) {
            Ok(line) => eprintln!("{line}"),
            Err(e) => tracing::debug!("Failed to serialize event: {e}"),
        })
    } else {
        EventSender::noop()
    };

    let supervisor = Supervisor::new(Arc::new(encoder), Arc::new(LocalFs))
        .with_events(events)
        .with_cancellation(cancel);

    let job = TranscodeJob::new(args.input, args.output, options);
    Ok(supervisor.transcode(&job).await?)
}

fn print_plan(
    input: &Path,
    output: &Path,
    ladder_file: Option<&Path>,
    config_path: Option<&Path>,
) -> Result<()> {
    let config = Config::load_or_default(config_path);
    let ladder = ladder::select_ladder(ladder_file, config.transcode.renditions.as_deref())?;
    let plan = EncodePlan::compile(input, output, &ladder, &config.transcode.encode);

    for arg in plan.to_args() {
        println!("{arg}");
    }
    Ok(())
}

fn print_playlist(ladder_file: Option<&Path>, config_path: Option<&Path>) -> Result<()> {
    let config = Config::load_or_default(config_path);
    let ladder = ladder::select_ladder(ladder_file, config.transcode.renditions.as_deref())?;
    print!("{}", build_master_playlist(&ladder)?);
    Ok(())
}

fn check_tools(config_path: Option<&Path>) -> Result<()> {
    println!("Checking external tools...\n");

    let config = Config::load_or_default(config_path);
    let rt = tokio::runtime::Runtime::new()?;
    let tools = rt.block_on(ToolRegistry::discover(&config.tools).check_all());
    let mut all_ok = true;

    for tool in &tools {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({version})");
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("ffmpeg is missing. Install it or set tools.ffmpeg_path in the config.");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {}", p.display());
            Config::load(p)?
        }
        None => {
            println!("No config file specified, using defaults");
            Config::default()
        }
    };

    let ladder = RenditionLadder::resolve(config.transcode.renditions.clone())?;
    let encode = &config.transcode.encode;

    println!("✓ Configuration is valid");
    println!(
        "  Renditions: {}",
        ladder
            .iter()
            .map(|r| r.playlist_name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
    match config.transcode.timeout_secs {
        Some(secs) => println!("  Timeout: {secs}s"),
        None => println!("  Timeout: none"),
    }
    println!("  Output policy: {:?}", config.transcode.output_policy);
    println!(
        "  Encoder: {} crf {} gop {} / {} {} Hz",
        encode.video_codec, encode.crf, encode.gop_size, encode.audio_codec, encode.audio_sample_rate
    );

    for warning in config.validate() {
        println!("⚠ {warning}");
    }

    Ok(())
}
