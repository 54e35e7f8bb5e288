mod cli;

use clipforge::config::{self, Config};
use clipforge_av::{
    check_tools, Encoder, FfmpegEncoder, QualityTier, TranscodeRequest, Transcoder, Workspace,
};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "clipforge=trace,clipforge_av=trace".to_string()
        } else {
            "clipforge=info,clipforge_av=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Video {
            input,
            tier,
            limit,
            keep_source,
            output_dir,
            json,
        } => {
            let config = config::load_config_or_default(cli.config.as_deref())?;
            let options = VideoOptions {
                tier: tier.unwrap_or(config.transcode.default_tier),
                limit: limit.or(config.transcode.size_limit_bytes),
                delete_source: config.transcode.delete_source && !keep_source,
                output_dir: output_dir.or_else(|| config.transcode.output_dir.clone()),
                json,
            };
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(convert_video(&input, &config, options))
        }
        Commands::Audio { input, output } => {
            let config = config::load_config_or_default(cli.config.as_deref())?;
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(convert_audio(&input, &output, &config))
        }
        Commands::Probe { file, json } => {
            let config = config::load_config_or_default(cli.config.as_deref())?;
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(probe_file(&file, &config, json))
        }
        Commands::CheckTools => run_check_tools(),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("clipforge {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

struct VideoOptions {
    tier: QualityTier,
    limit: Option<u64>,
    delete_source: bool,
    output_dir: Option<PathBuf>,
    json: bool,
}

fn build_encoder(config: &Config) -> Result<FfmpegEncoder> {
    let encoder = FfmpegEncoder::new(&config.tools.tool_config())
        .context("ffmpeg and ffprobe are required; run `clipforge check-tools`")?;
    Ok(encoder.with_timeout(config.tools.timeout()))
}

async fn convert_video(input: &Path, config: &Config, options: VideoOptions) -> Result<()> {
    if !input.exists() {
        anyhow::bail!("Input file does not exist: {:?}", input);
    }

    let workspace = match options.output_dir {
        Some(ref dir) => Workspace::at(dir)?,
        None => Workspace::system_temp(),
    };
    let transcoder = Transcoder::new(Arc::new(build_encoder(config)?), workspace);

    let mut request = TranscodeRequest::new(input).with_tier(options.tier);
    if let Some(limit) = options.limit {
        request = request.with_size_limit(limit);
    }
    request.delete_source_on_success = options.delete_source;

    tracing::info!(
        "Converting {:?} (tier: {}, limit: {})",
        input,
        request.tier,
        request
            .size_limit
            .map(|l| format!("{} bytes", l))
            .unwrap_or_else(|| "none".to_string())
    );

    let outcome = transcoder
        .convert(request)
        .await
        .with_context(|| format!("Failed to convert {:?}", input))?;

    let size = std::fs::metadata(&outcome.output).map(|m| m.len()).ok();

    if options.json {
        let report = serde_json::json!({
            "output": outcome.output,
            "tier": outcome.tier,
            "preset": outcome.preset.name(),
            "estimated_bytes": outcome.estimated_len,
            "actual_bytes": size,
            "error": outcome.error.as_ref().map(|e| e.to_string()),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Output: {}", outcome.output.display());
        println!("Tier: {} ({})", outcome.tier, outcome.preset);
        println!("Estimated: {} bytes", outcome.estimated_len);
        if let Some(size) = size {
            println!("Actual: {} bytes", size);
        }
    }

    match outcome.error {
        Some(e) => Err(e).context("Export failed"),
        None => Ok(()),
    }
}

async fn convert_audio(input: &Path, output: &Path, config: &Config) -> Result<()> {
    if !input.exists() {
        anyhow::bail!("Input file does not exist: {:?}", input);
    }

    let transcoder = Transcoder::new(Arc::new(build_encoder(config)?), Workspace::system_temp());
    transcoder
        .export_audio(input, output)
        .await
        .with_context(|| format!("Cannot transcode {:?} to {:?}", input, output))?;

    println!("Output: {}", output.display());
    Ok(())
}

async fn probe_file(file: &Path, config: &Config, json: bool) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {:?}", file);
    }

    let asset = build_encoder(config)?.load_asset(file).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&asset)?);
        return Ok(());
    }

    println!("File: {}", asset.path.display());
    println!("Container: {}", asset.container);
    println!("Size: {} bytes", asset.file_size);
    if let Some(ref duration) = asset.duration {
        let secs = duration.as_secs();
        let mins = secs / 60;
        let hours = mins / 60;
        println!("Duration: {:02}:{:02}:{:02}", hours, mins % 60, secs % 60);
    }
    println!("Audio: {}", if asset.has_audio { "yes" } else { "no" });

    println!("\nVideo Tracks: {}", asset.video_tracks.len());
    for (i, track) in asset.video_tracks.iter().enumerate() {
        print!(
            "  [{}] {} {}x{}",
            i, track.codec, track.natural_size.width, track.natural_size.height
        );
        if let Some(fps) = track.frame_rate {
            print!(", {:.3} fps", fps);
        }
        println!();
    }

    if let Some(size) = asset.natural_size() {
        println!(
            "\nHighest tier for upload: {}",
            QualityTier::Highest.clamp_for(size)
        );
    }

    Ok(())
}

fn run_check_tools() -> Result<()> {
    println!("Checking external tools...\n");

    let tools = check_tools();
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
            print!(" ({})", version);
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
        println!("Some tools are missing. Install ffmpeg to enable conversions.");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            config
        }
        None => {
            println!("No config file specified, using defaults");
            Config::default()
        }
    };

    println!("  Default tier: {}", config.transcode.default_tier);
    match config.transcode.size_limit_bytes {
        Some(limit) => println!("  Size limit: {} bytes", limit),
        None => println!("  Size limit: none"),
    }
    println!("  Delete source: {}", config.transcode.delete_source);
    println!("  Export timeout: {}s", config.tools.timeout_secs);

    Ok(())
}
