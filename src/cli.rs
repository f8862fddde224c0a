use crate::config::{Config, RasterEncoding, load_config};
use crate::document::DEFAULT_TOPIC;
use crate::export::{ExportArtifact, ExportFormat};
use crate::generate::GenerationClient;
use crate::http::UreqTransport;
use crate::normalize::RawResponse;
use crate::rating::{RatingClient, RatingOutcome};
use crate::session::{Command, Effect, Session};
use crate::share::ShareAttempt;
use anyhow::{Result, anyhow, bail};
use clap::{Parser, ValueEnum};
use log::{LevelFilter, debug, info};
use serde_json::Value;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "mmw", version, about = "Mind map generator, renderer and exporter")]
pub struct Args {
    /// Topic to generate a mind map for via the generation service
    #[arg(short = 't', long = "topic", conflicts_with = "input")]
    pub topic: Option<String>,

    /// Local outline or raw service reply (markdown or JSON), or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file. Text formats default to stdout, binary ones to <topic>.<ext>.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "svg")]
    pub output_format: OutputFormat,

    /// Config JSON file (theme, mindmap, render, export, service sections)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Viewport width
    #[arg(short = 'w', long = "width")]
    pub width: Option<f32>,

    /// Viewport height
    #[arg(short = 'H', long = "height")]
    pub height: Option<f32>,

    /// Publish the mind map and print its viewer link
    #[arg(long = "share")]
    pub share: bool,

    /// Write the share link's QR code as PNG
    #[arg(long = "qr", requires = "share")]
    pub qr: Option<PathBuf>,

    /// Rate the service with 1 to 5 stars
    #[arg(long = "rate", value_parser = clap::value_parser!(u8).range(1..=5))]
    pub rate: Option<u8>,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long = "log-level", default_value = "warn")]
    pub log_level: String,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Md,
    Svg,
    Jpg,
    Png,
    Pdf,
}

impl OutputFormat {
    fn export_format(self) -> ExportFormat {
        match self {
            OutputFormat::Md => ExportFormat::Markdown,
            OutputFormat::Svg => ExportFormat::Svg,
            OutputFormat::Jpg | OutputFormat::Png => ExportFormat::Raster,
            OutputFormat::Pdf => ExportFormat::Pdf,
        }
    }

    fn is_text(self) -> bool {
        matches!(self, OutputFormat::Md | OutputFormat::Svg)
    }
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    init_logger(&args.log_level);
    debug!("parsed arguments: {args:?}");

    let config = build_config(&args)?;
    let transport = UreqTransport::new(Duration::from_secs(config.service.timeout_secs));

    if let Some(stars) = args.rate {
        let mut rating = RatingClient::new(
            &transport,
            config.service.rating_url.as_str(),
            config.service.rating_source.as_str(),
        );
        if let RatingOutcome::Submitted { status } = rating.rate(stars)? {
            eprintln!("Thanks for rating us {stars}/5 (status {status})");
        }
        if args.topic.is_none() && args.input.is_none() {
            return Ok(());
        }
    }

    let mut session = Session::new(&config, &transport);
    let label = args.topic.as_deref().unwrap_or(DEFAULT_TOPIC);
    let Effect::Request(ticket) = session.dispatch(Command::Generate(label.to_string())) else {
        bail!("Topic must not be empty");
    };
    let reply = match &args.topic {
        Some(topic) => GenerationClient::new(&transport, config.service.generate_url.as_str())
            .request(topic),
        None => Ok(raw_from_input(&read_input(args.input.as_deref())?)),
    };
    if let Effect::Error(message) = session.resolve(ticket, reply) {
        bail!(message);
    }

    let format = args.output_format.export_format();
    let artifact = match session.dispatch(Command::Download(format)) {
        Effect::Download(artifact) => artifact,
        Effect::Error(message) => bail!(message),
        other => bail!("unexpected outcome for {format} export: {other:?}"),
    };
    write_artifact(&artifact, args.output.as_deref(), args.output_format)?;

    if args.share {
        match session.dispatch(Command::Share) {
            Effect::Share(ShareAttempt::Shared(link)) => {
                eprintln!("Share link: {}", link.url);
                if let Some(path) = &args.qr {
                    std::fs::write(path, &link.qr_png)?;
                    info!("wrote QR code to {}", path.display());
                }
            }
            Effect::Share(ShareAttempt::Failed(err)) => return Err(err.into()),
            _ => {}
        }
    }

    session.teardown();
    Ok(())
}

fn init_logger(level: &str) {
    let level = LevelFilter::from_str(level).unwrap_or_else(|_| {
        eprintln!("Invalid log level: {level}. Using 'warn' instead.");
        LevelFilter::Warn
    });
    env_logger::Builder::from_env(env_logger::Env::default())
        .filter_level(level)
        .init();
}

fn build_config(args: &Args) -> Result<Config> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(width) = args.width {
        config.render.width = width;
    }
    if let Some(height) = args.height {
        config.render.height = height;
    }
    match args.output_format {
        OutputFormat::Jpg => config.export.raster_encoding = RasterEncoding::Jpeg,
        OutputFormat::Png => config.export.raster_encoding = RasterEncoding::Png,
        _ => {}
    }
    Ok(config)
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path.filter(|path| *path != Path::new("-")) {
        return std::fs::read_to_string(path)
            .map_err(|err| anyhow!("failed to read {}: {err}", path.display()));
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

/// Saved service replies are JSON; anything else is taken as an outline.
fn raw_from_input(input: &str) -> RawResponse {
    match serde_json::from_str::<Value>(input) {
        Ok(value) => {
            let payload = value.get("response").unwrap_or(&value);
            RawResponse::from_json(payload)
        }
        Err(_) => RawResponse::from(input),
    }
}

fn write_artifact(artifact: &ExportArtifact, output: Option<&Path>, format: OutputFormat) -> Result<()> {
    match output {
        Some(path) if path != Path::new("-") => {
            std::fs::write(path, &artifact.bytes)?;
            info!("wrote {}", path.display());
        }
        _ if format.is_text() => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(&artifact.bytes)?;
            if !artifact.bytes.ends_with(b"\n") {
                stdout.write_all(b"\n")?;
            }
        }
        Some(_) => bail!("{} output cannot be written to stdout", artifact.mime),
        None => {
            std::fs::write(&artifact.filename, &artifact.bytes)?;
            info!("wrote {}", artifact.filename);
        }
    }
    Ok(())
}
