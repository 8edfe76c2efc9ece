use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand};
use li820_frame::{FrameConfig, FrameTag, LeftoverPolicy, RetryPolicy};
use li820_sampler::{SessionConfig, DEFAULT_QUEUE_CAPACITY, MAX_QUEUE_CAPACITY};
use li820_transport::{DeviceAddress, Endpoint, SerialSettings, DEFAULT_BAUD_RATE};

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod decode;
pub mod run;
pub mod sample;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Sample continuously and publish every record.
    Run(RunArgs),
    /// Take a few samples and print them.
    Sample(SampleArgs),
    /// Decode one frame from a file or stdin.
    Decode(DecodeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Run(args) => run::run(args),
        Command::Sample(args) => sample::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Version(args) => version::run(args, format),
    }
}

/// Model tag and site label stamped on every record.
#[derive(Args, Debug, Clone)]
pub struct SessionArgs {
    /// Analyzer model tag delimiting frames.
    #[arg(long, env = "LI820_TAG", default_value = "li820")]
    pub tag: FrameTag,
    /// Site label copied into every record.
    #[arg(long, env = "LI820_SITE", default_value = "glbrc")]
    pub site: String,
}

impl SessionArgs {
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig::new(self.tag.clone(), self.site.as_str())
    }
}

#[derive(Args, Debug, Clone)]
pub struct DeviceArgs {
    /// Serial device path, or sim:// (sim://<interval-ms>) for the synthetic analyzer.
    #[arg(long, env = "LI820_DEVICE", default_value = "/dev/ttyS1")]
    pub device: DeviceAddress,
    /// Serial baud rate.
    #[arg(long, env = "LI820_BAUD", default_value_t = DEFAULT_BAUD_RATE)]
    pub baud: u32,
    #[command(flatten)]
    pub session: SessionArgs,
    /// Drop bytes received after a frame instead of keeping them for the next one.
    #[arg(long, env = "LI820_DISCARD_LEFTOVER")]
    pub discard_leftover: bool,
    /// Consecutive read errors tolerated before the device is given up.
    #[arg(long, env = "LI820_READ_RETRIES", default_value_t = 10)]
    pub read_retries: u32,
}

impl DeviceArgs {
    pub fn serial_settings(&self) -> SerialSettings {
        SerialSettings {
            baud_rate: self.baud,
            read_timeout: Duration::from_secs(1),
        }
    }

    pub fn frame_config(&self) -> FrameConfig {
        let leftover = if self.discard_leftover {
            LeftoverPolicy::Discard
        } else {
            LeftoverPolicy::CarryForward
        };
        FrameConfig {
            leftover,
            retry: RetryPolicy {
                max_consecutive_errors: self.read_retries,
                ..RetryPolicy::default()
            },
            ..FrameConfig::default()
        }
    }
}

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub device: DeviceArgs,
    /// Publish endpoints (comma-separated tcp://HOST:PORT or ipc://PATH).
    #[arg(
        long,
        env = "LI820_PUBLISH",
        value_delimiter = ',',
        default_value = "tcp://0.0.0.0:5556,ipc://weather.ipc"
    )]
    pub publish: Vec<Endpoint>,
    /// Address serving /metrics and /health.
    #[arg(long, env = "LI820_METRICS_ADDR", default_value = "0.0.0.0:9092")]
    pub metrics_addr: String,
    /// Records buffered between sampler and publisher before the oldest are dropped.
    #[arg(
        long,
        env = "LI820_QUEUE",
        default_value_t = DEFAULT_QUEUE_CAPACITY,
        value_parser = clap::builder::RangedU64ValueParser::<usize>::new()
            .range(1..=MAX_QUEUE_CAPACITY as u64)
    )]
    pub queue: usize,
}

#[derive(Args, Debug)]
pub struct SampleArgs {
    #[command(flatten)]
    pub device: DeviceArgs,
    /// Number of samples to take.
    #[arg(long, short = 'n', default_value_t = 1, value_parser = clap::value_parser!(u64).range(1..))]
    pub count: u64,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// File holding the frame. Reads stdin when omitted.
    pub file: Option<PathBuf>,
    #[command(flatten)]
    pub session: SessionArgs,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
