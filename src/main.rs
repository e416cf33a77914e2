//! intel-gpu-top: print the render ring's percent-busy once per second

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use intel_gpu_top::Result;

#[derive(Parser, Debug)]
#[command(name = "intel-gpu-top", version, long_about = None)]
struct Args {
    /// PCI slot of the GPU (e.g., "0000:00:02.0"); auto-detected by default
    #[arg(long, conflicts_with = "dump")]
    device: Option<String>,

    /// Replay a register dump instead of mapping hardware
    #[arg(long, requires = "device_id")]
    dump: Option<PathBuf>,

    /// PCI device id of the chip the dump was taken from (e.g., 0x0126)
    #[arg(long, requires = "dump", value_parser = parse_device_id)]
    device_id: Option<u16>,

    /// Validate every register access against the generation's register map
    #[arg(long, default_value_t = false)]
    safe: bool,

    /// Publish the render ring's load to SysV shared memory
    #[arg(long, default_value_t = false)]
    shm: bool,

    /// Print pipeline statistics deltas after each window
    #[arg(long, default_value_t = false)]
    stats: bool,

    /// Prefix each line with the ring name
    #[arg(long, default_value_t = false)]
    labels: bool,

    /// Enable verbose logging
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

fn parse_device_id(s: &str) -> std::result::Result<u16, String> {
    let s = s.trim();
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => u16::from_str_radix(s, 16),
    };
    parsed.map_err(|e| format!("invalid device id '{}': {}", s, e))
}

fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };

    // Reports go to stdout; keep logs on stderr.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("intel_gpu_top={}", level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("intel-gpu-top: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(target_os = "linux")]
fn run(args: &Args) -> Result<()> {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use tracing::{info, warn};

    use intel_gpu_top::linux::shm::ShmSink;
    use intel_gpu_top::linux::{resolve_chipset, AccessOptions, IntelGpu};
    use intel_gpu_top::{SinkSet, TextSink};

    let options = AccessOptions { safe: args.safe };
    let gpu = match (&args.dump, args.device_id, &args.device) {
        (Some(dump), Some(device_id), _) => {
            IntelGpu::from_dump(dump, resolve_chipset(device_id), options)?
        }
        (_, _, Some(slot)) => IntelGpu::open(slot, options)?,
        _ => IntelGpu::detect(options)?,
    };

    if args.stats && !gpu.capabilities().stats_regs {
        warn!("{} has no pipeline statistics registers", gpu.chipset());
    }

    let mut sampler = gpu.into_sampler()?;

    let mut sinks = SinkSet::new();
    sinks.push(
        TextSink::new(std::io::stdout())
            .with_labels(args.labels)
            .with_counters(args.stats),
    );
    if args.shm {
        sinks.push(ShmSink::new());
    }

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("shutdown signal received");
        r.store(false, Ordering::SeqCst);
    }) {
        warn!("failed to install signal handler: {}", e);
    }

    sampler.run(&mut sinks, &running)
}

#[cfg(not(target_os = "linux"))]
fn run(_args: &Args) -> Result<()> {
    Err(intel_gpu_top::Error::PlatformNotSupported)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_device_id() {
        assert_eq!(parse_device_id("0x0126"), Ok(0x0126));
        assert_eq!(parse_device_id("3e92"), Ok(0x3e92));
        assert!(parse_device_id("0xzzzz").is_err());
    }

    #[test]
    fn test_dump_requires_device_id() {
        assert!(Args::try_parse_from(["intel-gpu-top", "--dump", "regs.bin"]).is_err());
        let args =
            Args::try_parse_from(["intel-gpu-top", "--dump", "regs.bin", "--device-id", "0x0126"])
                .unwrap();
        assert_eq!(args.device_id, Some(0x0126));
    }

    #[test]
    fn test_device_id_requires_dump() {
        assert!(Args::try_parse_from(["intel-gpu-top", "--device-id", "0x0126"]).is_err());
    }

    #[test]
    fn test_device_conflicts_with_dump() {
        assert!(Args::try_parse_from([
            "intel-gpu-top",
            "--device",
            "0000:00:02.0",
            "--dump",
            "regs.bin",
            "--device-id",
            "0x0126",
        ])
        .is_err());
    }
}
