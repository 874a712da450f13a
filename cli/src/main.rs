//! PBCH Loopback Application
//!
//! Encodes one SS/PBCH block occasion, passes it through an AWGN channel,
//! detects the SSB index from the PBCH DMRS and decodes the MIB back.

mod config;

use anyhow::{anyhow, Result};
use clap::Parser;
use num_complex::Complex32;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use serde::Serialize;
use tracing::{debug, error, info};
use tracing_subscriber::{fmt, EnvFilter};

use common::types::Lmax;
use config::LoopbackConfig;
use nr_pbch::phy::dmrs::{self, DmrsDetection};
use nr_pbch::phy::{Mib, PbchArgs, PbchCodec, PbchConfig, PbchMessage, SSB_NOF_RE};
use nr_pbch::PhyError;

/// NR PBCH encode/decode loopback
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to YAML configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,

    /// Physical Cell ID (0-1007)
    #[arg(long)]
    pci: Option<u16>,

    /// Maximum number of SSB candidates (4, 8, 64)
    #[arg(long)]
    lmax: Option<u32>,

    /// System frame number (0-1023)
    #[arg(long)]
    sfn: Option<u16>,

    /// Transmit in the second half frame
    #[arg(long)]
    hrf: bool,

    /// SSB index
    #[arg(long)]
    ssb_idx: Option<u8>,

    /// Standard deviation of the complex Gaussian noise per component
    #[arg(long, default_value = "0.0")]
    noise_std: f32,

    /// Noise generator seed
    #[arg(long, default_value = "0")]
    seed: u64,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,
}

/// Loopback result
#[derive(Debug, Serialize)]
struct Report {
    pci: u16,
    l_max: Lmax,
    detection: DmrsDetection,
    checksum_ok: bool,
    message: Option<PbchMessage>,
    mib: Option<Mib>,
    matches_transmitted: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => LoopbackConfig::from_yaml_file(path)?,
        None => LoopbackConfig::default(),
    };
    apply_overrides(&mut config, &args)?;

    // Initialize logging
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log.level));

    fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .init();

    info!("Starting NR PBCH loopback");
    if let Some(path) = &args.config {
        info!("Configuration file: {}", path);
    }

    let pci = config.pci()?;
    let l_max = config.cell.l_max;
    let ssb_idx = config.cell.ssb_idx;
    if ssb_idx as u32 >= l_max.value() {
        return Err(anyhow!(
            "SSB index {} out of range for L_max {}",
            ssb_idx,
            l_max.value()
        ));
    }

    let mib = config.mib.to_mib(l_max)?;
    let msg = PbchMessage::from_mib(
        &mib,
        config.mib.sfn,
        config.mib.hrf,
        ssb_idx,
        config.mib.k_ssb,
    );
    msg.validate(l_max)?;

    info!("Cell configuration:");
    info!("  PCI: {}", pci.0);
    info!("  L_max: {}", l_max.value());
    info!("  SSB index: {}", ssb_idx);
    info!("  SFN: {} (half frame {})", config.mib.sfn, config.mib.hrf as u8);
    info!("Transmitted: {}", msg);

    let cfg = PbchConfig::from_parts(pci, l_max);
    let mut codec = PbchCodec::new(&PbchArgs::default())?;

    // Transmit
    let mut grid = vec![Complex32::new(0.0, 0.0); SSB_NOF_RE];
    codec.encode(&cfg, &msg, &mut grid)?;
    dmrs::put(&cfg, ssb_idx, config.mib.hrf, &mut grid)?;

    // Channel
    if args.noise_std > 0.0 {
        let mut rng = StdRng::seed_from_u64(args.seed);
        add_awgn(&mut grid, args.noise_std, &mut rng)?;
        debug!("Added AWGN std={} seed={}", args.noise_std, args.seed);
    }

    // Receive
    let detection = dmrs::detect(&cfg, &grid)?;
    info!(
        "PBCH DMRS: ssb_idx={} epre={:.3} rsrp={:.3} snr={:.1}dB",
        detection.ssb_idx,
        detection.measurement.epre,
        detection.measurement.rsrp,
        detection.measurement.snr_db
    );

    let decoded = match codec.decode(&cfg, detection.ssb_idx, &grid) {
        Ok(decoded) => Some(decoded),
        Err(PhyError::CrcMismatch { checksum }) => {
            error!("PBCH decoding failed, checksum={:06x}", checksum);
            None
        }
        Err(e) => return Err(e.into()),
    };

    let report = Report {
        pci: pci.0,
        l_max,
        detection,
        checksum_ok: decoded.is_some(),
        mib: decoded.as_ref().and_then(|m| m.mib(l_max).ok()),
        matches_transmitted: decoded.as_ref() == Some(&msg),
        message: decoded,
    };
    print_report(&report, args.json)?;

    if !report.checksum_ok {
        return Err(anyhow!("PBCH CRC mismatch"));
    }
    Ok(())
}

/// Command line flags take precedence over the configuration file
fn apply_overrides(config: &mut LoopbackConfig, args: &Args) -> Result<()> {
    if let Some(level) = &args.log_level {
        config.log.level = level.clone();
    }
    if let Some(pci) = args.pci {
        config.cell.pci = pci;
    }
    if let Some(l_max) = args.lmax {
        config.cell.l_max = Lmax::try_from(l_max)?;
    }
    if let Some(ssb_idx) = args.ssb_idx {
        config.cell.ssb_idx = ssb_idx;
    }
    if let Some(sfn) = args.sfn {
        config.mib.sfn = sfn;
    }
    if args.hrf {
        config.mib.hrf = true;
    }
    if args.noise_std < 0.0 {
        return Err(anyhow!("Invalid noise standard deviation: {}", args.noise_std));
    }
    Ok(())
}

/// Add complex Gaussian noise with `std_dev` per component
fn add_awgn(grid: &mut [Complex32], std_dev: f32, rng: &mut StdRng) -> Result<()> {
    let noise_dist = Normal::new(0.0, std_dev)?;
    for re in grid.iter_mut() {
        *re += Complex32::new(noise_dist.sample(rng), noise_dist.sample(rng));
    }
    Ok(())
}

fn print_report(report: &Report, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!(
        "PCI={} L_max={} detected ssb_idx={} rsrp={:.3}",
        report.pci,
        report.l_max.value(),
        report.detection.ssb_idx,
        report.detection.measurement.rsrp
    );
    match &report.message {
        Some(msg) => {
            println!("Decoded: {}", msg);
            if let Some(mib) = &report.mib {
                println!("MIB: {:?}", mib);
            }
            println!("Matches transmitted: {}", report.matches_transmitted);
        }
        None => println!("Decoded: CRC mismatch"),
    }
    Ok(())
}
