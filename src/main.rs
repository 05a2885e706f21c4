//! # Ring Sizer Application Entry Point
//!
//! This binary crate provides the command-line front end for the ring sizer,
//! coordinating between configuration, the matching engine, screen calibration
//! and the persisted calibration store.


use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use log::debug;
use std::path::PathBuf;

use ring_sizer_lib::calibration::{
    reference_rect_width_px, CalibrationPhase, CalibrationSession, MAX_REFERENCE_PX, MAX_RING_PX, MIN_REFERENCE_PX,
    MIN_RING_PX,
};
use ring_sizer_lib::config::{Config, CONFIG_FILE};
use ring_sizer_lib::renderer::{draw_chart, draw_outcome, format_measurement, format_options};
use ring_sizer_lib::store::JsonFileStore;
use ring_sizer_lib::{InputType, SizeTable};

#[derive(Parser, Debug)]
#[command(name = "ring-sizer", version, about = "International ring size converter")]
struct Opts {
    /// Configuration file
    #[arg(long, global = true, default_value = CONFIG_FILE)]
    config: PathBuf,

    #[command(flatten)]
    verbose: Verbosity<WarnLevel>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert a size into every supported system
    Convert {
        /// System the value is expressed in, e.g. DIAMETER_MM, us-ca, UK_AU_NZ_IE_ZA
        input_type: InputType,
        /// The size value; omit to see the empty-state prompt
        value: Option<String>,
        /// Print the matched row as JSON
        #[arg(long)]
        json: bool,
    },
    /// List selectable sizes for a national system
    Options {
        input_type: InputType,
    },
    /// Print the whole reference chart
    Chart,
    /// Calibrate the screen from the on-screen length of a reference card
    Calibrate {
        /// Rectangle length in CSS pixels matching the card's long edge (150-600)
        #[arg(long, value_parser = parse_reference_px)]
        reference_px: f64,
        /// Current device pixel ratio
        #[arg(long, default_value_t = 1.0)]
        dpr: f64,
    },
    /// Measure a ring from the pixel diameter of the sizer circle
    Measure {
        /// Circle diameter in CSS pixels matching the ring's inner edge (30-100)
        #[arg(long, value_parser = parse_ring_px)]
        ring_px: f64,
        /// Current device pixel ratio
        #[arg(long, default_value_t = 1.0)]
        dpr: f64,
        /// Print the measurement and matched row as JSON
        #[arg(long)]
        json: bool,
    },
    /// Discard the saved screen calibration
    Recalibrate {
        /// Current device pixel ratio
        #[arg(long, default_value_t = 1.0)]
        dpr: f64,
    },
}

fn parse_reference_px(value: &str) -> Result<f64, String> {
    parse_px_in_range(value, MIN_REFERENCE_PX, MAX_REFERENCE_PX)
}

fn parse_ring_px(value: &str) -> Result<f64, String> {
    parse_px_in_range(value, MIN_RING_PX, MAX_RING_PX)
}

/// Pixel lengths outside the sizer's control range are rejected, not clamped.
fn parse_px_in_range(value: &str, min: f64, max: f64) -> Result<f64, String> {
    let px: f64 = value.trim().parse().map_err(|_| format!("`{}` is not a number", value))?;
    if (min..=max).contains(&px) {
        Ok(px)
    } else {
        Err(format!("must be between {} and {} px, got {}", min, max, px))
    }
}

/// Main application entry point.
fn main() -> anyhow::Result<()> {
    let opts = Opts::parse();

    env_logger::Builder::new()
        .filter_level(opts.verbose.log_level_filter())
        .parse_default_env()
        .init();

    let config = Config::load_from_path(&opts.config);
    debug!("config: {:?}", config);

    match opts.command {
        Command::Convert {
            input_type,
            value,
            json,
        } => convert(input_type, value.as_deref(), json),
        Command::Options { input_type } => {
            let options = SizeTable::standard().available_options(input_type);
            print!("{}", format_options(input_type, &options));
            Ok(())
        }
        Command::Chart => {
            draw_chart(&SizeTable::standard());
            Ok(())
        }
        Command::Calibrate { reference_px, dpr } => calibrate(&config, reference_px, dpr),
        Command::Measure { ring_px, dpr, json } => measure(&config, ring_px, dpr, json),
        Command::Recalibrate { dpr } => recalibrate(&config, dpr),
    }
}

fn convert(input_type: InputType, value: Option<&str>, json: bool) -> anyhow::Result<()> {
    let outcome = SizeTable::standard().find_match(input_type, value);
    if json {
        println!("{}", serde_json::to_string_pretty(&outcome.entry())?);
    } else {
        draw_outcome(outcome, input_type, value);
    }
    Ok(())
}

fn calibrate(config: &Config, reference_px: f64, dpr: f64) -> anyhow::Result<()> {
    let store = JsonFileStore::new(&config.storage.path);
    let mut session = CalibrationSession::restore(store, config.calibration.clone(), dpr);
    if matches!(session.phase(), CalibrationPhase::Calibrated { .. }) {
        session.recalibrate()?;
    } else {
        session.start()?;
    }

    let estimate_mm = session.adjust_reference(reference_px)?;
    if let CalibrationPhase::Calibrating { reference_px } = *session.phase() {
        println!(
            "Reference rectangle: {:.0} x {:.0} px (default-density estimate {:.1} mm)",
            reference_px,
            reference_rect_width_px(reference_px),
            estimate_mm
        );
    }

    let report = session.save(dpr).context("saving calibration")?;
    println!("Calibration saved: {:.4} px/mm", report.state.pixels_per_mm);
    println!("Effective screen density: {} PPI", report.density.ppi);
    if let Some(warning) = session.density_warning() {
        println!("Warning: {}", warning);
    }
    Ok(())
}

fn measure(config: &Config, ring_px: f64, dpr: f64, json: bool) -> anyhow::Result<()> {
    let store = JsonFileStore::new(&config.storage.path);
    let mut session = CalibrationSession::restore(store, config.calibration.clone(), dpr);

    if let Some(prompt) = session.recalibration_prompt() {
        bail!("{}", prompt);
    }
    if !session.check_device_pixel_ratio(dpr) {
        bail!("Screen calibration needed. Run `ring-sizer calibrate --reference-px <PX> --dpr {}` first.", dpr);
    }

    let measurement = session.adjust_ring(ring_px)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&measurement)?);
    } else {
        print!("{}", format_measurement(&measurement));
    }
    Ok(())
}

fn recalibrate(config: &Config, dpr: f64) -> anyhow::Result<()> {
    let store = JsonFileStore::new(&config.storage.path);
    let mut session = CalibrationSession::restore(store, config.calibration.clone(), dpr);
    if matches!(session.phase(), CalibrationPhase::Calibrated { .. }) {
        session.recalibrate()?;
    } else if session.recalibration_prompt().is_none() {
        // a calibration made at another device pixel ratio was already dropped by restore
        println!("No saved calibration.");
        return Ok(());
    }
    println!("Calibration discarded. Run `calibrate` to measure your screen again.");
    Ok(())
}
