//! # Screen Calibration
//!
//! Converts on-screen pixel lengths into physical millimetres for the visual ring
//! sizer.
//!
//! ## How Calibration Works
//!
//! The user holds a reference object of known size (an ID-1 card, 85.6 mm on its
//! long edge) against the screen and resizes a rectangle until it matches. The
//! rectangle's pixel length divided by the physical length gives pixels per
//! millimetre (ppmm) for this display at the current zoom. A ring circle measured
//! in pixels is then divided by ppmm to get its diameter.
//!
//! ## Plausibility
//!
//! `ppmm × device pixel ratio × 25.4` estimates the real screen density. Values
//! outside 70-500 PPI usually mean the card was not flat, not viewed straight on,
//! or the page was zoomed. The check is advisory: the calibration is saved anyway.
//!
//! ## Staleness
//!
//! Calibration is only valid for the device pixel ratio it was made at. Any change
//! (zoom, moving the window to another display) discards it.

use log::{info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::CalibrationConfig;
use crate::size_table::{Measurement, SizeTable};
use crate::store::KeyValueStore;
use crate::SizeEntry;

/// Long edge of an ISO/IEC 7810 ID-1 card
pub const REFERENCE_CARD_LENGTH_MM: f64 = 85.6;
/// Short edge of an ISO/IEC 7810 ID-1 card
pub const REFERENCE_CARD_WIDTH_MM: f64 = 53.98;
pub const MM_PER_INCH: f64 = 25.4;

pub const DEFAULT_MIN_PPI: i64 = 70;
pub const DEFAULT_MAX_PPI: i64 = 500;

/// Reference rectangle length control, in CSS pixels
pub const INITIAL_REFERENCE_PX: f64 = 300.0;
pub const MIN_REFERENCE_PX: f64 = 150.0;
pub const MAX_REFERENCE_PX: f64 = 600.0;

/// Ring circle diameter control, in CSS pixels
pub const INITIAL_RING_PX: f64 = 65.0;
pub const MIN_RING_PX: f64 = 30.0;
pub const MAX_RING_PX: f64 = 100.0;

/// Store key for the persisted [`CalibrationState`]
pub const CALIBRATION_STORAGE_KEY: &str = "alvetakRingSizer_calibrationData_v4";

/// Pixels per millimetre from a pixel length matched to a known physical length.
pub fn compute_pixels_per_mm(pixel_length: f64, physical_length_mm: f64) -> f64 {
    pixel_length / physical_length_mm
}

/// Estimated true screen density in pixels per inch.
pub fn effective_ppi(pixels_per_mm: f64, device_pixel_ratio: f64) -> i64 {
    (pixels_per_mm * device_pixel_ratio * MM_PER_INCH).round() as i64
}

/// Outcome of [`validate_density`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DensityCheck {
    pub ok: bool,
    pub ppi: i64,
    /// Set when `ok` is false.
    pub warning: Option<String>,
}

/// Check an effective PPI against the inclusive `[min_ppi, max_ppi]` range.
pub fn validate_density(ppi: i64, min_ppi: i64, max_ppi: i64) -> DensityCheck {
    let ok = (min_ppi..=max_ppi).contains(&ppi);
    let warning = (!ok).then(|| {
        format!(
            "Calibration resulted in an unusual screen density ({ppi} PPI, expected {min_ppi}-{max_ppi}). \
             Make sure the card is flat against the screen, viewed straight on, and that zoom is at 100%."
        )
    });
    DensityCheck { ok, ppi, warning }
}

/// Physical length in millimetres of a pixel length.
pub fn to_physical_mm(pixel_length: f64, pixels_per_mm: f64) -> f64 {
    pixel_length / pixels_per_mm
}

/// Short side of the reference rectangle for a given long side, keeping the card's
/// aspect ratio.
pub fn reference_rect_width_px(reference_px: f64) -> f64 {
    reference_px * (REFERENCE_CARD_WIDTH_MM / REFERENCE_CARD_LENGTH_MM)
}

/// True when the device pixel ratio differs in any way from the one calibrated at.
pub fn is_stale_calibration(stored_device_pixel_ratio: f64, current_device_pixel_ratio: f64) -> bool {
    stored_device_pixel_ratio != current_device_pixel_ratio
}

/// A saved calibration.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationState {
    #[serde(rename = "storedPixelsPerMm")]
    pub pixels_per_mm: f64,
    #[serde(rename = "devicePixelRatioAtCalibration")]
    pub device_pixel_ratio_at_calibration: f64,
}

impl CalibrationState {
    /// Parse a persisted payload. Malformed JSON, missing fields and non-positive
    /// values all read as "no calibration".
    pub fn from_json(raw: &str) -> Option<Self> {
        let state: CalibrationState = serde_json::from_str(raw).ok()?;
        let positive = |v: f64| v.is_finite() && v > 0.0;
        (positive(state.pixels_per_mm) && positive(state.device_pixel_ratio_at_calibration)).then_some(state)
    }

    pub fn to_json(&self) -> String {
        // two finite f64 fields always serialize
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// A ring circle converted to physical size.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct RingMeasurement<'a> {
    pub ring_px: f64,
    pub diameter_mm: f64,
    pub circumference_mm: f64,
    pub matched: Option<&'a SizeEntry>,
}

/// Convert a ring circle's pixel diameter and match it against `table`.
pub fn measure_ring<'a>(ring_px: f64, pixels_per_mm: f64, table: &SizeTable<'a>) -> RingMeasurement<'a> {
    let diameter_mm = to_physical_mm(ring_px, pixels_per_mm);
    RingMeasurement {
        ring_px,
        diameter_mm,
        circumference_mm: diameter_mm * std::f64::consts::PI,
        matched: table.find_by_measurement(Measurement::Diameter, diameter_mm),
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalibrationError {
    #[error("cannot {event} while {phase}")]
    InvalidTransition { event: &'static str, phase: &'static str },

    #[error("length must be a positive number of pixels, got {0}")]
    InvalidLength(f64),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CalibrationPhase {
    Uninitialized,
    Calibrating { reference_px: f64 },
    Calibrated { state: CalibrationState, ring_px: f64 },
}

impl CalibrationPhase {
    pub fn name(&self) -> &'static str {
        match self {
            CalibrationPhase::Uninitialized => "uninitialized",
            CalibrationPhase::Calibrating { .. } => "calibrating",
            CalibrationPhase::Calibrated { .. } => "calibrated",
        }
    }
}

/// Result of a successful [`CalibrationSession::save`].
#[derive(Clone, Debug, PartialEq)]
pub struct SaveReport {
    pub state: CalibrationState,
    pub density: DensityCheck,
}

const DPR_MISMATCH_PROMPT: &str = "Your screen zoom or display has changed since the last calibration. \
                                   Please recalibrate for accurate measurements.";

/// Drives the calibration lifecycle and owns its persistence.
///
/// ```text
/// Uninitialized --start--> Calibrating --save--> Calibrated
///       ^                       ^                    |
///       |                       +----recalibrate-----+
///       +-------------device pixel ratio changed-----+
/// ```
pub struct CalibrationSession<S: KeyValueStore> {
    store: S,
    settings: CalibrationConfig,
    phase: CalibrationPhase,
    density_warning: Option<String>,
    recalibration_prompt: Option<String>,
}

impl<S: KeyValueStore> CalibrationSession<S> {
    /// A session with no calibration, ignoring anything persisted.
    pub fn new(store: S, settings: CalibrationConfig) -> Self {
        CalibrationSession {
            store,
            settings,
            phase: CalibrationPhase::Uninitialized,
            density_warning: None,
            recalibration_prompt: None,
        }
    }

    /// Resume from persisted state, validating it against the current device pixel
    /// ratio. Corrupted or stale state is removed from the store.
    pub fn restore(store: S, settings: CalibrationConfig, current_device_pixel_ratio: f64) -> Self {
        let mut session = Self::new(store, settings);

        let Some(raw) = session.store.load(CALIBRATION_STORAGE_KEY) else {
            return session;
        };

        match CalibrationState::from_json(&raw) {
            Some(state) if is_stale_calibration(state.device_pixel_ratio_at_calibration, current_device_pixel_ratio) => {
                session.invalidate(state.device_pixel_ratio_at_calibration, current_device_pixel_ratio);
            }
            Some(state) => {
                info!("Restored calibration: {:.4} px/mm", state.pixels_per_mm);
                session.phase = CalibrationPhase::Calibrated {
                    state,
                    ring_px: INITIAL_RING_PX,
                };
            }
            None => {
                warn!("Discarding corrupted calibration data: {}", raw);
                session.discard();
            }
        }

        session
    }

    pub fn phase(&self) -> &CalibrationPhase {
        &self.phase
    }

    pub fn settings(&self) -> &CalibrationConfig {
        &self.settings
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Density warning from the most recent save, if any.
    pub fn density_warning(&self) -> Option<&str> {
        self.density_warning.as_deref()
    }

    /// Set when a stored calibration was dropped because the display changed.
    pub fn recalibration_prompt(&self) -> Option<&str> {
        self.recalibration_prompt.as_deref()
    }

    pub fn state(&self) -> Option<&CalibrationState> {
        match &self.phase {
            CalibrationPhase::Calibrated { state, .. } => Some(state),
            _ => None,
        }
    }

    pub fn pixels_per_mm(&self) -> Option<f64> {
        self.state().map(|state| state.pixels_per_mm)
    }

    pub fn start(&mut self) -> Result<(), CalibrationError> {
        match self.phase {
            CalibrationPhase::Uninitialized => {
                self.phase = CalibrationPhase::Calibrating {
                    reference_px: INITIAL_REFERENCE_PX,
                };
                self.density_warning = None;
                Ok(())
            }
            _ => Err(self.invalid_transition("start calibration")),
        }
    }

    /// Set the reference rectangle length, clamped to the control range.
    /// Returns the display-only estimate of its physical length.
    pub fn adjust_reference(&mut self, reference_px: f64) -> Result<f64, CalibrationError> {
        if !reference_px.is_finite() {
            return Err(CalibrationError::InvalidLength(reference_px));
        }
        if let CalibrationPhase::Calibrating { reference_px: current } = &mut self.phase {
            *current = reference_px.clamp(MIN_REFERENCE_PX, MAX_REFERENCE_PX);
            return Ok(self.reference_estimate_mm().unwrap_or_default());
        }
        Err(self.invalid_transition("adjust the reference length"))
    }

    /// Physical length the reference rectangle would have at the default density.
    pub fn reference_estimate_mm(&self) -> Option<f64> {
        match self.phase {
            CalibrationPhase::Calibrating { reference_px } => {
                let default_ppmm = compute_pixels_per_mm(INITIAL_REFERENCE_PX, self.settings.reference_length_mm);
                Some(to_physical_mm(reference_px, default_ppmm))
            }
            _ => None,
        }
    }

    /// Compute and persist the calibration for the current reference length.
    ///
    /// An implausible density is reported in the [`SaveReport`] but does not stop
    /// the save. A non-positive or non-finite device pixel ratio is taken as 1.
    pub fn save(&mut self, current_device_pixel_ratio: f64) -> Result<SaveReport, CalibrationError> {
        let CalibrationPhase::Calibrating { reference_px } = self.phase else {
            return Err(self.invalid_transition("save calibration"));
        };
        if !(reference_px > 0.0) {
            return Err(CalibrationError::InvalidLength(reference_px));
        }

        let device_pixel_ratio = if current_device_pixel_ratio.is_finite() && current_device_pixel_ratio > 0.0 {
            current_device_pixel_ratio
        } else {
            1.0
        };

        let pixels_per_mm = compute_pixels_per_mm(reference_px, self.settings.reference_length_mm);
        let density = validate_density(
            effective_ppi(pixels_per_mm, device_pixel_ratio),
            self.settings.min_ppi,
            self.settings.max_ppi,
        );
        if let Some(warning) = &density.warning {
            warn!("{}", warning);
        }

        let state = CalibrationState {
            pixels_per_mm,
            device_pixel_ratio_at_calibration: device_pixel_ratio,
        };
        self.persist(&state);
        info!(
            "Calibration saved: {:.4} px/mm at device pixel ratio {} ({} PPI)",
            pixels_per_mm, device_pixel_ratio, density.ppi
        );

        self.phase = CalibrationPhase::Calibrated {
            state,
            ring_px: INITIAL_RING_PX,
        };
        self.density_warning = density.warning.clone();
        self.recalibration_prompt = None;

        Ok(SaveReport { state, density })
    }

    /// Re-validate a calibrated session against the live device pixel ratio.
    ///
    /// Returns whether the session is still calibrated. A mismatch discards the
    /// calibration and sets the recalibration prompt.
    pub fn check_device_pixel_ratio(&mut self, current_device_pixel_ratio: f64) -> bool {
        let Some(stored) = self.state().map(|state| state.device_pixel_ratio_at_calibration) else {
            return false;
        };
        if is_stale_calibration(stored, current_device_pixel_ratio) {
            self.invalidate(stored, current_device_pixel_ratio);
            return false;
        }
        true
    }

    /// Drop the current calibration and start over with the default reference length.
    pub fn recalibrate(&mut self) -> Result<(), CalibrationError> {
        match self.phase {
            CalibrationPhase::Calibrated { .. } => {
                self.discard();
                self.phase = CalibrationPhase::Calibrating {
                    reference_px: INITIAL_REFERENCE_PX,
                };
                self.density_warning = None;
                self.recalibration_prompt = None;
                Ok(())
            }
            _ => Err(self.invalid_transition("recalibrate")),
        }
    }

    /// Set the ring circle diameter, clamped to the control range, and measure it.
    pub fn adjust_ring(&mut self, ring_px: f64) -> Result<RingMeasurement<'static>, CalibrationError> {
        if !ring_px.is_finite() {
            return Err(CalibrationError::InvalidLength(ring_px));
        }
        if let CalibrationPhase::Calibrated { state, ring_px: current } = &mut self.phase {
            *current = ring_px.clamp(MIN_RING_PX, MAX_RING_PX);
            return Ok(measure_ring(*current, state.pixels_per_mm, &SizeTable::standard()));
        }
        Err(self.invalid_transition("measure a ring"))
    }

    /// Measurement of the current ring circle, when calibrated.
    pub fn measurement(&self) -> Option<RingMeasurement<'static>> {
        match self.phase {
            CalibrationPhase::Calibrated { state, ring_px } => {
                Some(measure_ring(ring_px, state.pixels_per_mm, &SizeTable::standard()))
            }
            _ => None,
        }
    }

    fn invalid_transition(&self, event: &'static str) -> CalibrationError {
        CalibrationError::InvalidTransition {
            event,
            phase: self.phase.name(),
        }
    }

    fn invalidate(&mut self, stored: f64, current: f64) {
        warn!(
            "Device pixel ratio changed from {} to {}, discarding calibration",
            stored, current
        );
        self.discard();
        self.phase = CalibrationPhase::Uninitialized;
        self.recalibration_prompt = Some(DPR_MISMATCH_PROMPT.to_string());
    }

    fn persist(&mut self, state: &CalibrationState) {
        if let Err(e) = self.store.save(CALIBRATION_STORAGE_KEY, &state.to_json()) {
            warn!("Failed to persist calibration: {}", e);
        }
    }

    fn discard(&mut self) {
        if let Err(e) = self.store.remove(CALIBRATION_STORAGE_KEY) {
            warn!("Failed to remove persisted calibration: {}", e);
        }
    }
}
