//! # Ring Sizer Core Library
//!
//! This library provides the reference chart, the matching engine and the screen
//! calibration arithmetic behind the ring sizer. It is deliberately small: every
//! operation is a pure function over an embedded, read-only chart, apart from
//! calibration persistence which goes through an explicit key-value store.
//!
//! ## Design Philosophy
//!
//! ### Static Reference Data
//! - **Embedded chart**: 30 rows compiled into the binary, never loaded at runtime
//! - **Immutable**: no row is created, mutated or removed after startup
//! - **Absent codes are explicit**: a system with no equivalent at a given size is
//!   `None`, never a placeholder string, so absence can never satisfy a lookup
//!
//! ### Two-Tier Tolerance
//! Numeric lookups accept a value when it is within a tight "exact" tolerance of a
//! row (returned immediately, in chart order), or otherwise when the closest row
//! is within a looser acceptance tolerance. Anything further away is not a ring
//! size on this chart.
//!
//! ### Data Flow
//! 1. **Manual entry**: input type + raw text → [`matcher`] → matched row → [`renderer`]
//! 2. **Visual sizer**: reference rectangle px → [`calibration`] ppmm → ring circle px
//!    → millimetres → [`matcher`] → matched row
//! 3. **Persistence**: calibration is saved through [`store::KeyValueStore`] and
//!    discarded whenever the device pixel ratio changes
//!
//! ## Core Types
//!
//! - [`SizeEntry`]: one chart row correlating a physical size with its national codes
//! - [`size_table::InputType`]: which system a value is expressed in
//! - [`matcher::MatchOutcome`]: tagged lookup result

use serde::Serialize;

// Module declarations
pub mod calibration;
pub mod config;
pub mod matcher;
pub mod renderer;
pub mod size_table;
pub mod store;

pub use matcher::{find_match, find_matching_size, MatchOutcome};
pub use size_table::{InputType, Measurement, SizeField, SizeSystem, SizeTable};

/// One row of the ring size reference chart.
///
/// Physical measurements are inner dimensions in millimetres. National codes are
/// stored as written on the chart (`"7.5"`, `"N½"`, `"Z+1"`); `None` means the
/// system has no common equivalent at this size.
///
/// # Example
/// ```
/// use ring_sizer_lib::{SizeEntry, SizeSystem};
///
/// let entry = SizeEntry {
///     id: 14,
///     diameter_mm: 17.35,
///     circumference_mm: 54.51,
///     us_ca: Some("7"),
///     uk_au_nz_ie_za: Some("N½"),
///     eu_iso: Some("54.5"),
///     jp_cn_sa: Some("13"),
///     ch: Some("14.5"),
///     it_es_nl_tr: Some("14"),
/// };
///
/// assert_eq!(entry.code(SizeSystem::UsCa), Some("7"));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct SizeEntry {
    /// Stable ordering key, ascending with physical size
    pub id: u32,
    /// Inner diameter in millimetres
    pub diameter_mm: f64,
    /// Inner circumference in millimetres
    pub circumference_mm: f64,
    /// US and Canada
    pub us_ca: Option<&'static str>,
    /// UK, Australia, New Zealand, Ireland and South Africa
    pub uk_au_nz_ie_za: Option<&'static str>,
    /// Europe (ISO 8653 / French)
    pub eu_iso: Option<&'static str>,
    /// Japan, China and South America
    pub jp_cn_sa: Option<&'static str>,
    /// Switzerland
    pub ch: Option<&'static str>,
    /// Italy, Spain, Netherlands and Turkey
    pub it_es_nl_tr: Option<&'static str>,
}

impl SizeEntry {
    /// Physical measurement of this row in millimetres.
    pub fn measurement(&self, measurement: Measurement) -> f64 {
        match measurement {
            Measurement::Diameter => self.diameter_mm,
            Measurement::Circumference => self.circumference_mm,
        }
    }

    /// Code of this row in a national system, if the chart defines one.
    pub fn code(&self, system: SizeSystem) -> Option<&'static str> {
        match system {
            SizeSystem::UsCa => self.us_ca,
            SizeSystem::UkAuNzIeZa => self.uk_au_nz_ie_za,
            SizeSystem::EuIso => self.eu_iso,
            SizeSystem::JpCnSa => self.jp_cn_sa,
            SizeSystem::Ch => self.ch,
            SizeSystem::ItEsNlTr => self.it_es_nl_tr,
        }
    }
}
