//! # Size Matching
//!
//! Resolves a value typed by the user into a row of the reference chart.
//!
//! ## Numeric Input (diameter, circumference)
//!
//! Rows are scanned in chart order. The first row closer than the exact tolerance
//! is returned straight away, so when two rows are equally close the smaller size
//! wins. Otherwise the closest row is returned if it lies within the acceptance
//! tolerance:
//!
//! | Measurement   | Exact     | Acceptance |
//! |---------------|-----------|------------|
//! | Diameter      | < 0.05 mm | <= 0.6 mm  |
//! | Circumference | < 0.25 mm | <= 2.0 mm  |
//!
//! The leading number of the input is read and anything after it is ignored, so
//! `"17.3mm"` and `"54.5 mm"` both match. Parsing always uses `.` as the decimal
//! separator, whatever the display locale: `"17,35"` reads as 17.
//!
//! ## Discrete Input (national systems)
//!
//! Input and chart codes are trimmed and lowercased before comparison. Rows without
//! a code in the requested system never match.

use std::sync::LazyLock;

use log::debug;
use regex::Regex;

use crate::size_table::{normalize_code, InputType, Measurement, SizeField, SizeSystem, SizeTable};
use crate::SizeEntry;

/// Result of a lookup.
///
/// Distinguishes "nothing typed yet" from "typed something the chart does not
/// contain", so callers can show different empty states.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MatchOutcome<'a> {
    /// Input was missing, empty or whitespace only.
    NotEntered,
    /// Input was present but unparseable or too far from every row.
    NoMatch,
    Matched(&'a SizeEntry),
}

impl<'a> MatchOutcome<'a> {
    pub fn entry(self) -> Option<&'a SizeEntry> {
        match self {
            MatchOutcome::Matched(entry) => Some(entry),
            MatchOutcome::NotEntered | MatchOutcome::NoMatch => None,
        }
    }
}

impl<'a> SizeTable<'a> {
    /// Look up `raw` as a value in `input_type`.
    pub fn find_match(&self, input_type: InputType, raw: Option<&str>) -> MatchOutcome<'a> {
        let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
            return MatchOutcome::NotEntered;
        };

        let found = match input_type.field() {
            SizeField::Measurement(measurement) => {
                parse_measurement(raw).and_then(|value| self.find_by_measurement(measurement, value))
            }
            SizeField::System(system) => self.find_by_code(system, raw),
        };

        debug!(
            "match {} '{}' -> {:?}",
            input_type.wire_name(),
            raw,
            found.map(|entry| entry.id)
        );

        found.map_or(MatchOutcome::NoMatch, MatchOutcome::Matched)
    }

    /// Look up `raw`, collapsing both empty outcomes to `None`.
    pub fn find_matching_size(&self, input_type: InputType, raw: Option<&str>) -> Option<&'a SizeEntry> {
        self.find_match(input_type, raw).entry()
    }

    /// Closest row to a physical measurement, within the two-tier tolerance.
    pub fn find_by_measurement(&self, measurement: Measurement, value_mm: f64) -> Option<&'a SizeEntry> {
        if !value_mm.is_finite() {
            return None;
        }

        let mut closest: Option<(&'a SizeEntry, f64)> = None;
        for entry in self.entries() {
            let difference = (entry.measurement(measurement) - value_mm).abs();
            if difference < measurement.exact_tolerance_mm() {
                return Some(entry);
            }
            if closest.map_or(true, |(_, smallest)| difference < smallest) {
                closest = Some((entry, difference));
            }
        }

        closest
            .filter(|&(_, smallest)| smallest <= measurement.acceptance_tolerance_mm())
            .map(|(entry, _)| entry)
    }

    /// First row whose code in `system` equals `code`, ignoring case and
    /// surrounding whitespace.
    pub fn find_by_code(&self, system: SizeSystem, code: &str) -> Option<&'a SizeEntry> {
        let wanted = normalize_code(code);
        self.entries().iter().find(|entry| {
            entry
                .code(system)
                .is_some_and(|candidate| normalize_code(candidate) == wanted)
        })
    }
}

static LEADING_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?([0-9]+(\.[0-9]*)?|\.[0-9]+)([eE][+-]?[0-9]+)?").expect("leading number pattern is valid")
});

/// Longest leading decimal number of `raw`; trailing text such as a unit is ignored.
fn parse_measurement(raw: &str) -> Option<f64> {
    let number = LEADING_NUMBER.find(raw)?;
    number.as_str().parse::<f64>().ok().filter(|value| value.is_finite())
}

/// [`SizeTable::find_match`] against the embedded chart.
pub fn find_match(input_type: InputType, raw: Option<&str>) -> MatchOutcome<'static> {
    SizeTable::standard().find_match(input_type, raw)
}

/// [`SizeTable::find_matching_size`] against the embedded chart.
pub fn find_matching_size(input_type: InputType, raw: Option<&str>) -> Option<&'static SizeEntry> {
    SizeTable::standard().find_matching_size(input_type, raw)
}

/// [`SizeTable::available_options`] for the embedded chart.
pub fn available_options(input_type: InputType) -> Vec<&'static str> {
    SizeTable::standard().available_options(input_type)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(InputType::DiameterMm, "17.35", 14)]
    #[case(InputType::DiameterMm, " 17.30 ", 14)]
    #[case(InputType::DiameterMm, "18.55", 17)]
    #[case(InputType::DiameterMm, "17.5", 14)]
    #[case(InputType::DiameterMm, "17.3mm", 14)]
    #[case(InputType::DiameterMm, "17,35", 13)]
    #[case(InputType::DiameterMm, "+1.735e1", 14)]
    #[case(InputType::CircumferenceMm, "54.5", 14)]
    #[case(InputType::CircumferenceMm, "54.5 mm", 14)]
    #[case(InputType::CircumferenceMm, "56", 15)]
    #[case(InputType::CircumferenceMm, "56.4", 15)]
    #[case(InputType::CircumferenceMm, "76.5", 30)]
    #[case(InputType::CircumferenceMm, "35.6", 1)]
    #[case(InputType::UsCa, "7", 14)]
    #[case(InputType::UkAuNzIeZa, "n½", 14)]
    #[case(InputType::UkAuNzIeZa, "z+1", 27)]
    #[case(InputType::EuIso, "54.5", 14)]
    #[case(InputType::JpCnSa, "1", 2)]
    #[case(InputType::Ch, "0.5", 3)]
    #[case(InputType::ItEsNlTr, "0", 3)]
    fn finds_expected_row(#[case] input_type: InputType, #[case] raw: &str, #[case] expected_id: u32) {
        let entry = find_matching_size(input_type, Some(raw)).expect("should match");
        assert_eq!(entry.id, expected_id);
    }

    #[rstest]
    #[case(None)]
    #[case(Some(""))]
    #[case(Some("   "))]
    fn empty_input_is_not_entered(#[case] raw: Option<&str>) {
        for input_type in InputType::ALL {
            assert_eq!(find_match(input_type, raw), MatchOutcome::NotEntered);
        }
    }

    #[rstest]
    #[case(InputType::DiameterMm, "abc")]
    #[case(InputType::DiameterMm, "mm17")]
    #[case(InputType::DiameterMm, ".")]
    #[case(InputType::DiameterMm, "NaN")]
    #[case(InputType::DiameterMm, "inf")]
    #[case(InputType::DiameterMm, "1e400")]
    #[case(InputType::DiameterMm, "25")]
    #[case(InputType::DiameterMm, "10")]
    #[case(InputType::CircumferenceMm, "90")]
    #[case(InputType::CircumferenceMm, "76.9")]
    #[case(InputType::CircumferenceMm, "35.4")]
    #[case(InputType::UsCa, "7.25")]
    #[case(InputType::UkAuNzIeZa, "-")]
    fn unknown_input_is_no_match(#[case] input_type: InputType, #[case] raw: &str) {
        assert_eq!(find_match(input_type, Some(raw)), MatchOutcome::NoMatch);
    }

    #[test]
    fn exact_tolerance_prefers_earlier_row() {
        // 0.04 mm from both rows; the earlier row short-circuits the scan.
        let rows = [
            SizeEntry {
                id: 1,
                diameter_mm: 16.00,
                circumference_mm: 50.27,
                us_ca: Some("5"),
                uk_au_nz_ie_za: None,
                eu_iso: None,
                jp_cn_sa: None,
                ch: None,
                it_es_nl_tr: None,
            },
            SizeEntry {
                id: 2,
                diameter_mm: 16.08,
                circumference_mm: 50.52,
                us_ca: Some("5.5"),
                uk_au_nz_ie_za: None,
                eu_iso: None,
                jp_cn_sa: None,
                ch: None,
                it_es_nl_tr: None,
            },
        ];
        let table = SizeTable::new(&rows).unwrap();
        let entry = table.find_by_measurement(Measurement::Diameter, 16.04).unwrap();
        assert_eq!(entry.id, 1);
    }

    #[test]
    fn acceptance_tolerance_returns_closest_row() {
        // 0.5 mm below the smallest diameter
        let entry = find_matching_size(InputType::DiameterMm, Some("11.45")).unwrap();
        assert_eq!(entry.id, 1);
        // 0.65 mm below: out of range
        assert_eq!(find_matching_size(InputType::DiameterMm, Some("11.30")), None);
    }

    #[test]
    fn placeholder_never_matches() {
        for input_type in InputType::ALL.into_iter().filter(|t| !t.is_numeric()) {
            assert_eq!(find_match(input_type, Some("-")), MatchOutcome::NoMatch);
        }
    }
}
