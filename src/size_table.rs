//! # Ring Size Reference Chart
//!
//! The embedded chart, the closed set of input systems and the declarative mapping
//! from an input system to the chart column it reads.
//!
//! ## Chart Data
//!
//! Sizes vary slightly between jewelers; the chart holds common approximations.
//! - **EU/ISO** codes follow the inner circumference in millimetres
//! - **CH** codes are usually the EU code minus 40
//! - **IT/ES/NL/TR** use their own numbering, close to EU minus 40
//!
//! ## Invariants
//!
//! Checked by [`SizeTable::new`] and asserted for the embedded chart in tests:
//! - at least one row
//! - `id` strictly increasing
//! - diameter and circumference both ascending
//! - within one system, each code appears on at most one row

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::SizeEntry;

/// Continuous measurement columns of the chart.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Measurement {
    Diameter,
    Circumference,
}

impl Measurement {
    /// Differences below this are treated as the same size.
    pub fn exact_tolerance_mm(self) -> f64 {
        match self {
            Measurement::Diameter => 0.05,
            Measurement::Circumference => 0.25,
        }
    }

    /// Largest difference to the closest row that still counts as a match.
    pub fn acceptance_tolerance_mm(self) -> f64 {
        match self {
            Measurement::Diameter => 0.6,
            Measurement::Circumference => 2.0,
        }
    }
}

/// National sizing systems with discrete codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SizeSystem {
    UsCa,
    UkAuNzIeZa,
    EuIso,
    JpCnSa,
    Ch,
    ItEsNlTr,
}

impl SizeSystem {
    pub const ALL: [SizeSystem; 6] = [
        SizeSystem::UsCa,
        SizeSystem::UkAuNzIeZa,
        SizeSystem::EuIso,
        SizeSystem::JpCnSa,
        SizeSystem::Ch,
        SizeSystem::ItEsNlTr,
    ];
}

impl fmt::Display for SizeSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(SizeField::System(*self).label())
    }
}

/// A column of the chart: either a physical measurement or a national system.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SizeField {
    Measurement(Measurement),
    System(SizeSystem),
}

impl SizeField {
    /// Human-readable column heading.
    pub fn label(self) -> &'static str {
        match self {
            SizeField::Measurement(Measurement::Diameter) => "Diameter (mm)",
            SizeField::Measurement(Measurement::Circumference) => "Circumference (mm)",
            SizeField::System(SizeSystem::UsCa) => "US / Canada",
            SizeField::System(SizeSystem::UkAuNzIeZa) => "UK / AU / NZ / IE / ZA",
            SizeField::System(SizeSystem::EuIso) => "Europe (ISO / French)",
            SizeField::System(SizeSystem::JpCnSa) => "Japan / China / S. America",
            SizeField::System(SizeSystem::Ch) => "Switzerland",
            SizeField::System(SizeSystem::ItEsNlTr) => "Italy / Spain / NL / Turkey",
        }
    }
}

/// The system a user-supplied value is expressed in.
///
/// Parses from the wire name (`US_CA`) or its kebab-case form (`us-ca`),
/// ignoring case.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InputType {
    DiameterMm,
    CircumferenceMm,
    UsCa,
    UkAuNzIeZa,
    EuIso,
    JpCnSa,
    Ch,
    ItEsNlTr,
}

struct InputTypeInfo {
    input_type: InputType,
    wire_name: &'static str,
    field: SizeField,
}

// Declared in `InputType` discriminant order; `InputType::info` indexes into it.
const INPUT_TYPES: [InputTypeInfo; 8] = [
    InputTypeInfo {
        input_type: InputType::DiameterMm,
        wire_name: "DIAMETER_MM",
        field: SizeField::Measurement(Measurement::Diameter),
    },
    InputTypeInfo {
        input_type: InputType::CircumferenceMm,
        wire_name: "CIRCUMFERENCE_MM",
        field: SizeField::Measurement(Measurement::Circumference),
    },
    InputTypeInfo {
        input_type: InputType::UsCa,
        wire_name: "US_CA",
        field: SizeField::System(SizeSystem::UsCa),
    },
    InputTypeInfo {
        input_type: InputType::UkAuNzIeZa,
        wire_name: "UK_AU_NZ_IE_ZA",
        field: SizeField::System(SizeSystem::UkAuNzIeZa),
    },
    InputTypeInfo {
        input_type: InputType::EuIso,
        wire_name: "EU_ISO",
        field: SizeField::System(SizeSystem::EuIso),
    },
    InputTypeInfo {
        input_type: InputType::JpCnSa,
        wire_name: "JP_CN_SA",
        field: SizeField::System(SizeSystem::JpCnSa),
    },
    InputTypeInfo {
        input_type: InputType::Ch,
        wire_name: "CH",
        field: SizeField::System(SizeSystem::Ch),
    },
    InputTypeInfo {
        input_type: InputType::ItEsNlTr,
        wire_name: "IT_ES_NL_TR",
        field: SizeField::System(SizeSystem::ItEsNlTr),
    },
];

impl InputType {
    /// All input types, in display order.
    pub const ALL: [InputType; 8] = [
        InputType::DiameterMm,
        InputType::CircumferenceMm,
        InputType::UsCa,
        InputType::UkAuNzIeZa,
        InputType::EuIso,
        InputType::JpCnSa,
        InputType::Ch,
        InputType::ItEsNlTr,
    ];

    fn info(self) -> &'static InputTypeInfo {
        &INPUT_TYPES[self as usize]
    }

    /// The chart column this input type is looked up in.
    pub fn field(self) -> SizeField {
        self.info().field
    }

    /// Screaming-snake identifier, e.g. `UK_AU_NZ_IE_ZA`.
    pub fn wire_name(self) -> &'static str {
        self.info().wire_name
    }

    pub fn label(self) -> &'static str {
        self.field().label()
    }

    /// True for diameter and circumference, which take free numeric input.
    pub fn is_numeric(self) -> bool {
        matches!(self.field(), SizeField::Measurement(_))
    }
}

impl fmt::Display for InputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Returned when a string names no known input type.
#[derive(Error, Debug, PartialEq, Eq)]
#[error("unknown input type '{0}' (expected one of: {names})", names = InputType::ALL.map(InputType::wire_name).join(", "))]
pub struct ParseInputTypeError(pub String);

impl FromStr for InputType {
    type Err = ParseInputTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().replace('-', "_").to_ascii_uppercase();
        INPUT_TYPES
            .iter()
            .find(|info| info.wire_name == normalized)
            .map(|info| info.input_type)
            .ok_or_else(|| ParseInputTypeError(s.to_string()))
    }
}

/// Violations of the chart invariants.
#[derive(Error, Debug, PartialEq)]
pub enum TableError {
    #[error("size table has no rows")]
    Empty,

    #[error("row {id}: measurements must be positive")]
    NonPositiveMeasurement { id: u32 },

    #[error("row {id}: id must be greater than the previous row's")]
    IdOrder { id: u32 },

    #[error("row {id}: diameter and circumference must be ascending")]
    MeasurementOrder { id: u32 },

    #[error("row {id}: {system} code '{code}' is already used by row {first_id}")]
    DuplicateCode {
        id: u32,
        first_id: u32,
        system: SizeSystem,
        code: String,
    },
}

/// A validated, read-only view over chart rows.
#[derive(Clone, Copy, Debug)]
pub struct SizeTable<'a> {
    entries: &'a [SizeEntry],
}

impl SizeTable<'static> {
    /// The embedded reference chart.
    pub fn standard() -> Self {
        SizeTable {
            entries: &RING_SIZES,
        }
    }
}

impl<'a> SizeTable<'a> {
    /// Wrap `entries` after checking the chart invariants.
    pub fn new(entries: &'a [SizeEntry]) -> Result<Self, TableError> {
        validate(entries)?;
        Ok(SizeTable { entries })
    }

    pub fn entries(&self) -> &'a [SizeEntry] {
        self.entries
    }

    /// Selectable codes for a discrete input type.
    ///
    /// Numeric input types have no enumerable options and return an empty list.
    /// Plain decimal codes come first in numeric order, followed by the remaining
    /// codes in case-insensitive order.
    pub fn available_options(&self, input_type: InputType) -> Vec<&'static str> {
        let SizeField::System(system) = input_type.field() else {
            return Vec::new();
        };

        let mut options: Vec<&'static str> = Vec::new();
        for code in self.entries.iter().filter_map(|entry| entry.code(system)) {
            if !options.contains(&code) {
                options.push(code);
            }
        }

        options.sort_by(|a, b| compare_codes(a, b));
        options
    }
}

/// Normalized form used when comparing codes: trimmed and lowercased.
pub(crate) fn normalize_code(code: &str) -> String {
    code.trim().to_lowercase()
}

static PLAIN_DECIMAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]+(\.[0-9]+)?$").expect("plain decimal pattern is valid"));

fn plain_decimal(code: &str) -> Option<f64> {
    if PLAIN_DECIMAL.is_match(code) {
        code.parse().ok()
    } else {
        None
    }
}

fn compare_codes(a: &str, b: &str) -> Ordering {
    match (plain_decimal(a), plain_decimal(b)) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a
            .to_lowercase()
            .cmp(&b.to_lowercase())
            .then_with(|| a.cmp(b)),
    }
}

fn validate(entries: &[SizeEntry]) -> Result<(), TableError> {
    if entries.is_empty() {
        return Err(TableError::Empty);
    }

    for entry in entries {
        if !(entry.diameter_mm > 0.0 && entry.circumference_mm > 0.0) {
            return Err(TableError::NonPositiveMeasurement { id: entry.id });
        }
    }

    for pair in entries.windows(2) {
        let (prev, next) = (&pair[0], &pair[1]);
        if next.id <= prev.id {
            return Err(TableError::IdOrder { id: next.id });
        }
        if next.diameter_mm < prev.diameter_mm || next.circumference_mm < prev.circumference_mm {
            return Err(TableError::MeasurementOrder { id: next.id });
        }
    }

    for system in SizeSystem::ALL {
        let mut seen: HashMap<String, u32> = HashMap::new();
        for entry in entries {
            let Some(code) = entry.code(system) else {
                continue;
            };
            if let Some(&first_id) = seen.get(&normalize_code(code)) {
                return Err(TableError::DuplicateCode {
                    id: entry.id,
                    first_id,
                    system,
                    code: code.to_string(),
                });
            }
            seen.insert(normalize_code(code), entry.id);
        }
    }

    Ok(())
}

macro_rules! code {
    (-) => {
        None
    };
    ($code:literal) => {
        Some($code)
    };
}

macro_rules! row {
    ($id:literal, $diameter:literal, $circumference:literal, $us:tt, $uk:tt, $eu:tt, $jp:tt, $ch:tt, $it:tt) => {
        SizeEntry {
            id: $id,
            diameter_mm: $diameter,
            circumference_mm: $circumference,
            us_ca: code!($us),
            uk_au_nz_ie_za: code!($uk),
            eu_iso: code!($eu),
            jp_cn_sa: code!($jp),
            ch: code!($ch),
            it_es_nl_tr: code!($it),
        }
    };
}

/// Embedded chart. Columns: id, diameter, circumference, US/CA, UK, EU/ISO,
/// JP/CN/SA, CH, IT/ES/NL/TR. `-` marks a system with no equivalent.
pub static RING_SIZES: [SizeEntry; 30] = [
    // Smaller sizes
    row!(1, 11.95, 37.54, "0", "A", "37.5", -, -, -),
    row!(2, 12.37, 38.86, "1", "B", "39", "1", -, -),
    row!(3, 12.78, 40.15, "1.5", "C", "40", -, "0.5", "0"),
    row!(4, 13.21, 41.50, "2", "D", "41.5", "2", "1.5", "1"),
    row!(5, 13.61, 42.76, "2.5", "E", "42.75", "3", "2.75", "3"),
    row!(6, 14.05, 44.14, "3", "F", "44", "4", "4", "4"),
    row!(7, 14.45, 45.40, "3.5", "G", "45.5", "5", "5.5", "5"),
    row!(8, 14.86, 46.68, "4", "H", "46.5", "6", "6.5", "6"),
    row!(9, 15.27, 47.97, "4.5", "I", "48", "7", "8", "8"),
    // Common adult sizes
    row!(10, 15.70, 49.32, "5", "J½", "49.5", "9", "9.5", "9"),
    row!(11, 16.10, 50.58, "5.5", "K½", "50.5", "10", "10.5", "10"),
    row!(12, 16.51, 51.87, "6", "L½", "52", "11", "12", "12"),
    row!(13, 16.92, 53.16, "6.5", "M½", "53", "12", "13", "13"),
    row!(14, 17.35, 54.51, "7", "N½", "54.5", "13", "14.5", "14"),
    row!(15, 17.75, 55.76, "7.5", "O½", "55.75", "15", "15.75", "16"),
    row!(16, 18.19, 57.15, "8", "P½", "57", "16", "17", "17"),
    row!(17, 18.53, 58.21, "8.5", "Q½", "58.25", "17", "18.25", "18"),
    row!(18, 18.89, 59.34, "9", "R½", "59.5", "18", "19.5", "19"),
    row!(19, 19.41, 60.98, "9.5", "S½", "61", "19", "21", "21"),
    row!(20, 19.84, 62.33, "10", "T½", "62.5", "20", "22.5", "22"),
    row!(21, 20.20, 63.46, "10.5", "U½", "63.5", "22", "23.5", "23"),
    row!(22, 20.68, 64.97, "11", "V½", "65", "23", "25", "25"),
    row!(23, 21.08, 66.22, "11.5", "W½", "66.25", "24", "26.25", "26"),
    row!(24, 21.49, 67.51, "12", "X½", "67.5", "25", "27.5", "27"),
    row!(25, 21.89, 68.77, "12.5", "Y½", "68.75", "26", "28.75", "29"),
    // Larger sizes
    row!(26, 22.33, 70.15, "13", "Z½", "70", "27", "30", "30"),
    row!(27, 22.60, 71.00, "13.5", "Z+1", "71", "28", "31", "31"),
    row!(28, 23.01, 72.28, "14", "Z+2", "72.25", "29", "32.25", "32"),
    row!(29, 23.42, 73.57, "14.5", "Z+3", "73.5", "30", "33.5", "33"),
    row!(30, 23.83, 74.86, "15", "Z+4", "75", "31", "35", "35"),
];

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: u32, diameter_mm: f64, us_ca: Option<&'static str>) -> SizeEntry {
        SizeEntry {
            id,
            diameter_mm,
            circumference_mm: diameter_mm * std::f64::consts::PI,
            us_ca,
            uk_au_nz_ie_za: None,
            eu_iso: None,
            jp_cn_sa: None,
            ch: None,
            it_es_nl_tr: None,
        }
    }

    #[test]
    fn standard_chart_satisfies_invariants() {
        assert_eq!(validate(&RING_SIZES), Ok(()));
        assert_eq!(SizeTable::standard().entries().len(), 30);
    }

    #[test]
    fn input_type_table_matches_discriminants() {
        for input_type in InputType::ALL {
            assert_eq!(input_type.info().input_type, input_type);
        }
    }

    #[test]
    fn every_input_type_maps_to_a_distinct_field() {
        let fields: Vec<SizeField> = InputType::ALL.iter().map(|t| t.field()).collect();
        for (i, field) in fields.iter().enumerate() {
            assert!(!fields[i + 1..].contains(field), "{:?} mapped twice", field);
        }
    }

    #[test]
    fn input_type_parses_wire_and_kebab_names() {
        assert_eq!("US_CA".parse(), Ok(InputType::UsCa));
        assert_eq!("uk-au-nz-ie-za".parse(), Ok(InputType::UkAuNzIeZa));
        assert_eq!(" diameter_mm ".parse(), Ok(InputType::DiameterMm));
        assert_eq!(
            "ring".parse::<InputType>(),
            Err(ParseInputTypeError("ring".to_string()))
        );
    }

    #[test]
    fn input_type_serializes_to_wire_name() {
        for input_type in InputType::ALL {
            let json = serde_json::to_string(&input_type).unwrap();
            assert_eq!(json, format!("\"{}\"", input_type.wire_name()));
        }
    }

    #[test]
    fn new_rejects_empty_table() {
        assert_eq!(SizeTable::new(&[]).unwrap_err(), TableError::Empty);
    }

    #[test]
    fn new_rejects_unsorted_rows() {
        let rows = [entry(1, 16.0, Some("5")), entry(2, 15.0, Some("6"))];
        assert_eq!(
            SizeTable::new(&rows).unwrap_err(),
            TableError::MeasurementOrder { id: 2 }
        );

        let rows = [entry(2, 15.0, Some("5")), entry(2, 16.0, Some("6"))];
        assert_eq!(SizeTable::new(&rows).unwrap_err(), TableError::IdOrder { id: 2 });
    }

    #[test]
    fn new_rejects_duplicate_codes() {
        let rows = [entry(1, 15.0, Some("5")), entry(2, 16.0, Some(" 5 "))];
        assert_eq!(
            SizeTable::new(&rows).unwrap_err(),
            TableError::DuplicateCode {
                id: 2,
                first_id: 1,
                system: SizeSystem::UsCa,
                code: " 5 ".to_string(),
            }
        );
    }

    #[test]
    fn absent_codes_are_not_duplicates() {
        let rows = [entry(1, 15.0, None), entry(2, 16.0, None)];
        assert!(SizeTable::new(&rows).is_ok());
    }

    #[test]
    fn numeric_inputs_have_no_options() {
        let table = SizeTable::standard();
        assert!(table.available_options(InputType::DiameterMm).is_empty());
        assert!(table.available_options(InputType::CircumferenceMm).is_empty());
    }

    #[test]
    fn options_sort_numerically() {
        let rows = [
            entry(1, 12.0, Some("0")),
            entry(2, 12.5, Some("1")),
            entry(3, 13.0, Some("1.5")),
            entry(4, 13.5, Some("2")),
        ];
        let table = SizeTable::new(&rows).unwrap();
        assert_eq!(
            table.available_options(InputType::UsCa),
            vec!["0", "1", "1.5", "2"]
        );
    }

    #[test]
    fn options_put_numbers_before_codes() {
        assert_eq!(compare_codes("10", "2"), Ordering::Greater);
        assert_eq!(compare_codes("99", "A"), Ordering::Less);
        assert_eq!(compare_codes("b", "A"), Ordering::Greater);
        assert_eq!(compare_codes("1.5", "1½"), Ordering::Less);
    }

    #[test]
    fn standard_us_options_are_in_chart_order() {
        let options = SizeTable::standard().available_options(InputType::UsCa);
        assert_eq!(options.len(), 30);
        assert_eq!(options.first(), Some(&"0"));
        assert_eq!(options.last(), Some(&"15"));
        assert!(options.windows(2).all(|w| w[0].parse::<f64>().unwrap() < w[1].parse::<f64>().unwrap()));
    }

    #[test]
    fn standard_uk_options_start_with_letters() {
        let options = SizeTable::standard().available_options(InputType::UkAuNzIeZa);
        assert_eq!(&options[..3], &["A", "B", "C"]);
        assert!(options.contains(&"Z+4"));
        assert!(!options.contains(&"-"));
    }

    #[test]
    fn options_skip_absent_codes() {
        let options = SizeTable::standard().available_options(InputType::JpCnSa);
        assert_eq!(options.len(), 28);
        assert_eq!(options.first(), Some(&"1"));
    }
}
