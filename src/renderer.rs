//! # Result Rendering
//!
//! Renders lookup results, option lists, the full chart and visual sizer
//! measurements as plain text for the terminal. Every `format_*` function returns
//! the text so it can be tested; the `draw_*` functions print it.

use crate::calibration::RingMeasurement;
use crate::matcher::MatchOutcome;
use crate::size_table::{InputType, SizeField, SizeTable};
use crate::SizeEntry;

const LABEL_WIDTH: usize = 28;

const DISCLAIMERS: [&str; 3] = [
    "* Ring sizes can vary slightly by jeweler and country. This chart provides common approximations.",
    "* EU/ISO sizes often correspond to the ring's inner circumference in millimeters. CH (Swiss) sizes are often EU size - 40.",
    "* '-' indicates no direct common equivalent in this chart or data not available.",
];

/// Display value of one chart column: measurements with two decimals, absent
/// codes as `-`.
pub fn field_value(entry: &SizeEntry, field: SizeField) -> String {
    match field {
        SizeField::Measurement(measurement) => format!("{:.2}", entry.measurement(measurement)),
        SizeField::System(system) => entry.code(system).unwrap_or("-").to_string(),
    }
}

/// All equivalents of a row, one per line, in display order.
pub fn format_entry(entry: &SizeEntry) -> String {
    let mut out = String::from("Equivalent International Sizes\n\n");
    for input_type in InputType::ALL {
        let field = input_type.field();
        out.push_str(&format!(
            "  {:<width$} {}\n",
            format!("{}:", field.label()),
            field_value(entry, field),
            width = LABEL_WIDTH
        ));
    }
    out.push('\n');
    for line in DISCLAIMERS {
        out.push_str(line);
        out.push('\n');
    }
    out
}

/// Text for a lookup result, with distinct messages for empty and unmatched input.
pub fn format_outcome(outcome: MatchOutcome<'_>, input_type: InputType, raw: Option<&str>) -> String {
    match outcome {
        MatchOutcome::Matched(entry) => format_entry(entry),
        MatchOutcome::NotEntered => "Enter a size to see conversions.\n\
                                     Select your known measurement type and value.\n"
            .to_string(),
        MatchOutcome::NoMatch => format!(
            "No matching size found for \"{}\" in {}.\n\
             Please check your input or try a different value. This chart contains common sizes; \
             very small, large, or custom sizes may not be listed.\n",
            raw.unwrap_or_default().trim(),
            input_type.label()
        ),
    }
}

/// Selectable codes for an input type, or a note when it takes free input.
pub fn format_options(input_type: InputType, options: &[&str]) -> String {
    if input_type.is_numeric() {
        return format!(
            "{} takes a number in millimetres (e.g. {}).\n",
            input_type.label(),
            if input_type == InputType::DiameterMm { "17.35" } else { "54.5" }
        );
    }
    if options.is_empty() {
        return "No sizes available for this type\n".to_string();
    }
    format!("{}: {}\n", input_type.label(), options.join(", "))
}

/// The whole chart as an aligned table.
pub fn format_chart(table: &SizeTable<'_>) -> String {
    let headings = ["Diam", "Circ", "US/CA", "UK", "EU", "JP", "CH", "IT"];
    let mut out = format!("{:>3} ", "#");
    for heading in headings {
        out.push_str(&format!("{:>7}", heading));
    }
    out.push('\n');

    for entry in table.entries() {
        out.push_str(&format!("{:>3} ", entry.id));
        for input_type in InputType::ALL {
            let value = field_value(entry, input_type.field());
            // pad by chars; codes such as "J½" are multi-byte
            let padding = 7usize.saturating_sub(value.chars().count());
            out.push_str(&" ".repeat(padding));
            out.push_str(&value);
        }
        out.push('\n');
    }
    out
}

/// Visual sizer reading followed by the matched row, if any.
pub fn format_measurement(measurement: &RingMeasurement<'_>) -> String {
    let mut out = format!(
        "Ring circle: {:.0} px\n  Diameter:      {:.2} mm\n  Circumference: {:.2} mm\n\n",
        measurement.ring_px, measurement.diameter_mm, measurement.circumference_mm
    );
    match measurement.matched {
        Some(entry) => out.push_str(&format_entry(entry)),
        None => out.push_str(&format_outcome(
            MatchOutcome::NoMatch,
            InputType::DiameterMm,
            Some(&format!("{:.2}", measurement.diameter_mm)),
        )),
    }
    out
}

/// Print a lookup result to stdout.
pub fn draw_outcome(outcome: MatchOutcome<'_>, input_type: InputType, raw: Option<&str>) {
    print!("{}", format_outcome(outcome, input_type, raw));
}

/// Print the whole chart to stdout.
pub fn draw_chart(table: &SizeTable<'_>) {
    print!("{}", format_chart(table));
}
