//! InfluxDB line-protocol encoding.
//!
//! Only the subset needed for the two measurements is implemented:
//! measurement, tag set, field set, no explicit timestamp (the server
//! assigns the receive time).

use crate::stats::FieldValue;

/// Encode one point. `fields` must not be empty.
pub fn encode_point(
    measurement: &str,
    tags: &[(&str, &str)],
    fields: &[(String, FieldValue)],
) -> String {
    let mut line = escape_measurement(measurement);

    for (key, value) in tags {
        line.push(',');
        line.push_str(&escape_tag(key));
        line.push('=');
        line.push_str(&escape_tag(value));
    }

    line.push(' ');
    let rendered: Vec<String> = fields
        .iter()
        .map(|(key, value)| format!("{}={}", escape_tag(key), format_field(value)))
        .collect();
    line.push_str(&rendered.join(","));

    line
}

/// Measurement names escape commas and spaces.
fn escape_measurement(name: &str) -> String {
    name.replace(',', "\\,").replace(' ', "\\ ")
}

/// Tag keys, tag values and field keys escape commas, equals signs and
/// spaces.
fn escape_tag(value: &str) -> String {
    value
        .replace(',', "\\,")
        .replace('=', "\\=")
        .replace(' ', "\\ ")
}

/// String field values escape backslashes and double quotes.
fn escape_field_text(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Render a field value with its type marker: integers carry the `i`
/// suffix, floats are unsuffixed, strings are quoted.
fn format_field(value: &FieldValue) -> String {
    match value {
        FieldValue::Integer(n) => format!("{n}i"),
        FieldValue::Float(f) => format!("{f}"),
        FieldValue::Boolean(b) => b.to_string(),
        FieldValue::Text(s) => format!("\"{}\"", escape_field_text(s)),
    }
}
