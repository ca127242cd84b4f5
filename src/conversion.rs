use crate::constants::Degree;

/// Split a sexagesimal string on whitespace or colons (`"22 52 23.37"`, `"22:52:23.37"`).
fn sexagesimal_parts(value: &str) -> Vec<&str> {
    value
        .split(|c: char| c.is_whitespace() || c == ':')
        .filter(|p| !p.is_empty())
        .collect()
}

/// Parse a right ascension string to degrees
///
/// Arguments
/// ---------
/// * `ra`: a string representing the right ascension in the format `HH MM SS.SS` (or `HH:MM:SS.SS`)
///
/// Returns
/// -------
/// * `Option<Degree>`: the right ascension in degrees, or `None` if the input format is invalid.
pub(crate) fn parse_ra_to_deg(ra: &str) -> Option<Degree> {
    let parts = sexagesimal_parts(ra);
    if parts.len() != 3 {
        return None;
    }

    let h: f64 = parts[0].parse().ok()?;
    let m: f64 = parts[1].parse().ok()?;
    let s: f64 = parts[2].parse().ok()?;

    Some((h + m / 60.0 + s / 3600.0) * 15.0)
}

/// Parse a declination string to degrees
///
/// Arguments
/// ---------
/// * `dec`: a string representing the declination in the format `±DD MM SS.SS` (or `±DD:MM:SS.SS`)
///
/// Returns
/// -------
/// * `Option<Degree>`: the declination in degrees, or `None` if the input format is invalid.
pub(crate) fn parse_dec_to_deg(dec: &str) -> Option<Degree> {
    let parts = sexagesimal_parts(dec);
    if parts.len() != 3 {
        return None;
    }

    let sign = if parts[0].starts_with('-') { -1.0 } else { 1.0 };
    let d: f64 = parts[0].trim_start_matches(&['-', '+'][..]).parse().ok()?;
    let m: f64 = parts[1].parse().ok()?;
    let s: f64 = parts[2].parse().ok()?;

    Some(sign * (d + m / 60.0 + s / 3600.0))
}

/// Cell contents that surveys use to say "no value".
const MISSING_MARKERS: [&str; 7] = ["", "nan", "null", "none", "na", "--", "-"];

/// `true` when the trimmed cell text is one of the usual missing-value markers.
pub(crate) fn is_missing_marker(text: &str) -> bool {
    let t = text.trim();
    MISSING_MARKERS.iter().any(|m| t.eq_ignore_ascii_case(m))
}

/// Parse a plain numeric cell.
///
/// Returns `None` for missing markers and for text that is not a number.
/// Non-finite values written out explicitly (`"inf"`) are returned as-is so the
/// caller can report them as a data-quality issue.
pub(crate) fn parse_number(text: &str) -> Option<f64> {
    if is_missing_marker(text) {
        return None;
    }
    text.trim().parse::<f64>().ok()
}

/// Parse a right ascension cell: decimal degrees first, sexagesimal hours otherwise.
pub(crate) fn parse_ra_cell(text: &str) -> Option<Degree> {
    parse_number(text).or_else(|| parse_ra_to_deg(text))
}

/// Parse a declination cell: decimal degrees first, sexagesimal degrees otherwise.
pub(crate) fn parse_dec_cell(text: &str) -> Option<Degree> {
    parse_number(text).or_else(|| parse_dec_to_deg(text))
}
