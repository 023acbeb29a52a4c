//! Recorded gesture files.
//!
//! Two formats are accepted: a JSON array of `[x, y, z]` triples, or CSV with
//! one `x,y,z` sample per line. Blank lines and `#` comments are skipped in
//! CSV, and a first line that does not parse as numbers is taken as a header.

use std::path::Path;

use mg_common::{Error, Gesture, Result, Sample};

/// Load a gesture from `path`. `.json` files are parsed as JSON, anything
/// else as CSV.
pub fn load_gesture(path: &Path) -> Result<Gesture> {
    let text = std::fs::read_to_string(path)?;
    let is_json = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if is_json {
        parse_json_gesture(&text)
    } else {
        parse_csv_gesture(&text)
    }
}

pub fn parse_json_gesture(text: &str) -> Result<Gesture> {
    let samples: Vec<Sample> = serde_json::from_str(text)?;
    check_samples(&samples)?;
    Ok(Gesture::from_samples(samples))
}

pub fn parse_csv_gesture(text: &str) -> Result<Gesture> {
    let mut samples = Vec::new();
    let mut seen_first_line = false;
    for (lineno, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match parse_csv_line(line) {
            Some(sample) => samples.push(sample),
            None if !seen_first_line => {}
            None => {
                return Err(Error::InvalidInput(format!(
                    "line {}: expected three comma-separated numbers, got {:?}",
                    lineno + 1,
                    line
                )))
            }
        }
        seen_first_line = true;
    }
    check_samples(&samples)?;
    Ok(Gesture::from_samples(samples))
}

fn parse_csv_line(line: &str) -> Option<Sample> {
    let mut fields = line.split(',').map(|f| f.trim().parse::<f64>());
    let x = fields.next()?.ok()?;
    let y = fields.next()?.ok()?;
    let z = fields.next()?.ok()?;
    if fields.next().is_some() {
        return None;
    }
    Some(Sample::new(x, y, z))
}

fn check_samples(samples: &[Sample]) -> Result<()> {
    if samples.is_empty() {
        return Err(Error::EmptyGesture);
    }
    if let Some(index) = samples.iter().position(|s| !s.is_finite()) {
        return Err(Error::InvalidSample {
            index,
            reason: "component is NaN or infinite".to_string(),
        });
    }
    Ok(())
}
