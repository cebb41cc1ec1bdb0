//! Result decoder
//!
//! Turns a finished (or failed) engine launch into an [`InvocationOutcome`].
//! Decoding is all-or-nothing: one malformed element rejects the whole set.
//!
//! Each element must carry a text, a confidence in [0, 1] and a bounding box.
//! Two spellings are understood:
//!
//! ```text
//! { "text": "TOTAL", "confidence": 0.94, "boundingBox": [[0,0],[1,0],[1,0.1],[0,0.1]] }
//! { "txt": "TOTAL", "x": 12, "y": 40, "w": 300, "h": 28, "conf": 0.94 }
//! ```
//!
//! The second form is in pixels with a top-left origin and is normalized
//! against the image's dimensions, read from the file header with the `image`
//! crate. Formats that crate cannot read (HEIC, PDF) therefore fail the pixel
//! form with `OutputParseError`, and EXIF orientation is not applied: the
//! stored width and height are used as-is.

use crate::engine::{LaunchError, LaunchOutput};
use crate::error::{Failure, FailureKind};
use crate::region::{BoundingBox, InvocationOutcome, Point, RecognizedRegion};
use serde::Deserialize;
use serde_json::Value;

/// Image width and height in pixels
pub type ImageSize = (u32, u32);

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawNumber {
    Number(f64),
    Text(String),
}

impl RawNumber {
    fn to_f64(&self) -> Option<f64> {
        match self {
            RawNumber::Number(n) => Some(*n),
            RawNumber::Text(s) => s.trim().parse().ok(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawRegion {
    #[serde(alias = "txt")]
    text: String,
    #[serde(alias = "conf")]
    confidence: RawNumber,
    #[serde(
        default,
        rename = "boundingBox",
        alias = "bounding_box",
        alias = "bbox"
    )]
    bounding_box: Option<Vec<[f64; 2]>>,
    #[serde(default)]
    x: Option<f64>,
    #[serde(default)]
    y: Option<f64>,
    #[serde(default)]
    w: Option<f64>,
    #[serde(default)]
    h: Option<f64>,
}

impl RawRegion {
    fn pixel_rect(&self) -> Option<(f64, f64, f64, f64)> {
        Some((self.x?, self.y?, self.w?, self.h?))
    }

    fn needs_image_size(&self) -> bool {
        self.bounding_box.is_none() && self.pixel_rect().is_some()
    }

    fn into_region(self, image_size: Option<ImageSize>) -> Result<RecognizedRegion, String> {
        let confidence = self
            .confidence
            .to_f64()
            .ok_or_else(|| "confidence is not a number".to_string())?;
        if !is_unit(confidence) {
            return Err(format!("confidence {} outside [0, 1]", confidence));
        }

        let bounding_box = match (&self.bounding_box, self.pixel_rect()) {
            (Some(corners), _) => normalized_box(corners)?,
            (None, Some(rect)) => {
                let size = image_size
                    .ok_or_else(|| "pixel bounding box without image size".to_string())?;
                pixel_box(rect, size)?
            }
            (None, None) => return Err("missing bounding box".to_string()),
        };

        Ok(RecognizedRegion {
            text: self.text,
            confidence,
            bounding_box,
        })
    }
}

fn is_unit(v: f64) -> bool {
    v.is_finite() && (0.0..=1.0).contains(&v)
}

fn normalized_box(corners: &[[f64; 2]]) -> Result<BoundingBox, String> {
    if corners.len() != 4 {
        return Err(format!(
            "bounding box has {} corners, expected 4",
            corners.len()
        ));
    }

    let mut points = [Point::new(0.0, 0.0); 4];
    for (point, [x, y]) in points.iter_mut().zip(corners) {
        if !is_unit(*x) || !is_unit(*y) {
            return Err(format!("corner [{}, {}] outside [0, 1]", x, y));
        }
        *point = Point::new(*x, *y);
    }

    Ok(BoundingBox { corners: points })
}

fn pixel_box(
    (x, y, w, h): (f64, f64, f64, f64),
    (width, height): ImageSize,
) -> Result<BoundingBox, String> {
    let (width, height) = (f64::from(width), f64::from(height));
    if width <= 0.0 || height <= 0.0 {
        return Err("image has zero size".to_string());
    }

    let inside = [x, y, w, h].iter().all(|v| v.is_finite() && *v >= 0.0)
        && x + w <= width
        && y + h <= height;
    if !inside {
        return Err(format!(
            "pixel box x={} y={} w={} h={} outside {}x{} image",
            x, y, w, h, width, height
        ));
    }

    Ok(BoundingBox::from_rect(
        x / width,
        y / height,
        w / width,
        h / height,
    ))
}

/// Decode the engine's standard output into regions.
///
/// `image_size` is consulted at most once, and only when an element uses the
/// pixel rectangle form.
pub fn decode_regions<F>(stdout: &str, image_size: F) -> Result<Vec<RecognizedRegion>, Failure>
where
    F: FnOnce() -> Result<ImageSize, String>,
{
    let parse_error = |detail: String| Failure::new(FailureKind::OutputParseError, detail);

    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Err(parse_error("engine produced no output".to_string()));
    }

    let elements: Vec<Value> = serde_json::from_str(trimmed)
        .map_err(|e| parse_error(format!("expected a JSON array of regions: {}", e)))?;

    let raw = elements
        .into_iter()
        .enumerate()
        .map(|(i, value)| {
            RawRegion::deserialize(value).map_err(|e| parse_error(format!("element {}: {}", i, e)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let size = if raw.iter().any(RawRegion::needs_image_size) {
        Some(image_size().map_err(|e| parse_error(format!("cannot read image size: {}", e)))?)
    } else {
        None
    };

    raw.into_iter()
        .enumerate()
        .map(|(i, r)| {
            r.into_region(size)
                .map_err(|e| parse_error(format!("element {}: {}", i, e)))
        })
        .collect()
}

/// Engine stdout as text; JSON must be UTF-8, so invalid bytes fail the set
pub fn stdout_text(stdout: &[u8]) -> Result<&str, Failure> {
    std::str::from_utf8(stdout).map_err(|e| {
        Failure::new(
            FailureKind::OutputParseError,
            format!("engine output is not UTF-8 at byte {}", e.valid_up_to()),
        )
    })
}

/// Diagnostic for an engine that exited unsuccessfully
fn runtime_detail(output: &LaunchOutput) -> String {
    let stderr = output.stderr.trim();
    if !stderr.is_empty() {
        return stderr.to_string();
    }
    match output.exit_code {
        Some(code) => format!("exit status {}", code),
        None => "terminated by signal".to_string(),
    }
}

/// Fail on launch errors and non-zero exits, otherwise hand the output on
pub fn check_launch(launched: Result<LaunchOutput, LaunchError>) -> Result<LaunchOutput, Failure> {
    match launched {
        Err(e @ LaunchError::Spawn { .. }) => {
            Err(Failure::new(FailureKind::LaunchError, e.to_string()))
        }
        Err(e @ LaunchError::TimedOut(_)) => {
            Err(Failure::new(FailureKind::TimeoutError, e.to_string()))
        }
        Err(e @ LaunchError::Io(_)) => {
            Err(Failure::new(FailureKind::EngineRuntimeError, e.to_string()))
        }
        Ok(output) if !output.succeeded() => Err(Failure::new(
            FailureKind::EngineRuntimeError,
            runtime_detail(&output),
        )),
        Ok(output) => Ok(output),
    }
}

/// Classify one launch into an outcome
pub fn decode<F>(launched: Result<LaunchOutput, LaunchError>, image_size: F) -> InvocationOutcome
where
    F: FnOnce() -> Result<ImageSize, String>,
{
    check_launch(launched)
        .and_then(|output| decode_regions(stdout_text(&output.stdout)?, image_size))
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::time::Duration;

    fn no_size() -> Result<ImageSize, String> {
        Err("not consulted".to_string())
    }

    fn parse_kind(stdout: &str) -> FailureKind {
        decode_regions(stdout, no_size).unwrap_err().kind
    }

    #[test]
    fn test_receipt_region() {
        let stdout = r#"[{"text":"TOTAL $12.00","confidence":0.94,
            "boundingBox":[[0,0],[1,0],[1,0.1],[0,0.1]]}]"#;
        let regions = decode_regions(stdout, no_size).unwrap();

        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].text, "TOTAL $12.00");
        assert_eq!(regions[0].confidence, 0.94);
        assert_eq!(regions[0].bounding_box.corners[2], Point::new(1.0, 0.1));
    }

    #[test]
    fn test_empty_array_is_success() {
        assert_eq!(decode_regions("[]\n", no_size).unwrap(), Vec::new());
    }

    #[test]
    fn test_emission_order_is_kept() {
        let stdout = r#"[
            {"text":"zeta","confidence":0.1,"boundingBox":[[0,0.9],[1,0.9],[1,1],[0,1]]},
            {"text":"alpha","confidence":0.9,"boundingBox":[[0,0],[1,0],[1,0.1],[0,0.1]]},
            {"text":"mid","confidence":0.5,"boundingBox":[[0,0.5],[1,0.5],[1,0.6],[0,0.6]]}
        ]"#;
        let texts: Vec<String> = decode_regions(stdout, no_size)
            .unwrap()
            .into_iter()
            .map(|r| r.text)
            .collect();
        assert_eq!(texts, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_empty_and_whitespace_output_fail() {
        assert_eq!(parse_kind(""), FailureKind::OutputParseError);
        assert_eq!(parse_kind("  \n"), FailureKind::OutputParseError);
    }

    #[test]
    fn test_confidence_out_of_range_rejects_everything() {
        let stdout = r#"[
            {"text":"ok","confidence":0.5,"boundingBox":[[0,0],[1,0],[1,1],[0,1]]},
            {"text":"bad","confidence":1.2,"boundingBox":[[0,0],[1,0],[1,1],[0,1]]}
        ]"#;
        let failure = decode_regions(stdout, no_size).unwrap_err();
        assert_eq!(failure.kind, FailureKind::OutputParseError);
        assert!(failure.detail.contains("element 1"), "{}", failure.detail);
    }

    #[test]
    fn test_confidence_bounds_are_inclusive() {
        for confidence in ["0", "0.0", "1", "1.0"] {
            let stdout = format!(
                r#"[{{"text":"a","confidence":{},"boundingBox":[[0,0],[1,0],[1,1],[0,1]]}}]"#,
                confidence
            );
            let regions = decode_regions(&stdout, no_size).unwrap();
            assert_eq!(regions[0].confidence, confidence.parse::<f64>().unwrap());
        }
    }

    #[test]
    fn test_confidence_just_outside_bounds_fails() {
        for confidence in ["1.0000001", "-0.0000001"] {
            let stdout = format!(
                r#"[{{"text":"a","confidence":{},"boundingBox":[[0,0],[1,0],[1,1],[0,1]]}}]"#,
                confidence
            );
            assert_eq!(parse_kind(&stdout), FailureKind::OutputParseError, "{}", confidence);
        }
    }

    #[test]
    fn test_corners_on_the_edges_are_accepted() {
        let stdout = r#"[{"text":"a","confidence":0.5,"boundingBox":[[0.0,0.0],[1.0,0.0],[1.0,1.0],[0.0,1.0]]}]"#;
        let regions = decode_regions(stdout, no_size).unwrap();
        assert_eq!(regions[0].bounding_box, BoundingBox::from_rect(0.0, 0.0, 1.0, 1.0));

        let stdout = r#"[{"text":"a","confidence":0.5,"boundingBox":[[0,0],[1.0000001,0],[1,1],[0,1]]}]"#;
        assert_eq!(parse_kind(stdout), FailureKind::OutputParseError);
    }

    #[test]
    fn test_invalid_utf8_output_fails() {
        let mut stdout = br#"[{"text":"TOT"#.to_vec();
        stdout.push(0xff);
        stdout.extend_from_slice(br#"AL","confidence":0.9,"boundingBox":[[0,0],[1,0],[1,1],[0,1]]}]"#);

        let outcome = decode(Ok(LaunchOutput::success(stdout)), no_size);
        let failure = outcome.failure().expect("failure");
        assert_eq!(failure.kind, FailureKind::OutputParseError);
        assert!(failure.detail.contains("byte 13"), "{}", failure.detail);
    }

    #[test]
    fn test_negative_confidence_fails() {
        let stdout = r#"[{"text":"a","confidence":-0.01,"boundingBox":[[0,0],[1,0],[1,1],[0,1]]}]"#;
        assert_eq!(parse_kind(stdout), FailureKind::OutputParseError);
    }

    #[test]
    fn test_confidence_string_is_coerced() {
        let stdout = r#"[{"text":"a","confidence":" 0.75 ","boundingBox":[[0,0],[1,0],[1,1],[0,1]]}]"#;
        let regions = decode_regions(stdout, no_size).unwrap();
        assert_eq!(regions[0].confidence, 0.75);

        let stdout = r#"[{"text":"a","confidence":"high","boundingBox":[[0,0],[1,0],[1,1],[0,1]]}]"#;
        assert_eq!(parse_kind(stdout), FailureKind::OutputParseError);
    }

    #[test]
    fn test_missing_or_null_fields_fail() {
        for stdout in [
            r#"[{"confidence":0.5,"boundingBox":[[0,0],[1,0],[1,1],[0,1]]}]"#,
            r#"[{"text":null,"confidence":0.5,"boundingBox":[[0,0],[1,0],[1,1],[0,1]]}]"#,
            r#"[{"text":"a","boundingBox":[[0,0],[1,0],[1,1],[0,1]]}]"#,
            r#"[{"text":"a","confidence":0.5}]"#,
        ] {
            assert_eq!(parse_kind(stdout), FailureKind::OutputParseError, "{}", stdout);
        }
    }

    #[test]
    fn test_malformed_boxes_fail() {
        for stdout in [
            r#"[{"text":"a","confidence":0.5,"boundingBox":[[0,0],[1,0],[1,1]]}]"#,
            r#"[{"text":"a","confidence":0.5,"boundingBox":[[0,0],[1,0],[1,1],[0,1.5]]}]"#,
            r#"[{"text":"a","confidence":0.5,"boundingBox":[[0,0,0],[1,0],[1,1],[0,1]]}]"#,
        ] {
            assert_eq!(parse_kind(stdout), FailureKind::OutputParseError, "{}", stdout);
        }
    }

    #[test]
    fn test_non_array_documents_fail() {
        assert_eq!(parse_kind(r#"{"text":"a"}"#), FailureKind::OutputParseError);
        assert_eq!(parse_kind("TOTAL $12.00"), FailureKind::OutputParseError);
        assert_eq!(parse_kind("[1, 2]"), FailureKind::OutputParseError);
        assert_eq!(parse_kind(r#"[{"text":"a","#), FailureKind::OutputParseError);
    }

    #[test]
    fn test_pixel_rectangle_is_normalized() {
        let stdout = r#"[
          { "txt" : "Hello",
            "x" : 100, "y" : 50, "w" : 200, "h" : 25, "conf" : 0.5 }
        ]"#;
        let regions = decode_regions(stdout, || Ok((400, 100))).unwrap();

        assert_eq!(regions[0].text, "Hello");
        assert_eq!(regions[0].bounding_box, BoundingBox::from_rect(0.25, 0.5, 0.5, 0.25));
    }

    #[test]
    fn test_pixel_rectangle_outside_image_fails() {
        let stdout = r#"[{"txt":"a","x":300,"y":0,"w":200,"h":10,"conf":0.5}]"#;
        let failure = decode_regions(stdout, || Ok((400, 100))).unwrap_err();
        assert_eq!(failure.kind, FailureKind::OutputParseError);
    }

    #[test]
    fn test_unreadable_image_size_fails_pixel_form() {
        let stdout = r#"[{"txt":"a","x":0,"y":0,"w":1,"h":1,"conf":0.5}]"#;
        let failure = decode_regions(stdout, || Err("no such file".to_string())).unwrap_err();
        assert_eq!(failure.kind, FailureKind::OutputParseError);
        assert!(failure.detail.contains("no such file"));
    }

    #[test]
    fn test_image_size_not_read_for_normalized_boxes() {
        let stdout = r#"[{"text":"a","confidence":0.5,"boundingBox":[[0,0],[1,0],[1,1],[0,1]]}]"#;
        let regions = decode_regions(stdout, || panic!("image size read")).unwrap();
        assert_eq!(regions.len(), 1);
    }

    #[test]
    fn test_nonzero_exit_uses_stderr() {
        let outcome = decode(
            Ok(LaunchOutput::exited(1, "", "image unreadable\n")),
            no_size,
        );
        assert_eq!(
            outcome,
            InvocationOutcome::Failure(Failure::new(
                FailureKind::EngineRuntimeError,
                "image unreadable"
            ))
        );
    }

    #[test]
    fn test_nonzero_exit_without_stderr_reports_status() {
        let outcome = decode(Ok(LaunchOutput::exited(2, "[]", "")), no_size);
        let failure = outcome.failure().unwrap();
        assert_eq!(failure.kind, FailureKind::EngineRuntimeError);
        assert_eq!(failure.detail, "exit status 2");

        let killed = LaunchOutput {
            exit_code: None,
            ..Default::default()
        };
        let outcome = decode(Ok(killed), no_size);
        assert_eq!(outcome.failure().unwrap().detail, "terminated by signal");
    }

    #[test]
    fn test_launch_errors_are_classified() {
        let spawn = LaunchError::Spawn {
            program: "macocr".to_string(),
            source: io::Error::from(io::ErrorKind::PermissionDenied),
        };
        assert_eq!(
            decode(Err(spawn), no_size).failure().map(|f| f.kind),
            Some(FailureKind::LaunchError)
        );

        let timed_out = LaunchError::TimedOut(Duration::from_secs(5));
        assert_eq!(
            decode(Err(timed_out), no_size).failure().map(|f| f.kind),
            Some(FailureKind::TimeoutError)
        );
    }
}
