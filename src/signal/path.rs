use miette::Diagnostic;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const SEPARATOR: char = '.';

#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
#[error("Malformed signal path `{path}`: {reason}")]
#[diagnostic(
    code(vss::signal::malformed_path),
    help("Signal paths are non-empty segments joined by `.`, e.g. Vehicle.Drivetrain.Transmission.Gear")
)]
pub struct MalformedPathError {
    pub path: String,
    pub reason: &'static str,
}

/// Dot-delimited path identifying one node of the signal tree,
/// e.g. `Vehicle.Drivetrain.Transmission.Gear`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SignalPath {
    segments: Vec<String>,
}

impl SignalPath {
    pub fn parse(s: &str) -> Result<Self, MalformedPathError> {
        if s.is_empty() {
            return Err(MalformedPathError {
                path: s.to_string(),
                reason: "path is empty",
            });
        }
        let segments: Vec<String> = s.split(SEPARATOR).map(str::to_string).collect();
        if segments.iter().any(String::is_empty) {
            return Err(MalformedPathError {
                path: s.to_string(),
                reason: "path contains an empty segment",
            });
        }
        Ok(Self { segments })
    }

    /// Build a path from already split segments.
    pub fn from_segments<I, S>(segments: I) -> Result<Self, MalformedPathError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() {
            return Err(MalformedPathError {
                path: String::new(),
                reason: "path is empty",
            });
        }
        if segments
            .iter()
            .any(|s| s.is_empty() || s.contains(SEPARATOR))
        {
            return Err(MalformedPathError {
                path: segments.join("."),
                reason: "path contains an empty segment",
            });
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Last segment, the name of the leaf itself.
    pub fn name(&self) -> &str {
        // parse/from_segments never produce an empty path
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Path with `segment` appended.
    pub fn child(&self, segment: &str) -> Result<Self, MalformedPathError> {
        let mut segments = self.segments.clone();
        segments.push(segment.to_string());
        Self::from_segments(segments)
    }
}

impl fmt::Display for SignalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

impl FromStr for SignalPath {
    type Err = MalformedPathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_path() {
        let p = SignalPath::parse("Vehicle.Drivetrain.Transmission.Gear").unwrap();
        assert_eq!(
            p.segments(),
            &["Vehicle", "Drivetrain", "Transmission", "Gear"]
        );
        assert_eq!(p.name(), "Gear");
        assert_eq!(p.to_string(), "Vehicle.Drivetrain.Transmission.Gear");
    }

    #[test]
    fn test_parse_single_segment() {
        let p: SignalPath = "Vehicle".parse().unwrap();
        assert_eq!(p.len(), 1);
    }

    #[test]
    fn test_parse_rejects_empty_segments() {
        assert!(SignalPath::parse("").is_err());
        assert!(SignalPath::parse("Vehicle..Gear").is_err());
        assert!(SignalPath::parse(".Vehicle").is_err());
        assert!(SignalPath::parse("Vehicle.").is_err());

        let err = SignalPath::parse("A..B").unwrap_err();
        assert_eq!(err.path, "A..B");
    }

    #[test]
    fn test_from_segments_rejects_embedded_separator() {
        assert!(SignalPath::from_segments(["Vehicle", "Drive.train"]).is_err());
        assert!(SignalPath::from_segments(Vec::<String>::new()).is_err());
    }

    #[test]
    fn test_child() {
        let p = SignalPath::parse("Vehicle").unwrap();
        let c = p.child("Speed").unwrap();
        assert_eq!(c.to_string(), "Vehicle.Speed");
        assert!(p.child("").is_err());
    }
}
