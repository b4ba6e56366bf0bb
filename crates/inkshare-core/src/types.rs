use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Longest colour string accepted on a stroke.
pub const MAX_COLOR_LEN: usize = 64;

/// Client-chosen stroke identifier.
pub type StrokeId = String;

/// A position in the client's screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// One pen-down-to-pen-up drawing action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrokeOperation {
    pub id: StrokeId,
    pub color: String,
    /// Browsers send the width slider's value verbatim, so `"3"` is as valid as `3`.
    #[serde(deserialize_with = "deserialize_width")]
    pub width: f64,
    pub points: Vec<Point>,
}

impl StrokeOperation {
    /// Check the invariants a stroke must hold before it enters the log.
    pub fn validate(&self) -> Result<(), StrokeError> {
        if self.points.is_empty() {
            return Err(StrokeError::EmptyPoints);
        }
        if !self.width.is_finite() || self.width <= 0.0 {
            return Err(StrokeError::InvalidWidth(self.width));
        }
        if self.color.trim().is_empty() || self.color.len() > MAX_COLOR_LEN {
            return Err(StrokeError::InvalidColor);
        }
        Ok(())
    }
}

/// Last known pointer position of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cursor {
    pub x: f64,
    pub y: f64,
    pub color: String,
}

/// Why a stroke was refused by the log.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StrokeError {
    #[error("stroke id '{0}' is already live")]
    DuplicateId(StrokeId),

    #[error("stroke has no points")]
    EmptyPoints,

    #[error("stroke width {0} is not a positive number")]
    InvalidWidth(f64),

    #[error("stroke color must be 1..={MAX_COLOR_LEN} bytes")]
    InvalidColor,

    #[error("operation log is full ({0} operations)")]
    LogFull(usize),
}

impl StrokeError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::DuplicateId(_) => "duplicate_id",
            Self::EmptyPoints => "empty_points",
            Self::InvalidWidth(_) => "invalid_width",
            Self::InvalidColor => "invalid_color",
            Self::LogFull(_) => "log_full",
        }
    }
}

fn deserialize_width<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Width {
        Number(f64),
        Text(String),
    }

    match Width::deserialize(deserializer)? {
        Width::Number(n) => Ok(n),
        Width::Text(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|e| serde::de::Error::custom(format!("invalid width '{s}': {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stroke(width: f64, points: Vec<Point>) -> StrokeOperation {
        StrokeOperation {
            id: "s1".into(),
            color: "#000".into(),
            width,
            points,
        }
    }

    #[test]
    fn test_width_accepts_number_and_string() {
        let a: StrokeOperation = serde_json::from_str(
            r##"{"id":"a","color":"#111","width":3,"points":[{"x":1,"y":2}]}"##,
        )
        .unwrap();
        let b: StrokeOperation = serde_json::from_str(
            r##"{"id":"b","color":"#111","width":"3","points":[{"x":1,"y":2}]}"##,
        )
        .unwrap();
        assert_eq!(a.width, 3.0);
        assert_eq!(b.width, 3.0);
    }

    #[test]
    fn test_width_rejects_garbage_string() {
        let result = serde_json::from_str::<StrokeOperation>(
            r##"{"id":"a","color":"#111","width":"thick","points":[]}"##,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_validate() {
        assert!(stroke(3.0, vec![Point::new(0.0, 0.0)]).validate().is_ok());
        assert_eq!(stroke(3.0, vec![]).validate(), Err(StrokeError::EmptyPoints));
        assert_eq!(
            stroke(0.0, vec![Point::new(0.0, 0.0)]).validate(),
            Err(StrokeError::InvalidWidth(0.0))
        );

        let mut blank = stroke(1.0, vec![Point::new(0.0, 0.0)]);
        blank.color = "  ".into();
        assert_eq!(blank.validate(), Err(StrokeError::InvalidColor));
    }
}
