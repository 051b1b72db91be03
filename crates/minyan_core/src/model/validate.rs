//! Pure validation rules for broadcast fields and queries.
//!
//! # Responsibility
//! - Check coordinate ranges, minyan type membership and time windows.
//! - Produce one typed error shape for every boundary rejection.
//!
//! # Invariants
//! - Functions here have no side effects and never touch storage.
//! - NaN coordinates and radii are always rejected.

use crate::model::broadcast::MinyanType;
use chrono::{DateTime, Datelike, Utc};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::ops::RangeInclusive;

/// Valid latitude domain in degrees.
pub const LATITUDE_RANGE: RangeInclusive<f64> = -90.0..=90.0;
/// Valid longitude domain in degrees.
pub const LONGITUDE_RANGE: RangeInclusive<f64> = -180.0..=180.0;
/// Years representable as four-digit RFC 3339 text, whose lexical order is
/// chronological.
pub const YEAR_RANGE: RangeInclusive<i32> = 0..=9999;

/// Input rejected before it reaches storage.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    LatitudeOutOfRange(f64),
    LongitudeOutOfRange(f64),
    UnknownMinyanType(String),
    /// `earliestTime` is later than `latestTime`.
    InvertedWindow {
        earliest: DateTime<Utc>,
        latest: DateTime<Utc>,
    },
    /// Timestamp year falls outside [`YEAR_RANGE`].
    TimeOutOfRange {
        field: &'static str,
        value: DateTime<Utc>,
    },
    /// Radius is negative or not a finite number.
    InvalidRadius(f64),
    /// Required wire field is absent.
    MissingField(&'static str),
    /// Wire field is present but cannot be interpreted.
    InvalidField {
        field: &'static str,
        message: String,
    },
    /// Request body does not decode into the expected shape.
    InvalidBody(String),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LatitudeOutOfRange(value) => {
                write!(f, "latitude must be between -90 and 90, got {value}")
            }
            Self::LongitudeOutOfRange(value) => {
                write!(f, "longitude must be between -180 and 180, got {value}")
            }
            Self::UnknownMinyanType(value) => write!(
                f,
                "minyanType must be one of shacharit, mincha, maariv, got `{value}`"
            ),
            Self::InvertedWindow { earliest, latest } => write!(
                f,
                "earliestTime {} must not be later than latestTime {}",
                earliest.to_rfc3339(),
                latest.to_rfc3339()
            ),
            Self::TimeOutOfRange { field, value } => write!(
                f,
                "{field} must fall within years 0000 to 9999, got year {}",
                value.year()
            ),
            Self::InvalidRadius(value) => {
                write!(f, "radius must be a non-negative number of miles, got {value}")
            }
            Self::MissingField(field) => write!(f, "missing required field: {field}"),
            Self::InvalidField { field, message } => write!(f, "invalid {field}: {message}"),
            Self::InvalidBody(message) => write!(f, "invalid request body: {message}"),
        }
    }
}

impl Error for ValidationError {}

/// Rejects latitudes outside `[-90, 90]`.
pub fn validate_latitude(latitude: f64) -> Result<(), ValidationError> {
    if LATITUDE_RANGE.contains(&latitude) {
        Ok(())
    } else {
        Err(ValidationError::LatitudeOutOfRange(latitude))
    }
}

/// Rejects longitudes outside `[-180, 180]`.
pub fn validate_longitude(longitude: f64) -> Result<(), ValidationError> {
    if LONGITUDE_RANGE.contains(&longitude) {
        Ok(())
    } else {
        Err(ValidationError::LongitudeOutOfRange(longitude))
    }
}

/// Rejects a coordinate pair when either component is out of range.
///
/// Latitude is checked first, so a pair that is wrong on both axes reports
/// the latitude.
pub fn validate_coordinates(latitude: f64, longitude: f64) -> Result<(), ValidationError> {
    validate_latitude(latitude)?;
    validate_longitude(longitude)
}

/// Parses a wire minyan type name into the closed enum.
///
/// Matching is exact on the lowercase names; `"Mincha"` is rejected.
pub fn validate_type(value: &str) -> Result<MinyanType, ValidationError> {
    match value {
        "shacharit" => Ok(MinyanType::Shacharit),
        "mincha" => Ok(MinyanType::Mincha),
        "maariv" => Ok(MinyanType::Maariv),
        other => Err(ValidationError::UnknownMinyanType(other.to_string())),
    }
}

/// Rejects timestamps outside [`YEAR_RANGE`].
pub fn validate_time(field: &'static str, value: &DateTime<Utc>) -> Result<(), ValidationError> {
    if YEAR_RANGE.contains(&value.year()) {
        Ok(())
    } else {
        Err(ValidationError::TimeOutOfRange {
            field,
            value: *value,
        })
    }
}

/// Rejects windows whose start is after their end, or whose bounds fall
/// outside [`YEAR_RANGE`]. Equal bounds are allowed.
pub fn validate_window(
    earliest: &DateTime<Utc>,
    latest: &DateTime<Utc>,
) -> Result<(), ValidationError> {
    validate_time("earliestTime", earliest)?;
    validate_time("latestTime", latest)?;
    if earliest > latest {
        return Err(ValidationError::InvertedWindow {
            earliest: *earliest,
            latest: *latest,
        });
    }
    Ok(())
}

/// Rejects negative, NaN and infinite search radii.
pub fn validate_radius(radius_miles: f64) -> Result<(), ValidationError> {
    if radius_miles.is_finite() && radius_miles >= 0.0 {
        Ok(())
    } else {
        Err(ValidationError::InvalidRadius(radius_miles))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn coordinates_accept_closed_bounds() {
        validate_coordinates(90.0, 180.0).expect("upper bounds are inclusive");
        validate_coordinates(-90.0, -180.0).expect("lower bounds are inclusive");
    }

    #[test]
    fn coordinates_reject_out_of_range_and_nan() {
        assert_eq!(
            validate_coordinates(91.0, 0.0),
            Err(ValidationError::LatitudeOutOfRange(91.0))
        );
        assert_eq!(
            validate_coordinates(0.0, 181.0),
            Err(ValidationError::LongitudeOutOfRange(181.0))
        );
        assert!(validate_coordinates(f64::NAN, 0.0).is_err());
        assert!(validate_coordinates(0.0, f64::NAN).is_err());
    }

    #[test]
    fn type_is_case_sensitive() {
        assert_eq!(validate_type("maariv"), Ok(MinyanType::Maariv));
        assert_eq!(
            validate_type("Mincha"),
            Err(ValidationError::UnknownMinyanType("Mincha".to_string()))
        );
        assert!(validate_type("foo").is_err());
    }

    #[test]
    fn window_allows_equal_bounds_and_rejects_inversion() {
        let one = Utc.with_ymd_and_hms(2025, 3, 26, 13, 0, 0).unwrap();
        let two = Utc.with_ymd_and_hms(2025, 3, 26, 14, 0, 0).unwrap();

        validate_window(&one, &one).expect("equal bounds are a valid window");
        validate_window(&one, &two).expect("ordered window is valid");
        let err = validate_window(&two, &one).expect_err("inverted window must fail");
        assert!(err.to_string().contains("must not be later"));
    }

    #[test]
    fn window_rejects_years_without_four_digit_text() {
        let last = Utc.with_ymd_and_hms(9999, 12, 31, 0, 0, 0).unwrap();
        let beyond = Utc.with_ymd_and_hms(10000, 1, 1, 0, 0, 0).unwrap();
        let negative = Utc.with_ymd_and_hms(-2, 1, 1, 0, 0, 0).unwrap();
        let first = Utc.with_ymd_and_hms(0, 1, 1, 0, 0, 0).unwrap();

        validate_window(&first, &last).expect("years 0000 and 9999 are representable");
        assert!(matches!(
            validate_window(&last, &beyond),
            Err(ValidationError::TimeOutOfRange {
                field: "latestTime",
                ..
            })
        ));
        assert!(matches!(
            validate_window(&negative, &first),
            Err(ValidationError::TimeOutOfRange {
                field: "earliestTime",
                ..
            })
        ));
    }

    #[test]
    fn radius_rejects_negative_and_non_finite() {
        validate_radius(0.0).expect("zero radius is valid");
        assert!(validate_radius(-0.5).is_err());
        assert!(validate_radius(f64::NAN).is_err());
        assert!(validate_radius(f64::INFINITY).is_err());
    }
}
