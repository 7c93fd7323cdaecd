//! # Validation Module
//!
//! Input validation for jobs, itineraries, materials, tips and reviews.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: SPA / admin tooling                                          │
//! │  └── Basic format checks, immediate feedback                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Engine services (Rust)                                       │
//! │  ├── Type validation (deserialization)                                 │
//! │  └── THIS MODULE: shape and range rules                                │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK constraints on statuses and ranges                          │
//! │  └── UNIQUE (job_id, sequence), UNIQUE request_number                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every error names the offending field (`stops[2].location.latitude`) so
//! callers can point at it.

use std::collections::HashSet;

use crate::error::ValidationError;
use crate::types::{GeoPoint, MaterialRequest, MoverRating, NewJob, ReviewInput, Stop, StopRole};
use crate::{MAX_CREW_SIZE, REQUEST_NUMBER_LENGTH, REQUEST_NUMBER_PREFIX};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest accepted free-text address.
const MAX_ADDRESS_LENGTH: usize = 500;

/// Longest accepted review text.
const MAX_REVIEW_LENGTH: usize = 2000;

// =============================================================================
// Identifiers
// =============================================================================

/// Validates a human-readable request number.
///
/// ## Rules
/// - Format `REQ-XXXXXXXX`
/// - Suffix is exactly 8 upper-case ASCII letters or digits
///
/// ## Example
/// ```rust
/// use moowwee_core::validation::validate_request_number;
///
/// assert!(validate_request_number("REQ-7GQ2K9XA").is_ok());
/// assert!(validate_request_number("REQ-7gq2k9xa").is_err());
/// assert!(validate_request_number("7GQ2K9XA").is_err());
/// ```
pub fn validate_request_number(number: &str) -> ValidationResult<()> {
    let invalid = |reason: &str| ValidationError::InvalidFormat {
        field: "request_number".to_string(),
        reason: reason.to_string(),
    };

    let suffix = number
        .strip_prefix(REQUEST_NUMBER_PREFIX)
        .and_then(|rest| rest.strip_prefix('-'))
        .ok_or_else(|| invalid("must start with REQ-"))?;

    if suffix.len() != REQUEST_NUMBER_LENGTH {
        return Err(invalid("suffix must be 8 characters"));
    }

    if !suffix
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
    {
        return Err(invalid("suffix must be upper-case letters and digits"));
    }

    Ok(())
}

// =============================================================================
// Geography
// =============================================================================

/// Validates a coordinate pair.
///
/// Latitude must be within [-90, 90], longitude within [-180, 180]. NaN and
/// infinities are rejected.
pub fn validate_coordinate(point: &GeoPoint, field: &str) -> ValidationResult<()> {
    check_component(point.latitude, format!("{}.latitude", field), 90.0)?;
    check_component(point.longitude, format!("{}.longitude", field), 180.0)
}

fn check_component(value: f64, field: String, bound: f64) -> ValidationResult<()> {
    if !value.is_finite() || !(-bound..=bound).contains(&value) {
        return Err(ValidationError::CoordinateOutOfRange {
            field,
            value,
            min: -bound,
            max: bound,
        });
    }
    Ok(())
}

/// Validates a full itinerary.
///
/// ## Rules
/// - At least 2 stops
/// - Sequences unique, zero-based and strictly increasing in list order
/// - Exactly one `loading` and exactly one `unloading` stop
/// - Every coordinate in range, every address non-empty
pub fn validate_stops(stops: &[Stop]) -> ValidationResult<()> {
    if stops.len() < 2 {
        return Err(ValidationError::TooFew {
            field: "stops".to_string(),
            min: 2,
        });
    }

    let mut seen = HashSet::new();
    for (i, stop) in stops.iter().enumerate() {
        let field = format!("stops[{}]", i);

        if !seen.insert(stop.sequence) {
            return Err(ValidationError::Duplicate {
                field: format!("{}.sequence", field),
                value: stop.sequence.to_string(),
            });
        }

        validate_coordinate(&stop.location, &format!("{}.location", field))?;
        validate_address(&stop.address, &format!("{}.address", field))?;
    }

    if stops.first().map(|s| s.sequence) != Some(0) {
        return Err(ValidationError::invalid(
            "stops[0].sequence",
            "sequence must start at 0",
        ));
    }

    if let Some(i) = stops
        .windows(2)
        .position(|pair| pair[1].sequence <= pair[0].sequence)
    {
        return Err(ValidationError::invalid(
            format!("stops[{}].sequence", i + 1),
            "sequence must be strictly increasing",
        ));
    }

    for role in [StopRole::Loading, StopRole::Unloading] {
        let count = stops.iter().filter(|s| s.role == role).count();
        if count != 1 {
            return Err(ValidationError::invalid(
                "stops",
                format!(
                    "exactly one {} stop is required, found {}",
                    role_name(role),
                    count
                ),
            ));
        }
    }

    Ok(())
}

fn role_name(role: StopRole) -> &'static str {
    match role {
        StopRole::Loading => "loading",
        StopRole::Intermediate => "intermediate",
        StopRole::Unloading => "unloading",
    }
}

/// Validates a free-text address.
pub fn validate_address(address: &str, field: &str) -> ValidationResult<()> {
    let address = address.trim();

    if address.is_empty() {
        return Err(ValidationError::required(field));
    }

    if address.chars().count() > MAX_ADDRESS_LENGTH {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_ADDRESS_LENGTH,
        });
    }

    Ok(())
}

// =============================================================================
// Job Attributes
// =============================================================================

/// Validates crew size.
///
/// ## Rules
/// - Must be positive
/// - Must not exceed MAX_CREW_SIZE (20)
pub fn validate_crew_size(crew_size: u32) -> ValidationResult<()> {
    if crew_size == 0 {
        return Err(ValidationError::MustBePositive {
            field: "crew_size".to_string(),
        });
    }

    if crew_size > MAX_CREW_SIZE {
        return Err(ValidationError::OutOfRange {
            field: "crew_size".to_string(),
            min: 1,
            max: MAX_CREW_SIZE as i64,
        });
    }

    Ok(())
}

/// Validates material requests before snapshotting.
///
/// ## Rules
/// - Quantity must be positive
/// - Freeform lines (no catalog id) need a name
pub fn validate_material_requests(materials: &[MaterialRequest]) -> ValidationResult<()> {
    for (i, line) in materials.iter().enumerate() {
        if line.quantity == 0 {
            return Err(ValidationError::MustBePositive {
                field: format!("materials[{}].quantity", i),
            });
        }

        if line.packing_material_id.is_none() && line.name.trim().is_empty() {
            return Err(ValidationError::required(format!("materials[{}].name", i)));
        }
    }

    Ok(())
}

/// Validates a new job's shape.
pub fn validate_new_job(job: &NewJob) -> ValidationResult<()> {
    validate_crew_size(job.crew_size)?;
    validate_stops(&job.stops)?;
    validate_material_requests(&job.materials)?;

    if job.square_feet == Some(0) {
        return Err(ValidationError::MustBePositive {
            field: "square_feet".to_string(),
        });
    }

    if job.estimated_duration_minutes == Some(0) {
        return Err(ValidationError::MustBePositive {
            field: "estimated_duration_minutes".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Reviews
// =============================================================================

/// Validates a star rating (1-5).
pub fn validate_rating(rating: u8, field: &str) -> ValidationResult<()> {
    if !(1..=5).contains(&rating) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 1,
            max: 5,
        });
    }
    Ok(())
}

/// Validates a review against the job's crew size.
///
/// ## Rules
/// - Overall rating 1-5
/// - Text at most 2000 characters
/// - Each mover rating 1-5, crew member within 1..=crew_size, no duplicates
pub fn validate_review(input: &ReviewInput, crew_size: u32) -> ValidationResult<()> {
    validate_rating(input.rating, "rating")?;

    if let Some(text) = &input.review_text {
        if text.chars().count() > MAX_REVIEW_LENGTH {
            return Err(ValidationError::TooLong {
                field: "review_text".to_string(),
                max: MAX_REVIEW_LENGTH,
            });
        }
    }

    validate_mover_ratings(&input.mover_ratings, crew_size)
}

fn validate_mover_ratings(ratings: &[MoverRating], crew_size: u32) -> ValidationResult<()> {
    let mut seen = HashSet::new();

    for (i, mover) in ratings.iter().enumerate() {
        let field = format!("mover_ratings[{}]", i);

        if mover.crew_member == 0 || mover.crew_member > crew_size {
            return Err(ValidationError::OutOfRange {
                field: format!("{}.crew_member", field),
                min: 1,
                max: crew_size as i64,
            });
        }

        if !seen.insert(mover.crew_member) {
            return Err(ValidationError::Duplicate {
                field: format!("{}.crew_member", field),
                value: mover.crew_member.to_string(),
            });
        }

        validate_rating(mover.rating, &format!("{}.rating", field))?;
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn stop(sequence: u32, role: StopRole, lat: f64, lng: f64) -> Stop {
        Stop {
            sequence,
            role,
            location: GeoPoint::new(lat, lng),
            address: format!("{} Main St", sequence + 1),
            category: None,
        }
    }

    fn itinerary() -> Vec<Stop> {
        vec![
            stop(0, StopRole::Loading, 40.7128, -74.0060),
            stop(1, StopRole::Intermediate, 40.7527, -73.9772),
            stop(2, StopRole::Unloading, 40.7589, -73.9851),
        ]
    }

    #[test]
    fn test_validate_request_number() {
        assert!(validate_request_number("REQ-ABCD1234").is_ok());
        assert!(validate_request_number("REQ-ABCD123").is_err());
        assert!(validate_request_number("REQ_ABCD1234").is_err());
        assert!(validate_request_number("REQ-ABCD-234").is_err());
    }

    #[test]
    fn test_validate_stops_accepts_itinerary() {
        assert!(validate_stops(&itinerary()).is_ok());
    }

    #[test]
    fn test_validate_stops_needs_two() {
        let err = validate_stops(&itinerary()[..1]).unwrap_err();
        assert_eq!(err.field(), "stops");
    }

    #[test]
    fn test_validate_stops_coordinate_range() {
        let mut stops = itinerary();
        stops[1].location.latitude = 91.0;
        let err = validate_stops(&stops).unwrap_err();
        assert_eq!(err.field(), "stops[1].location.latitude");

        let mut stops = itinerary();
        stops[2].location.longitude = f64::NAN;
        let err = validate_stops(&stops).unwrap_err();
        assert_eq!(err.field(), "stops[2].location.longitude");
    }

    #[test]
    fn test_validate_stops_roles() {
        let mut stops = itinerary();
        stops[1].role = StopRole::Loading;
        let err = validate_stops(&stops).unwrap_err();
        assert!(err.to_string().contains("exactly one loading stop"));

        let mut stops = itinerary();
        stops[2].role = StopRole::Intermediate;
        let err = validate_stops(&stops).unwrap_err();
        assert!(err.to_string().contains("exactly one unloading stop"));
    }

    #[test]
    fn test_validate_stops_sequence() {
        let mut stops = itinerary();
        stops[2].sequence = 1;
        assert!(matches!(
            validate_stops(&stops),
            Err(ValidationError::Duplicate { .. })
        ));

        let mut stops = itinerary();
        stops.swap(1, 2);
        let err = validate_stops(&stops).unwrap_err();
        assert_eq!(err.field(), "stops[2].sequence");

        let mut stops = itinerary();
        for s in stops.iter_mut() {
            s.sequence += 1;
        }
        assert_eq!(validate_stops(&stops).unwrap_err().field(), "stops[0].sequence");
    }

    #[test]
    fn test_validate_stops_address() {
        let mut stops = itinerary();
        stops[0].address = "   ".to_string();
        assert_eq!(
            validate_stops(&stops).unwrap_err(),
            ValidationError::required("stops[0].address")
        );
    }

    #[test]
    fn test_validate_crew_size() {
        assert!(validate_crew_size(1).is_ok());
        assert!(validate_crew_size(MAX_CREW_SIZE).is_ok());
        assert!(validate_crew_size(0).is_err());
        assert!(validate_crew_size(MAX_CREW_SIZE + 1).is_err());
    }

    #[test]
    fn test_validate_material_requests() {
        let ok = MaterialRequest {
            packing_material_id: Some(1),
            name: String::new(),
            quantity: 10,
            unit_price: Default::default(),
        };
        assert!(validate_material_requests(&[ok.clone()]).is_ok());

        let zero = MaterialRequest { quantity: 0, ..ok.clone() };
        assert_eq!(
            validate_material_requests(&[ok.clone(), zero]).unwrap_err().field(),
            "materials[1].quantity"
        );

        let nameless = MaterialRequest {
            packing_material_id: None,
            ..ok
        };
        assert_eq!(
            validate_material_requests(&[nameless]).unwrap_err().field(),
            "materials[0].name"
        );
    }

    #[test]
    fn test_validate_review() {
        let input = ReviewInput {
            rating: 5,
            review_text: Some("Careful with the piano".to_string()),
            mover_ratings: vec![
                MoverRating { crew_member: 1, rating: 5 },
                MoverRating { crew_member: 3, rating: 4 },
            ],
        };
        assert!(validate_review(&input, 3).is_ok());

        let bad_rating = ReviewInput { rating: 0, ..input.clone() };
        assert_eq!(validate_review(&bad_rating, 3).unwrap_err().field(), "rating");

        let bad_member = ReviewInput {
            mover_ratings: vec![MoverRating { crew_member: 4, rating: 5 }],
            ..input.clone()
        };
        assert_eq!(
            validate_review(&bad_member, 3).unwrap_err().field(),
            "mover_ratings[0].crew_member"
        );

        let dup = ReviewInput {
            mover_ratings: vec![
                MoverRating { crew_member: 2, rating: 5 },
                MoverRating { crew_member: 2, rating: 1 },
            ],
            ..input
        };
        assert!(matches!(
            validate_review(&dup, 3),
            Err(ValidationError::Duplicate { .. })
        ));
    }
}
