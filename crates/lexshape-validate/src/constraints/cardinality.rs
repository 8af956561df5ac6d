//! sh:minCount / sh:maxCount

use super::{Constraint, ConstraintViolation};
use lexshape_rdf::RdfTerm;

pub fn validate_min_count(values: &[RdfTerm], min: usize) -> Option<ConstraintViolation> {
    (values.len() < min).then(|| ConstraintViolation {
        constraint: Constraint::MinCount(min),
        value: None,
        message: format!(
            "Expected at least {} value(s) but found {}",
            min,
            values.len()
        ),
    })
}

pub fn validate_max_count(values: &[RdfTerm], max: usize) -> Option<ConstraintViolation> {
    (values.len() > max).then(|| ConstraintViolation {
        constraint: Constraint::MaxCount(max),
        value: None,
        message: format!(
            "Expected at most {} value(s) but found {}",
            max,
            values.len()
        ),
    })
}
