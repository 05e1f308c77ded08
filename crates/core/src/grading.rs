use thiserror::Error;

use crate::model::{ColumnKind, TabularResult};
use crate::normalize::{CanonicalResult, GradingOptions, canonicalize};

/// Why two results could not be compared.
///
/// Never leaves [`result_equals`]; it exists so the reason can be logged.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ComparisonFault {
    #[error("column `{name}` is {left} on one side and {right} on the other")]
    KindClash {
        name: String,
        left: ColumnKind,
        right: ColumnKind,
    },
}

/// Whether the learner's result matches the expected one for grading.
///
/// Both sides are normalized independently. An absent result on either side
/// is never a match, and a comparison fault counts as "not equal".
#[must_use]
pub fn result_equals(learner: Option<&TabularResult>, expected: Option<&TabularResult>) -> bool {
    result_equals_with(learner, expected, GradingOptions::default())
}

#[must_use]
pub fn result_equals_with(
    learner: Option<&TabularResult>,
    expected: Option<&TabularResult>,
    options: GradingOptions,
) -> bool {
    let (Some(learner), Some(expected)) = (learner, expected) else {
        return false;
    };
    let learner = canonicalize(learner, options);
    let expected = canonicalize(expected, options);
    match compare(&learner, &expected) {
        Ok(equal) => equal,
        Err(fault) => {
            tracing::debug!(%fault, "comparison fault treated as mismatch");
            false
        }
    }
}

/// Compare two canonical results.
///
/// # Errors
///
/// Returns `ComparisonFault::KindClash` when a column present on both sides
/// holds incompatible kinds.
pub fn compare(learner: &CanonicalResult, expected: &CanonicalResult) -> Result<bool, ComparisonFault> {
    let (left, right) = (learner.as_table(), expected.as_table());

    if left.column_names() != right.column_names() || left.row_count() != right.row_count() {
        return Ok(false);
    }

    for (l, r) in left.columns().iter().zip(right.columns()) {
        if !l.kind().is_compatible_with(r.kind()) {
            return Err(ComparisonFault::KindClash {
                name: l.name().to_owned(),
                left: l.kind(),
                right: r.kind(),
            });
        }
        if l.values() != r.values() {
            return Ok(false);
        }
    }

    Ok(true)
}
