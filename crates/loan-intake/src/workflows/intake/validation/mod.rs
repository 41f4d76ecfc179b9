//! Document rule checks and application completeness.

pub mod completeness;
pub mod dates;
mod rules;

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use super::clock::Clock;
use super::domain::{DocumentType, ExtractionResult, ValidationResult};
use super::panic_message;

pub use completeness::validate_application_completeness;
pub use dates::parse_date;
pub use rules::VALIDITY_THRESHOLD_POINTS;

/// Applies the per-type rule set. The clock only feeds the recency and expiry
/// checks.
#[derive(Clone)]
pub struct Validator {
    clock: Arc<dyn Clock>,
}

impl Validator {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Never fails. A fault inside a rule becomes a single issue.
    pub fn validate(
        &self,
        extraction: &ExtractionResult,
        document_type: DocumentType,
    ) -> ValidationResult {
        let today = self.clock.today();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            rules::evaluate(extraction, document_type, today)
        }));

        match outcome {
            Ok(findings) => findings.into_result(),
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::error!(
                    document_type = %document_type,
                    error = %message,
                    "document validation failed"
                );
                rules::Findings::failed(message).into_result()
            }
        }
    }
}
