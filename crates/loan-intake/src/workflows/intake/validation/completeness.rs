use std::collections::BTreeSet;

use crate::workflows::intake::domain::{CompletenessResult, DocumentType};
use crate::workflows::intake::registry::{self, OPTIONAL_DOCUMENT_TYPES, REQUIRED_DOCUMENT_TYPES};

/// Required-type coverage for the given resolved types. Order and duplicates
/// in `present` do not matter.
pub fn validate_application_completeness<I>(present: I) -> CompletenessResult
where
    I: IntoIterator<Item = DocumentType>,
{
    let present: BTreeSet<DocumentType> = present.into_iter().collect();

    let missing_required: BTreeSet<DocumentType> = REQUIRED_DOCUMENT_TYPES
        .into_iter()
        .filter(|kind| !present.contains(kind))
        .collect();
    let missing_optional: BTreeSet<DocumentType> = OPTIONAL_DOCUMENT_TYPES
        .into_iter()
        .filter(|kind| !present.contains(kind))
        .collect();

    let recommendations = REQUIRED_DOCUMENT_TYPES
        .into_iter()
        .filter(|kind| missing_required.contains(kind))
        .map(|kind| {
            format!(
                "Please upload your {} to complete your application",
                registry::title_case(&kind.words())
            )
        })
        .collect();

    let total = REQUIRED_DOCUMENT_TYPES.len();
    let covered = total - missing_required.len();

    CompletenessResult {
        is_complete: missing_required.is_empty(),
        missing_required,
        missing_optional,
        completeness_score: covered as f64 / total as f64,
        recommendations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_required_set_is_complete() {
        let result = validate_application_completeness([
            DocumentType::EmploymentLetter,
            DocumentType::IdProof,
            DocumentType::BankStatement,
            DocumentType::Payslip,
            DocumentType::Payslip,
        ]);

        assert!(result.is_complete);
        assert_eq!(result.completeness_score, 1.0);
        assert!(result.recommendations.is_empty());
        assert_eq!(result.missing_optional.len(), OPTIONAL_DOCUMENT_TYPES.len());
    }

    #[test]
    fn each_missing_required_type_gets_a_recommendation() {
        let result =
            validate_application_completeness([DocumentType::Payslip, DocumentType::UtilityBill]);

        assert!(!result.is_complete);
        assert_eq!(result.completeness_score, 0.25);
        assert_eq!(
            result.missing_required,
            BTreeSet::from([
                DocumentType::IdProof,
                DocumentType::BankStatement,
                DocumentType::EmploymentLetter,
            ])
        );
        assert!(!result.missing_optional.contains(&DocumentType::UtilityBill));
        assert_eq!(
            result.recommendations,
            vec![
                "Please upload your Id Proof to complete your application",
                "Please upload your Bank Statement to complete your application",
                "Please upload your Employment Letter to complete your application",
            ]
        );
    }

    #[test]
    fn unknown_documents_do_not_count() {
        let result = validate_application_completeness([DocumentType::Unknown; 3]);
        assert_eq!(result.completeness_score, 0.0);
        assert_eq!(result.missing_required.len(), 4);
    }
}
