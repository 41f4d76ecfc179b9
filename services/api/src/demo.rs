use crate::infra::{build_intake_service, InMemoryIntakeRepository};
use chrono::{Duration, Local, NaiveDate};
use clap::Args;
use loan_intake::config::AppConfig;
use loan_intake::error::AppError;
use loan_intake::telemetry::{self, LogSink};
use loan_intake::workflows::intake::{
    ApplicationId, BatchRequest, BatchResult, DocumentType, ExtractionError, IntakeService,
    LocalFileStorage, OcrEngine, ProcessingOptions, RawDocument, SystemClock, TextReader,
};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// One `--doc` argument: an optional declared type and a file path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DocumentArg {
    pub(crate) declared_type: Option<DocumentType>,
    pub(crate) path: PathBuf,
}

/// Accepts `<type>=<path>` or a bare path. A prefix that is not a known type
/// label is treated as part of the path.
pub(crate) fn parse_document_arg(raw: &str) -> Result<DocumentArg, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err("document path must not be empty".to_string());
    }

    if let Some((label, path)) = raw.split_once('=') {
        if let Some(declared_type) = DocumentType::from_label(label) {
            if path.trim().is_empty() {
                return Err(format!("missing path after '{label}='"));
            }
            return Ok(DocumentArg {
                declared_type: Some(declared_type).filter(|kind| kind.is_known()),
                path: PathBuf::from(path.trim()),
            });
        }
    }

    Ok(DocumentArg {
        declared_type: None,
        path: PathBuf::from(raw),
    })
}

#[derive(Args, Debug, Default)]
pub(crate) struct ProcessArgs {
    /// Application identifier. Generated when omitted.
    #[arg(long)]
    pub(crate) application_id: Option<String>,
    /// Document to include, as <type>=<path> or a bare path to classify automatically.
    #[arg(long = "doc", value_parser = parse_document_arg, required = true)]
    pub(crate) documents: Vec<DocumentArg>,
    /// Skip field extraction (and therefore validation).
    #[arg(long)]
    pub(crate) no_extract: bool,
    /// Skip per-document validation.
    #[arg(long)]
    pub(crate) no_validate: bool,
    /// Skip summaries and the application analysis.
    #[arg(long)]
    pub(crate) no_summary: bool,
    /// Skip fraud indicator analysis.
    #[arg(long)]
    pub(crate) no_fraud_detection: bool,
    /// Print the batch result as JSON instead of a report.
    #[arg(long)]
    pub(crate) json: bool,
}

impl ProcessArgs {
    fn options(&self) -> ProcessingOptions {
        ProcessingOptions {
            extract_entities: !self.no_extract,
            auto_validate: !self.no_validate,
            generate_summary: !self.no_summary,
            fraud_detection: !self.no_fraud_detection,
        }
    }
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Directory for the demo uploads. Defaults to a folder under the system temp dir.
    #[arg(long)]
    pub(crate) storage_dir: Option<PathBuf>,
    /// Worker pool size for the demo batch.
    #[arg(long, default_value_t = 3)]
    pub(crate) workers: usize,
    /// Print the batch result as JSON instead of a report.
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) async fn run_process(args: ProcessArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init_with_sink(&config.telemetry, LogSink::Stderr)?;

    let mut documents = Vec::with_capacity(args.documents.len());
    let mut declared_types = HashMap::new();
    for document in &args.documents {
        let content = tokio::fs::read(&document.path).await.map_err(|err| {
            AppError::InvalidInput(format!("{}: {err}", document.path.display()))
        })?;
        let filename = document
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| document.path.display().to_string());
        if let Some(declared) = document.declared_type {
            declared_types.insert(filename.clone(), declared);
        }
        documents.push(RawDocument::new(filename, content));
    }

    let repository = Arc::new(InMemoryIntakeRepository::default());
    let service = build_intake_service(&config.intake, repository);
    let batch = service
        .process_batch(BatchRequest {
            application_id: args.application_id.clone().map(ApplicationId),
            documents,
            declared_types,
            options: args.options(),
            ..BatchRequest::default()
        })
        .await;

    print_batch(&batch, args.json)
}

/// Treats image bytes as already-recognised UTF-8 text, so the demo needs no
/// OCR engine.
struct EchoOcr;

impl OcrEngine for EchoOcr {
    fn recognize(&self, image: &[u8]) -> Result<String, ExtractionError> {
        String::from_utf8(image.to_vec()).map_err(|err| ExtractionError::Ocr(err.to_string()))
    }
}

fn us_date(date: NaiveDate) -> String {
    date.format("%m/%d/%Y").to_string()
}

pub(crate) fn demo_documents(today: NaiveDate) -> Vec<RawDocument> {
    let recent = us_date(today - Duration::days(12));
    let stale = us_date(today - Duration::days(200));

    vec![
        RawDocument::new(
            "drivers_license.png",
            "STATE DRIVER LICENSE Name Jordan Applicant License No 0123456789 Expires 01/31/2031",
        ),
        RawDocument::new(
            "payslip_recent.png",
            format!(
                "NORTHWIND TRADING PAYSLIP Employee Jordan Applicant Pay Date {recent} \
                 Gross Pay $6,250.00 deductions withheld for tax and benefits this period \
                 Net Pay $4,710.35"
            ),
        ),
        RawDocument::new(
            "bank_statement.png",
            format!(
                "FIRST FEDERAL Account number 4455667788 Statement date {recent} \
                 Opening balance $7,900.10 Closing balance $8,450.25"
            ),
        ),
        RawDocument::new(
            "utility_bill.png",
            format!("CITY ELECTRIC Service address 12 Elm St Bill date {stale} Amount due $84.12"),
        ),
        RawDocument::new("selfie.heic", "not a supported format"),
    ]
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init_with_sink(&config.telemetry, LogSink::Stderr)?;

    let storage_dir = args
        .storage_dir
        .unwrap_or_else(|| std::env::temp_dir().join("loan-intake-demo"));
    let clock = Arc::new(SystemClock);
    let service = IntakeService::builder(
        Arc::new(LocalFileStorage::new(storage_dir.clone(), clock.clone())),
        Arc::new(InMemoryIntakeRepository::default()),
    )
    .clock(clock)
    .worker_limit(args.workers)
    .text_reader(TextReader::new().with_ocr(Arc::new(EchoOcr)))
    .build();

    if !args.json {
        println!("Loan intake demo");
        println!("Uploads: {}", storage_dir.display());
    }

    let today = Local::now().date_naive();
    let batch = service
        .process_batch(BatchRequest {
            documents: demo_documents(today),
            ..BatchRequest::default()
        })
        .await;

    print_batch(&batch, args.json)
}

fn print_batch(batch: &BatchResult, json: bool) -> Result<(), AppError> {
    if json {
        println!("{}", serde_json::to_string_pretty(batch)?);
    } else {
        render_batch_report(batch);
    }
    Ok(())
}

pub(crate) fn render_batch_report(batch: &BatchResult) {
    println!("\nApplication {}", batch.application_id);
    println!(
        "Status: {} | {} submitted, {} processed, {} succeeded, {} failed | {:.2}s",
        batch.status.label(),
        batch.total_documents,
        batch.processed_documents,
        batch.successful_documents,
        batch.failed_documents,
        batch.elapsed_seconds
    );
    if let Some(error) = &batch.error {
        println!("Batch error: {error}");
    }

    println!("\nDocuments");
    for result in &batch.document_results {
        let verdict = match &result.validation {
            Some(validation) if validation.is_valid => {
                format!("valid ({:.0}%)", validation.validation_score * 100.0)
            }
            Some(validation) => format!("needs review ({:.0}%)", validation.validation_score * 100.0),
            None => "not validated".to_string(),
        };
        println!(
            "{}. {} -> {} | {} | {}",
            result.submission_order,
            result.filename,
            result.document_type,
            result.status.label(),
            verdict
        );

        if let Some(validation) = &result.validation {
            for issue in &validation.issues {
                println!("   issue: {issue}");
            }
            for warning in &validation.warnings {
                println!("   warning: {warning}");
            }
        }
        for error in &result.errors {
            println!("   error: {error}");
        }
    }

    let completeness = &batch.application_completeness;
    println!(
        "\nCompleteness: {:.0}% ({})",
        completeness.completeness_score * 100.0,
        if completeness.is_complete {
            "complete"
        } else {
            "incomplete"
        }
    );
    for recommendation in &completeness.recommendations {
        println!("- {recommendation}");
    }

    if let Some(analysis) = &batch.application_analysis {
        println!("\nAnalysis: {}", analysis.summary);
        println!(
            "Risk {:?} | approval likelihood {}",
            analysis.risk_level, analysis.approval_likelihood
        );
        for recommendation in &analysis.recommendations {
            println!("- {recommendation}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_args_accept_typed_and_bare_paths() {
        assert_eq!(
            parse_document_arg("payslip=docs/may.pdf"),
            Ok(DocumentArg {
                declared_type: Some(DocumentType::Payslip),
                path: PathBuf::from("docs/may.pdf"),
            })
        );
        assert_eq!(
            parse_document_arg("scans/id=front.png"),
            Ok(DocumentArg {
                declared_type: None,
                path: PathBuf::from("scans/id=front.png"),
            })
        );
        assert_eq!(
            parse_document_arg("unknown=scan.jpg").map(|arg| arg.declared_type),
            Ok(None)
        );
        assert!(parse_document_arg("bank_statement=").is_err());
    }

    #[test]
    fn process_flags_map_to_options() {
        let args = ProcessArgs {
            no_summary: true,
            ..ProcessArgs::default()
        };
        let options = args.options();
        assert!(options.extract_entities);
        assert!(options.auto_validate);
        assert!(!options.generate_summary);
        assert!(options.fraud_detection);
    }

    #[tokio::test]
    async fn demo_batch_runs_against_a_temp_directory() {
        let storage_dir = std::env::temp_dir().join(format!(
            "loan-intake-demo-test-{}",
            std::process::id()
        ));
        let clock = Arc::new(SystemClock);
        let service = IntakeService::builder(
            Arc::new(LocalFileStorage::new(storage_dir.clone(), clock.clone())),
            Arc::new(InMemoryIntakeRepository::default()),
        )
        .clock(clock)
        .text_reader(TextReader::new().with_ocr(Arc::new(EchoOcr)))
        .build();

        let today = Local::now().date_naive();
        let batch = service
            .process_batch(BatchRequest {
                documents: demo_documents(today),
                ..BatchRequest::default()
            })
            .await;
        let _ = std::fs::remove_dir_all(&storage_dir);

        assert_eq!(batch.total_documents, 5);
        assert_eq!(batch.failed_documents, 0);
        let types: Vec<DocumentType> = batch
            .document_results
            .iter()
            .map(|result| result.document_type)
            .collect();
        assert_eq!(
            types,
            vec![
                DocumentType::IdProof,
                DocumentType::Payslip,
                DocumentType::BankStatement,
                DocumentType::UtilityBill,
                DocumentType::Unknown,
            ]
        );
        let utility = batch.document_results[3]
            .validation
            .as_ref()
            .expect("utility bill validated");
        assert!(utility
            .issues
            .iter()
            .any(|issue| issue.starts_with("Utility Bill is older than 90 days")));
        assert!(batch.document_results[4].errors[0].contains("Unsupported file format"));
    }
}
