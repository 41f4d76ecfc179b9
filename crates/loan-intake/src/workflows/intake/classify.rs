use std::path::Path;
use std::sync::Arc;

use super::domain::{DocumentType, StoredDocument};
use super::enrichment::NarrativeService;
use super::extraction::text::pdf_text;
use super::registry::{self, FILENAME_KEYWORDS};

const SAMPLE_CHARS: usize = 1000;

/// Resolves a type for documents declared as `unknown`.
#[derive(Clone, Default)]
pub struct Classifier {
    narrative: Option<Arc<dyn NarrativeService>>,
}

impl Classifier {
    pub fn new(narrative: Option<Arc<dyn NarrativeService>>) -> Self {
        Self {
            narrative: narrative.filter(|service| service.is_available()),
        }
    }

    /// Content classification first (PDF text only), then filename keywords,
    /// then `Unknown`.
    pub async fn classify(&self, document: &StoredDocument) -> DocumentType {
        if let Some(kind) = self.classify_content(document).await {
            return kind;
        }
        classify_filename(document.filename())
    }

    async fn classify_content(&self, document: &StoredDocument) -> Option<DocumentType> {
        let narrative = self.narrative.as_ref()?;
        if document.raw.extension().as_deref() != Some("pdf") {
            return None;
        }

        let content = document.raw.content.clone();
        let text = tokio::task::spawn_blocking(move || pdf_text(&content))
            .await
            .ok()?
            .ok()?;
        if text.trim().is_empty() {
            return None;
        }

        let sample: String = text.chars().take(SAMPLE_CHARS).collect();
        match narrative.summarize(&classification_prompt(&sample)).await {
            Ok(reply) => {
                let kind = DocumentType::from_label(&reply).filter(|kind| kind.is_known());
                if kind.is_none() {
                    tracing::debug!(filename = %document.filename(), reply = %reply.trim(), "discarding classification outside vocabulary");
                }
                kind
            }
            Err(err) => {
                tracing::warn!(filename = %document.filename(), error = %err, "content classification failed");
                None
            }
        }
    }
}

/// Keyword table lookup on the lowercased base name.
pub fn classify_filename(filename: &str) -> DocumentType {
    let base = Path::new(filename)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(filename)
        .to_lowercase();

    FILENAME_KEYWORDS
        .into_iter()
        .find(|kind| {
            registry::profile(*kind).is_some_and(|profile| {
                profile
                    .filename_keywords
                    .iter()
                    .any(|keyword| base.contains(keyword))
            })
        })
        .unwrap_or(DocumentType::Unknown)
}

fn classification_prompt(sample: &str) -> String {
    let mut prompt = String::from(
        "Analyze this document text and classify it as one of these loan document types:\n",
    );
    for kind in DocumentType::KNOWN {
        if let Some(profile) = registry::profile(kind) {
            prompt.push_str(&format!("- {} ({})\n", kind.label(), profile.description));
        }
    }
    prompt.push_str(&format!(
        "\nText sample: {sample}\n\nReturn only the document type from the list above."
    ));
    prompt
}
