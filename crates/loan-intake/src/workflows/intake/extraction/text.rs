use std::sync::Arc;

use super::ExtractionError;

/// Recognises text in a single encoded image.
pub trait OcrEngine: Send + Sync {
    fn recognize(&self, image: &[u8]) -> Result<String, ExtractionError>;
}

/// Rasterises PDF pages into encoded images, in page order.
pub trait PageRenderer: Send + Sync {
    fn render_pages(&self, pdf: &[u8]) -> Result<Vec<Vec<u8>>, ExtractionError>;
}

/// Reads the text layer of a PDF. Pages are joined in order with a newline.
pub fn pdf_text(bytes: &[u8]) -> Result<String, ExtractionError> {
    let document =
        lopdf::Document::load_mem(bytes).map_err(|err| ExtractionError::Pdf(err.to_string()))?;

    let mut pages: Vec<u32> = document.get_pages().keys().copied().collect();
    pages.sort_unstable();

    let mut text = String::new();
    for page in pages {
        let page_text = document.extract_text(&[page]).unwrap_or_default();
        text.push_str(&page_text);
        if !page_text.ends_with('\n') {
            text.push('\n');
        }
    }

    tracing::debug!(chars = text.len(), "extracted pdf text layer");
    Ok(text)
}

/// Local text recovery used by the fallback strategy.
#[derive(Clone, Default)]
pub struct TextReader {
    ocr: Option<Arc<dyn OcrEngine>>,
    renderer: Option<Arc<dyn PageRenderer>>,
}

impl TextReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ocr(mut self, ocr: Arc<dyn OcrEngine>) -> Self {
        self.ocr = Some(ocr);
        self
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn PageRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Text for a supported file. PDFs without a text layer are OCR'd page by
    /// page when both a renderer and an engine are configured.
    pub fn read(&self, bytes: &[u8], extension: &str) -> Result<String, ExtractionError> {
        match extension {
            "pdf" => {
                let text = pdf_text(bytes)?;
                if !text.trim().is_empty() {
                    return Ok(text);
                }
                self.ocr_pdf(bytes)
            }
            "jpg" | "jpeg" | "png" | "tiff" | "tif" => {
                let ocr = self.ocr.as_ref().ok_or(ExtractionError::OcrUnavailable)?;
                ocr.recognize(bytes)
            }
            other => Err(ExtractionError::UnsupportedFormat(other.to_string())),
        }
    }

    fn ocr_pdf(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        let (Some(renderer), Some(ocr)) = (&self.renderer, &self.ocr) else {
            tracing::warn!("pdf has no text layer and page OCR is not configured");
            return Ok(String::new());
        };

        let mut text = String::new();
        for image in renderer.render_pages(bytes)? {
            text.push_str(&ocr.recognize(&image)?);
            text.push('\n');
        }
        Ok(text)
    }
}

#[cfg(feature = "tesseract")]
pub use self::tesseract::TesseractEngine;

#[cfg(feature = "tesseract")]
mod tesseract {
    use std::path::PathBuf;

    use leptess::LepTess;

    use super::{ExtractionError, OcrEngine};

    /// Tesseract through `leptess`. A fresh instance is created per image.
    #[derive(Debug, Clone)]
    pub struct TesseractEngine {
        tessdata_dir: Option<PathBuf>,
        language: String,
    }

    impl TesseractEngine {
        pub fn new(tessdata_dir: Option<PathBuf>) -> Self {
            Self {
                tessdata_dir,
                language: "eng".to_string(),
            }
        }

        pub fn with_language(mut self, language: impl Into<String>) -> Self {
            self.language = language.into();
            self
        }
    }

    impl OcrEngine for TesseractEngine {
        fn recognize(&self, image: &[u8]) -> Result<String, ExtractionError> {
            let datapath = match &self.tessdata_dir {
                Some(dir) => Some(dir.to_str().ok_or_else(|| {
                    ExtractionError::Ocr("tessdata path is not valid UTF-8".to_string())
                })?),
                None => None,
            };

            let mut tess = LepTess::new(datapath, &self.language)
                .map_err(|err| ExtractionError::Ocr(format!("tesseract init failed: {err:?}")))?;
            tess.set_image_from_mem(image)
                .map_err(|err| ExtractionError::Ocr(format!("image decode failed: {err:?}")))?;
            tess.get_utf8_text()
                .map_err(|err| ExtractionError::Ocr(format!("recognition failed: {err:?}")))
        }
    }
}
