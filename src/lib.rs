pub mod compose;
pub mod config;
pub mod docx;
mod error;
pub mod fonts;
pub mod images;
pub mod model;
pub mod pdf;
pub mod report;

pub use config::RenderConfig;
pub use error::Error;
pub use fonts::TextMetrics;
pub use images::{HttpImageFetcher, ImageSource, ImageStore};
pub use pdf::LaidOutDocument;
pub use report::{AttendanceReport, CmvrReport};

use std::time::Instant;

use chrono::NaiveDateTime;

use model::Document;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum ReportKind {
    Cmvr,
    Attendance,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum OutputFormat {
    Pdf,
    Docx,
}

/// Report renderer. Holds the measured fonts and the image source; each
/// generate call owns its own pages and image store.
pub struct Renderer<S: ImageSource = HttpImageFetcher> {
    config: RenderConfig,
    metrics: TextMetrics,
    source: S,
}

impl Renderer<HttpImageFetcher> {
    /// Renderer fetching images over HTTP with the configured timeout.
    pub fn new(config: RenderConfig) -> Result<Self, Error> {
        let source = HttpImageFetcher::new(config.image_timeout());
        Self::with_image_source(config, source)
    }
}

impl<S: ImageSource> Renderer<S> {
    pub fn with_image_source(config: RenderConfig, source: S) -> Result<Self, Error> {
        config.validate()?;
        let metrics = TextMetrics::from_config(&config.fonts)?;
        Ok(Self {
            config,
            metrics,
            source,
        })
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn metrics(&self) -> &TextMetrics {
        &self.metrics
    }

    fn generated_at(&self) -> NaiveDateTime {
        self.config
            .generated_at
            .unwrap_or_else(|| chrono::Local::now().naive_local())
    }

    async fn prefetch(&self, doc: &Document) -> ImageStore {
        let t0 = Instant::now();
        let urls = doc.image_urls();
        let store = ImageStore::prefetch(&self.source, &urls).await;
        log::info!(
            "Timing: fetched {} of {} images in {:.1}ms",
            store.iter().count(),
            urls.len(),
            t0.elapsed().as_secs_f64() * 1000.0,
        );
        store
    }

    async fn render(&self, doc: Document, format: OutputFormat) -> Result<Vec<u8>, Error> {
        let images = self.prefetch(&doc).await;
        let generated_at = self.generated_at();
        let result = match format {
            OutputFormat::Pdf => pdf::render(&doc, &self.metrics, &images, &self.config, generated_at),
            OutputFormat::Docx => docx::render(&doc, &images, generated_at),
        };
        if let Err(e) = &result {
            log::error!("{format:?} generation for {:?} failed: {e}", doc.title);
        }
        result
    }

    /// Pages of a CMVR report after layout and footers, without serializing.
    pub async fn layout_cmvr(&self, report: &CmvrReport) -> Result<LaidOutDocument, Error> {
        let doc = compose::compose_cmvr(report);
        let images = self.prefetch(&doc).await;
        pdf::layout(&doc, &self.metrics, &images, &self.config, self.generated_at())
    }

    pub async fn layout_attendance(&self, report: &AttendanceReport) -> Result<LaidOutDocument, Error> {
        let doc = compose::compose_attendance(report);
        let images = self.prefetch(&doc).await;
        pdf::layout(&doc, &self.metrics, &images, &self.config, self.generated_at())
    }

    pub async fn cmvr_pdf(&self, report: &CmvrReport) -> Result<Vec<u8>, Error> {
        self.render(compose::compose_cmvr(report), OutputFormat::Pdf)
            .await
    }

    pub async fn attendance_pdf(&self, report: &AttendanceReport) -> Result<Vec<u8>, Error> {
        self.render(compose::compose_attendance(report), OutputFormat::Pdf)
            .await
    }

    pub async fn cmvr_docx(&self, report: &CmvrReport) -> Result<Vec<u8>, Error> {
        self.render(compose::compose_cmvr(report), OutputFormat::Docx)
            .await
    }

    pub async fn attendance_docx(&self, report: &AttendanceReport) -> Result<Vec<u8>, Error> {
        self.render(compose::compose_attendance(report), OutputFormat::Docx)
            .await
    }

    /// Parse report JSON of the given kind and render it.
    pub async fn generate(
        &self,
        kind: ReportKind,
        json: &[u8],
        format: OutputFormat,
    ) -> Result<Vec<u8>, Error> {
        let t0 = Instant::now();
        let doc = match kind {
            ReportKind::Cmvr => compose::compose_cmvr(&serde_json::from_slice(json)?),
            ReportKind::Attendance => compose::compose_attendance(&serde_json::from_slice(json)?),
        };
        let t_parse = t0.elapsed();
        let bytes = self.render(doc, format).await?;
        log::info!(
            "Timing: parse={:.1}ms, total={:.1}ms (output {} bytes)",
            t_parse.as_secs_f64() * 1000.0,
            t0.elapsed().as_secs_f64() * 1000.0,
            bytes.len(),
        );
        Ok(bytes)
    }
}
