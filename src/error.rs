use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid report JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A draw call received coordinates or sizes the page cannot hold.
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("font error: {0}")]
    Font(String),

    #[error("PDF generation failed: {0}")]
    Pdf(String),

    #[error("DOCX packaging failed: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("invalid configuration: {0}")]
    Config(String),
}
