//! HTML to PDF conversion with an external renderer
//!
//! wkhtmltopdf is preferred; a headless Chromium/Chrome is used otherwise.

use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

use crate::error::{Result, RheoError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RendererKind {
    Wkhtmltopdf,
    Chromium,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PdfRenderer {
    pub kind: RendererKind,
    pub path: PathBuf,
}

/// First renderer found on `PATH`
pub fn find_pdf_renderer() -> Option<PdfRenderer> {
    if let Ok(path) = which::which("wkhtmltopdf") {
        return Some(PdfRenderer { kind: RendererKind::Wkhtmltopdf, path });
    }
    for name in ["chromium", "chromium-browser", "google-chrome", "chrome"] {
        if let Ok(path) = which::which(name) {
            return Some(PdfRenderer { kind: RendererKind::Chromium, path });
        }
    }
    None
}

impl PdfRenderer {
    pub fn render(&self, html_path: &Path, pdf_path: &Path) -> Result<()> {
        debug!(renderer = %self.path.display(), html = %html_path.display(), "rendering PDF");
        let status = match self.kind {
            RendererKind::Wkhtmltopdf => Command::new(&self.path)
                .args(["--quiet", "--enable-local-file-access", "--page-size", "A4"])
                .args(["--margin-top", "20mm", "--margin-bottom", "20mm"])
                .args(["--margin-left", "15mm", "--margin-right", "15mm"])
                .arg(html_path)
                .arg(pdf_path)
                .status()?,
            RendererKind::Chromium => {
                let url = format!("file://{}", html_path.canonicalize()?.display());
                Command::new(&self.path)
                    .args(["--headless", "--disable-gpu", "--no-pdf-header-footer"])
                    .arg(format!("--print-to-pdf={}", pdf_path.display()))
                    .arg(url)
                    .status()?
            }
        };

        if !status.success() {
            return Err(RheoError::Report(format!("{} exited with {}", self.path.display(), status)));
        }
        if !pdf_path.exists() {
            return Err(RheoError::Report(format!("PDF was not generated: {}", pdf_path.display())));
        }
        Ok(())
    }
}
