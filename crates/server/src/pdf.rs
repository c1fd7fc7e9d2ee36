//! Proposal PDFs: a Tera HTML template converted by wkhtmltopdf.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tera::{Context, Tera};
use tokio::process::Command;
use tracing::{error, info, warn};

use deckbot_core::config::DocumentsConfig;
use deckbot_core::domain::StructuredProposal;
use deckbot_core::errors::CollaboratorError;
use deckbot_core::ports::{DocumentRenderer, RenderedDocument};

const PROPOSAL_TEMPLATE: &str = "proposal.html.tera";
const AGENCY_NAME: &str = "DIGIT DECK AGENCY SAS";
const BRAND_COLOR: &str = "#7c3aed";

#[derive(Debug, thiserror::Error)]
pub enum PdfError {
    #[error("template error: {0}")]
    Template(String),
    #[error("conversion error: {0}")]
    Conversion(String),
    #[error("wkhtmltopdf not found")]
    WkhtmltopdfNotFound,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<PdfError> for CollaboratorError {
    fn from(error: PdfError) -> Self {
        CollaboratorError::Render(error.to_string())
    }
}

#[derive(Clone, Debug)]
pub struct PdfRenderer {
    tera: Tera,
    wkhtmltopdf_path: Option<PathBuf>,
}

impl PdfRenderer {
    /// Uses the configured binary, else whatever `wkhtmltopdf` is on PATH.
    /// A missing binary is not fatal here; every render then fails instead.
    pub fn from_config(config: &DocumentsConfig) -> Result<Self, PdfError> {
        let wkhtmltopdf_path =
            config.wkhtmltopdf_path.clone().or_else(|| which::which("wkhtmltopdf").ok());
        match &wkhtmltopdf_path {
            Some(path) => info!(path = %path.display(), "wkhtmltopdf found"),
            None => warn!("wkhtmltopdf not found in PATH - proposal documents cannot be rendered"),
        }
        Ok(Self { tera: embedded_templates()?, wkhtmltopdf_path })
    }

    pub fn is_available(&self) -> bool {
        self.wkhtmltopdf_path.is_some()
    }

    pub fn render_html(&self, proposal: &StructuredProposal) -> Result<String, PdfError> {
        let mut context =
            Context::from_serialize(proposal).map_err(|e| PdfError::Template(e.to_string()))?;
        context.insert("agency_name", AGENCY_NAME);
        context.insert("brand_color", BRAND_COLOR);

        self.tera.render(PROPOSAL_TEMPLATE, &context).map_err(|e| PdfError::Template(e.to_string()))
    }

    async fn convert_html_to_pdf(
        &self,
        html: &str,
        wkhtmltopdf_path: &Path,
    ) -> Result<Vec<u8>, PdfError> {
        let temp_dir = std::env::temp_dir();
        let stem = format!("deckbot_{}", uuid::Uuid::new_v4());
        let html_path = temp_dir.join(format!("{stem}.html"));
        let pdf_path = temp_dir.join(format!("{stem}.pdf"));

        tokio::fs::write(&html_path, html).await?;
        let converted = run_wkhtmltopdf(wkhtmltopdf_path, &html_path, &pdf_path).await;
        let pdf_bytes = match converted {
            Ok(()) => tokio::fs::read(&pdf_path).await.map_err(PdfError::from),
            Err(error) => Err(error),
        };

        let _ = tokio::fs::remove_file(&html_path).await;
        let _ = tokio::fs::remove_file(&pdf_path).await;

        let pdf_bytes = pdf_bytes?;
        info!(size = pdf_bytes.len(), "PDF generated successfully");
        Ok(pdf_bytes)
    }
}

#[async_trait]
impl DocumentRenderer for PdfRenderer {
    async fn render(
        &self,
        proposal: &StructuredProposal,
    ) -> Result<RenderedDocument, CollaboratorError> {
        let wkhtmltopdf = self.wkhtmltopdf_path.as_deref().ok_or(PdfError::WkhtmltopdfNotFound)?;
        let html = self.render_html(proposal)?;
        let bytes = self.convert_html_to_pdf(&html, wkhtmltopdf).await?;
        Ok(RenderedDocument::pdf(proposal.document_file_name(), bytes))
    }
}

async fn run_wkhtmltopdf(binary: &Path, html_path: &Path, pdf_path: &Path) -> Result<(), PdfError> {
    let output = Command::new(binary)
        .args(["--page-size", "Letter"])
        .args(["--margin-top", "0", "--margin-right", "0", "--margin-bottom", "0", "--margin-left", "0"])
        .args(["--encoding", "utf-8", "--print-media-type", "--enable-local-file-access", "--quiet"])
        .arg(html_path)
        .arg(pdf_path)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        error!(stderr = %stderr, "wkhtmltopdf failed");
        return Err(PdfError::Conversion(stderr.into_owned()));
    }
    Ok(())
}

fn embedded_templates() -> Result<Tera, PdfError> {
    let mut tera = Tera::default();
    tera.autoescape_on(vec![".html.tera"]);
    tera.add_raw_template(
        PROPOSAL_TEMPLATE,
        include_str!("../../../templates/proposals/proposal.html.tera"),
    )
    .map_err(|e| PdfError::Template(e.to_string()))?;
    Ok(tera)
}
