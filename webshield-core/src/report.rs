//! Downloadable reports built from a job's persisted output.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::str::FromStr;
use std::sync::Arc;

use tracing::{debug, info};

use crate::error::{Result, ScanError};
use crate::scan::{ScanJobSummary, ScannerSettings};

/// Download formats, selected by the `format` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    /// The persisted job log as is.
    Txt,
    /// The log wrapped in an escaped `<pre>` page.
    Html,
    /// The HTML page rendered by `wkhtmltopdf`.
    Pdf,
}

impl ReportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Txt => "txt",
            ReportFormat::Html => "html",
            ReportFormat::Pdf => "pdf",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ReportFormat::Txt => "text/plain; charset=utf-8",
            ReportFormat::Html => "text/html; charset=utf-8",
            ReportFormat::Pdf => "application/pdf",
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ReportFormat {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "txt" => Ok(ReportFormat::Txt),
            "html" => Ok(ReportFormat::Html),
            "pdf" => Ok(ReportFormat::Pdf),
            other => Err(ScanError::report(format!(
                "Unsupported report format: {other}"
            ))),
        }
    }
}

/// A report file ready to be streamed to the client.
#[derive(Debug, Clone)]
pub struct Report {
    pub path: PathBuf,
    /// `<scanType>_<timestamp>.<format>`
    pub file_name: String,
    pub format: ReportFormat,
}

#[derive(Debug, Clone)]
pub struct ReportGenerator {
    settings: Arc<ScannerSettings>,
}

impl ReportGenerator {
    pub fn new(settings: Arc<ScannerSettings>) -> Self {
        Self { settings }
    }

    pub async fn generate(
        &self,
        job: &ScanJobSummary,
        format: ReportFormat,
    ) -> Result<Report> {
        let file_name =
            format!("{}_{}.{}", job.scan_type, job.timestamp, format);

        if !tokio::fs::try_exists(&job.output_file).await.unwrap_or(false) {
            return Err(ScanError::report(format!(
                "Scan output not found for {}",
                job.id
            )));
        }

        let path = match format {
            ReportFormat::Txt => job.output_file.clone(),
            ReportFormat::Html => self.write_html(job).await?,
            ReportFormat::Pdf => {
                let html = self.write_html(job).await?;
                self.convert_to_pdf(&html).await?
            }
        };

        debug!(
            scan_id = %job.id,
            format = %format,
            path = %path.display(),
            "report ready"
        );
        Ok(Report {
            path,
            file_name,
            format,
        })
    }

    async fn write_html(&self, job: &ScanJobSummary) -> Result<PathBuf> {
        let output = tokio::fs::read(&job.output_file).await.map_err(|err| {
            ScanError::report(format!("Failed to read scan output: {err}"))
        })?;
        let output = String::from_utf8_lossy(&output);

        let path = job.output_file.with_extension("html");
        tokio::fs::write(&path, render_html(job, &output))
            .await
            .map_err(|err| {
                ScanError::report(format!("Failed to write HTML report: {err}"))
            })?;
        Ok(path)
    }

    async fn convert_to_pdf(&self, html: &Path) -> Result<PathBuf> {
        let pdf = html.with_extension("pdf");
        let status = tokio::process::Command::new(
            &self.settings.wkhtmltopdf_path,
        )
        .arg("--quiet")
        .arg(html)
        .arg(&pdf)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map_err(|err| {
            ScanError::report(format!(
                "PDF generation requires {}: {err}",
                self.settings.wkhtmltopdf_path
            ))
        })?;

        if !status.success() {
            return Err(ScanError::report(format!(
                "PDF generation failed: {status}"
            )));
        }
        info!(path = %pdf.display(), "rendered PDF report");
        Ok(pdf)
    }
}

fn render_html(job: &ScanJobSummary, output: &str) -> String {
    let title = format!(
        "{} scan report: {}",
        job.scan_type.label(),
        escape_html(&job.target)
    );
    let mut html = String::with_capacity(output.len() + 1024);
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str(&format!("<title>{title}</title>\n"));
    html.push_str(
        "<style>body{font-family:sans-serif;margin:2em}\
         pre{background:#111;color:#ddd;padding:1em;white-space:pre-wrap}\
         dt{font-weight:bold}</style>\n",
    );
    html.push_str("</head>\n<body>\n");
    html.push_str(&format!("<h1>{title}</h1>\n<dl>\n"));
    for (label, value) in [
        ("Scan ID", job.id.to_string()),
        ("Scan type", job.scan_type.to_string()),
        ("Target", job.target.clone()),
        ("Option", job.option.clone()),
        ("Status", job.status.to_string()),
        ("Started", job.created_at.to_rfc3339()),
    ] {
        html.push_str(&format!(
            "<dt>{label}</dt><dd>{}</dd>\n",
            escape_html(&value)
        ));
    }
    if let Some(error) = &job.error {
        html.push_str(&format!(
            "<dt>Error</dt><dd>{}</dd>\n",
            escape_html(error)
        ));
    }
    html.push_str("</dl>\n<h2>Output</h2>\n<pre>");
    html.push_str(&escape_html(output));
    html.push_str("</pre>\n</body>\n</html>\n");
    html
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::{JobRegistry, ScanType};

    fn job_with_output(
        root: &Path,
        output: &str,
    ) -> (ReportGenerator, ScanJobSummary) {
        let settings = Arc::new(ScannerSettings::with_root(root));
        let registry = JobRegistry::new(&settings.results_dir);
        let job = registry
            .create(ScanType::Webscan, "<b>example.com</b>", "")
            .unwrap();
        std::fs::write(&job.output_file, output).unwrap();
        (ReportGenerator::new(settings), job.summary())
    }

    #[test]
    fn formats_parse_case_insensitively() {
        assert_eq!("TXT".parse::<ReportFormat>().unwrap(), ReportFormat::Txt);
        assert_eq!("html".parse::<ReportFormat>().unwrap(), ReportFormat::Html);
        let err = "docx".parse::<ReportFormat>().unwrap_err();
        assert!(matches!(err, ScanError::ReportGeneration(_)));
    }

    #[tokio::test]
    async fn txt_report_is_the_persisted_output() {
        let dir = tempfile::tempdir().unwrap();
        let (reports, job) = job_with_output(dir.path(), "+ Server: nginx\n");

        let report = reports.generate(&job, ReportFormat::Txt).await.unwrap();
        assert_eq!(report.path, job.output_file);
        assert_eq!(
            report.file_name,
            format!("webscan_{}.txt", job.timestamp)
        );
    }

    #[tokio::test]
    async fn html_report_escapes_output_and_target() {
        let dir = tempfile::tempdir().unwrap();
        let (reports, job) =
            job_with_output(dir.path(), "<script>alert(1)</script>\n");

        let report = reports.generate(&job, ReportFormat::Html).await.unwrap();
        assert_eq!(report.path.extension().unwrap(), "html");

        let html = std::fs::read_to_string(&report.path).unwrap();
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
        assert!(html.contains("&lt;b&gt;example.com&lt;/b&gt;"));
        assert!(!html.contains("<script>"));
    }

    #[tokio::test]
    async fn missing_output_is_a_report_error() {
        let dir = tempfile::tempdir().unwrap();
        let (reports, job) = job_with_output(dir.path(), "");
        std::fs::remove_file(&job.output_file).unwrap();

        let err = reports.generate(&job, ReportFormat::Txt).await.unwrap_err();
        assert!(matches!(err, ScanError::ReportGeneration(_)));
    }

    #[tokio::test]
    async fn pdf_without_converter_is_a_report_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = ScannerSettings::with_root(dir.path());
        settings.wkhtmltopdf_path =
            dir.path().join("missing-wkhtmltopdf").display().to_string();
        let settings = Arc::new(settings);
        let registry = JobRegistry::new(&settings.results_dir);
        let job =
            registry.create(ScanType::Portscan, "example.com", "").unwrap();
        std::fs::write(&job.output_file, "PORT STATE\n").unwrap();

        let err = ReportGenerator::new(settings)
            .generate(&job.summary(), ReportFormat::Pdf)
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("PDF generation requires"));
    }
}
