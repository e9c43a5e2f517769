//! Per-sample report generation
//!
//! - `template`: operator-supplied names, photos and notes
//! - `figures`: SVG figures for the report and the cohort analysis
//! - `document`: paginated HTML report
//! - `render`: HTML to PDF through an external renderer

pub mod template;
pub mod figures;
pub mod document;
pub mod render;

pub use template::ReportTemplate;
pub use document::{ReportFigures, SampleReport};
pub use render::{find_pdf_renderer, PdfRenderer};

use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::analysis::export::{export_path, ExperimentExport};
use crate::analysis::sample::{analyze_sample, SampleAnalysis};
use crate::analysis::time_sweep::TimeWindow;
use crate::config::LabConfig;
use crate::database::sample_db::find_sample;
use crate::database::stat_db::{find_record, StatResults};
use crate::error::{Result, RheoError};
use crate::records::sample::sample_id;

/// Files written for one report
#[derive(Debug, Clone, PartialEq)]
pub struct ReportOutput {
    pub html: PathBuf,
    /// `None` when no PDF renderer was available or rendering failed
    pub pdf: Option<PathBuf>,
}

fn absolutize(path: &str) -> String {
    if path.is_empty() {
        return String::new();
    }
    fs::canonicalize(path)
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| path.to_string())
}

/// Draw one figure, logging (not propagating) a failure
fn try_figure(dir: &Path, file_name: String, draw: impl FnOnce(&Path) -> Result<()>) -> Option<PathBuf> {
    let path = dir.join(&file_name);
    match draw(&path) {
        Ok(()) => Some(PathBuf::from(file_name)),
        Err(e) => {
            warn!(figure = %path.display(), error = %e, "figure skipped");
            None
        }
    }
}

/// Test figures next to the report, referenced by file name
pub fn write_figures(dir: &Path, analysis: &SampleAnalysis) -> ReportFigures {
    let sid = &analysis.sample_id;
    ReportFigures {
        time_sweep: analysis.time_data.as_ref().and_then(|data| {
            try_figure(dir, format!("{}_time_sweep.svg", sid), |p| figures::time_sweep_figure(p, data))
        }),
        frequency_sweep: analysis.frequency_data.as_ref().and_then(|data| {
            try_figure(dir, format!("{}_frequency_sweep.svg", sid), |p| figures::frequency_sweep_figure(p, data))
        }),
        flow_step: analysis.flow_data.as_ref().and_then(|data| {
            let curve = analysis.flow_step.as_ref().map(|f| f.curve.as_slice()).unwrap_or_default();
            try_figure(dir, format!("{}_flow_step.svg", sid), |p| figures::flow_step_figure(p, data, curve))
        }),
        cox_merz: analysis.cox_merz.as_ref().and_then(|result| {
            try_figure(dir, format!("{}_cox_merz.svg", sid), |p| figures::cox_merz_figure(p, result))
        }),
    }
}

/// Build the report of sample `S<number>` dated `date`
///
/// Values come from the statistical database when the sample has a row
/// there, otherwise from a fresh analysis of its export. Figures are drawn
/// from the export when present.
pub fn create_sample_report(
    config: &LabConfig,
    number: u32,
    window: TimeWindow,
    date: NaiveDate,
) -> Result<ReportOutput> {
    let paths = &config.paths;
    let sid = sample_id(number);
    let entry = find_sample(&paths.sample_database, &sid)?;

    let mut template = if paths.report_template.exists() {
        ReportTemplate::from_file(&paths.report_template)?
    } else {
        warn!(path = %paths.report_template.display(), "no report template, using empty texts");
        ReportTemplate::default()
    };
    template.images = template.images.map(|p| absolutize(&p));

    let analysis = if export_path(&paths.experiment_dir, &sid).exists() {
        let export = ExperimentExport::load(&paths.experiment_dir, &sid)?;
        Some(analyze_sample(&export, window, &config.analysis.targets())?)
    } else {
        warn!(sample = %sid, "no export found, report without test figures");
        None
    };

    let stored = if paths.stat_database.exists() {
        match find_record(&paths.stat_database, &sid) {
            Ok(record) => Some(record.results),
            Err(RheoError::UnknownSample(_)) => None,
            Err(e) => return Err(e),
        }
    } else {
        None
    };
    let results = match (stored, &analysis) {
        (Some(results), _) => results,
        (None, Some(analysis)) => StatResults::from_analysis(analysis),
        (None, None) => StatResults::default(),
    };

    fs::create_dir_all(&paths.report_dir)?;
    let figures = analysis
        .as_ref()
        .map(|a| write_figures(&paths.report_dir, a))
        .unwrap_or_default();

    let report = SampleReport {
        entry: &entry,
        results: &results,
        window,
        template: &template,
        figures: &figures,
        date,
    };
    let stem = report.file_stem();
    let html = paths.report_dir.join(format!("{}.html", stem));
    fs::write(&html, report.to_html())?;
    info!(sample = %sid, path = %html.display(), "report written");

    let pdf = match find_pdf_renderer() {
        Some(renderer) => {
            let pdf = paths.report_dir.join(format!("{}.pdf", stem));
            match renderer.render(&html, &pdf) {
                Ok(()) => {
                    info!(path = %pdf.display(), "PDF rendered");
                    Some(pdf)
                }
                Err(e) => {
                    warn!(error = %e, "PDF rendering failed, keeping HTML only");
                    None
                }
            }
        }
        None => {
            warn!("no PDF renderer found (wkhtmltopdf or chromium), keeping HTML only");
            None
        }
    };

    Ok(ReportOutput { html, pdf })
}
