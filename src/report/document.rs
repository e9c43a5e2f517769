/// Per-sample report document
///
/// Builds the report as a paginated HTML document. Pages break where the
/// printed report turns a page; every page after the first carries the lab
/// header and every page a "Page N" footer. Tables and figures are numbered
/// in order of appearance.
///
/// # Layout
/// 1. Sample's Information: dates, storage and COVID-19 status
/// 2. Sample's Description: volume, appearance, composition, syringe photos
/// 3. Analysis: one subsection per test with results (time sweep, frequency
///    sweep, flow step, Cox-Merz when both of the last two are present)
/// 4. Results: the author's closing text

use chrono::NaiveDate;
use std::path::PathBuf;

use crate::analysis::time_sweep::TimeWindow;
use crate::database::sample_db::SampleEntry;
use crate::database::stat_db::StatResults;
use crate::records::choices::{yes_no, Choice};
use crate::records::sample::DATE_FORMAT;
use crate::report::template::ReportTemplate;
use crate::utils::{relative_deviation, round_to};

const STYLE: &str = "\
body { margin: 0; }
section.page { padding: 10mm 0; page-break-after: always; position: relative; min-height: 250mm; }
section.page:last-child { page-break-after: auto; }
.running-header { color: #808080; font-size: 10pt; margin-bottom: 6mm; }
.page-footer { color: #808080; font-size: 10pt; text-align: center; position: absolute; bottom: 0; width: 100%; }
h1 { text-align: center; font-size: 16pt; }
h2 { font-size: 12pt; }
p { font-size: 12pt; text-align: justify; }
p.caption { font-style: italic; font-size: 10pt; text-align: center; }
p.table-caption { font-style: italic; font-size: 10pt; }
p.notes-title { text-decoration: underline; }
table { border-collapse: collapse; margin-bottom: 6mm; }
td { border: 1px solid #000; padding: 1mm 3mm; min-width: 55mm; font-size: 12pt; }
.pair { display: flex; justify-content: space-between; }
.pair img { width: 43%; }
img.figure { display: block; margin: 0 auto; width: 80%; }
";

/// Rendered test figures; `None` falls back to the template images 9 … 12
#[derive(Debug, Clone, Default)]
pub struct ReportFigures {
    pub time_sweep: Option<PathBuf>,
    pub frequency_sweep: Option<PathBuf>,
    pub flow_step: Option<PathBuf>,
    pub cox_merz: Option<PathBuf>,
}

pub struct SampleReport<'a> {
    pub entry: &'a SampleEntry,
    pub results: &'a StatResults,
    pub window: TimeWindow,
    pub template: &'a ReportTemplate,
    pub figures: &'a ReportFigures,
    /// Report (and test) date
    pub date: NaiveDate,
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn value(v: Option<f64>) -> String {
    v.map(|v| round_to(v, 4).to_string()).unwrap_or_else(|| "-".to_string())
}

fn percent(fraction: Option<f64>) -> String {
    fraction
        .map(|f| format!("{} %", round_to(f * 100.0, 4)))
        .unwrap_or_else(|| "-".to_string())
}

fn difference(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    Some(relative_deviation(a?, b?))
}

/// Page-by-page HTML builder with running figure and table numbers
struct Document {
    header: String,
    pages: Vec<String>,
    figures: usize,
    tables: usize,
}

impl Document {
    fn new(header: String) -> Self {
        Self { header, pages: vec![String::new()], figures: 0, tables: 0 }
    }

    fn push(&mut self, html: &str) {
        if let Some(page) = self.pages.last_mut() {
            page.push_str(html);
            page.push('\n');
        }
    }

    fn paragraph(&mut self, text: &str) {
        self.push(&format!("<p>{}</p>", escape(text)));
    }

    fn new_page(&mut self) {
        self.pages.push(String::new());
    }

    fn figure(&mut self, image: Option<PathBuf>, caption: &str) {
        self.figures += 1;
        if let Some(image) = image {
            self.push(&format!(r#"<img class="figure" src="{}">"#, escape(&image.display().to_string())));
        }
        self.push(&format!(r#"<p class="caption">Figure {}. {}</p>"#, self.figures, escape(caption)));
    }

    fn figure_pair(&mut self, left: Option<PathBuf>, right: Option<PathBuf>, caption: &str) {
        self.figures += 1;
        let img = |p: Option<PathBuf>| {
            p.map(|p| format!(r#"<img src="{}">"#, escape(&p.display().to_string())))
                .unwrap_or_default()
        };
        self.push(&format!(r#"<div class="pair">{}{}</div>"#, img(left), img(right)));
        self.push(&format!(r#"<p class="caption">Figure {}. {}</p>"#, self.figures, escape(caption)));
    }

    fn table(&mut self, caption: Option<&str>, rows: &[(&str, String)]) {
        if let Some(caption) = caption {
            self.tables += 1;
            self.push(&format!(r#"<p class="table-caption">Table {}: {}</p>"#, self.tables, escape(caption)));
        }
        let mut html = String::from("<table>\n");
        for (name, cell) in rows {
            html.push_str(&format!("<tr><td>{}</td><td>{}</td></tr>\n", escape(name), escape(cell)));
        }
        html.push_str("</table>");
        self.push(&html);
    }

    fn notes(&mut self, text: &str) {
        self.push(r#"<p class="notes-title">Author's notes:</p>"#);
        self.paragraph(text);
    }

    fn render(&self, title: &str, font: &str) -> String {
        let font = if font.is_empty() { "sans-serif" } else { font };
        let mut html = format!(
            "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n<style>\nbody {{ font-family: {}; }}\n{}</style>\n</head>\n<body>\n",
            escape(title),
            escape(font),
            STYLE
        );
        for (i, page) in self.pages.iter().enumerate() {
            html.push_str("<section class=\"page\">\n");
            if i > 0 {
                html.push_str(&format!("<div class=\"running-header\">{}</div>\n", escape(&self.header)));
            }
            html.push_str(page);
            html.push_str(&format!("<div class=\"page-footer\">Page {}</div>\n</section>\n", i + 1));
        }
        html.push_str("</body>\n</html>\n");
        html
    }
}

impl<'a> SampleReport<'a> {
    pub fn sample_id(&self) -> String {
        self.entry.sample.id()
    }

    pub fn title(&self) -> String {
        format!("Report - HSF_{}", self.sample_id())
    }

    pub fn header(&self) -> String {
        format!(
            "© Biomedical Engineering Lab | Chemical Engineering AUTh - HSF_{}_Report",
            self.sample_id()
        )
    }

    /// `<SID>_Report_<DD_MM_YYYY>`
    pub fn file_stem(&self) -> String {
        format!("{}_Report_{}", self.sample_id(), self.date.format("%d_%m_%Y"))
    }

    pub fn has_time_sweep(&self) -> bool {
        self.results.ts_storage_mean.is_some()
    }

    pub fn has_frequency_sweep(&self) -> bool {
        self.results.fs_storage_ref.is_some()
    }

    pub fn has_flow_step(&self) -> bool {
        self.results.flow_viscosity.is_some()
    }

    pub fn to_html(&self) -> String {
        let sid = self.sample_id();
        let sample = &self.entry.sample;
        let r = self.results;
        let t = self.template;
        let temp = &t.test_temp;
        let mut doc = Document::new(self.header());

        // Title and authorship
        doc.push(&format!("<h1>{}</h1>", escape(&self.title())));
        doc.paragraph(&format!("Author: {}", t.author));
        doc.paragraph(&format!("Supervisor: {}", t.supervisor));
        doc.paragraph(&format!("Date: {}", self.date.format(DATE_FORMAT)));

        // 1. Sample's information
        doc.push("<h2>1. Sample's Information</h2>");
        doc.table(
            Some("Sample's information summary."),
            &[
                ("Sampling date", sample.date.format(DATE_FORMAT).to_string()),
                ("Test date", self.date.format(DATE_FORMAT).to_string()),
                ("Stored in freezer", yes_no(sample.freezer_storage).to_string()),
                ("COVID 19 in general", yes_no(sample.covid).to_string()),
                ("COVID 19 vaccination", yes_no(sample.vaccinated).to_string()),
                ("COVID 19 when tested", yes_no(sample.covid_now).to_string()),
            ],
        );

        // 2. Sample's description
        doc.push("<h2>2. Sample's Description</h2>");
        doc.paragraph(&format!(
            "The sample had a total volume of approximately {} ml. It was {} in color, {}, {}, {}.",
            sample.total_volume_ml,
            sample.color.label(),
            sample.transparency.label(),
            sample.texture.label(),
            sample.composition_phrase()
        ));
        doc.figure_pair(t.image(1), t.image(2), &format!("HSF_{} in syringe.", sid));
        doc.new_page();

        // 3. Analysis
        doc.push("<h2>3. Analysis</h2>");

        if self.has_time_sweep() {
            doc.paragraph(&format!(
                "Time Sweep test at {temp} oC: The variation of G', G'' (Pa) over time (min) at {temp} oC with \
                 an oscillation frequency of 3.142 rad/s and a 3% shear stress."
            ));
            doc.figure(
                self.figures.time_sweep.clone().or_else(|| t.image(9)),
                &format!("Time sweep test at {} oC.", temp),
            );
            doc.paragraph(&format!(
                "The means and standard deviation are calculated for the data from {} to {} minutes.",
                self.window.start_min(), self.window.finish_min()
            ));
            doc.table(
                Some("Time sweep analysis results."),
                &[
                    ("Mean G'", value(r.ts_storage_mean)),
                    ("Standard Deviation G'", percent(r.ts_storage_std)),
                    ("Mean G''", value(r.ts_loss_mean)),
                    ("Standard Deviation G''", percent(r.ts_loss_std)),
                ],
            );
            doc.new_page();
            doc.figure_pair(
                t.image(3),
                t.image(4),
                &format!("HSF_{} before (left) and after (right) Time Sweep test at {} oC.", sid, temp),
            );
            doc.notes(&t.time_text);
            doc.new_page();
        }

        if self.has_frequency_sweep() {
            doc.paragraph(&format!(
                "Frequency Sweep test at {temp} oC: The variation of G', G'' (Pa) and |n*| (Pa s) as a function \
                 of the oscillation frequency of the strain (rad/s) at {temp} oC."
            ));
            doc.figure(
                self.figures.frequency_sweep.clone().or_else(|| t.image(10)),
                &format!("Frequency sweep test at {} oC.", temp),
            );
            if let Some(crossover) = r.crossover {
                doc.paragraph(&format!("Cross over point at {} rad/s.", crossover));
            }
            doc.table(
                Some("Frequency sweep analysis results."),
                &[
                    ("Time sweep G'", value(r.ts_storage_mean)),
                    ("Frequency sweep G'", value(r.fs_storage_ref)),
                    ("Percentage difference", percent(difference(r.ts_storage_mean, r.fs_storage_ref))),
                    ("Time sweep G''", value(r.ts_loss_mean)),
                    ("Frequency sweep G''", value(r.fs_loss_ref)),
                    ("Percentage difference", percent(difference(r.ts_loss_mean, r.fs_loss_ref))),
                ],
            );
            doc.table(
                None,
                &[
                    ("Frequency sweep G' at 0.68 rad/s", value(r.fs_storage_low)),
                    ("Frequency sweep G'' at 0.68 rad/s", value(r.fs_loss_low)),
                    ("Frequency sweep G' at 14.58 rad/s", value(r.fs_storage_high)),
                    ("Frequency sweep G'' at 14.58 rad/s", value(r.fs_loss_high)),
                ],
            );
            doc.new_page();
            doc.figure_pair(
                t.image(5),
                t.image(6),
                &format!("HSF_{} before (left) and after (right) Frequency Sweep test at {} oC.", sid, temp),
            );
            doc.notes(&t.freq_text);
            doc.new_page();
        }

        if self.has_flow_step() {
            doc.paragraph(&format!(
                "Flow step test at {temp} oC: The variation of viscosity (Pa s) with shear rate (1/s) at {temp} oC."
            ));
            doc.figure(
                self.figures.flow_step.clone().or_else(|| t.image(11)),
                &format!("Flow step test at {} oC.", temp),
            );
            doc.paragraph("Cross model parameters:");
            doc.table(
                Some("Flow step analysis results."),
                &[
                    ("Zero-rate viscosity (Pa s)", value(r.eta_0)),
                    ("Infinite-rate viscosity (Pa s)", value(r.eta_inf)),
                    ("Consistency (s)", value(r.consistency)),
                    ("Rate index", value(r.rate_index)),
                    ("% error", value(r.standard_error)),
                ],
            );
            doc.new_page();
            doc.figure_pair(
                t.image(7),
                t.image(8),
                &format!("HSF_{} before (left) and after (right) Flow Step test at {} oC.", sid, temp),
            );
            doc.notes(&t.flow_text);
            doc.new_page();
        }

        if self.has_frequency_sweep() && self.has_flow_step() {
            doc.paragraph(&format!(
                "Cox-Merz rule at {temp} oC: The viscosity variation as a function of the shear rate (1/s) and \
                 the angular frequency (rad/s) from the Flow step and Frequency sweep, respectively at {temp} oC."
            ));
            doc.figure(
                self.figures.cox_merz.clone().or_else(|| t.image(12)),
                &format!("Cox-Merz rule at {} oC.", temp),
            );
            doc.table(
                Some("Cox-Merz rule results."),
                &[
                    ("Flow step viscosity", value(r.flow_viscosity)),
                    ("Frequency sweep |n*|", value(r.fs_viscosity)),
                    ("Percentage difference", percent(difference(r.flow_viscosity, r.fs_viscosity))),
                ],
            );
            doc.notes(&t.cox_text);
            doc.new_page();
        }

        // 4. Results
        doc.push("<h2>4. Results</h2>");
        doc.paragraph(&t.results_text);

        doc.render(&self.title(), &t.font)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::sample::fixtures::knee_oa_sample;

    fn entry() -> SampleEntry {
        SampleEntry { sample: knee_oa_sample(57), tests: Vec::new() }
    }

    fn template() -> ReportTemplate {
        ReportTemplate {
            font: "Arial".into(),
            author: "A. Author".into(),
            supervisor: "B. Supervisor".into(),
            test_temp: "37".into(),
            time_text: "Stable plateau.".into(),
            results_text: "Typical OA fluid.".into(),
            ..Default::default()
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 2).unwrap()
    }

    #[test]
    fn test_title_header_and_file_stem() {
        let (e, r, t, f) = (entry(), StatResults::default(), template(), ReportFigures::default());
        let report = SampleReport {
            entry: &e, results: &r, window: TimeWindow::default(), template: &t, figures: &f, date: date(),
        };
        assert_eq!(report.title(), "Report - HSF_S57");
        assert_eq!(report.file_stem(), "S57_Report_02_05_2024");
        assert!(report.header().ends_with("HSF_S57_Report"));
    }

    #[test]
    fn test_sections_follow_available_results() {
        let (e, t, f) = (entry(), template(), ReportFigures::default());
        let r = StatResults {
            ts_storage_mean: Some(2.5),
            ts_loss_mean: Some(1.25),
            ts_storage_std: Some(0.0123),
            ts_loss_std: Some(0.02),
            ..Default::default()
        };
        let report = SampleReport {
            entry: &e, results: &r, window: TimeWindow::default(), template: &t, figures: &f, date: date(),
        };
        let html = report.to_html();
        assert!(html.contains("<title>Report - HSF_S57</title>"));
        assert!(html.contains("Author: A. Author"));
        assert!(html.contains("Date: 02/05/2024"));
        assert!(html.contains("Sampling date"));
        assert!(html.contains("14/03/2023"));
        assert!(html.contains("It was yellow in color, transparent, viscous, without blood, but with tissue."));
        assert!(html.contains("Time Sweep test at 37 oC"));
        assert!(html.contains("from 0.5 to 5 minutes"));
        assert!(html.contains("1.23 %"));
        assert!(html.contains("Stable plateau."));
        assert!(!html.contains("Frequency Sweep test"));
        assert!(!html.contains("Cox-Merz rule at"));
        assert!(html.contains("4. Results"));
        // tables and figures numbered in order
        assert!(html.contains("Table 1: Sample&#39;s") || html.contains("Table 1: Sample's"));
        assert!(html.contains("Table 2: Time sweep analysis results."));
        assert!(html.contains("Figure 1. HSF_S57 in syringe."));
        assert!(html.contains("Figure 2. Time sweep test at 37 oC."));
        assert!(html.contains("Figure 3. HSF_S57 before (left)"));
        // header only after the first page, footer on every page
        assert!(html.contains("Page 1"));
        assert!(html.contains("Page 4"));
        assert_eq!(html.matches("running-header\">").count(), 3);
    }

    #[test]
    fn test_cox_merz_needs_both_tests() {
        let (e, t) = (entry(), template());
        let f = ReportFigures { cox_merz: Some(PathBuf::from("S57_cox_merz.svg")), ..Default::default() };
        let r = StatResults {
            fs_storage_ref: Some(3.0),
            fs_loss_ref: Some(1.0),
            crossover: Some(2.5),
            fs_viscosity: Some(1.1),
            flow_viscosity: Some(1.0),
            eta_0: Some(4.0),
            ..Default::default()
        };
        let report = SampleReport {
            entry: &e, results: &r, window: TimeWindow::default(), template: &t, figures: &f, date: date(),
        };
        let html = report.to_html();
        assert!(html.contains("Cross over point at 2.5 rad/s."));
        assert!(html.contains("Flow step test at 37 oC"));
        assert!(html.contains("Cox-Merz rule at 37 oC"));
        assert!(html.contains("S57_cox_merz.svg"));
        assert!(html.contains("9.5238 %"));
    }
}
