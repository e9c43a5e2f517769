//! Report template: operator-supplied names, image paths and notes
//!
//! A plain text file of `name = value` lines. Values are taken by position,
//! not by name, in this order:
//!
//! ```text
//! font, author, supervisor, im1 … im12, test_temp,
//! time_text, freq_text, flow_text, cox_text, results_text
//! ```
//!
//! Lines that do not match the pattern are ignored. Missing trailing
//! entries default to empty strings.

use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, RheoError};

pub const IMAGE_COUNT: usize = 12;

const LINE_PATTERN: &str = r"^\s*([\w_]+)\s*=\s*(.+)\s*$";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportTemplate {
    pub font: String,
    pub author: String,
    pub supervisor: String,
    /// im1 … im12: syringe (1, 2), before/after time sweep (3, 4), frequency
    /// sweep (5, 6) and flow step (7, 8), then the four test figures (9 … 12)
    pub images: [String; IMAGE_COUNT],
    pub test_temp: String,
    pub time_text: String,
    pub freq_text: String,
    pub flow_text: String,
    pub cox_text: String,
    pub results_text: String,
}

/// `name = value` pairs in file order
pub fn parse_assignments(contents: &str) -> Result<Vec<(String, String)>> {
    let re = Regex::new(LINE_PATTERN).map_err(|e| RheoError::Report(e.to_string()))?;
    Ok(contents
        .lines()
        .filter_map(|line| re.captures(line))
        .map(|caps| (caps[1].to_string(), caps[2].trim().to_string()))
        .collect())
}

impl ReportTemplate {
    pub fn parse(contents: &str) -> Result<Self> {
        let values: Vec<String> = parse_assignments(contents)?.into_iter().map(|(_, v)| v).collect();
        let at = |i: usize| values.get(i).cloned().unwrap_or_default();
        Ok(Self {
            font: at(0),
            author: at(1),
            supervisor: at(2),
            images: std::array::from_fn(|k| at(3 + k)),
            test_temp: at(15),
            time_text: at(16),
            freq_text: at(17),
            flow_text: at(18),
            cox_text: at(19),
            results_text: at(20),
        })
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::parse(&fs::read_to_string(path)?)
    }

    /// Image `k` (1-based, as in the template), if one was given
    pub fn image(&self, k: usize) -> Option<PathBuf> {
        self.images
            .get(k.wrapping_sub(1))
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEMPLATE: &str = "\
# report settings
font = Arial
author = A. Author
supervisor   =   B. Supervisor
im1 = photos/s57_a.jpg
im2 = photos/s57_b.jpg
im3 = x3.png
im4 = x4.png
im5 = x5.png
im6 = x6.png
im7 = x7.png
im8 = x8.png
im9 = x9.png
im10 = x10.png
im11 = x11.png
im12 = x12.png
test_temp = 37
time_text = Plateau reached after 30 s.
freq_text = G' dominates above 2 rad/s.
";

    #[test]
    fn test_positional_parse() {
        let t = ReportTemplate::parse(TEMPLATE).unwrap();
        assert_eq!(t.font, "Arial");
        assert_eq!(t.supervisor, "B. Supervisor");
        assert_eq!(t.images[0], "photos/s57_a.jpg");
        assert_eq!(t.images[11], "x12.png");
        assert_eq!(t.test_temp, "37");
        assert_eq!(t.freq_text, "G' dominates above 2 rad/s.");
        // not given
        assert_eq!(t.flow_text, "");
        assert_eq!(t.results_text, "");
    }

    #[test]
    fn test_image_lookup() {
        let t = ReportTemplate::parse(TEMPLATE).unwrap();
        assert_eq!(t.image(1), Some(PathBuf::from("photos/s57_a.jpg")));
        assert_eq!(t.image(0), None);
        assert_eq!(t.image(13), None);
        assert_eq!(ReportTemplate::default().image(3), None);
    }

    #[test]
    fn test_non_matching_lines_ignored() {
        let pairs = parse_assignments("no equals here\nkey = value = more\n = missing name\n").unwrap();
        assert_eq!(pairs, vec![("key".to_string(), "value = more".to_string())]);
    }
}
