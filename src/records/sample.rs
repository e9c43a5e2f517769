/// Sample description record
///
/// One row of metadata per synovial-fluid sample, captured at the bench
/// before any rheometer test is run. Field order is fixed: it is the order
/// of the prompts, of the numbered review list, and of the first eighteen
/// columns of the sample database.

use chrono::NaiveDate;

use crate::error::{Result, RheoError};
use crate::records::choices::{
    parse_yes_no, yes_no, Choice, Color, Condition, Gender, Joint, Texture, Transparency,
};

/// Date format used on the bench sheet and in every spreadsheet file
pub const DATE_FORMAT: &str = "%d/%m/%Y";

/// Number of fields in a sample description
pub const SAMPLE_FIELD_COUNT: usize = 18;

/// Labels of the sample fields, in order
pub const SAMPLE_FIELD_LABELS: [&str; SAMPLE_FIELD_COUNT] = [
    "ID",
    "Date",
    "Gender",
    "Age",
    "Joint",
    "Condition",
    "Total Volume (mL)",
    "Color",
    "Transparency",
    "Texture",
    "Blood",
    "Clot",
    "Tissue",
    "Storage in freezer",
    "COVID 19",
    "Vaccinated COVID 19",
    "COVID 19 now",
    "Number of Tests",
];

#[derive(Debug, Clone, PartialEq)]
pub struct SampleDescription {
    /// Sample number; the ID is `S<number>`
    pub number: u32,
    pub date: NaiveDate,
    pub gender: Gender,
    pub age: u32,
    pub joint: Joint,
    pub condition: Condition,
    pub total_volume_ml: f64,
    pub color: Color,
    pub transparency: Transparency,
    pub texture: Texture,
    pub blood: bool,
    pub clot: bool,
    pub tissue: bool,
    pub freezer_storage: bool,
    pub covid: bool,
    pub vaccinated: bool,
    pub covid_now: bool,
    pub number_of_tests: u32,
}

/// Format a sample number as its ID
pub fn sample_id(number: u32) -> String {
    format!("S{}", number)
}

/// Parse `S57` (or `s57`) into 57
pub fn parse_sample_id(id: &str) -> Result<u32> {
    let trimmed = id.trim();
    trimmed
        .strip_prefix('S')
        .or_else(|| trimmed.strip_prefix('s'))
        .and_then(|digits| digits.parse::<u32>().ok())
        .ok_or_else(|| RheoError::InvalidInput(format!("'{}' is not a sample ID like S57", id)))
}

/// Parse a non-negative integer the way the bench prompts accept it
pub fn parse_count(input: &str) -> Result<u32> {
    let trimmed = input.trim();
    if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return Err(RheoError::InvalidInput(format!("'{}' is not a valid integer", trimmed)));
    }
    trimmed
        .parse::<u32>()
        .map_err(|_| RheoError::InvalidInput(format!("'{}' is out of range", trimmed)))
}

/// Parse a finite decimal number (`NaN` and `inf` are rejected)
pub fn parse_decimal(input: &str) -> Result<f64> {
    let trimmed = input.trim();
    trimmed
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| RheoError::InvalidInput(format!("'{}' is not a valid number", trimmed)))
}

/// Parse a fluid volume in mL
pub fn parse_volume(input: &str) -> Result<f64> {
    let volume = parse_decimal(input)?;
    if volume < 0.0 {
        return Err(RheoError::InvalidInput(format!("volume {} must not be negative", volume)));
    }
    Ok(volume)
}

pub fn parse_date(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), DATE_FORMAT).map_err(|_| {
        RheoError::InvalidInput(format!("'{}' is not a date in the format DD/MM/YYYY", input.trim()))
    })
}

impl SampleDescription {
    pub fn id(&self) -> String {
        sample_id(self.number)
    }

    /// Display values of all fields, in field order
    pub fn values(&self) -> Vec<String> {
        vec![
            self.id(),
            self.date.format(DATE_FORMAT).to_string(),
            self.gender.to_string(),
            self.age.to_string(),
            self.joint.to_string(),
            self.condition.to_string(),
            self.total_volume_ml.to_string(),
            self.color.to_string(),
            self.transparency.to_string(),
            self.texture.to_string(),
            yes_no(self.blood).to_string(),
            yes_no(self.clot).to_string(),
            yes_no(self.tissue).to_string(),
            yes_no(self.freezer_storage).to_string(),
            yes_no(self.covid).to_string(),
            yes_no(self.vaccinated).to_string(),
            yes_no(self.covid_now).to_string(),
            self.number_of_tests.to_string(),
        ]
    }

    /// Replace one field from text, re-validating it
    ///
    /// # Arguments
    /// * `position` - 1-based field position (1..=18)
    /// * `text` - New value as typed
    pub fn set_field(&mut self, position: usize, text: &str) -> Result<()> {
        match position {
            1 => self.number = parse_sample_id(text).or_else(|_| parse_count(text))?,
            2 => self.date = parse_date(text)?,
            3 => self.gender = Gender::parse(text)?,
            4 => self.age = parse_count(text)?,
            5 => self.joint = Joint::parse(text)?,
            6 => self.condition = Condition::parse(text)?,
            7 => self.total_volume_ml = parse_volume(text)?,
            8 => self.color = Color::parse(text)?,
            9 => self.transparency = Transparency::parse(text)?,
            10 => self.texture = Texture::parse(text)?,
            11 => self.blood = parse_yes_no(text)?,
            12 => self.clot = parse_yes_no(text)?,
            13 => self.tissue = parse_yes_no(text)?,
            14 => self.freezer_storage = parse_yes_no(text)?,
            15 => self.covid = parse_yes_no(text)?,
            16 => self.vaccinated = parse_yes_no(text)?,
            17 => self.covid_now = parse_yes_no(text)?,
            18 => self.number_of_tests = parse_count(text)?,
            _ => {
                return Err(RheoError::InvalidInput(format!(
                    "field position {} is outside 1..={}",
                    position, SAMPLE_FIELD_COUNT
                )))
            }
        }
        Ok(())
    }

    /// Rebuild a description from the first eighteen cells of a database row
    pub fn from_values(values: &[&str]) -> Result<Self> {
        if values.len() < SAMPLE_FIELD_COUNT {
            return Err(RheoError::InvalidInput(format!(
                "sample row has {} cells, expected {}",
                values.len(),
                SAMPLE_FIELD_COUNT
            )));
        }
        let mut sample = SampleDescription {
            number: parse_sample_id(values[0])?,
            date: parse_date(values[1])?,
            gender: Gender::parse(values[2])?,
            age: parse_count(values[3])?,
            joint: Joint::parse(values[4])?,
            condition: Condition::parse(values[5])?,
            total_volume_ml: parse_decimal(values[6])?,
            color: Color::parse(values[7])?,
            transparency: Transparency::parse(values[8])?,
            texture: Texture::parse(values[9])?,
            blood: false,
            clot: false,
            tissue: false,
            freezer_storage: false,
            covid: false,
            vaccinated: false,
            covid_now: false,
            number_of_tests: 0,
        };
        for (offset, value) in values[10..SAMPLE_FIELD_COUNT].iter().enumerate() {
            sample.set_field(11 + offset, value)?;
        }
        Ok(sample)
    }

    /// Blood / clot / tissue phrase used in the report description
    pub fn composition_phrase(&self) -> &'static str {
        match (self.blood, self.clot, self.tissue) {
            (true, true, true) => "with blood, clot and tissue",
            (true, true, false) => "with blood and clot, but without tissue",
            (true, false, true) => "with blood and tissue, but without clot",
            (true, false, false) => "with blood, but without tissue or clot",
            (false, _, true) => "without blood, but with tissue",
            (false, _, false) => "without blood, clot and tissue",
        }
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::knee_oa_sample;
    use super::*;

    #[test]
    fn test_sample_id_round_trip() {
        assert_eq!(sample_id(57), "S57");
        assert_eq!(parse_sample_id("S57").unwrap(), 57);
        assert_eq!(parse_sample_id(" s3 ").unwrap(), 3);
        assert!(parse_sample_id("57").is_err());
        assert!(parse_sample_id("Sx").is_err());
    }

    #[test]
    fn test_parse_count_rejects_signs_and_decimals() {
        assert_eq!(parse_count("12").unwrap(), 12);
        assert!(parse_count("-1").is_err());
        assert!(parse_count("1.5").is_err());
        assert!(parse_count("").is_err());
    }

    #[test]
    fn test_values_follow_field_order() {
        let sample = knee_oa_sample(12);
        let values = sample.values();
        assert_eq!(values.len(), SAMPLE_FIELD_COUNT);
        assert_eq!(values[0], "S12");
        assert_eq!(values[1], "14/03/2023");
        assert_eq!(values[5], "oa");
        assert_eq!(values[12], "yes");
        assert_eq!(values[17], "2");
    }

    #[test]
    fn test_from_values_restores_sample() {
        let sample = knee_oa_sample(8);
        let values = sample.values();
        let refs: Vec<&str> = values.iter().map(String::as_str).collect();
        assert_eq!(SampleDescription::from_values(&refs).unwrap(), sample);
    }

    #[test]
    fn test_decimal_and_volume_must_be_physical() {
        assert_eq!(parse_decimal(" 2.5 ").unwrap(), 2.5);
        assert_eq!(parse_decimal("-0.5").unwrap(), -0.5);
        for text in ["NaN", "inf", "-infinity", ""] {
            assert!(matches!(parse_decimal(text), Err(RheoError::InvalidInput(_))), "{}", text);
        }
        assert_eq!(parse_volume("0").unwrap(), 0.0);
        assert!(parse_volume("-1.5").is_err());

        let mut sample = knee_oa_sample(3);
        assert!(sample.set_field(7, "-2").is_err());
        sample.set_field(7, "3.5").unwrap();
        assert_eq!(sample.total_volume_ml, 3.5);
    }

    #[test]
    fn test_set_field_revalidates() {
        let mut sample = knee_oa_sample(1);
        sample.set_field(6, "healthy").unwrap();
        assert_eq!(sample.condition, Condition::Healthy);
        assert!(sample.set_field(6, "flu").is_err());
        assert!(sample.set_field(2, "2023-03-14").is_err());
        assert!(sample.set_field(19, "x").is_err());
        sample.set_field(1, "S44").unwrap();
        assert_eq!(sample.id(), "S44");
    }

    #[test]
    fn test_composition_phrase() {
        let mut sample = knee_oa_sample(1);
        assert_eq!(sample.composition_phrase(), "without blood, but with tissue");
        sample.blood = true;
        sample.clot = true;
        assert_eq!(sample.composition_phrase(), "with blood, clot and tissue");
        sample.tissue = false;
        assert_eq!(sample.composition_phrase(), "with blood and clot, but without tissue");
        sample.blood = false;
        assert_eq!(sample.composition_phrase(), "without blood, clot and tissue");
    }
}
