/// Per-test description record
///
/// A sample runs one or more rheometer tests; each gets its own row in the
/// sample database (columns 19..=23).

use crate::error::{Result, RheoError};
use crate::records::choices::{parse_yes_no, yes_no, Choice, Temperature, TestType};

pub const TEST_FIELD_COUNT: usize = 5;

pub const TEST_FIELD_LABELS: [&str; TEST_FIELD_COUNT] = [
    "Test Type",
    "Temperature (oC)",
    "Tissue in Test",
    "Bubbles before Test",
    "Bubbles after Test",
];

#[derive(Debug, Clone, PartialEq)]
pub struct TestDescription {
    pub test_type: TestType,
    pub temperature: Temperature,
    /// Always false when the sample itself carried no tissue
    pub tissue_in_test: bool,
    pub bubbles_before: bool,
    pub bubbles_after: bool,
}

impl TestDescription {
    pub fn values(&self) -> Vec<String> {
        vec![
            self.test_type.to_string(),
            self.temperature.to_string(),
            yes_no(self.tissue_in_test).to_string(),
            yes_no(self.bubbles_before).to_string(),
            yes_no(self.bubbles_after).to_string(),
        ]
    }

    /// Replace one field (1-based) from text
    ///
    /// Tissue in test cannot be set to yes for a sample without tissue.
    pub fn set_field(&mut self, position: usize, text: &str, sample_has_tissue: bool) -> Result<()> {
        match position {
            1 => self.test_type = TestType::parse(text)?,
            2 => self.temperature = Temperature::parse(text)?,
            3 => {
                let value = parse_yes_no(text)?;
                if value && !sample_has_tissue {
                    return Err(RheoError::InvalidInput(
                        "sample has no tissue, so tissue in test must be 'no'".to_string(),
                    ));
                }
                self.tissue_in_test = value;
            }
            4 => self.bubbles_before = parse_yes_no(text)?,
            5 => self.bubbles_after = parse_yes_no(text)?,
            _ => {
                return Err(RheoError::InvalidInput(format!(
                    "field position {} is outside 1..={}",
                    position, TEST_FIELD_COUNT
                )))
            }
        }
        Ok(())
    }

    pub fn from_values(values: &[&str]) -> Result<Self> {
        if values.len() < TEST_FIELD_COUNT {
            return Err(RheoError::InvalidInput(format!(
                "test row has {} cells, expected {}",
                values.len(),
                TEST_FIELD_COUNT
            )));
        }
        Ok(TestDescription {
            test_type: TestType::parse(values[0])?,
            temperature: Temperature::parse(values[1])?,
            tissue_in_test: parse_yes_no(values[2])?,
            bubbles_before: parse_yes_no(values[3])?,
            bubbles_after: parse_yes_no(values[4])?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frequency_sweep() -> TestDescription {
        TestDescription {
            test_type: TestType::FrequencySweep,
            temperature: Temperature::Body,
            tissue_in_test: false,
            bubbles_before: false,
            bubbles_after: true,
        }
    }

    #[test]
    fn test_values() {
        assert_eq!(frequency_sweep().values(), vec!["frequency sweep", "37", "no", "no", "yes"]);
    }

    #[test]
    fn test_tissue_in_test_requires_sample_tissue() {
        let mut test = frequency_sweep();
        assert!(test.set_field(3, "yes", false).is_err());
        test.set_field(3, "yes", true).unwrap();
        assert!(test.tissue_in_test);
    }

    #[test]
    fn test_from_values() {
        let test = TestDescription::from_values(&["flow step", "25", "no", "yes", "no"]).unwrap();
        assert_eq!(test.test_type, TestType::FlowStep);
        assert_eq!(test.temperature, Temperature::Room);
        assert!(test.bubbles_before);
        assert!(TestDescription::from_values(&["flow step", "30", "no", "yes", "no"]).is_err());
    }
}
