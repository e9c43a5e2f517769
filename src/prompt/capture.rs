//! Interactive capture of sample and test descriptions
//!
//! Flow for each record:
//! 1. Prompt every field with validation
//! 2. Print the numbered values for review
//! 3. (S)ave, or (R)evise: pick a field number, type a new value,
//!    review again. (E)xit from the revise menu saves.
//!
//! Any other answer at the save/revise menu aborts the capture.

use std::io::{BufRead, Write};

use tracing::debug;

use crate::analysis::time_sweep::TimeWindow;
use crate::error::{Result, RheoError};
use crate::prompt::input::Prompter;
use crate::records::choices::{
    Color, Condition, Gender, Joint, Temperature, TestType, Texture, Transparency,
};
use crate::records::measurement::{TestDescription, TEST_FIELD_COUNT};
use crate::records::sample::{SampleDescription, SAMPLE_FIELD_COUNT};

/// Prompt for a complete sample description and let the operator review it
pub fn capture_sample<R: BufRead, W: Write>(p: &mut Prompter<R, W>) -> Result<SampleDescription> {
    let mut sample = SampleDescription {
        number: p.integer("Sample's number: ")?,
        date: p.date("Date: (DD/MM/YYYY) ")?,
        gender: p.choice::<Gender>("Gender: (male, female) ")?,
        age: p.integer("Age: ")?,
        joint: p.choice::<Joint>("Joint: (knee, hip, elbow, wrist) ")?,
        condition: p.choice::<Condition>("Condition: (oa, healthy, meniscal tear, etc.) ")?,
        total_volume_ml: p.volume("Total volume (mL): ")?,
        color: p.choice::<Color>("Color: (red, orange, yellow, soft yellow, colorless) ")?,
        transparency: p.choice::<Transparency>("Transparency: (transparent, non-transparent) ")?,
        texture: p.choice::<Texture>("Texture: (viscous, non-viscous) ")?,
        blood: p.yes_no("Blood: (yes, no) ")?,
        clot: p.yes_no("Clot: (yes, no) ")?,
        tissue: p.yes_no("Tissue: (yes, no) ")?,
        freezer_storage: p.yes_no("Storage in freezer (-20oC): (yes, no) ")?,
        covid: p.yes_no("COVID-19: (yes, no) ")?,
        vaccinated: p.yes_no("Vaccinated for COVID-19: (yes, no) ")?,
        covid_now: p.yes_no("COVID-19 now: (yes, no) ")?,
        number_of_tests: p.integer("Number of tests: ")?,
    };

    review(p, &mut sample, SAMPLE_FIELD_COUNT, SampleDescription::values, |s, pos, text| {
        s.set_field(pos, text)
    })?;
    p.say("Sample data are saved.")?;
    debug!(sample = %sample.id(), "captured sample description");
    Ok(sample)
}

/// Prompt for `sample.number_of_tests` test descriptions
pub fn capture_tests<R: BufRead, W: Write>(
    p: &mut Prompter<R, W>,
    sample: &SampleDescription,
) -> Result<Vec<TestDescription>> {
    let mut tests = Vec::with_capacity(sample.number_of_tests as usize);
    for index in 0..sample.number_of_tests {
        p.say(&format!("\nTest {} of {}", index + 1, sample.number_of_tests))?;
        let mut test = TestDescription {
            test_type: p.choice::<TestType>(
                "Test type: (time sweep, frequency sweep, flow step, strain sweep) ",
            )?,
            temperature: p.choice::<Temperature>("Temperature (oC): (25, 37) ")?,
            tissue_in_test: if sample.tissue {
                p.yes_no("Tissue in test: (yes, no) ")?
            } else {
                false
            },
            bubbles_before: p.yes_no("Bubbles before test: (yes, no) ")?,
            bubbles_after: p.yes_no("Bubbles after test: (yes, no) ")?,
        };
        let has_tissue = sample.tissue;
        review(p, &mut test, TEST_FIELD_COUNT, TestDescription::values, |t, pos, text| {
            t.set_field(pos, text, has_tissue)
        })?;
        p.say("Test data are saved.")?;
        tests.push(test);
    }
    Ok(tests)
}

/// Ask for the time sweep averaging window, re-asking until start ≤ finish
///
/// Empty answers keep the offered default; the finish default is the last
/// recorded time when one is known.
pub fn capture_time_window<R: BufRead, W: Write>(
    p: &mut Prompter<R, W>,
    default: TimeWindow,
    last_time: Option<f64>,
) -> Result<TimeWindow> {
    let finish_default = last_time.unwrap_or(default.finish_min());
    loop {
        let start = p.float_or(&format!("Start time (min) [{}]: ", default.start_min()), default.start_min())?;
        let finish = p.float_or(&format!("Finish time (min) [{}]: ", finish_default), finish_default)?;
        match TimeWindow::new(start, finish) {
            Ok(window) => return Ok(window),
            Err(err) => p.say(&format!("{}", err))?,
        }
    }
}

fn print_values<R: BufRead, W: Write>(
    p: &mut Prompter<R, W>,
    heading: &str,
    values: &[String],
) -> Result<()> {
    p.say(heading)?;
    for (idx, item) in values.iter().enumerate() {
        p.say(&format!("{}: {}", idx + 1, item))?;
    }
    Ok(())
}

/// Save/revise loop shared by both record kinds
fn review<R, W, T>(
    p: &mut Prompter<R, W>,
    record: &mut T,
    field_count: usize,
    values: impl Fn(&T) -> Vec<String>,
    mut set_field: impl FnMut(&mut T, usize, &str) -> Result<()>,
) -> Result<()>
where
    R: BufRead,
    W: Write,
{
    print_values(p, "\nInput data:", &values(record))?;
    match p.menu("\nDo you want to (S)ave the data or (R)evise the data? ")?.as_str() {
        "s" => return Ok(()),
        "r" => {}
        other => {
            return Err(RheoError::InvalidInput(format!(
                "'{}' is neither (S)ave nor (R)evise; nothing was saved",
                other
            )))
        }
    }

    loop {
        let revise = p.menu(&format!(
            "\nWhich data point do you want to revise? (1, 2, ... {}) or (E)xit to save: ",
            field_count
        ))?;
        if revise == "e" {
            return Ok(());
        }
        match revise.parse::<usize>() {
            Ok(position) if (1..=field_count).contains(&position) => {
                let current = values(record)[position - 1].clone();
                let text = p.ask(&format!("Revise {}: ", current))?;
                if let Err(err) = set_field(record, position, &text) {
                    p.say(&format!("{}", err))?;
                }
            }
            _ => p.say("Invalid choice.")?,
        }

        print_values(p, "\nRevised input data:", &values(record))?;
        match p.menu("\nDo you want to (S)ave the data or (R)evise the data again? ")?.as_str() {
            "s" => return Ok(()),
            "r" => continue,
            other => {
                return Err(RheoError::InvalidInput(format!(
                    "'{}' is neither (S)ave nor (R)evise; nothing was saved",
                    other
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const SAMPLE_ANSWERS: &str = "57\n14/03/2023\nfemale\n67\nknee\noa\n4.5\nyellow\ntransparent\n\
viscous\nno\nno\nyes\nyes\nno\nyes\nno\n1\n";

    fn prompter(script: String) -> Prompter<Cursor<Vec<u8>>, Vec<u8>> {
        Prompter::new(Cursor::new(script.into_bytes()), Vec::new())
    }

    #[test]
    fn test_capture_sample_and_save() {
        let mut p = prompter(format!("{}s\n", SAMPLE_ANSWERS));
        let sample = capture_sample(&mut p).unwrap();
        assert_eq!(sample.id(), "S57");
        assert_eq!(sample.condition, Condition::Oa);
        assert!(sample.tissue);
        assert_eq!(sample.number_of_tests, 1);
    }

    #[test]
    fn test_capture_sample_with_revision() {
        // Revise field 6 (condition) with an invalid then a valid value
        let script = format!("{}r\n6\nflu\nr\n6\nhealthy\ns\n", SAMPLE_ANSWERS);
        let mut p = prompter(script);
        let sample = capture_sample(&mut p).unwrap();
        assert_eq!(sample.condition, Condition::Healthy);
        let out = String::from_utf8(p.into_output()).unwrap();
        assert!(out.contains("Revised input data:"));
        assert!(out.contains("'flu' is not one of"));
    }

    #[test]
    fn test_revise_exit_saves() {
        let script = format!("{}r\n99\ns\n", SAMPLE_ANSWERS);
        let mut p = prompter(script);
        let sample = capture_sample(&mut p).unwrap();
        assert_eq!(sample.age, 67);
        let out = String::from_utf8(p.into_output()).unwrap();
        assert!(out.contains("Invalid choice."));

        let mut p = prompter(format!("{}r\ne\n", SAMPLE_ANSWERS));
        assert!(capture_sample(&mut p).is_ok());
    }

    #[test]
    fn test_unknown_menu_answer_aborts() {
        let mut p = prompter(format!("{}x\n", SAMPLE_ANSWERS));
        assert!(matches!(capture_sample(&mut p), Err(RheoError::InvalidInput(_))));
    }

    #[test]
    fn test_capture_tests_skips_tissue_prompt_without_tissue() {
        let mut sample = crate::records::sample::fixtures::knee_oa_sample(3);
        sample.tissue = false;
        sample.number_of_tests = 2;
        let script = "time sweep\n37\nno\nno\ns\nflow step\n25\nyes\nno\ns\n".to_string();
        let mut p = prompter(script);
        let tests = capture_tests(&mut p, &sample).unwrap();
        assert_eq!(tests.len(), 2);
        assert_eq!(tests[0].test_type, TestType::TimeSweep);
        assert!(!tests[0].tissue_in_test);
        assert_eq!(tests[1].test_type, TestType::FlowStep);
        assert!(tests[1].bubbles_before);
    }

    #[test]
    fn test_capture_tests_asks_tissue_when_sample_has_tissue() {
        let sample = crate::records::sample::fixtures::knee_oa_sample(3);
        let mut one = sample.clone();
        one.number_of_tests = 1;
        let mut p = prompter("frequency sweep\n37\nyes\nno\nno\ns\n".to_string());
        let tests = capture_tests(&mut p, &one).unwrap();
        assert!(tests[0].tissue_in_test);
    }

    #[test]
    fn test_time_window_defaults_and_retry() {
        let mut p = prompter("\n\n".to_string());
        let window = capture_time_window(&mut p, TimeWindow::default(), Some(8.0)).unwrap();
        assert_eq!(window.start_min(), 0.5);
        assert_eq!(window.finish_min(), 8.0);

        let mut p = prompter("4\n1\n1\n3\n".to_string());
        let window = capture_time_window(&mut p, TimeWindow::default(), None).unwrap();
        assert_eq!((window.start_min(), window.finish_min()), (1.0, 3.0));
        let out = String::from_utf8(p.into_output()).unwrap();
        assert!(out.contains("not a valid interval"));
    }
}
