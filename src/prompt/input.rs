//! Validated console input
//!
//! Every prompt re-asks until the answer parses. Input and output are
//! generic so the capture flow runs against in-memory buffers in tests.

use std::io::{BufRead, Write};

use chrono::NaiveDate;

use crate::error::{Result, RheoError};
use crate::records::choices::Choice;
use crate::records::sample::{parse_count, parse_date, parse_decimal, parse_volume};

pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    /// Print one line to the operator
    pub fn say(&mut self, line: &str) -> Result<()> {
        writeln!(self.output, "{}", line)?;
        Ok(())
    }

    /// Ask once and return the trimmed answer
    ///
    /// Closed input is an error so that a validation loop cannot spin forever.
    pub fn ask(&mut self, prompt: &str) -> Result<String> {
        write!(self.output, "{}", prompt)?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(RheoError::EndOfInput);
        }
        Ok(line.trim().to_string())
    }

    /// Ask until the parser accepts the answer
    fn ask_until<T>(&mut self, prompt: &str, parse: impl Fn(&str) -> Result<T>) -> Result<T> {
        loop {
            let answer = self.ask(prompt)?;
            match parse(&answer) {
                Ok(value) => return Ok(value),
                Err(RheoError::InvalidInput(reason)) => {
                    self.say(&format!("Invalid input. {}", reason))?;
                }
                Err(other) => return Err(other),
            }
        }
    }

    pub fn integer(&mut self, prompt: &str) -> Result<u32> {
        self.ask_until(prompt, parse_count)
    }

    pub fn float(&mut self, prompt: &str) -> Result<f64> {
        self.ask_until(prompt, parse_decimal)
    }

    /// Non-negative volume in mL
    pub fn volume(&mut self, prompt: &str) -> Result<f64> {
        self.ask_until(prompt, parse_volume)
    }

    /// Like `float`, but an empty answer takes `default`
    pub fn float_or(&mut self, prompt: &str, default: f64) -> Result<f64> {
        self.ask_until(prompt, |answer| {
            if answer.is_empty() {
                Ok(default)
            } else {
                parse_decimal(answer)
            }
        })
    }

    pub fn date(&mut self, prompt: &str) -> Result<NaiveDate> {
        self.ask_until(prompt, parse_date)
    }

    /// Ask for one of the labels of `C`; empty answers are rejected
    pub fn choice<C: Choice>(&mut self, prompt: &str) -> Result<C> {
        self.ask_until(prompt, |answer| {
            if answer.is_empty() {
                return Err(RheoError::InvalidInput("Empty input not allowed.".to_string()));
            }
            C::parse(answer)
        })
    }

    pub fn yes_no(&mut self, prompt: &str) -> Result<bool> {
        self.ask_until(prompt, crate::records::choices::parse_yes_no)
    }

    /// Ask for a single-letter menu answer, lower-cased
    pub fn menu(&mut self, prompt: &str) -> Result<String> {
        Ok(self.ask(prompt)?.to_lowercase())
    }
}
