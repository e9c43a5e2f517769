pub mod input;
pub mod capture;

pub use input::Prompter;
pub use capture::{capture_sample, capture_tests, capture_time_window};
