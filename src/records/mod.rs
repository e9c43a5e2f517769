pub mod choices;
pub mod sample;
pub mod measurement;

pub use choices::{
    Choice, Color, Condition, Gender, Joint, Temperature, TestType, Texture, Transparency, YesNo,
};
pub use sample::{
    parse_sample_id, sample_id, SampleDescription, DATE_FORMAT, SAMPLE_FIELD_COUNT,
    SAMPLE_FIELD_LABELS,
};
pub use measurement::{TestDescription, TEST_FIELD_COUNT, TEST_FIELD_LABELS};
