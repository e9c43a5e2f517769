//! Closed vocabularies used by the sample and test records
//!
//! Every categorical field of the sample sheet accepts a fixed list of
//! lower-case labels. The labels double as the on-disk representation in the
//! spreadsheet files.

use crate::error::{Result, RheoError};

/// A categorical field with a fixed set of lower-case labels
pub trait Choice: Sized + Copy {
    /// All accepted labels, in prompt order
    const LABELS: &'static [&'static str];

    fn from_label(label: &str) -> Option<Self>;

    fn label(&self) -> &'static str;

    /// Parse a user- or file-supplied label (trimmed, case-insensitive)
    fn parse(input: &str) -> Result<Self> {
        let normalized = input.trim().to_lowercase();
        Self::from_label(&normalized).ok_or_else(|| {
            RheoError::InvalidInput(format!(
                "'{}' is not one of: {}",
                input.trim(),
                Self::LABELS.join(", ")
            ))
        })
    }
}

macro_rules! choice_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $label:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl Choice for $name {
            const LABELS: &'static [&'static str] = &[$($label),+];

            fn from_label(label: &str) -> Option<Self> {
                match label {
                    $($label => Some(Self::$variant),)+
                    _ => None,
                }
            }

            fn label(&self) -> &'static str {
                match self {
                    $(Self::$variant => $label),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.label())
            }
        }
    };
}

choice_enum!(Gender {
    Male => "male",
    Female => "female",
});

choice_enum!(Joint {
    Knee => "knee",
    Hip => "hip",
    Elbow => "elbow",
    Wrist => "wrist",
});

choice_enum!(
    /// Clinical condition of the donor joint. `Oa` is the positive class in
    /// biomarker validation.
    Condition {
        Oa => "oa",
        Healthy => "healthy",
        MeniscalTear => "meniscal tear",
        PatellofemoralPain => "patellofemoral pain",
        FemoralHeadNecrosis => "femoral head necrosis",
        ShoulderInstability => "shoulder instability",
        AclRupture => "acl rupture",
        OaBrokenPoly => "oa broken poly",
        NailingHip => "nailing hip",
        PatellofemoralCartilageDefect => "patellofemoral cartilage defect",
    }
);

choice_enum!(Color {
    Red => "red",
    Orange => "orange",
    Yellow => "yellow",
    SoftYellow => "soft yellow",
    Colorless => "colorless",
});

choice_enum!(Transparency {
    Transparent => "transparent",
    NonTransparent => "non-transparent",
});

choice_enum!(Texture {
    Viscous => "viscous",
    NonViscous => "non-viscous",
});

choice_enum!(
    /// Rheometer protocol run on a sample
    TestType {
        TimeSweep => "time sweep",
        FrequencySweep => "frequency sweep",
        FlowStep => "flow step",
        StrainSweep => "strain sweep",
    }
);

choice_enum!(
    /// Test temperature in °C
    Temperature {
        Room => "25",
        Body => "37",
    }
);

choice_enum!(YesNo {
    Yes => "yes",
    No => "no",
});

impl YesNo {
    pub fn is_yes(self) -> bool {
        self == YesNo::Yes
    }
}

impl From<bool> for YesNo {
    fn from(value: bool) -> Self {
        if value { YesNo::Yes } else { YesNo::No }
    }
}

/// Parse a yes/no label into a bool
pub fn parse_yes_no(input: &str) -> Result<bool> {
    YesNo::parse(input).map(YesNo::is_yes)
}

/// Render a bool as the yes/no label used on disk
pub fn yes_no(value: bool) -> &'static str {
    YesNo::from(value).label()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive_and_trimmed() {
        assert_eq!(Condition::parse("  Meniscal Tear ").unwrap(), Condition::MeniscalTear);
        assert_eq!(Joint::parse("KNEE").unwrap(), Joint::Knee);
    }

    #[test]
    fn test_parse_rejects_unknown_label() {
        let err = Color::parse("blue").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("blue"));
        assert!(msg.contains("soft yellow"));
    }

    #[test]
    fn test_labels_round_trip_through_display() {
        for label in TestType::LABELS {
            let parsed = TestType::parse(label).unwrap();
            assert_eq!(parsed.to_string(), *label);
        }
    }

    #[test]
    fn test_yes_no_helpers() {
        assert!(parse_yes_no("Yes").unwrap());
        assert!(!parse_yes_no("no").unwrap());
        assert!(parse_yes_no("maybe").is_err());
        assert_eq!(yes_no(true), "yes");
        assert_eq!(yes_no(false), "no");
    }
}
