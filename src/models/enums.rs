use serde::{Deserialize, Serialize};

/// Error returned when a string does not name any variant of a `str_enum!`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid value for {field}: {value}")]
pub struct InvalidEnum {
    pub field: String,
    pub value: String,
}

/// Macro to generate enum with as_str + std::str::FromStr pattern.
/// The wire (serde) form is the same string as `as_str`.
macro_rules! str_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = InvalidEnum;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

str_enum!(
    /// Classification of a value against its reference range.
    AnalyteStatus {
        Low => "low",
        Normal => "normal",
        High => "high",
        Unknown => "unknown",
    }
);

str_enum!(
    /// Which strategy produced the adopted extraction result.
    ExtractionMethod {
        TextOnly => "text_only",
        VisionFallback => "vision_fallback",
    }
);

str_enum!(
    /// Observability label derived from the final analyte count.
    ExtractionQuality {
        Comprehensive => "comprehensive",
        Moderate => "moderate",
        Limited => "limited",
    }
);

str_enum!(Sex {
    Male => "M",
    Female => "F",
    Unspecified => "X",
});
