use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
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
    /// Severity of a drug-drug interaction rule, lowest to highest urgency.
    InteractionSeverity {
        Minor => "minor",
        Moderate => "moderate",
        Major => "major",
        Contraindicated => "contraindicated",
    }
);

str_enum!(
    /// Severity of a recorded patient allergy.
    AllergySeverity {
        Mild => "mild",
        Moderate => "moderate",
        Severe => "severe",
    }
);

str_enum!(
    /// Unified urgency scale across interaction and allergy findings.
    /// Declaration order is rank order: minor/mild < moderate < major/severe < contraindicated.
    #[derive(PartialOrd, Ord)]
    SeverityLevel {
        Minor => "minor",
        Moderate => "moderate",
        Major => "major",
        Contraindicated => "contraindicated",
    }
);

str_enum!(
    /// Lifecycle position of an encounter's check session.
    CheckState {
        Clean => "clean",
        Flagged => "flagged",
        Overridden => "overridden",
    }
);
