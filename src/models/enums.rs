use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern.
/// The stored string doubles as the JSON representation.
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$(Self::$variant),+];

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

str_enum!(Gender {
    Male => "Male",
    Female => "Female",
    Other => "Other",
});

str_enum!(AppointmentStatus {
    Scheduled => "scheduled",
    Completed => "completed",
    Cancelled => "cancelled",
    NoShow => "no_show",
});

str_enum!(PaymentMethod {
    Zaad => "zaad",
    Edahab => "edahab",
    PremierBank => "premier_bank",
    Cash => "cash",
});

str_enum!(ExpenseCategory {
    Supplies => "supplies",
    Rent => "rent",
    Salaries => "salaries",
    Utilities => "utilities",
    Equipment => "equipment",
    Other => "other",
});

impl Gender {
    /// Lenient parse for spreadsheet cells: anything unrecognised is `Other`.
    pub fn from_loose(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "male" | "m" => Self::Male,
            "female" | "f" => Self::Female,
            _ => Self::Other,
        }
    }
}

impl PaymentMethod {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Zaad => "Zaad",
            Self::Edahab => "Edahab",
            Self::PremierBank => "Premier Bank",
            Self::Cash => "Cash",
        }
    }

    /// Lenient parse for spreadsheet cells ("Premier Bank", "CASH", ...).
    pub fn from_loose(raw: &str) -> Option<Self> {
        let key: String = raw
            .trim()
            .to_ascii_lowercase()
            .chars()
            .map(|c| if c == ' ' || c == '-' { '_' } else { c })
            .collect();
        key.parse().ok()
    }
}

impl ExpenseCategory {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Supplies => "Supplies",
            Self::Rent => "Rent",
            Self::Salaries => "Salaries",
            Self::Utilities => "Utilities",
            Self::Equipment => "Equipment",
            Self::Other => "Other",
        }
    }
}

impl Default for AppointmentStatus {
    fn default() -> Self {
        Self::Scheduled
    }
}

impl Default for ExpenseCategory {
    fn default() -> Self {
        Self::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn appointment_status_round_trips_through_str() {
        for status in AppointmentStatus::ALL {
            assert_eq!(AppointmentStatus::from_str(status.as_str()).unwrap(), *status);
        }
    }

    #[test]
    fn unknown_value_is_invalid_enum() {
        let err = ExpenseCategory::from_str("travel").unwrap_err();
        assert!(matches!(err, DatabaseError::InvalidEnum { .. }));
    }

    #[test]
    fn serde_uses_stored_strings() {
        let json = serde_json::to_string(&AppointmentStatus::NoShow).unwrap();
        assert_eq!(json, "\"no_show\"");
        let method: PaymentMethod = serde_json::from_str("\"premier_bank\"").unwrap();
        assert_eq!(method, PaymentMethod::PremierBank);
    }

    #[test]
    fn loose_parsers_accept_spreadsheet_spellings() {
        assert_eq!(Gender::from_loose(" female "), Gender::Female);
        assert_eq!(Gender::from_loose("unknown"), Gender::Other);
        assert_eq!(PaymentMethod::from_loose("Premier Bank"), Some(PaymentMethod::PremierBank));
        assert_eq!(PaymentMethod::from_loose("CASH"), Some(PaymentMethod::Cash));
        assert_eq!(PaymentMethod::from_loose("cheque"), None);
    }
}
