use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::encode::IsNull;
use sqlx::error::BoxDynError;
use sqlx::mysql::{MySql, MySqlTypeInfo, MySqlValueRef};
use sqlx::{Decode, Encode, Type};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("unknown {kind} value: {value}")]
pub(crate) struct UnknownVariant {
    kind: &'static str,
    value: String,
}

/// Maps a fieldless enum onto a MySQL `ENUM`/`VARCHAR` column through its
/// lowercase string form.
macro_rules! string_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub(crate) const ALL: &'static [$name] = &[$($name::$variant),+];

            pub(crate) fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value {
                    $($text => Ok($name::$variant),)+
                    other => Err(UnknownVariant { kind: $kind, value: other.to_string() }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl Type<MySql> for $name {
            fn type_info() -> MySqlTypeInfo {
                <str as Type<MySql>>::type_info()
            }

            fn compatible(ty: &MySqlTypeInfo) -> bool {
                <str as Type<MySql>>::compatible(ty)
            }
        }

        impl<'q> Encode<'q, MySql> for $name {
            fn encode_by_ref(&self, buf: &mut Vec<u8>) -> Result<IsNull, BoxDynError> {
                <&str as Encode<'q, MySql>>::encode_by_ref(&self.as_str(), buf)
            }
        }

        impl<'r> Decode<'r, MySql> for $name {
            fn decode(value: MySqlValueRef<'r>) -> Result<Self, BoxDynError> {
                let text = <&str as Decode<'r, MySql>>::decode(value)?;
                Ok(text.parse::<$name>()?)
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum UserRole {
    Admin,
    Professor,
    Student,
}

string_enum!(UserRole, "role", {
    Admin => "admin",
    Professor => "professor",
    Student => "student",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum Semester {
    Spring,
    Summer,
    Fall,
    Winter,
}

string_enum!(Semester, "semester", {
    Spring => "spring",
    Summer => "summer",
    Fall => "fall",
    Winter => "winter",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum AssignmentStatus {
    Active,
    Closed,
}

string_enum!(AssignmentStatus, "assignment status", {
    Active => "active",
    Closed => "closed",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum EnrollmentStatus {
    Active,
    Dropped,
}

string_enum!(EnrollmentStatus, "enrollment status", {
    Active => "active",
    Dropped => "dropped",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum RequestStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

string_enum!(RequestStatus, "request status", {
    Pending => "pending",
    Approved => "approved",
    Rejected => "rejected",
    Cancelled => "cancelled",
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_text_roundtrip() {
        for role in UserRole::ALL {
            assert_eq!(role.as_str().parse::<UserRole>().unwrap(), *role);
        }
        assert!("superuser".parse::<UserRole>().is_err());
    }

    #[test]
    fn serde_matches_column_text() {
        let json = serde_json::to_string(&RequestStatus::Cancelled).unwrap();
        assert_eq!(json, "\"cancelled\"");
        let parsed: Semester = serde_json::from_str("\"fall\"").unwrap();
        assert_eq!(parsed, Semester::Fall);
        assert_eq!(parsed.to_string(), "fall");
    }

    #[test]
    fn unknown_variant_message_names_the_kind() {
        let err = "paused".parse::<AssignmentStatus>().unwrap_err();
        assert_eq!(err.to_string(), "unknown assignment status value: paused");
    }
}
