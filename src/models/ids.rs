//! Typed entity ids
//!
//! Each id wraps a UUID and displays as a short prefixed form (`sht-1a2b3c4d`)
//! that the CLI accepts back as input.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! define_id {
    ($name:ident, $prefix:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            pub const PREFIX: &'static str = $prefix;

            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            /// Short form without the prefix, as shown in listings
            pub fn short(&self) -> String {
                self.0.simple().to_string()[..8].to_string()
            }

            /// Whether user input (full UUID, `pfx-xxxxxxxx`, or a bare
            /// 8-character prefix) refers to this id
            pub fn matches(&self, input: &str) -> bool {
                let input = input.trim();
                if let Ok(full) = Self::from_str(input) {
                    return full == *self;
                }
                let short = input.strip_prefix($prefix).unwrap_or(input).to_ascii_lowercase();
                !short.is_empty() && self.0.simple().to_string().starts_with(&short)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}{}", $prefix, self.short())
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            /// Full UUIDs only, with or without the prefix
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let s = s.trim();
                let s = s.strip_prefix($prefix).unwrap_or(s);
                Uuid::parse_str(s).map(Self)
            }
        }
    };
}

define_id!(UserId, "usr-");
define_id!(SheetId, "sht-");
define_id!(ExpenseId, "exp-");
define_id!(DebtId, "dbt-");
define_id!(PaymentId, "pay-");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_prefixed_short_form() {
        let id = SheetId::new();
        let shown = id.to_string();
        assert!(shown.starts_with("sht-"));
        assert_eq!(shown.len(), 12);
    }

    #[test]
    fn test_matches_short_and_full_forms() {
        let id = DebtId::new();
        assert!(id.matches(&id.to_string()));
        assert!(id.matches(&id.short()));
        assert!(id.matches(&id.as_uuid().to_string()));
        assert!(!id.matches(""));
        assert!(!id.matches("dbt-"));
        assert!(!DebtId::new().matches(&id.as_uuid().to_string()));
    }

    #[test]
    fn test_from_str_accepts_prefixed_uuid() {
        let raw = "550e8400-e29b-41d4-a716-446655440000";
        let id: UserId = format!("usr-{}", raw).parse().unwrap();
        assert_eq!(id.as_uuid().to_string(), raw);
        assert!("usr-550e8400".parse::<UserId>().is_err());
    }
}
