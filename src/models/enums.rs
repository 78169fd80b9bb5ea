use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
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

str_enum!(PiiKind {
    Email => "email",
    Phone => "phone",
    Account => "account",
});

str_enum!(ExtractionMethod {
    PdfDirect => "pdf_direct",
    ModelOcr => "model_ocr",
    Failed => "failed",
});

str_enum!(BillState {
    Uploaded => "uploaded",
    Extracted => "extracted",
    Processed => "processed",
});

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn pii_kind_round_trip() {
        for (variant, s) in [
            (PiiKind::Email, "email"),
            (PiiKind::Phone, "phone"),
            (PiiKind::Account, "account"),
        ] {
            assert_eq!(variant.as_str(), s);
            assert_eq!(PiiKind::from_str(s).unwrap(), variant);
        }
    }

    #[test]
    fn extraction_method_round_trip() {
        for (variant, s) in [
            (ExtractionMethod::PdfDirect, "pdf_direct"),
            (ExtractionMethod::ModelOcr, "model_ocr"),
            (ExtractionMethod::Failed, "failed"),
        ] {
            assert_eq!(variant.as_str(), s);
            assert_eq!(ExtractionMethod::from_str(s).unwrap(), variant);
        }
    }

    #[test]
    fn serde_matches_as_str() {
        assert_eq!(serde_json::to_string(&PiiKind::Account).unwrap(), "\"account\"");
        assert_eq!(
            serde_json::to_string(&ExtractionMethod::PdfDirect).unwrap(),
            "\"pdf_direct\""
        );
        assert_eq!(serde_json::to_string(&BillState::Processed).unwrap(), "\"processed\"");
    }

    #[test]
    fn invalid_enum_returns_error() {
        let result = BillState::from_str("archived");
        assert!(matches!(
            result,
            Err(DatabaseError::InvalidEnum { field, value })
                if field == "BillState" && value == "archived"
        ));
    }
}
