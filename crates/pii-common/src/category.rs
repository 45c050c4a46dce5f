//! PII category taxonomy and detector provenance.

use serde::{Deserialize, Serialize};

/// Category of personally identifiable information a span carries.
///
/// The serialized form is the upper-case tag used in redaction output,
/// e.g. `CREDIT_CARD` for `[REDACTED_CREDIT_CARD]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    /// Email address
    Email,
    /// Telephone number (NANP, with or without country code)
    Phone,
    /// US social security number
    Ssn,
    /// Payment card number
    CreditCard,
    /// IPv4 or IPv6 address
    Ip,
    /// Person name
    Name,
    /// Street or postal address
    Address,
    /// Calendar date (birth dates, etc.)
    Date,
    /// Card expiration date (MM/YY)
    ExpirationDate,
    /// Card verification value
    Cvv,
    /// Driver's license number
    DriversLicense,
}

impl Category {
    /// All categories in declaration order.
    pub const ALL: [Category; 11] = [
        Category::Email,
        Category::Phone,
        Category::Ssn,
        Category::CreditCard,
        Category::Ip,
        Category::Name,
        Category::Address,
        Category::Date,
        Category::ExpirationDate,
        Category::Cvv,
        Category::DriversLicense,
    ];

    /// Upper-case tag for this category.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Email => "EMAIL",
            Category::Phone => "PHONE",
            Category::Ssn => "SSN",
            Category::CreditCard => "CREDIT_CARD",
            Category::Ip => "IP",
            Category::Name => "NAME",
            Category::Address => "ADDRESS",
            Category::Date => "DATE",
            Category::ExpirationDate => "EXPIRATION_DATE",
            Category::Cvv => "CVV",
            Category::DriversLicense => "DRIVERS_LICENSE",
        }
    }

    /// Parse a category tag (case-insensitive).
    pub fn parse_str(s: &str) -> Option<Self> {
        let upper = s.trim().to_ascii_uppercase();
        Category::ALL.into_iter().find(|c| c.as_str() == upper)
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which detector produced a span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Source {
    /// Deterministic grammar match
    Pattern,
    /// Named-entity recognizer
    Ner,
    /// Keyword-labelled proximity rule
    Proximity,
}

impl Source {
    /// Resolution priority; lower wins.
    pub fn priority(&self) -> u8 {
        match self {
            Source::Pattern => 0,
            Source::Ner => 1,
            Source::Proximity => 2,
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Source::Pattern => write!(f, "PATTERN"),
            Source::Ner => write!(f, "NER"),
            Source::Proximity => write!(f, "PROXIMITY"),
        }
    }
}
