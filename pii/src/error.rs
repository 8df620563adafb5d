use std::fmt;

/// Identity fields that go through normalization
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IdentityField {
    Phone,
    Zip,
    City,
    State,
}

impl IdentityField {
    pub const fn as_str(&self) -> &'static str {
        match self {
            IdentityField::Phone => "phone",
            IdentityField::Zip => "zip",
            IdentityField::City => "city",
            IdentityField::State => "state",
        }
    }
}

impl fmt::Display for IdentityField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PiiError {
    /// The value cannot be brought into canonical form. The raw input is
    /// deliberately not part of the error.
    #[error("invalid {field}: {reason}")]
    InvalidFormat {
        field: IdentityField,
        reason: &'static str,
    },
}

impl PiiError {
    pub(crate) fn invalid(field: IdentityField, reason: &'static str) -> Self {
        PiiError::InvalidFormat { field, reason }
    }

    pub fn field(&self) -> IdentityField {
        match self {
            PiiError::InvalidFormat { field, .. } => *field,
        }
    }
}
