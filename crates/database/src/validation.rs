//! Input validation for WhatsApp configuration fields.

use std::fmt;

/// Validation error types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// One or more required fields are missing or blank.
    MissingFields(Vec<&'static str>),
    /// Value too long.
    TooLong { field: String, max: usize, actual: usize },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::MissingFields(fields) => {
                write!(f, "All fields are required: {}", fields.join(", "))
            }
            ValidationError::TooLong { field, max, actual } => {
                write!(f, "{} is too long ({} chars, max {})", field, actual, max)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Maximum allowed length for any configuration value.
pub const MAX_CONFIG_VALUE_LENGTH: usize = 1024;

const REQUIRED_FIELDS: [&str; 4] = [
    "accessToken",
    "webhookVerifyToken",
    "businessAccountId",
    "phoneNumberId",
];

/// Configuration values as submitted by the settings form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WhatsAppConfigInput {
    pub access_token: String,
    pub webhook_verify_token: String,
    pub business_account_id: String,
    pub phone_number_id: String,
}

impl WhatsAppConfigInput {
    /// Trim every field and check that all of them are present.
    ///
    /// A missing field reports the whole required set, matching what the
    /// settings form shows to the user.
    pub fn validated(&self) -> Result<Self, ValidationError> {
        let trimmed = Self {
            access_token: self.access_token.trim().to_string(),
            webhook_verify_token: self.webhook_verify_token.trim().to_string(),
            business_account_id: self.business_account_id.trim().to_string(),
            phone_number_id: self.phone_number_id.trim().to_string(),
        };

        let values = [
            &trimmed.access_token,
            &trimmed.webhook_verify_token,
            &trimmed.business_account_id,
            &trimmed.phone_number_id,
        ];

        if values.iter().any(|value| value.is_empty()) {
            return Err(ValidationError::MissingFields(REQUIRED_FIELDS.to_vec()));
        }

        for (field, value) in REQUIRED_FIELDS.iter().zip(values) {
            if value.chars().count() > MAX_CONFIG_VALUE_LENGTH {
                return Err(ValidationError::TooLong {
                    field: field.to_string(),
                    max: MAX_CONFIG_VALUE_LENGTH,
                    actual: value.chars().count(),
                });
            }
        }

        Ok(trimmed)
    }
}
