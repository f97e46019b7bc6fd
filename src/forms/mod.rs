//! Request forms: binding raw JSON input, field rules and cross-field rules.
//!
//! Each form exposes a `clean` step returning either the validated data or
//! a [`FormErrors`] map keyed by field name. Rules that need the database
//! (uniqueness, foreign keys) go through the lookup traits below so the
//! services can back them with SQL.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;
use validator::ValidationErrors;

use crate::{error::AppResult, models::User};

pub mod contact;
pub mod password;
pub mod register;
pub mod register_update;

pub use contact::ContactForm;
pub use register::{NewAccount, RegisterForm};
pub use register_update::RegisterUpdateForm;

pub const REQUIRED_MESSAGE: &str = "This field is required.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub message: String,
    pub code: String,
}

impl FieldError {
    pub fn new(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: code.into(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::new(message, "invalid")
    }

    pub fn required() -> Self {
        Self::new(REQUIRED_MESSAGE, "required")
    }
}

/// Field name -> errors, in a stable order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FormErrors(BTreeMap<String, Vec<FieldError>>);

impl FormErrors {
    pub fn from_validation(result: Result<(), ValidationErrors>) -> Self {
        let mut errors = Self::default();
        if let Err(validation) = result {
            for (field, field_errors) in validation.field_errors() {
                for error in field_errors {
                    let message = error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid value ({})", error.code));
                    errors.add(field.to_string(), FieldError::new(message, error.code.to_string()));
                }
            }
        }
        errors
    }

    pub fn add(&mut self, field: impl Into<String>, error: FieldError) {
        self.0.entry(field.into()).or_default().push(error);
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    #[cfg(test)]
    pub fn get(&self, field: &str) -> &[FieldError] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn check(self) -> Result<(), FormErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

/// Account queries needed while cleaning the registration forms.
#[async_trait]
pub trait AccountLookup: Send + Sync {
    async fn email_taken(&self, email: &str, exclude: Option<Uuid>) -> AppResult<bool>;
    async fn username_taken(&self, username: &str, exclude: Option<Uuid>) -> AppResult<bool>;
}

#[async_trait]
pub trait CategoryLookup: Send + Sync {
    async fn category_exists(&self, id: Uuid) -> AppResult<bool>;
}

/// Trims text input; blank input counts as not supplied.
pub(crate) fn clean_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Passwords keep their whitespace; only empty input is dropped.
pub(crate) fn clean_secret(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// The email is only checked against other accounts when it changed.
pub(crate) async fn clean_email<L: AccountLookup + ?Sized>(
    errors: &mut FormErrors,
    accounts: &L,
    email: Option<&str>,
    instance: Option<&User>,
) -> AppResult<()> {
    let Some(email) = email else {
        return Ok(());
    };

    let current = instance.map(|u| u.email.as_str());
    if current != Some(email) && accounts.email_taken(email, instance.map(|u| u.id)).await? {
        errors.add(
            "email",
            FieldError::invalid("an account with this email already exists"),
        );
    }

    Ok(())
}

/// Username charset and uniqueness, mirroring the identity model rules.
pub(crate) async fn clean_username<L: AccountLookup + ?Sized>(
    errors: &mut FormErrors,
    accounts: &L,
    username: Option<&str>,
    instance: Option<&User>,
) -> AppResult<()> {
    let Some(username) = username else {
        return Ok(());
    };

    let valid = username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'));
    if !valid {
        errors.add(
            "username",
            FieldError::invalid(
                "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
            ),
        );
        return Ok(());
    }

    let current = instance.map(|u| u.username.as_str());
    if current != Some(username)
        && accounts
            .username_taken(username, instance.map(|u| u.id))
            .await?
    {
        errors.add(
            "username",
            FieldError::new("a user with that username already exists", "unique"),
        );
    }

    Ok(())
}

/// Both password fields must agree whenever either one is supplied.
pub(crate) fn clean_password_pair(
    errors: &mut FormErrors,
    password1: Option<&str>,
    password2: Option<&str>,
) {
    match (password1, password2) {
        (Some(p1), Some(p2)) if p1 != p2 => {
            errors.add(
                "password2",
                FieldError::new("passwords do not match", "password_mismatch"),
            );
        }
        (Some(_), None) if !errors.has("password2") => errors.add("password2", FieldError::required()),
        (None, Some(_)) if !errors.has("password1") => errors.add("password1", FieldError::required()),
        _ => {}
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_text_trims_and_drops_blank() {
        assert_eq!(clean_text(Some("  Ana ".to_string())), Some("Ana".to_string()));
        assert_eq!(clean_text(Some("   ".to_string())), None);
        assert_eq!(clean_text(None), None);
    }

    #[test]
    fn secrets_keep_whitespace() {
        assert_eq!(clean_secret(Some(" pw ".to_string())), Some(" pw ".to_string()));
        assert_eq!(clean_secret(Some(String::new())), None);
    }

    #[test]
    fn password_pair_mismatch_goes_on_second_field() {
        let mut errors = FormErrors::default();
        clean_password_pair(&mut errors, Some("a-long-secret"), Some("another-secret"));
        assert_eq!(errors.get("password2")[0].message, "passwords do not match");
        assert!(!errors.has("password1"));
    }

    #[test]
    fn password_pair_reports_missing_half() {
        let mut errors = FormErrors::default();
        clean_password_pair(&mut errors, None, Some("a-long-secret"));
        assert_eq!(errors.get("password1")[0].code, "required");

        let mut errors = FormErrors::default();
        clean_password_pair(&mut errors, None, None);
        assert!(errors.is_empty());
    }

    #[test]
    fn check_passes_only_when_empty() {
        assert!(FormErrors::default().check().is_ok());

        let mut errors = FormErrors::default();
        errors.add("first_name", FieldError::required());
        let errors = errors.check().unwrap_err();
        assert_eq!(errors.get("first_name")[0].message, REQUIRED_MESSAGE);
    }
}
