use serde::Deserialize;
use validator::Validate;

use super::{
    clean_email, clean_password_pair, clean_secret, clean_text, clean_username,
    password::{validate_password, UserAttributes},
    AccountLookup, FormErrors,
};
use crate::error::AppResult;

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct RegisterForm {
    #[validate(
        required(message = "This field is required."),
        length(min = 3, max = 150, message = "Ensure this value has between 3 and 150 characters.")
    )]
    pub first_name: Option<String>,
    #[validate(length(max = 150, message = "Ensure this value has at most 150 characters."))]
    pub last_name: Option<String>,
    #[validate(
        required(message = "This field is required."),
        email(message = "Enter a valid email address.")
    )]
    pub email: Option<String>,
    #[validate(
        required(message = "This field is required."),
        length(max = 150, message = "Ensure this value has at most 150 characters.")
    )]
    pub username: Option<String>,
    #[validate(required(message = "This field is required."))]
    pub password1: Option<String>,
    #[validate(required(message = "This field is required."))]
    pub password2: Option<String>,
}

/// A validated registration, ready to be hashed and stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

impl RegisterForm {
    fn normalized(self) -> Self {
        Self {
            first_name: clean_text(self.first_name),
            last_name: clean_text(self.last_name),
            email: clean_text(self.email),
            username: clean_text(self.username),
            password1: clean_secret(self.password1),
            password2: clean_secret(self.password2),
        }
    }

    pub async fn clean<L: AccountLookup + ?Sized>(self, accounts: &L) -> AppResult<NewAccount> {
        let form = self.normalized();
        let mut errors = FormErrors::from_validation(form.validate());

        clean_username(&mut errors, accounts, form.username.as_deref(), None).await?;
        if !errors.has("email") {
            clean_email(&mut errors, accounts, form.email.as_deref(), None).await?;
        }

        if let Some(password) = form.password1.as_deref() {
            let user = UserAttributes {
                username: form.username.as_deref(),
                email: form.email.as_deref(),
                first_name: form.first_name.as_deref(),
                last_name: form.last_name.as_deref(),
            };
            for error in validate_password(password, &user) {
                errors.add("password1", error);
            }
        }

        clean_password_pair(&mut errors, form.password1.as_deref(), form.password2.as_deref());

        errors.check()?;

        Ok(NewAccount {
            username: form.username.unwrap_or_default(),
            email: form.email.unwrap_or_default(),
            first_name: form.first_name.unwrap_or_default(),
            last_name: form.last_name.unwrap_or_default(),
            password: form.password1.unwrap_or_default(),
        })
    }
}
