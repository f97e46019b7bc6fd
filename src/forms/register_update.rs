use serde::Deserialize;
use validator::Validate;

use super::{
    clean_email, clean_password_pair, clean_secret, clean_text, clean_username,
    password::{validate_password, UserAttributes},
    AccountLookup, FormErrors,
};
use crate::{error::AppResult, models::User};

/// Profile edit for the signed-in user. Leaving both password fields empty
/// keeps the current password.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct RegisterUpdateForm {
    #[validate(
        required(message = "This field is required."),
        length(min = 2, max = 30, message = "Please add between 2 and 30 letters.")
    )]
    pub first_name: Option<String>,
    #[validate(
        required(message = "This field is required."),
        length(min = 2, max = 30, message = "Please add between 2 and 30 letters.")
    )]
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
    pub password1: Option<String>,
    pub password2: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountChanges {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password: Option<String>,
}

impl RegisterUpdateForm {
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

    pub async fn clean<L: AccountLookup + ?Sized>(
        self,
        accounts: &L,
        instance: &User,
    ) -> AppResult<AccountChanges> {
        let form = self.normalized();
        let mut errors = FormErrors::from_validation(form.validate());

        clean_username(&mut errors, accounts, form.username.as_deref(), Some(instance)).await?;
        if !errors.has("email") {
            clean_email(&mut errors, accounts, form.email.as_deref(), Some(instance)).await?;
        }

        if let Some(password) = form.password1.as_deref() {
            let user = UserAttributes {
                username: form.username.as_deref().or(Some(&instance.username)),
                email: form.email.as_deref().or(Some(&instance.email)),
                first_name: form.first_name.as_deref().or(Some(&instance.first_name)),
                last_name: form.last_name.as_deref().or(Some(&instance.last_name)),
            };
            for error in validate_password(password, &user) {
                errors.add("password1", error);
            }
        }

        clean_password_pair(&mut errors, form.password1.as_deref(), form.password2.as_deref());

        errors.check()?;

        Ok(AccountChanges {
            username: form.username.unwrap_or_default(),
            email: form.email.unwrap_or_default(),
            first_name: form.first_name.unwrap_or_default(),
            last_name: form.last_name.unwrap_or_default(),
            password: form.password1,
        })
    }
}

#[cfg(test)]
mod tests {
    use tokio_test::{assert_ok, block_on};

    use super::*;
    use crate::{
        error::AppError,
        forms::testing::{user, FakeDirectory},
    };

    fn form_for(current: &User) -> RegisterUpdateForm {
        RegisterUpdateForm {
            first_name: Some(current.first_name.clone()),
            last_name: Some(current.last_name.clone()),
            email: Some(current.email.clone()),
            username: Some(current.username.clone()),
            password1: None,
            password2: None,
        }
    }

    fn form_errors(result: AppResult<AccountChanges>) -> FormErrors {
        match result {
            Err(AppError::Form(errors)) => errors,
            other => panic!("expected form errors, got {:?}", other),
        }
    }

    #[test]
    fn keeping_own_email_is_allowed() {
        let me = user("ana", "ana@example.com");
        let directory = FakeDirectory::default().with_user(me.clone());

        let changes = assert_ok!(block_on(form_for(&me).clean(&directory, &me)));
        assert_eq!(changes.email, "ana@example.com");
        assert_eq!(changes.password, None);
    }

    #[test]
    fn switching_to_another_users_email_is_rejected() {
        let me = user("ana", "ana@example.com");
        let other = user("carla", "carla@example.com");
        let directory = FakeDirectory::default()
            .with_user(me.clone())
            .with_user(other);

        let mut input = form_for(&me);
        input.email = Some("carla@example.com".to_string());

        let errors = form_errors(block_on(input.clean(&directory, &me)));
        assert_eq!(
            errors.get("email")[0].message,
            "an account with this email already exists"
        );
    }

    #[test]
    fn name_length_bounds() {
        let me = user("ana", "ana@example.com");
        let mut input = form_for(&me);
        input.first_name = Some("A".to_string());
        input.last_name = Some("S".repeat(31));

        let errors = form_errors(block_on(input.clean(&FakeDirectory::default(), &me)));
        assert_eq!(errors.get("first_name")[0].code, "length");
        assert_eq!(errors.get("last_name")[0].code, "length");
    }

    #[test]
    fn password_rotation() {
        let me = user("ana", "ana@example.com");
        let mut input = form_for(&me);
        input.password1 = Some("violet-harbor-lantern".to_string());
        input.password2 = Some("violet-harbor-lantern".to_string());

        let changes = block_on(input.clean(&FakeDirectory::default(), &me)).unwrap();
        assert_eq!(changes.password.as_deref(), Some("violet-harbor-lantern"));
    }

    #[test]
    fn password_rotation_requires_matching_and_strength() {
        let me = user("ana", "ana@example.com");

        let mut input = form_for(&me);
        input.password1 = Some("violet-harbor-lantern".to_string());
        input.password2 = Some("violet-harbor".to_string());
        let errors = form_errors(block_on(input.clean(&FakeDirectory::default(), &me)));
        assert_eq!(errors.get("password2")[0].code, "password_mismatch");

        let mut input = form_for(&me);
        input.password1 = Some("qwerty".to_string());
        input.password2 = Some("qwerty".to_string());
        let errors = form_errors(block_on(input.clean(&FakeDirectory::default(), &me)));
        assert!(errors.has("password1"));
        assert!(!errors.has("password2"));
    }

    #[test]
    fn omitted_names_fall_back_to_stored_ones_for_similarity() {
        let mut me = user("ana", "ana@example.com");
        me.first_name = "Filomena".to_string();

        let mut input = form_for(&me);
        input.first_name = None;
        input.password1 = Some("filomena!".to_string());
        input.password2 = Some("filomena!".to_string());

        let errors = form_errors(block_on(input.clean(&FakeDirectory::default(), &me)));
        assert_eq!(errors.get("first_name")[0].code, "required");
        assert_eq!(
            errors.get("password1")[0].message,
            "The password is too similar to the first name."
        );
    }

    #[test]
    fn half_filled_password_pair_is_rejected() {
        let me = user("ana", "ana@example.com");
        let mut input = form_for(&me);
        input.password2 = Some("violet-harbor-lantern".to_string());

        let errors = form_errors(block_on(input.clean(&FakeDirectory::default(), &me)));
        assert_eq!(errors.get("password1")[0].code, "required");
    }
}
