use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::{clean_text, CategoryLookup, FieldError, FormErrors};
use crate::error::AppResult;

/// Contact fields accepted on create and update. The picture is uploaded
/// separately. `show: false` hides the contact from the public directory;
/// leaving it out keeps the current visibility.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ContactForm {
    #[validate(
        required(message = "This field is required."),
        length(max = 50, message = "Ensure this value has at most 50 characters.")
    )]
    pub first_name: Option<String>,
    #[validate(
        required(message = "This field is required."),
        length(max = 50, message = "Ensure this value has at most 50 characters.")
    )]
    pub last_name: Option<String>,
    #[validate(
        required(message = "This field is required."),
        length(max = 50, message = "Ensure this value has at most 50 characters.")
    )]
    pub phone: Option<String>,
    #[validate(
        email(message = "Enter a valid email address."),
        length(max = 254, message = "Ensure this value has at most 254 characters.")
    )]
    pub email: Option<String>,
    pub description: Option<String>,
    pub category: Option<Uuid>,
    pub show: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactData {
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub email: Option<String>,
    pub description: String,
    pub category_id: Option<Uuid>,
    pub show: Option<bool>,
}

impl ContactForm {
    fn normalized(self) -> Self {
        Self {
            first_name: clean_text(self.first_name),
            last_name: clean_text(self.last_name),
            phone: clean_text(self.phone),
            email: clean_text(self.email),
            description: clean_text(self.description),
            category: self.category,
            show: self.show,
        }
    }

    pub async fn clean<L: CategoryLookup + ?Sized>(self, categories: &L) -> AppResult<ContactData> {
        let form = self.normalized();
        let mut errors = FormErrors::from_validation(form.validate());

        if let (Some(first_name), Some(last_name)) = (&form.first_name, &form.last_name) {
            if first_name == last_name {
                let error = FieldError::invalid("first and last name cannot be equal");
                errors.add("first_name", error.clone());
                errors.add("last_name", error);
            }
        }

        if let Some(category) = form.category {
            if !categories.category_exists(category).await? {
                errors.add(
                    "category",
                    FieldError::new(
                        "Select a valid choice. That choice is not one of the available choices.",
                        "invalid_choice",
                    ),
                );
            }
        }

        errors.check()?;

        Ok(ContactData {
            first_name: form.first_name.unwrap_or_default(),
            last_name: form.last_name.unwrap_or_default(),
            phone: form.phone.unwrap_or_default(),
            email: form.email,
            description: form.description.unwrap_or_default(),
            category_id: form.category,
            show: form.show,
        })
    }
}
