use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Extension, Json,
};
use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    forms::{ContactForm, FieldError, FormErrors},
    models::{Contact, ContactWithCategory},
    pagination::Page,
    services::{auth::Claims, contacts::ContactsService},
    AppState,
};

use super::super::{middleware::get_user_id, router::contacts_index_path};

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    pub page: Option<String>,
}

impl SearchQuery {
    /// The trimmed term, or `None` when there is nothing to search for.
    pub fn term(&self) -> Option<&str> {
        let term = self.q.trim();
        (!term.is_empty()).then_some(term)
    }
}

#[derive(Debug, Serialize)]
pub struct ContactListPage {
    pub site_title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_value: Option<String>,
    pub page: Page<Contact>,
}

#[derive(Debug, Serialize)]
pub struct ContactPage {
    pub site_title: String,
    pub contact: ContactWithCategory,
}

pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<ContactListPage>> {
    let contacts_service = ContactsService::new(state.db);
    let page = contacts_service
        .list_contacts(query.page.as_deref(), state.config.pagination.per_page)
        .await?;

    Ok(Json(ContactListPage {
        site_title: "Contacts - ".to_string(),
        search_value: None,
        page,
    }))
}

pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> AppResult<Response> {
    let Some(term) = query.term() else {
        return Ok(Redirect::to(&contacts_index_path()).into_response());
    };

    let contacts_service = ContactsService::new(state.db);
    let page = contacts_service
        .search_contacts(term, query.page.as_deref(), state.config.pagination.per_page)
        .await?;

    Ok(Json(ContactListPage {
        site_title: "Search - ".to_string(),
        search_value: Some(term.to_string()),
        page,
    })
    .into_response())
}

pub async fn get_contact(
    State(state): State<AppState>,
    Path(contact_id): Path<Uuid>,
) -> AppResult<Json<ContactPage>> {
    let contacts_service = ContactsService::new(state.db);
    let contact = contacts_service.get_contact(contact_id).await?;

    Ok(Json(ContactPage {
        site_title: format!("{} - ", contact.contact.full_name()),
        contact,
    }))
}

pub async fn create_contact(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(form): Json<ContactForm>,
) -> AppResult<(StatusCode, Json<Contact>)> {
    let user_id = get_user_id(&claims)?;

    let contacts_service = ContactsService::new(state.db);
    let contact = contacts_service.create_contact(user_id, form).await?;

    Ok((StatusCode::CREATED, Json(contact)))
}

pub async fn update_contact(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(contact_id): Path<Uuid>,
    Json(form): Json<ContactForm>,
) -> AppResult<Json<Contact>> {
    let user_id = get_user_id(&claims)?;

    let contacts_service = ContactsService::new(state.db);
    let contact = contacts_service
        .update_contact(user_id, contact_id, form)
        .await?;

    Ok(Json(contact))
}

pub async fn delete_contact(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(contact_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let user_id = get_user_id(&claims)?;

    let contacts_service = ContactsService::new(state.db);
    contacts_service.delete_contact(user_id, contact_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn upload_picture(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(contact_id): Path<Uuid>,
    mut multipart: Multipart,
) -> AppResult<Json<Contact>> {
    let user_id = get_user_id(&claims)?;

    let contacts_service = ContactsService::new(state.db);
    contacts_service.get_owned_contact(user_id, contact_id).await?;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        AppError::BadRequest(format!("Failed to read multipart field: {}", e))
    })? {
        let name = field.name().unwrap_or("").to_string();
        if name != "picture" {
            continue;
        }

        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let Some(extension) = image_extension(&content_type) else {
            return Err(invalid_picture().into());
        };

        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Failed to read file: {}", e)))?;
        if data.is_empty() {
            return Err(invalid_picture().into());
        }

        let now = Utc::now();
        let key = format!(
            "{}/{:02}/{}.{}",
            now.year(),
            now.month(),
            Uuid::new_v4(),
            extension
        );
        let picture_url = state
            .minio
            .upload_file(state.minio.pictures_bucket(), &key, data, &content_type)
            .await?;

        let contact = contacts_service
            .set_picture(user_id, contact_id, &picture_url)
            .await?;

        return Ok(Json(contact));
    }

    let mut errors = FormErrors::default();
    errors.add("picture", FieldError::required());
    Err(errors.into())
}

fn invalid_picture() -> FormErrors {
    let mut errors = FormErrors::default();
    errors.add(
        "picture",
        FieldError::new(
            "Upload a valid image. The file you uploaded was either not an image or a corrupted image.",
            "invalid_image",
        ),
    );
    errors
}

/// File extension for accepted image uploads.
fn image_extension(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/png" => Some("png"),
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        "image/bmp" => Some("bmp"),
        _ => None,
    }
}
