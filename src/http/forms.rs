use axum::extract::multipart::Multipart;
use bytes::Bytes;
use serde::Serialize;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::domain::validators::validate_not_empty;
use crate::http::AppError;

pub const INVALID_GROUP_MESSAGE: &str = "Выберите корректную группу.";

/// Field metadata as shown on the rendered form.
#[derive(Debug, Clone, Serialize)]
pub struct FormField {
    pub name: &'static str,
    pub label: &'static str,
    pub help_text: &'static str,
    pub value: String,
}

/// Rendered form: fields with their current values, plus per-field errors.
/// Returned on GET of form pages and, with errors filled in, on invalid
/// submissions (which still answer 200).
#[derive(Debug, Clone, Serialize)]
pub struct FormView {
    pub fields: Vec<FormField>,
    pub errors: FormErrors,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct FormErrors(BTreeMap<&'static str, Vec<String>>);

impl FormErrors {
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Submitted post form: `text`, `group`, `image`. The form never carries
/// `author` or `pub_date`; the handler assigns those.
#[derive(Debug, Default)]
pub struct PostForm {
    pub text: String,
    pub group: String,
    pub image: Option<ImageUpload>,
}

#[derive(Debug)]
pub struct ImageUpload {
    pub filename: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl PostForm {
    pub async fn from_multipart(multipart: &mut Multipart) -> Result<Self, AppError> {
        let mut form = Self::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|_| AppError::bad_request("malformed form submission"))?
        {
            match field.name().unwrap_or_default() {
                "text" => {
                    form.text = field
                        .text()
                        .await
                        .map_err(|_| AppError::bad_request("malformed form submission"))?;
                }
                "group" => {
                    form.group = field
                        .text()
                        .await
                        .map_err(|_| AppError::bad_request("malformed form submission"))?;
                }
                "image" => {
                    let filename = field.file_name().unwrap_or_default().to_string();
                    let content_type = field.content_type().map(str::to_string);
                    let data = field
                        .bytes()
                        .await
                        .map_err(|_| AppError::bad_request("malformed form submission"))?;
                    // An empty file input submits a nameless empty part.
                    if !filename.is_empty() {
                        form.image = Some(ImageUpload {
                            filename,
                            content_type,
                            data,
                        });
                    }
                }
                _ => {}
            }
        }
        Ok(form)
    }

    /// Field-level validation. Group existence is checked by the handler
    /// against the store; the parsed id is returned for that lookup.
    pub fn validate(&self, errors: &mut FormErrors) -> Option<Uuid> {
        if let Err(err) = validate_not_empty(&self.text) {
            errors.add("text", err.message);
        }
        if self.group.is_empty() {
            return None;
        }
        match Uuid::parse_str(&self.group) {
            Ok(group_id) => Some(group_id),
            Err(_) => {
                errors.add("group", INVALID_GROUP_MESSAGE);
                None
            }
        }
    }

    pub fn view(&self, errors: FormErrors) -> FormView {
        FormView {
            fields: vec![
                FormField {
                    name: "text",
                    label: "Текст поста",
                    help_text: "Текст нового поста",
                    value: self.text.clone(),
                },
                FormField {
                    name: "group",
                    label: "Group",
                    help_text: "Выберите группу",
                    value: self.group.clone(),
                },
                FormField {
                    name: "image",
                    label: "Picture",
                    help_text: "Добавьте картинку",
                    value: self
                        .image
                        .as_ref()
                        .map(|image| image.filename.clone())
                        .unwrap_or_default(),
                },
            ],
            errors,
        }
    }
}

/// Submitted comment form: a single `text` field. `author` and `post` are
/// handler responsibilities.
#[derive(Debug, Default)]
pub struct CommentForm {
    pub text: String,
}

impl CommentForm {
    pub fn validate(&self, errors: &mut FormErrors) {
        if let Err(err) = validate_not_empty(&self.text) {
            errors.add("text", err.message);
        }
    }

    pub fn view(&self, errors: FormErrors) -> FormView {
        FormView {
            fields: vec![FormField {
                name: "text",
                label: "Текст комментария",
                help_text: "Текст нового комментария",
                value: self.text.clone(),
            }],
            errors,
        }
    }
}
