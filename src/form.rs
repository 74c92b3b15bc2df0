use axum::{
    Json,
    extract::{FromRequest, Multipart, Request, multipart::Field},
    http::header,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{CollegePayload, CollegeStatus, Course},
};

/// ImageUpload
///
/// A buffered image part from a college form.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub filename: Option<String>,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    fn extension(&self) -> &str {
        match self.content_type.as_str() {
            "image/png" => "png",
            "image/jpeg" => "jpg",
            "image/gif" => "gif",
            "image/webp" => "webp",
            "image/svg+xml" => "svg",
            _ => self
                .filename
                .as_deref()
                .and_then(|name| std::path::Path::new(name).extension())
                .and_then(std::ffi::OsStr::to_str)
                .unwrap_or("bin"),
        }
    }

    /// A fresh, collision-free object key under the `colleges/` prefix.
    pub fn object_key(&self) -> String {
        format!("colleges/{}.{}", Uuid::new_v4(), self.extension())
    }
}

/// CollegeForm
///
/// Body extractor for the admin create/update endpoints. Accepts either
///
/// - `multipart/form-data`: text parts for the scalar fields, a `courses` part holding a
///   JSON-encoded course array, and an optional `image` file part; or
/// - `application/json`: a `CollegePayload` object with `courses` as a real array.
///
/// Either way the course list leaves this extractor as typed `Vec<Course>` and the
/// scalar fields have been range-checked.
#[derive(Debug, Clone, Default)]
pub struct CollegeForm {
    pub fields: CollegePayload,
    pub image: Option<ImageUpload>,
}

impl<S> FromRequest<S> for CollegeForm
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|ct| ct.starts_with("multipart/form-data"));

        let mut form = if is_multipart {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|rejection| AppError::Validation(rejection.body_text()))?;
            read_multipart(multipart).await?
        } else {
            let Json(fields) = Json::<CollegePayload>::from_request(req, state)
                .await
                .map_err(|rejection| AppError::Validation(rejection.body_text()))?;
            CollegeForm {
                fields,
                image: None,
            }
        };

        validate(&mut form.fields)?;
        Ok(form)
    }
}

async fn read_multipart(mut multipart: Multipart) -> AppResult<CollegeForm> {
    let mut form = CollegeForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(e.body_text()))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        if name == "image" {
            form.image = read_image(field).await?;
            continue;
        }

        let text = field
            .text()
            .await
            .map_err(|e| AppError::Validation(e.body_text()))?;
        let text = text.trim();
        if text.is_empty() {
            continue;
        }

        let fields = &mut form.fields;
        match name.as_str() {
            "name" => fields.name = Some(text.to_string()),
            "location" => fields.location = Some(text.to_string()),
            "ranking" => fields.ranking = Some(parse_number(&name, text)?),
            "fees" => fields.fees = Some(parse_number(&name, text)?),
            "placementPercentage" => fields.placement_percentage = Some(parse_number(&name, text)?),
            "courses" => fields.courses = Some(parse_courses(text)?),
            "eligibility" => fields.eligibility = Some(text.to_string()),
            "status" => fields.status = Some(parse_status(text)?),
            "description" => fields.description = Some(text.to_string()),
            "website" => fields.website = Some(text.to_string()),
            other => tracing::debug!(field = other, "ignoring unknown form field"),
        }
    }

    Ok(form)
}

async fn read_image(field: Field<'_>) -> AppResult<Option<ImageUpload>> {
    let filename = field.file_name().map(str::to_string);
    let content_type = field
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_string();

    let bytes = field
        .bytes()
        .await
        .map_err(|e| AppError::Validation(e.body_text()))?;

    // Browsers send an empty part when no file was chosen.
    if bytes.is_empty() {
        return Ok(None);
    }

    if !content_type.starts_with("image/") {
        return Err(AppError::Validation(format!(
            "image must be an image file, got '{content_type}'"
        )));
    }

    Ok(Some(ImageUpload {
        filename,
        content_type,
        bytes: bytes.to_vec(),
    }))
}

fn parse_number<T: std::str::FromStr>(name: &str, text: &str) -> AppResult<T> {
    text.parse()
        .map_err(|_| AppError::Validation(format!("{name} must be a number")))
}

/// Decodes the JSON-encoded course list sent as a multipart text part.
pub fn parse_courses(text: &str) -> AppResult<Vec<Course>> {
    serde_json::from_str(text)
        .map_err(|e| AppError::Validation(format!("courses must be a JSON array of courses: {e}")))
}

fn parse_status(text: &str) -> AppResult<CollegeStatus> {
    match text {
        "draft" => Ok(CollegeStatus::Draft),
        "published" => Ok(CollegeStatus::Published),
        other => Err(AppError::Validation(format!(
            "status must be 'draft' or 'published', got '{other}'"
        ))),
    }
}

/// validate
///
/// Trims `name` and course names in place, then applies the field constraints declared
/// on `CollegePayload`. Whitespace-only names are therefore rejected as empty.
pub fn validate(fields: &mut CollegePayload) -> AppResult<()> {
    if let Some(name) = fields.name.as_mut() {
        *name = name.trim().to_string();
    }
    for course in fields.courses.iter_mut().flatten() {
        course.name = course.name.trim().to_string();
    }

    fields.validate()?;
    Ok(())
}
