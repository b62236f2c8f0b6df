use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    error::{AppError, AppResult, FieldErrors},
    models::Category,
};

pub const TITLE_MAX_LEN: usize = 120;
pub const SLUG_MAX_LEN: usize = 140;

/// Body of `POST` and `PUT`: every field is required.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CategoryRequest {
    pub title: String,
    pub slug: String,
}

/// Body of `PATCH`.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct CategoryPatch {
    pub title: Option<String>,
    pub slug: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryList {
    pub items: Vec<Category>,
}

impl From<CategoryRequest> for CategoryPatch {
    fn from(req: CategoryRequest) -> Self {
        CategoryPatch {
            title: Some(req.title),
            slug: Some(req.slug),
        }
    }
}

impl CategoryPatch {
    pub fn validate(&self) -> AppResult<()> {
        let mut errors = FieldErrors::new();
        if let Some(title) = &self.title {
            check_title(title, &mut errors);
        }
        if let Some(slug) = &self.slug {
            check_slug(slug, &mut errors);
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(errors))
        }
    }
}

fn check_title(title: &str, errors: &mut FieldErrors) {
    if title.trim().is_empty() {
        errors
            .entry("title".into())
            .or_default()
            .push("This field may not be blank.".into());
    } else if title.chars().count() > TITLE_MAX_LEN {
        errors
            .entry("title".into())
            .or_default()
            .push(format!("Ensure this field has no more than {TITLE_MAX_LEN} characters."));
    }
}

pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn check_slug(slug: &str, errors: &mut FieldErrors) {
    if !is_valid_slug(slug) {
        errors.entry("slug".into()).or_default().push(
            "Enter a valid slug consisting of letters, numbers, underscores or hyphens.".into(),
        );
    } else if slug.chars().count() > SLUG_MAX_LEN {
        errors
            .entry("slug".into())
            .or_default()
            .push(format!("Ensure this field has no more than {SLUG_MAX_LEN} characters."));
    }
}
