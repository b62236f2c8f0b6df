use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{AppError, AppResult, FieldErrors};

#[derive(Deserialize, Debug, ToSchema)]
pub struct RegisterRequest {
    pub username: String,
    #[serde(default)]
    pub email: String,
    pub password: String,
}

impl RegisterRequest {
    pub fn validate(&self) -> AppResult<()> {
        let mut errors = FieldErrors::new();
        let username = self.username.trim();
        if username.is_empty() {
            errors
                .entry("username".into())
                .or_default()
                .push("This field may not be blank.".into());
        } else if username.chars().count() > 150
            || !username.chars().all(|c| c.is_alphanumeric() || "@.+-_".contains(c))
        {
            errors.entry("username".into()).or_default().push(
                "Enter a valid username of at most 150 letters, digits and @/./+/-/_ characters."
                    .into(),
            );
        }
        if !self.email.is_empty() && !self.email.contains('@') {
            errors
                .entry("email".into())
                .or_default()
                .push("Enter a valid email address.".into());
        }
        if self.password.len() < 8 {
            errors
                .entry("password".into())
                .or_default()
                .push("Ensure this field has at least 8 characters.".into());
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(errors))
        }
    }
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: String,
    pub expires_at: i64,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct Claims {
    /// User id.
    pub sub: String,
    pub exp: usize,
}
