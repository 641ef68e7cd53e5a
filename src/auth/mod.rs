//! Identity boundary
//!
//! Authentication is delegated to an external identity provider; this
//! service never issues or verifies tokens itself. The gateway in front
//! of it forwards the verified identity as `x-auth-*` headers, and this
//! module turns those into an [`AuthorIdentity`].

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{HeaderMap, request::Parts},
};

use crate::error::AppError;

const UID_HEADER: &str = "x-auth-uid";
const DISPLAY_NAME_HEADER: &str = "x-auth-name";
const EMAIL_HEADER: &str = "x-auth-email";
const PHOTO_URL_HEADER: &str = "x-auth-photo";

/// The current user as supplied by the identity provider.
#[derive(Debug, Clone)]
pub struct AuthorIdentity {
    pub uid: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub photo_url: Option<String>,
}

impl AuthorIdentity {
    /// Resolve the display name stored on posts and comments.
    ///
    /// Falls back from `display_name` to the local part of `email` to
    /// `"Anonymous"`.
    pub fn author_name(&self) -> String {
        if let Some(name) = self.display_name.as_deref() {
            let name = name.trim();
            if !name.is_empty() {
                return name.to_string();
            }
        }

        if let Some(email) = self.email.as_deref() {
            let local = email.split('@').next().unwrap_or("").trim();
            if !local.is_empty() {
                return local.to_string();
            }
        }

        "Anonymous".to_string()
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
}

/// Extractor for the current authenticated user
///
/// # Usage
/// ```ignore
/// async fn handler(CurrentUser(identity): CurrentUser) -> impl IntoResponse {
///     format!("Hello, {}", identity.author_name())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentUser(pub AuthorIdentity);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    /// Extract current user from forwarded identity headers.
    ///
    /// A request without a uid header is unauthenticated.
    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let uid = header_value(&parts.headers, UID_HEADER).ok_or(AppError::Unauthorized)?;

        Ok(CurrentUser(AuthorIdentity {
            uid,
            display_name: header_value(&parts.headers, DISPLAY_NAME_HEADER),
            email: header_value(&parts.headers, EMAIL_HEADER),
            photo_url: header_value(&parts.headers, PHOTO_URL_HEADER),
        }))
    }
}
