//! Actor header extractor.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::HeaderName, request::Parts, StatusCode},
};

/// Header naming the administrator behind a change.
pub const ACTOR_HEADER: &str = "x-actor";

const MAX_ACTOR_LENGTH: usize = 100;

/// Optional actor taken from the `X-Actor` header.
///
/// Recorded on change records and snapshot authors. `None` when the header
/// is absent or blank.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Actor(pub Option<String>);

impl Actor {
    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }

    /// Snapshot author, falling back to `default`.
    pub fn author_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.0.as_deref().unwrap_or(default)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header_name = HeaderName::from_static(ACTOR_HEADER);

        let Some(value) = parts.headers.get(&header_name) else {
            return Ok(Actor(None));
        };
        let value = value
            .to_str()
            .map_err(|_| (StatusCode::BAD_REQUEST, "X-Actor must be visible ASCII"))?
            .trim();

        if value.len() > MAX_ACTOR_LENGTH {
            return Err((StatusCode::BAD_REQUEST, "X-Actor is too long"));
        }

        Ok(Actor((!value.is_empty()).then(|| value.to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(header: Option<&str>) -> Result<Actor, (StatusCode, &'static str)> {
        let mut builder = Request::builder().uri("/");
        if let Some(value) = header {
            builder = builder.header(ACTOR_HEADER, value);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        Actor::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_missing_header_is_none() {
        assert_eq!(extract(None).await.unwrap(), Actor(None));
    }

    #[tokio::test]
    async fn test_header_is_trimmed() {
        let actor = extract(Some("  alice@example.com ")).await.unwrap();
        assert_eq!(actor.as_deref(), Some("alice@example.com"));
    }

    #[tokio::test]
    async fn test_blank_header_is_none() {
        let actor = extract(Some("   ")).await.unwrap();
        assert_eq!(actor.author_or("system"), "system");
    }

    #[tokio::test]
    async fn test_overlong_header_rejected() {
        let long = "a".repeat(MAX_ACTOR_LENGTH + 1);
        let err = extract(Some(&long)).await.unwrap_err();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);
    }
}
