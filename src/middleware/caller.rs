use axum::{
    async_trait,
    extract::{FromRequestParts, Request},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use std::convert::Infallible;

use crate::models::Caller;
use crate::utils::error::AppError;

/// Header carrying the opaque user id
pub const USER_ID_HEADER: &str = "x-user-id";

/// Resolve the caller and store it in the request extensions.
///
/// No header means anonymous. A header that is not valid UTF-8, blank, or
/// too long is rejected with 400 before any handler runs.
pub async fn identify_caller(mut request: Request, next: Next) -> Result<Response, AppError> {
    let header = match request.headers().get(USER_ID_HEADER) {
        Some(value) => Some(value.to_str().map_err(|_| {
            AppError::BadRequest("User id header is not valid text".to_string())
        })?),
        None => None,
    };

    let caller = Caller::from_header(header)?;
    request.extensions_mut().insert(caller);

    Ok(next.run(request).await)
}

/// Handlers take `Caller` directly; routes without the middleware see anonymous.
#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<Caller>().cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        middleware,
        routing::get,
        Router,
    };
    use tower::ServiceExt;

    async fn whoami(caller: Caller) -> String {
        caller.user_id().unwrap_or("anonymous").to_string()
    }

    fn app() -> Router {
        Router::new()
            .route("/whoami", get(whoami))
            .layer(middleware::from_fn(identify_caller))
    }

    async fn call(header: Option<&str>) -> (StatusCode, String) {
        let mut builder = Request::builder().uri("/whoami");
        if let Some(value) = header {
            builder = builder.header(USER_ID_HEADER, value);
        }
        let response = app()
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_no_header_is_anonymous() {
        assert_eq!(call(None).await, (StatusCode::OK, "anonymous".to_string()));
    }

    #[tokio::test]
    async fn test_header_identifies_user() {
        assert_eq!(
            call(Some(" user-7 ")).await,
            (StatusCode::OK, "user-7".to_string())
        );
    }

    #[tokio::test]
    async fn test_blank_header_is_bad_request() {
        let (status, _) = call(Some("  ")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
