use axum::{
    extract::{FromRequest, OptionalFromRequest, Request},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use validator::Validate;

/// JSON body extractor that also runs `validator` rules.
///
/// Malformed bodies and failed validation both become a plain-text 400, the
/// same shape the handlers use for their own errors.
pub struct AppJson<T>(pub T);

impl<T, S> FromRequest<S> for AppJson<T>
where
    T: serde::de::DeserializeOwned + Validate + 'static,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let value = match <Json<T> as FromRequest<S>>::from_request(req, state).await {
            Ok(Json(value)) => value,
            Err(rejection) => {
                let message = format!("Failed to parse JSON request body: {}", rejection);
                tracing::warn!("{}", message);
                return Err((StatusCode::BAD_REQUEST, message).into_response());
            }
        };

        if let Err(e) = value.validate() {
            let message = format!("Validation error: {}", e);
            tracing::warn!("{}", message);
            return Err((StatusCode::BAD_REQUEST, message).into_response());
        }

        Ok(AppJson(value))
    }
}

/// `Option<AppJson<T>>`: a request without a body (no `Content-Type`) yields
/// `None`; anything else must parse and validate.
impl<T, S> OptionalFromRequest<S> for AppJson<T>
where
    T: serde::de::DeserializeOwned + Validate + 'static,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Option<Self>, Self::Rejection> {
        if !req.headers().contains_key(header::CONTENT_TYPE) {
            return Ok(None);
        }
        <Self as FromRequest<S>>::from_request(req, state)
            .await
            .map(Some)
    }
}
