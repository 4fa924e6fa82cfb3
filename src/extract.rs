use axum::extract::{rejection::JsonRejection, FromRequest, Request};
use axum::response::{IntoResponse, Response};
use tracing::warn;

use crate::error::ApiError;

/// Local version of [`axum::Json`]. A body that cannot be read as `T` is
/// answered with the API's own `{ success: false, message }` error shape.
#[derive(Debug, Clone, Copy, Default)]
pub struct Json<T>(pub T);

impl<T> IntoResponse for Json<T>
where
    T: serde::Serialize,
{
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

#[axum::async_trait]
impl<T, S> FromRequest<S> for Json<T>
where
    T: serde::de::DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match axum::Json::<T>::from_request(req, state).await {
            Ok(inner) => Ok(Json(inner.0)),
            Err(rejection) => {
                warn!(status = %rejection.status(), "rejected request body");
                let message = match rejection {
                    JsonRejection::MissingJsonContentType(_) => {
                        "Expected request with Content-Type: application/json".to_string()
                    }
                    other => other.body_text(),
                };
                Err(ApiError::Validation(message))
            }
        }
    }
}
