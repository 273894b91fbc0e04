//! `ValidatedJson`: a `Json<T>` extractor whose rejection goes through
//! `ApiError` so every 400 response carries the facade's `{"error": "..."}`
//! shape instead of axum's default plaintext rejection body.

use axum::{
    async_trait,
    extract::{FromRequest, Request},
    Json,
};

use crate::error::ApiError;

pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: serde::de::DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(ValidatedJson(value))
    }
}
