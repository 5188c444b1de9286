//! Success response envelope.

use axum::response::{IntoResponse, Response};
use axum::Json;
use moonbrain_core::{Paginated, Pagination};
use serde::Serialize;

/// `{"data": ..., "meta": ...}` body shared by all success responses.
#[derive(Debug, Serialize)]
pub struct DataResponse<T> {
    pub data: T,
    pub meta: Option<Pagination>,
}

impl<T> DataResponse<T> {
    pub fn new(data: T) -> Self {
        Self { data, meta: None }
    }
}

impl<T> From<Paginated<T>> for DataResponse<Vec<T>> {
    fn from(page: Paginated<T>) -> Self {
        Self {
            data: page.data,
            meta: Some(page.pagination),
        }
    }
}

impl<T: Serialize> IntoResponse for DataResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}
