use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::{json, Value};

/// Wrapper that renders the `success: true` envelope. Object payloads are
/// merged at the top level, so `json!({"token": ..., "user": ...})` becomes
/// `{"success": true, "token": ..., "user": ...}` on the wire.
#[derive(Debug)]
pub struct ApiResponse<T: Serialize> {
    data: T,
    status: StatusCode,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            data,
            status: StatusCode::OK,
        }
    }

    pub fn created(data: T) -> Self {
        Self {
            data,
            status: StatusCode::CREATED,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let value = match serde_json::to_value(&self.data) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!("failed to serialize response data: {}", e);
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({
                        "success": false,
                        "message": "Failed to serialize response"
                    })),
                )
                    .into_response();
            }
        };

        let envelope = match value {
            Value::Object(mut map) => {
                map.insert("success".to_string(), Value::Bool(true));
                Value::Object(map)
            }
            other => json!({ "success": true, "data": other }),
        };

        (self.status, Json(envelope)).into_response()
    }
}

pub type ApiResult<T> = Result<ApiResponse<T>, crate::error::ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_payloads_merge_into_envelope() {
        let response = ApiResponse::success(json!({"token": "abc"})).into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn created_status_is_201() {
        let response = ApiResponse::created(json!({"id": 1})).into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
    }
}
