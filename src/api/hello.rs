use axum::{response::IntoResponse, Json};
use serde_json::json;

/// GET /hello - Rate limited sample endpoint
pub async fn hello() -> impl IntoResponse {
    Json(json!({ "message": "Welcome to the Rate Limiter API!" }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hello_body() {
        let response = hello().await.into_response();
        assert_eq!(response.status(), axum::http::StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["message"], "Welcome to the Rate Limiter API!");
    }
}
