// SPDX-License-Identifier: MIT
// Copyright 2026 EcoTrace Contributors

use axum::http::StatusCode;
use axum::response::IntoResponse;
use ecotrace::error::AppError;
use ecotrace::period::PeriodType;

mod common;

#[test]
fn test_status_mapping() {
    let cases = [
        (AppError::Unauthorized, StatusCode::UNAUTHORIZED),
        (AppError::InvalidToken, StatusCode::UNAUTHORIZED),
        (AppError::not_found("League not found"), StatusCode::NOT_FOUND),
        (AppError::bad_request("League is full"), StatusCode::BAD_REQUEST),
        (AppError::forbidden("Only the host can kick members"), StatusCode::FORBIDDEN),
        (AppError::Database("boom".to_string()), StatusCode::INTERNAL_SERVER_ERROR),
        (
            AppError::Internal(anyhow::anyhow!("boom")),
            StatusCode::INTERNAL_SERVER_ERROR,
        ),
    ];

    for (err, status) in cases {
        assert_eq!(err.into_response().status(), status);
    }
}

#[tokio::test]
async fn test_client_errors_carry_details() {
    let response = AppError::forbidden("Cannot join private league without invitation")
        .into_response();
    let body = common::json_body(response).await;

    assert_eq!(body["error"], "forbidden");
    assert_eq!(body["details"], "Cannot join private league without invitation");
}

#[tokio::test]
async fn test_server_errors_hide_details() {
    let response = AppError::Database("connection reset by peer".to_string()).into_response();
    let body = common::json_body(response).await;

    assert_eq!(body["error"], "database_error");
    assert!(body.get("details").is_none());
}

#[test]
fn test_invalid_period_message_lists_choices() {
    let err = "hourly".parse::<PeriodType>().unwrap_err();
    assert_eq!(
        err.to_string(),
        "Invalid request: Invalid period type. Use: DAILY, WEEKLY, MONTHLY, YEARLY"
    );
}
