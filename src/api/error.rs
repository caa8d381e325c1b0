use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

#[derive(Serialize)]
pub struct ErrorDto {
	pub error: String,
}

#[derive(Error, Debug)]
pub enum ApiError {
	#[error("Missing or invalid API token")]
	Unauthorized,
	#[error("{0}")]
	BadRequest(String),
	#[error(transparent)]
	Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let status = match &self {
			Self::Unauthorized => StatusCode::UNAUTHORIZED,
			Self::BadRequest(_) => StatusCode::BAD_REQUEST,
			Self::Internal(e) => {
				error!("Dashboard API error: {:?}", e);
				return (
					StatusCode::INTERNAL_SERVER_ERROR,
					Json(ErrorDto {
						error: "Internal server error".to_owned(),
					}),
				)
					.into_response();
			}
		};

		(
			status,
			Json(ErrorDto {
				error: self.to_string(),
			}),
		)
			.into_response()
	}
}
