use crate::error::{InputError, PredictionError};
use actix_web::http::header::ContentType;
use actix_web::http::StatusCode;
use actix_web::HttpResponse;

mod protocol;
pub mod routes;

pub use protocol::{
    ClassesResponse, ErrorResponse, HealthResponse, PredictRequest, PredictResponse,
};

/// Every way a request can fail, rendered as `{error, success: false}`
#[derive(Debug)]
pub enum WebError {
    Input(InputError),
    Prediction(PredictionError),
    Server(anyhow::Error),
}

impl std::fmt::Display for WebError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WebError::Input(err) => write!(f, "{err}"),
            WebError::Prediction(err) => write!(f, "{err}"),
            WebError::Server(err) => write!(f, "Server error: {err}"),
        }
    }
}

impl actix_web::error::ResponseError for WebError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .json(ErrorResponse::new(self.to_string()))
    }

    fn status_code(&self) -> StatusCode {
        match self {
            WebError::Input(_) => StatusCode::BAD_REQUEST,
            WebError::Prediction(_) | WebError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<InputError> for WebError {
    fn from(err: InputError) -> WebError {
        WebError::Input(err)
    }
}

impl From<PredictionError> for WebError {
    fn from(err: PredictionError) -> WebError {
        WebError::Prediction(err)
    }
}

impl From<anyhow::Error> for WebError {
    fn from(err: anyhow::Error) -> WebError {
        WebError::Server(err)
    }
}

impl From<actix_web::error::BlockingError> for WebError {
    fn from(err: actix_web::error::BlockingError) -> Self {
        WebError::Server(anyhow::anyhow!(err))
    }
}
