pub mod savings;

use actix_web::{
    HttpResponse, Responder, ResponseError, body::BoxBody,
    dev::HttpServiceFactory, get, web,
};

use crate::store::StoreError;

pub fn api_services() -> impl HttpServiceFactory {
    web::scope("/api")
        .service(health_check)
        .service(savings::post_transaction)
        .service(savings::distribute_shu)
        .service(savings::get_account)
        .service(savings::get_transactions)
}

#[get("/health_check")]
pub async fn health_check() -> impl Responder {
    HttpResponse::Ok().body("healthy")
}

#[derive(Debug, thiserror::Error)]
pub enum APIError {
    #[error("Bad request")]
    BadRequest(#[source] anyhow::Error),
    #[error("Not found")]
    NotFound(#[source] anyhow::Error),
    #[error("Something went wrong")]
    UnexpectedError(#[from] anyhow::Error),
}

impl ResponseError for APIError {
    fn error_response(&self) -> HttpResponse<BoxBody> {
        match self {
            Self::BadRequest(e) => {
                HttpResponse::BadRequest().body(format!("{self}: {e}"))
            }
            Self::NotFound(e) => {
                HttpResponse::NotFound().body(format!("{self}: {e}"))
            }
            Self::UnexpectedError(_) => {
                HttpResponse::InternalServerError().body(self.to_string())
            }
        }
    }
}

impl From<StoreError> for APIError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::AccountNotFound
            | StoreError::TransferTargetNotFound => APIError::NotFound(e.into()),
            StoreError::NotUnique(_)
            | StoreError::Database(_)
            | StoreError::UnexpectedError(_) => {
                APIError::UnexpectedError(e.into())
            }
            // Validation failures keep their distinct messages in the body.
            _ => APIError::BadRequest(e.into()),
        }
    }
}
