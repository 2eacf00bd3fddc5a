use actix_web::{HttpResponse, post, web};
use payloads::requests;

use crate::ledger::Ledger;

use super::APIError;

#[tracing::instrument(skip(ledger), ret)]
#[post("/post_transaction")]
pub async fn post_transaction(
    details: web::Json<requests::PostTransaction>,
    ledger: web::Data<Ledger>,
) -> Result<HttpResponse, APIError> {
    let receipt = ledger.post(&details).await?;

    Ok(HttpResponse::Ok().json(receipt))
}

#[tracing::instrument(skip(ledger), ret)]
#[post("/distribute_shu")]
pub async fn distribute_shu(
    details: web::Json<requests::DistributeShu>,
    ledger: web::Data<Ledger>,
) -> Result<HttpResponse, APIError> {
    let result = ledger.distribute_shu(&details).await?;

    Ok(HttpResponse::Ok().json(result))
}

#[tracing::instrument(skip(ledger), ret)]
#[post("/get_account")]
pub async fn get_account(
    details: web::Json<requests::GetAccount>,
    ledger: web::Data<Ledger>,
) -> Result<HttpResponse, APIError> {
    let account = ledger.account(&details.member_id).await?;

    Ok(HttpResponse::Ok().json(payloads::responses::AccountInfo::from(account)))
}

#[tracing::instrument(skip(ledger), ret)]
#[post("/get_transactions")]
pub async fn get_transactions(
    details: web::Json<requests::GetTransactions>,
    ledger: web::Data<Ledger>,
) -> Result<HttpResponse, APIError> {
    let transactions = ledger
        .transactions(&details.member_id, details.limit, details.offset)
        .await?;

    Ok(HttpResponse::Ok().json(transactions))
}
