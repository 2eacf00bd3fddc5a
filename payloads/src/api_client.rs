use reqwest::StatusCode;
use serde::Serialize;

use crate::{requests, responses, TransactionRecord};

type ReqwestResult = Result<reqwest::Response, reqwest::Error>;

/// An API client for interfacing with the savings backend.
pub struct APIClient {
    pub address: String,
    pub inner_client: reqwest::Client,
}

/// Helper methods for http actions
impl APIClient {
    fn format_url(&self, path: &str) -> String {
        format!("{}/api/{path}", &self.address)
    }

    async fn post(&self, path: &str, body: &impl Serialize) -> ReqwestResult {
        self.inner_client
            .post(self.format_url(path))
            .json(body)
            .send()
            .await
    }

    async fn empty_get(&self, path: &str) -> ReqwestResult {
        self.inner_client.get(self.format_url(path)).send().await
    }
}

/// Methods on the backend API
impl APIClient {
    pub async fn health_check(&self) -> Result<(), ClientError> {
        let response = self.empty_get("health_check").await?;
        ok_empty(response).await
    }

    /// Post a deposit, withdrawal, or transfer against a member's account.
    pub async fn post_transaction(
        &self,
        details: &requests::PostTransaction,
    ) -> Result<responses::PostingReceipt, ClientError> {
        let response = self.post("post_transaction", details).await?;
        ok_body(response).await
    }

    /// Post the yearly SHU profit share to the listed members.
    pub async fn distribute_shu(
        &self,
        details: &requests::DistributeShu,
    ) -> Result<responses::ShuDistributionResult, ClientError> {
        let response = self.post("distribute_shu", details).await?;
        ok_body(response).await
    }

    /// Get a member's account balances.
    pub async fn get_account(
        &self,
        details: &requests::GetAccount,
    ) -> Result<responses::AccountInfo, ClientError> {
        let response = self.post("get_account", details).await?;
        ok_body(response).await
    }

    /// Get a member's transaction history, newest first.
    pub async fn get_transactions(
        &self,
        details: &requests::GetTransactions,
    ) -> Result<Vec<TransactionRecord>, ClientError> {
        let response = self.post("get_transactions", details).await?;
        ok_body(response).await
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// An unhandled API error to display, containing response text.
    #[error("{1}")]
    APIError(StatusCode, String),
    #[error("Network error. Please check your connection.")]
    Network(#[from] reqwest::Error),
}

/// Deserialize a successful request into the desired type, or return an
/// appropriate error.
pub async fn ok_body<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ClientError> {
    if !response.status().is_success() {
        return Err(ClientError::APIError(
            response.status(),
            response.text().await?,
        ));
    }
    Ok(response.json::<T>().await?)
}

/// Check that an empty response is OK, returning a ClientError if not.
pub async fn ok_empty(response: reqwest::Response) -> Result<(), ClientError> {
    if !response.status().is_success() {
        return Err(ClientError::APIError(
            response.status(),
            response.text().await?,
        ));
    }
    Ok(())
}
