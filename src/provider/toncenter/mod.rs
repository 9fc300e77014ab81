use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tycho_types::models::StdAddr;
use tycho_types::prelude::*;
use tycho_util::serde_helpers;

use self::models::*;
use super::{
    ContractProvider, ContractState, GetMethodOutput, ProviderError, StackItem, TransactionInfo,
};

pub mod models;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TonCenterConfig {
    /// API v2 base url.
    pub endpoint: String,
    pub api_key: Option<String>,
    #[serde(with = "serde_helpers::humantime")]
    pub request_timeout: Duration,
}

impl Default for TonCenterConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://toncenter.com/api/v2/".to_owned(),
            api_key: None,
            request_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Clone)]
pub struct TonCenterClient {
    client: reqwest::Client,
    endpoint: reqwest::Url,
}

impl TonCenterClient {
    const API_KEY_HEADER: &str = "X-API-Key";

    pub fn new(config: &TonCenterConfig) -> Result<Self, ProviderError> {
        let mut endpoint = config.endpoint.clone();
        if !endpoint.ends_with('/') {
            endpoint.push('/');
        }
        let endpoint = reqwest::Url::parse(&endpoint)
            .map_err(|e| ProviderError::InvalidResponse(format!("invalid endpoint: {e}")))?;

        let mut headers = reqwest::header::HeaderMap::new();
        if let Some(api_key) = &config.api_key {
            let value = reqwest::header::HeaderValue::from_str(api_key)
                .map_err(|e| ProviderError::InvalidResponse(format!("invalid api key: {e}")))?;
            headers.insert(Self::API_KEY_HEADER, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &reqwest::Url {
        &self.endpoint
    }

    fn url(&self, method: &str) -> Result<reqwest::Url, ProviderError> {
        self.endpoint
            .join(method)
            .map_err(|e| ProviderError::InvalidResponse(format!("invalid method url: {e}")))
    }

    async fn get<T: DeserializeOwned>(
        &self,
        method: &str,
        query: &[(&str, String)],
    ) -> Result<T, ProviderError> {
        let response = self.client.get(self.url(method)?).query(query).send().await?;
        Self::parse_response(method, response).await
    }

    async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        method: &str,
        body: &B,
    ) -> Result<T, ProviderError> {
        let response = self.client.post(self.url(method)?).json(body).send().await?;
        Self::parse_response(method, response).await
    }

    async fn parse_response<T: DeserializeOwned>(
        method: &str,
        response: reqwest::Response,
    ) -> Result<T, ProviderError> {
        let status = response.status();
        let text = response.text().await?;
        tracing::trace!(method, %status, body = %text, "api response");

        // NOTE: The API returns an envelope even for non-2xx statuses.
        match serde_json::from_str::<ApiResponse<T>>(&text) {
            Ok(response) => response.into_result(),
            Err(_) if !status.is_success() => Err(ProviderError::Api {
                code: status.as_u16() as i32,
                message: text,
            }),
            Err(e) => Err(ProviderError::InvalidResponse(format!(
                "failed to parse `{method}` response: {e}"
            ))),
        }
    }
}

impl ContractProvider for TonCenterClient {
    async fn get_contract_state(&self, address: &StdAddr) -> Result<ContractState, ProviderError> {
        let info = self
            .get::<AddressInformationResponse>("getAddressInformation", &[(
                "address",
                address.to_string(),
            )])
            .await?;
        Ok(info.into())
    }

    async fn get_transactions(
        &self,
        address: &StdAddr,
        limit: u8,
    ) -> Result<Vec<TransactionInfo>, ProviderError> {
        let transactions = self
            .get::<Vec<TonlibTransaction>>("getTransactions", &[
                ("address", address.to_string()),
                ("limit", limit.to_string()),
            ])
            .await?;

        transactions
            .into_iter()
            .map(TransactionInfo::try_from)
            .collect()
    }

    async fn run_get_method(
        &self,
        address: &StdAddr,
        method: &str,
        args: Vec<StackItem>,
    ) -> Result<GetMethodOutput, ProviderError> {
        let stack = args
            .into_iter()
            .map(TonlibInputStackItem::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        let response = self
            .post::<_, RunGetMethodResponse>("runGetMethod", &RunGetMethodRequest {
                address,
                method,
                stack,
            })
            .await?;

        tracing::debug!(
            %address,
            method,
            exit_code = response.exit_code,
            gas_used = response.gas_used,
            "get-method executed"
        );
        Ok(response.into())
    }

    async fn send_message(&self, message: Cell) -> Result<(), ProviderError> {
        let hash = *message.repr_hash();
        self.post::<_, serde_json::Value>("sendBoc", &SendBocRequest {
            boc: Boc::encode_base64(&message),
        })
        .await?;

        tracing::info!(%hash, "external message sent");
        Ok(())
    }
}
