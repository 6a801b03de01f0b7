use super::{
    record::{ApiResponse, HashesRequest, ResultPage},
    ChunkFailure, FetchOutcome, HistoryFetcher, WalletHistory, DEFAULT_CHUNK_SIZE,
};
use crate::{metrics::HistoryFetcherMetrics, ProviderError};

use alloy_primitives::{Address, TxHash};
use bridge_history_primitives::{BridgeTransaction, TokenInfo};
use futures::future::join_all;
use std::{collections::HashMap, sync::Arc, time::Duration};

/// The path of the by-hashes query.
const TXS_BY_HASHES_PATH: &str = "api/txsbyhashes";

/// The path of the by-wallet query.
const TXS_BY_WALLET_PATH: &str = "api/txs";

/// The default request timeout.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// A [`HistoryFetcher`] querying the history backend over HTTP.
#[derive(Debug, Clone)]
pub struct HttpHistoryFetcher {
    /// The HTTP client.
    client: reqwest::Client,
    /// The base url of the backend, terminated by a slash.
    base_url: String,
    /// The count of hashes per request.
    chunk_size: usize,
    /// The known ERC20 tokens, keyed by address.
    tokens: Arc<HashMap<Address, TokenInfo>>,
    /// The fetcher metrics.
    metrics: HistoryFetcherMetrics,
}

impl HttpHistoryFetcher {
    /// Returns a new [`HttpHistoryFetcher`] for the backend at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder().timeout(DEFAULT_REQUEST_TIMEOUT).build()?;
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Ok(Self {
            client,
            base_url,
            chunk_size: DEFAULT_CHUNK_SIZE,
            tokens: Default::default(),
            metrics: HistoryFetcherMetrics::default(),
        })
    }

    /// Sets the count of hashes per request.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Sets the known ERC20 tokens used to resolve the records' token info.
    pub fn with_tokens(mut self, tokens: impl IntoIterator<Item = TokenInfo>) -> Self {
        self.tokens = Arc::new(tokens.into_iter().map(|token| (token.address, token)).collect());
        self
    }

    async fn fetch_chunk(&self, hashes: &[TxHash]) -> Result<Vec<BridgeTransaction>, ProviderError> {
        let url = format!("{}{TXS_BY_HASHES_PATH}", self.base_url);
        let response: ApiResponse<ResultPage> = self
            .client
            .post(url)
            .json(&HashesRequest { txs: hashes })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        let page = unpack(response)?;
        Ok(self.into_transactions(page.results))
    }

    fn into_transactions(&self, records: Vec<super::BridgeRecord>) -> Vec<BridgeTransaction> {
        records.into_iter().map(|record| record.into_transaction(&self.tokens)).collect()
    }
}

/// Unpacks the backend envelope, mapping a non-zero error code to an error.
fn unpack(response: ApiResponse<ResultPage>) -> Result<ResultPage, ProviderError> {
    if response.errcode != 0 {
        return Err(ProviderError::Backend { code: response.errcode, message: response.errmsg })
    }
    Ok(response.data.unwrap_or_default())
}

#[async_trait::async_trait]
impl HistoryFetcher for HttpHistoryFetcher {
    async fn fetch_by_hashes(&self, hashes: &[TxHash]) -> FetchOutcome {
        let chunks: Vec<_> = hashes.chunks(self.chunk_size).collect();
        let results = join_all(chunks.iter().map(|chunk| self.fetch_chunk(chunk))).await;

        let mut outcome = FetchOutcome::default();
        for (chunk, result) in chunks.into_iter().zip(results) {
            match result {
                Ok(records) => {
                    self.metrics.fetched_records.increment(records.len() as u64);
                    outcome.records.extend(records);
                }
                Err(error) => {
                    tracing::warn!(target: "bridge_history::providers", count = chunk.len(), %error, "failed to fetch history chunk");
                    self.metrics.failed_chunks.increment(1);
                    outcome.failed_chunks.push(ChunkFailure { hashes: chunk.to_vec(), error });
                }
            }
        }
        tracing::debug!(
            target: "bridge_history::providers",
            requested = hashes.len(),
            fetched = outcome.records.len(),
            failed_chunks = outcome.failed_chunks.len(),
            "fetched history by hashes"
        );

        outcome
    }

    async fn fetch_by_wallet(
        &self,
        address: Address,
        page: u64,
        page_size: u64,
    ) -> Result<WalletHistory, ProviderError> {
        let url = format!("{}{TXS_BY_WALLET_PATH}", self.base_url);
        let response: ApiResponse<ResultPage> = self
            .client
            .get(url)
            .query(&[
                ("address", address.to_string()),
                ("page", page.to_string()),
                ("page_size", page_size.to_string()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        let page = unpack(response)?;
        self.metrics.fetched_records.increment(page.results.len() as u64);

        Ok(WalletHistory { total: page.total, records: self.into_transactions(page.results) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unpack_backend_error() {
        let response: ApiResponse<ResultPage> = serde_json::from_value(serde_json::json!({
            "errcode": 40001,
            "errmsg": "rate limited",
            "data": null
        }))
        .unwrap();
        let err = unpack(response).unwrap_err();
        assert!(matches!(err, ProviderError::Backend { code: 40001, .. }));
        assert!(err.is_transient());
    }

    #[test]
    fn test_unpack_empty_page() {
        let response: ApiResponse<ResultPage> =
            serde_json::from_value(serde_json::json!({ "errcode": 0, "errmsg": "" })).unwrap();
        let page = unpack(response).unwrap();
        assert!(page.results.is_empty());
        assert_eq!(page.total, 0);
    }

    #[test]
    fn test_base_url_normalized() {
        let fetcher = HttpHistoryFetcher::new("https://history.example").unwrap().with_chunk_size(0);
        assert_eq!(fetcher.base_url, "https://history.example/");
        assert_eq!(fetcher.chunk_size, 1);
    }
}
