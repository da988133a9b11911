//! Pending transactions scraped from the Etherscan web front end
//!
//! The pending list page only carries transaction hashes, so every hash costs
//! one more request to read its nonce from the transaction page.

use super::{PendingSource, SourceKind};
use crate::error::{PlungerError, PlungerResult};
use crate::reconcile::PendingEntry;

use async_trait::async_trait;
use ethers::types::Address;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

lazy_static! {
    /// Hash links inside `span.address-tag` cells of the pending table
    static ref PENDING_TX_LINK: Regex = Regex::new(
        r#"<span\s+class=["']address-tag["']\s*>\s*<a[^>]*>\s*(0x[0-9a-fA-F]{64})\s*</a>"#
    )
    .unwrap();

    /// Value of the element titled "The transaction nonce ..."
    static ref TX_NONCE: Regex = Regex::new(
        r#"<span[^>]*title=["'][^"']*The transaction nonce[^"']*["'][^>]*>\s*([0-9]+)\s*<"#
    )
    .unwrap();
}

pub struct EtherscanSource {
    /// Explorer base URL, e.g. `https://etherscan.io`
    base_url: String,
    http: reqwest::Client,
}

impl EtherscanSource {
    pub fn new(base_url: &str, http: reqwest::Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        }
    }

    async fn fetch(&self, url: &str) -> PlungerResult<String> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| PlungerError::source_failure(self.kind().name(), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PlungerError::source_failure(
                self.kind().name(),
                format!("GET {} returned {}", url, status),
            ));
        }

        response
            .text()
            .await
            .map_err(|e| PlungerError::source_failure(self.kind().name(), e))
    }

    async fn tx_nonce(&self, tx_hash: &str) -> PlungerResult<u64> {
        let page = self.fetch(&format!("{}/tx/{}", self.base_url, tx_hash)).await?;
        parse_tx_nonce(&page).ok_or_else(|| {
            PlungerError::source_failure(
                self.kind().name(),
                format!("no nonce on transaction page of {}", tx_hash),
            )
        })
    }
}

#[async_trait]
impl PendingSource for EtherscanSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Etherscan
    }

    async fn list_pending(&self, account: Address) -> PlungerResult<Vec<PendingEntry>> {
        let url = format!("{}/txsPending?a={:?}", self.base_url, account);
        let page = self.fetch(&url).await?;
        let tx_hashes = parse_pending_list(&page);

        debug!(count = tx_hashes.len(), "Etherscan lists pending transactions");

        let mut entries = Vec::with_capacity(tx_hashes.len());
        for tx_hash in tx_hashes {
            let nonce = self.tx_nonce(&tx_hash).await?;
            entries.push(PendingEntry::new(&tx_hash, nonce));
        }

        Ok(entries)
    }
}

/// Transaction hashes on the pending list page, first occurrence order
pub(crate) fn parse_pending_list(page: &str) -> Vec<String> {
    let mut hashes: Vec<String> = Vec::new();
    for caps in PENDING_TX_LINK.captures_iter(page) {
        let hash = caps[1].to_string();
        if !hashes.contains(&hash) {
            hashes.push(hash);
        }
    }
    hashes
}

pub(crate) fn parse_tx_nonce(page: &str) -> Option<u64> {
    TX_NONCE
        .captures(page)
        .and_then(|caps| caps[1].parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIST_PAGE: &str = r#"
<table class="table table-hover">
  <thead><tr><th>TxHash</th><th>Nonce</th><th>From</th></tr></thead>
  <tbody>
    <tr>
      <td><span class="address-tag"><a href="/tx/0x7bc44a24f93df200a3bd172a5a690bec50c215e7a84fa794bacfb61a211d6559">0x7bc44a24f93df200a3bd172a5a690bec50c215e7a84fa794bacfb61a211d6559</a></span></td>
      <td><span class="address-tag"><a href="/address/0x6c626f45e3b7ae5a3998478753634790fd0e82ee">0x6c626f45e3b7ae5a3998478753634790fd0e82ee</a></span></td>
    </tr>
    <tr>
      <td><span class="address-tag"><a href="/tx/0x72e7a42d3e1b0773f62cfa9ee2bc54ff904a908ac2a668678f9c4880fd046f7a">0x72e7a42d3e1b0773f62cfa9ee2bc54ff904a908ac2a668678f9c4880fd046f7a</a></span></td>
    </tr>
  </tbody>
</table>"#;

    const EMPTY_LIST_PAGE: &str = r#"
<table class="table table-hover">
  <tbody><tr><td colspan="7">There are no matching entries</td></tr></tbody>
</table>"#;

    const ACCOUNT: &str = "0x6c626f45e3b7ae5a3998478753634790fd0e82ee";
    const FIRST_TX: &str = "0x7bc44a24f93df200a3bd172a5a690bec50c215e7a84fa794bacfb61a211d6559";
    const SECOND_TX: &str = "0x72e7a42d3e1b0773f62cfa9ee2bc54ff904a908ac2a668678f9c4880fd046f7a";

    fn tx_page(nonce: u64) -> String {
        format!(
            r#"
<div class="row">
  <div class="col-md-3">Nonce:</div>
  <div class="col-md-9">
    <span rel="tooltip" data-toggle="tooltip" title="The transaction nonce (Position in the transaction sequence of the sender)"> {} </span>
  </div>
</div>"#,
            nonce
        )
    }

    async fn mock_page(
        server: &mut mockito::ServerGuard,
        path: &str,
        status: usize,
        body: &str,
    ) -> mockito::Mock {
        server
            .mock("GET", path)
            .match_query(mockito::Matcher::Any)
            .with_status(status)
            .with_body(body)
            .create_async()
            .await
    }

    #[test]
    fn test_parses_transaction_hashes_but_not_addresses() {
        assert_eq!(
            parse_pending_list(LIST_PAGE),
            vec![
                "0x7bc44a24f93df200a3bd172a5a690bec50c215e7a84fa794bacfb61a211d6559".to_string(),
                "0x72e7a42d3e1b0773f62cfa9ee2bc54ff904a908ac2a668678f9c4880fd046f7a".to_string(),
            ]
        );
    }

    #[test]
    fn test_empty_list_page() {
        assert!(parse_pending_list(EMPTY_LIST_PAGE).is_empty());
    }

    #[test]
    fn test_parses_nonce_from_transaction_page() {
        assert_eq!(parse_tx_nonce(&tx_page(9)), Some(9));
        assert_eq!(parse_tx_nonce("<html></html>"), None);
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let source = EtherscanSource::new("https://kovan.etherscan.io/", reqwest::Client::new());
        assert_eq!(source.base_url, "https://kovan.etherscan.io");
    }

    #[tokio::test]
    async fn test_lists_pending_transactions_with_nonces() {
        let mut server = mockito::Server::new_async().await;
        let list = server
            .mock("GET", "/txsPending")
            .match_query(mockito::Matcher::UrlEncoded("a".into(), ACCOUNT.into()))
            .with_body(LIST_PAGE)
            .create_async()
            .await;
        let _first = mock_page(&mut server, &format!("/tx/{}", FIRST_TX), 200, &tx_page(8)).await;
        let _second = mock_page(&mut server, &format!("/tx/{}", SECOND_TX), 200, &tx_page(9)).await;

        let source = EtherscanSource::new(&server.url(), reqwest::Client::new());
        let entries = source.list_pending(ACCOUNT.parse().unwrap()).await.unwrap();

        list.assert_async().await;
        assert_eq!(
            entries,
            vec![PendingEntry::new(FIRST_TX, 8), PendingEntry::new(SECOND_TX, 9)]
        );
    }

    #[tokio::test]
    async fn test_empty_list_needs_no_transaction_pages() {
        let mut server = mockito::Server::new_async().await;
        let _list = mock_page(&mut server, "/txsPending", 200, EMPTY_LIST_PAGE).await;

        let source = EtherscanSource::new(&server.url(), reqwest::Client::new());
        let entries = source.list_pending(ACCOUNT.parse().unwrap()).await.unwrap();

        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn test_error_status_is_source_error() {
        let mut server = mockito::Server::new_async().await;
        let _list = mock_page(&mut server, "/txsPending", 503, "Service Unavailable").await;

        let source = EtherscanSource::new(&server.url(), reqwest::Client::new());
        let err = source.list_pending(ACCOUNT.parse().unwrap()).await.unwrap_err();

        assert!(matches!(err, PlungerError::Source { ref name, .. } if name == "etherscan"));
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn test_transaction_page_without_nonce_aborts_listing() {
        let mut server = mockito::Server::new_async().await;
        let _list = mock_page(&mut server, "/txsPending", 200, LIST_PAGE).await;
        let _first = mock_page(&mut server, &format!("/tx/{}", FIRST_TX), 200, "<html></html>").await;
        let second = server
            .mock("GET", format!("/tx/{}", SECOND_TX).as_str())
            .match_query(mockito::Matcher::Any)
            .with_body(tx_page(9))
            .expect(0)
            .create_async()
            .await;

        let source = EtherscanSource::new(&server.url(), reqwest::Client::new());
        let err = source.list_pending(ACCOUNT.parse().unwrap()).await.unwrap_err();

        assert!(matches!(err, PlungerError::Source { .. }));
        second.assert_async().await;
    }
}
