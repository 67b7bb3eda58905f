//! Alpha Vantage 상승률 상위 종목 클라이언트.
//!
//! `TOP_GAINERS_LOSERS` 엔드포인트(JSON)에서 당일 상승률 상위 종목을
//! 조회합니다. 페이로드의 숫자는 전부 문자열이며 `change_percentage`는
//! `%` 접미사를 포함합니다.

use crate::error::{DataError, Result};
use serde::Deserialize;

/// Alpha Vantage 상승률 상위 종목 클라이언트.
#[derive(Clone)]
pub struct GainersClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

/// 상승률 상위 종목.
#[derive(Debug, Clone, PartialEq)]
pub struct GainerRow {
    pub ticker: String,
    pub price: Option<f64>,
    pub change_amount: Option<f64>,
    pub change_percentage: Option<f64>,
    pub volume: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawGainer {
    ticker: String,
    #[serde(default)]
    price: Option<String>,
    #[serde(default)]
    change_amount: Option<String>,
    #[serde(default)]
    change_percentage: Option<String>,
    #[serde(default)]
    volume: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GainersResponse {
    #[serde(default)]
    top_gainers: Vec<RawGainer>,
}

/// 숫자 문자열 파싱 (% 접미사, 천 단위 콤마 허용).
fn parse_num_opt(value: &Option<String>) -> Option<f64> {
    value
        .as_ref()
        .map(|v| v.trim_end_matches('%').replace(',', ""))
        .and_then(|v| v.parse().ok())
}

impl From<RawGainer> for GainerRow {
    fn from(raw: RawGainer) -> Self {
        GainerRow {
            price: parse_num_opt(&raw.price),
            change_amount: parse_num_opt(&raw.change_amount),
            change_percentage: parse_num_opt(&raw.change_percentage),
            volume: parse_num_opt(&raw.volume),
            ticker: raw.ticker,
        }
    }
}

impl GainersClient {
    /// 새로운 클라이언트 생성.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, "https://www.alphavantage.co")
    }

    /// base URL 지정 생성 (테스트용).
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("HTTP 클라이언트 생성 실패"),
            api_key: api_key.into(),
            base_url: base_url.into(),
        }
    }

    /// 상승률 상위 종목 조회.
    ///
    /// 실패는 실행 전체를 중단시키는 치명적 오류입니다.
    pub async fn fetch_top_gainers(&self) -> Result<Vec<GainerRow>> {
        let url = format!(
            "{}/query?function=TOP_GAINERS_LOSERS&apikey={}",
            self.base_url, self.api_key
        );

        tracing::debug!(url = %self.base_url, "TOP_GAINERS_LOSERS 요청");

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DataError::Fetch(format!(
                "TOP_GAINERS_LOSERS 오류 [{}]: {}",
                status, body
            )));
        }

        let data: GainersResponse = response.json().await?;
        let gainers: Vec<GainerRow> = data.top_gainers.into_iter().map(GainerRow::from).collect();

        tracing::info!(count = gainers.len(), "상승률 상위 종목 조회 완료");
        Ok(gainers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_num_opt() {
        assert_eq!(parse_num_opt(&Some("12.34".to_string())), Some(12.34));
        assert_eq!(parse_num_opt(&Some("45.6%".to_string())), Some(45.6));
        assert_eq!(
            parse_num_opt(&Some("1,234,567".to_string())),
            Some(1234567.0)
        );
        assert_eq!(parse_num_opt(&Some("n/a".to_string())), None);
        assert_eq!(parse_num_opt(&None), None);
    }

    #[tokio::test]
    async fn test_fetch_top_gainers() {
        let mut server = mockito::Server::new_async().await;
        let body = r#"{
            "metadata": "Top gainers, losers, and most actively traded US tickers",
            "last_updated": "2024-06-03 16:15:59 US/Eastern",
            "top_gainers": [
                {"ticker": "ABC", "price": "4.56", "change_amount": "1.23",
                 "change_percentage": "36.94%", "volume": "1200000"}
            ],
            "top_losers": [],
            "most_actively_traded": []
        }"#;
        server
            .mock("GET", "/query")
            .match_query(mockito::Matcher::UrlEncoded(
                "function".into(),
                "TOP_GAINERS_LOSERS".into(),
            ))
            .with_status(200)
            .with_body(body)
            .create_async()
            .await;

        let client = GainersClient::with_base_url("test-key", server.url());
        let gainers = client.fetch_top_gainers().await.unwrap();

        assert_eq!(gainers.len(), 1);
        assert_eq!(gainers[0].ticker, "ABC");
        assert_eq!(gainers[0].change_percentage, Some(36.94));
        assert_eq!(gainers[0].volume, Some(1200000.0));
    }

    #[tokio::test]
    async fn test_fetch_top_gainers_http_error_is_fatal() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/query")
            .match_query(mockito::Matcher::Any)
            .with_status(503)
            .create_async()
            .await;

        let client = GainersClient::with_base_url("test-key", server.url());
        let result = client.fetch_top_gainers().await;
        assert!(matches!(result, Err(DataError::Fetch(_))));
    }
}
