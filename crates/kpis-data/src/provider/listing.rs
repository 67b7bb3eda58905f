//! Alpha Vantage 상장 종목 클라이언트.
//!
//! `LISTING_STATUS` 엔드포인트에서 활성 상장 종목 전체를 CSV로 받아
//! ETF / 거래소 / 상장일 조건으로 필터링합니다.
//!
//! # 사용 예제
//!
//! ```rust,ignore
//! use kpis_data::provider::listing::ListingClient;
//!
//! let client = ListingClient::new(api_key);
//! let rows = client.fetch_active().await?;
//! let etfs = filter_etfs(rows, cutoff);
//! ```

use crate::error::{DataError, Result};
use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Deserialize;

/// Alpha Vantage 상장 종목 클라이언트.
#[derive(Clone)]
pub struct ListingClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

/// LISTING_STATUS CSV 원본 행.
#[derive(Debug, Clone, Deserialize)]
pub struct ListingRow {
    pub symbol: String,
    pub name: String,
    pub exchange: String,
    #[serde(rename = "assetType")]
    pub asset_type: String,
    #[serde(rename = "ipoDate")]
    pub ipo_date: String,
    #[serde(rename = "delistingDate", default)]
    pub delisting_date: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// 필터를 통과한 ETF 종목.
#[derive(Debug, Clone, PartialEq)]
pub struct EtfListing {
    /// 티커 (실행 단위 내에서 고유)
    pub symbol: String,
    /// 종목명
    pub name: String,
    /// 상장일
    pub ipo_date: NaiveDate,
    /// 거래소 (NASDAQ, NYSE 계열)
    pub exchange: String,
}

impl ListingClient {
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

    /// 활성 상장 종목 전체 조회.
    ///
    /// 실패는 실행 전체를 중단시키는 치명적 오류입니다 (종목 단위 격리 없음).
    pub async fn fetch_active(&self) -> Result<Vec<ListingRow>> {
        let url = format!(
            "{}/query?function=LISTING_STATUS&state=active&apikey={}",
            self.base_url, self.api_key
        );

        tracing::debug!(url = %self.base_url, "LISTING_STATUS 요청");

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DataError::Fetch(format!(
                "LISTING_STATUS 오류 [{}]: {}",
                status, body
            )));
        }

        let body = response.text().await?;
        let mut reader = csv::Reader::from_reader(body.as_bytes());
        let mut rows = Vec::new();
        for record in reader.deserialize::<ListingRow>() {
            rows.push(record?);
        }

        tracing::info!(count = rows.len(), "활성 상장 종목 조회 완료");
        Ok(rows)
    }
}

/// ETF / 거래소 / 상장일 필터.
///
/// 유지 조건:
/// - `asset_type == "ETF"`
/// - 거래소가 NASDAQ 이거나 이름에 NYSE 포함
/// - 상장일이 `cutoff` 이후 (엄격 비교)
///
/// 상장일을 파싱할 수 없는 행은 제외됩니다.
pub fn filter_etfs(rows: Vec<ListingRow>, cutoff: NaiveDate) -> Vec<EtfListing> {
    rows.into_iter()
        .filter(|r| r.asset_type == "ETF")
        .filter(|r| r.exchange == "NASDAQ" || r.exchange.contains("NYSE"))
        .filter_map(|r| {
            let ipo_date = NaiveDate::parse_from_str(&r.ipo_date, "%Y-%m-%d").ok()?;
            Some(EtfListing {
                symbol: r.symbol,
                name: r.name,
                ipo_date,
                exchange: r.exchange,
            })
        })
        .filter(|e| e.ipo_date > cutoff)
        .collect()
}

/// 최대 개수를 넘는 경우 균등 무작위 표본 추출.
///
/// 시드가 같으면 같은 입력에 대해 항상 같은 표본을 반환합니다.
/// 입력 순서는 유지됩니다.
pub fn sample_listings(listings: Vec<EtfListing>, max_count: usize, seed: u64) -> Vec<EtfListing> {
    if listings.len() <= max_count {
        return listings;
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut keep = rand::seq::index::sample(&mut rng, listings.len(), max_count).into_vec();
    keep.sort_unstable();

    keep.into_iter().map(|i| listings[i].clone()).collect()
}
