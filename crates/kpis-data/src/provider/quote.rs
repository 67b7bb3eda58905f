//! Yahoo Finance quoteSummary 클라이언트.
//!
//! 종목별 시세/펀더멘털 지표를 조회합니다. 응답의 숫자 필드는
//! `{ "raw": 1.23, "fmt": "1.23" }` 형태로 내려오므로 내부 정규화
//! 레이어에서 `raw` 값만 평탄화합니다. 필드 부재는 오류가 아니라
//! null로 매핑됩니다.
//!
//! 404 / 408 응답은 복구 가능한 조회 실패로 간주하여 `Ok(None)`을
//! 반환하고, 그 외의 HTTP 오류는 실행 전체를 중단시킵니다.

use crate::error::{DataError, Result};
use reqwest::StatusCode;
use serde::Deserialize;

const QUOTE_MODULES: &str =
    "price,summaryDetail,defaultKeyStatistics,fundProfile,fundPerformance,assetProfile";

/// Yahoo Finance quoteSummary 클라이언트.
#[derive(Clone)]
pub struct QuoteClient {
    client: reqwest::Client,
    base_url: String,
}

/// 종목별 시세/펀더멘털 레코드.
///
/// 시세 필드는 전부 nullable입니다. 조회 실패(복구 가능) 또는 필드 부재 시
/// null로 유지되어 조인 후에도 행이 유실되지 않습니다.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EtfQuote {
    pub symbol: String,
    pub previous_close: Option<f64>,
    pub nav_price: Option<f64>,
    pub trailing_pe: Option<f64>,
    pub volume: Option<f64>,
    pub average_volume: Option<f64>,
    pub bid: Option<f64>,
    pub bid_size: Option<f64>,
    pub ask: Option<f64>,
    pub ask_size: Option<f64>,
    pub beta_three_year: Option<f64>,
    pub ytd_return: Option<f64>,
    pub three_year_avg_return: Option<f64>,
    pub five_year_avg_return: Option<f64>,
    pub category: Option<String>,
    pub business_summary: Option<String>,
}

impl EtfQuote {
    /// 모든 지표가 null인 빈 레코드.
    pub fn empty(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            ..Default::default()
        }
    }

    /// 모든 지표 필드가 null인지 여부.
    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.previous_close.is_none()
            && self.nav_price.is_none()
            && self.trailing_pe.is_none()
            && self.volume.is_none()
            && self.average_volume.is_none()
            && self.bid.is_none()
            && self.bid_size.is_none()
            && self.ask.is_none()
            && self.ask_size.is_none()
            && self.beta_three_year.is_none()
            && self.ytd_return.is_none()
            && self.three_year_avg_return.is_none()
            && self.five_year_avg_return.is_none()
            && self.category.is_none()
            && self.business_summary.is_none()
    }
}

// ==================== 응답 정규화 레이어 ====================

/// `{ "raw": f64, "fmt": "..." }` 래퍼.
#[derive(Debug, Default, Deserialize)]
struct RawNum {
    #[serde(default)]
    raw: Option<f64>,
}

impl RawNum {
    fn value(opt: Option<RawNum>) -> Option<f64> {
        opt.and_then(|n| n.raw)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryDetail {
    #[serde(default)]
    previous_close: Option<RawNum>,
    #[serde(default)]
    nav_price: Option<RawNum>,
    #[serde(default, rename = "trailingPE")]
    trailing_pe: Option<RawNum>,
    #[serde(default)]
    volume: Option<RawNum>,
    #[serde(default)]
    average_volume: Option<RawNum>,
    #[serde(default)]
    bid: Option<RawNum>,
    #[serde(default)]
    bid_size: Option<RawNum>,
    #[serde(default)]
    ask: Option<RawNum>,
    #[serde(default)]
    ask_size: Option<RawNum>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeyStatistics {
    #[serde(default, rename = "beta3Year")]
    beta_three_year: Option<RawNum>,
    #[serde(default)]
    ytd_return: Option<RawNum>,
    #[serde(default)]
    three_year_average_return: Option<RawNum>,
    #[serde(default)]
    five_year_average_return: Option<RawNum>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FundProfile {
    #[serde(default)]
    category_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssetProfile {
    #[serde(default)]
    long_business_summary: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteModules {
    #[serde(default)]
    summary_detail: Option<SummaryDetail>,
    #[serde(default)]
    default_key_statistics: Option<KeyStatistics>,
    #[serde(default)]
    fund_profile: Option<FundProfile>,
    #[serde(default)]
    asset_profile: Option<AssetProfile>,
}

#[derive(Debug, Deserialize)]
struct QuoteSummary {
    #[serde(default)]
    result: Option<Vec<QuoteModules>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteResponse {
    quote_summary: QuoteSummary,
}

/// 모듈별 응답을 평탄한 레코드로 정규화.
fn normalize_quote(symbol: &str, modules: QuoteModules) -> EtfQuote {
    let detail = modules.summary_detail.unwrap_or_default();
    let stats = modules.default_key_statistics.unwrap_or_default();
    let fund = modules.fund_profile.unwrap_or_default();
    let profile = modules.asset_profile.unwrap_or_default();

    EtfQuote {
        symbol: symbol.to_string(),
        previous_close: RawNum::value(detail.previous_close),
        nav_price: RawNum::value(detail.nav_price),
        trailing_pe: RawNum::value(detail.trailing_pe),
        volume: RawNum::value(detail.volume),
        average_volume: RawNum::value(detail.average_volume),
        bid: RawNum::value(detail.bid),
        bid_size: RawNum::value(detail.bid_size),
        ask: RawNum::value(detail.ask),
        ask_size: RawNum::value(detail.ask_size),
        beta_three_year: RawNum::value(stats.beta_three_year),
        ytd_return: RawNum::value(stats.ytd_return),
        three_year_avg_return: RawNum::value(stats.three_year_average_return),
        five_year_avg_return: RawNum::value(stats.five_year_average_return),
        category: fund.category_name,
        business_summary: profile.long_business_summary,
    }
}

impl QuoteClient {
    /// 새로운 클라이언트 생성.
    pub fn new() -> Self {
        Self::with_base_url("https://query1.finance.yahoo.com")
    }

    /// base URL 지정 생성 (테스트용).
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .user_agent("Mozilla/5.0")
                .build()
                .expect("HTTP 클라이언트 생성 실패"),
            base_url: base_url.into(),
        }
    }

    /// 종목별 시세 조회.
    ///
    /// # Returns
    /// - `Ok(Some(quote))`: 조회 성공 (부재 필드는 null)
    /// - `Ok(None)`: 복구 가능한 실패 (404 / 408)
    /// - `Err(...)`: 그 외 HTTP 오류 (실행 중단)
    pub async fn fetch_quote(&self, symbol: &str) -> Result<Option<EtfQuote>> {
        let url = format!(
            "{}/v10/finance/quoteSummary/{}?modules={}",
            self.base_url, symbol, QUOTE_MODULES
        );

        tracing::debug!(symbol = symbol, "quoteSummary 요청");

        let response = self.client.get(&url).send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND || status == StatusCode::REQUEST_TIMEOUT {
            tracing::debug!(symbol = symbol, status = %status, "시세 없음 (복구 가능)");
            return Ok(None);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DataError::Fetch(format!(
                "quoteSummary 오류 [{}] {}: {}",
                symbol, status, body
            )));
        }

        let data: QuoteResponse = response.json().await?;
        let modules = data
            .quote_summary
            .result
            .unwrap_or_default()
            .into_iter()
            .next();

        match modules {
            Some(m) => Ok(Some(normalize_quote(symbol, m))),
            // 결과 배열이 빈 경우도 시세 없음으로 처리
            None => Ok(None),
        }
    }
}

impl Default for QuoteClient {
    fn default() -> Self {
        Self::new()
    }
}
