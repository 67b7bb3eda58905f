//! ETF KPI 수집 모듈.
//!
//! 상장 종목 조회 → ETF/거래소/상장일 필터 → 표본 추출 → 종목별 시세
//! 조회 → left join → 타입 캐스팅 순서의 파이프라인입니다.
//!
//! 상장 종목 조회 실패는 실행 전체를 중단시키고, 종목별 시세 조회는
//! 복구 가능한 실패(404/408)에 한해 null 레코드로 대체한 뒤 계속합니다.

use crate::{CollectionStats, CollectorConfig, Result};
use kpis_data::{
    build_kpi_frame, cast_kpi_frame, filter_etfs, sample_listings, EtfQuote, ListingClient,
    QuoteClient,
};
use polars::prelude::DataFrame;
use std::collections::HashMap;
use std::time::Instant;

/// ETF KPI 데이터셋 수집
pub async fn collect_etf_kpis(
    config: &CollectorConfig,
    listing_client: &ListingClient,
    quote_client: &QuoteClient,
) -> Result<(DataFrame, CollectionStats)> {
    let start = Instant::now();
    let mut stats = CollectionStats::new();

    tracing::info!("ETF KPI 수집 시작");

    // 1. 활성 상장 종목 전체 조회 (실패 시 실행 중단)
    let rows = listing_client.fetch_active().await?;

    // 2. ETF / NASDAQ·NYSE / 상장일 필터
    let etfs = filter_etfs(rows, config.ipo_cutoff);
    tracing::info!(
        count = etfs.len(),
        cutoff = %config.ipo_cutoff,
        "필터 통과 ETF 수"
    );

    // 3. 최대 개수 초과 시 시드 기반 표본 추출
    let etfs = sample_listings(etfs, config.max_etfs, config.sample_seed);
    tracing::info!(count = etfs.len(), max = config.max_etfs, "조회 대상 확정");

    // 4. 종목별 시세 조회
    let mut quotes: HashMap<String, EtfQuote> = HashMap::with_capacity(etfs.len());
    for (idx, listing) in etfs.iter().enumerate() {
        stats.total += 1;

        tracing::debug!(
            symbol = %listing.symbol,
            progress = format!("{}/{}", idx + 1, etfs.len()),
            "시세 조회"
        );

        match quote_client.fetch_quote(&listing.symbol).await {
            Ok(Some(quote)) => {
                stats.success += 1;
                quotes.insert(listing.symbol.clone(), quote);
            }
            Ok(None) => {
                // 복구 가능한 실패는 null 레코드로 대체하고 계속
                stats.not_found += 1;
                quotes.insert(listing.symbol.clone(), EtfQuote::empty(&listing.symbol));
            }
            Err(e) => {
                stats.errors += 1;
                tracing::error!(symbol = %listing.symbol, error = %e, "시세 조회 실패 (중단)");
                return Err(e.into());
            }
        }

        // Rate limiting
        tokio::time::sleep(config.quote_delay()).await;
    }

    // 5. left join 후 선언된 스키마로 캐스팅
    let df = cast_kpi_frame(build_kpi_frame(&etfs, &quotes)?)?;

    stats.elapsed = start.elapsed();
    Ok((df, stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn test_config() -> CollectorConfig {
        CollectorConfig {
            env: "dev".to_string(),
            max_etfs: 20,
            fetch_timeout_secs: 60,
            ipo_cutoff: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            s3_bucket: "test-bucket".to_string(),
            api_key: "test-key".to_string(),
            parquet: true,
            sample_seed: 42,
            quote_delay_ms: 0,
        }
    }

    fn quote_body(close: f64) -> String {
        format!(
            r#"{{"quoteSummary":{{"result":[{{"summaryDetail":{{"previousClose":{{"raw":{},"fmt":"{}"}}}}}}],"error":null}}}}"#,
            close, close
        )
    }

    #[tokio::test]
    async fn test_collect_etf_kpis_pipeline() {
        let mut server = mockito::Server::new_async().await;

        // 거래소 탈락 1건, 상장일 탈락 1건, 통과 2건 (그중 1건은 시세 404)
        let listing_body = "symbol,name,exchange,assetType,ipoDate,delistingDate,status\n\
            XXX,X Fund,BATS,ETF,2021-05-01,null,Active\n\
            YYY,Y Fund,NASDAQ,ETF,2019-06-01,null,Active\n\
            ZZZ,Z Fund,NYSE,ETF,2021-05-01,null,Active\n\
            WWW,W Fund,NASDAQ,ETF,2021-06-01,null,Active\n";
        server
            .mock("GET", "/query")
            .match_query(mockito::Matcher::UrlEncoded(
                "function".into(),
                "LISTING_STATUS".into(),
            ))
            .with_status(200)
            .with_body(listing_body)
            .create_async()
            .await;
        server
            .mock("GET", "/v10/finance/quoteSummary/ZZZ")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(quote_body(12.5))
            .create_async()
            .await;
        server
            .mock("GET", "/v10/finance/quoteSummary/WWW")
            .match_query(mockito::Matcher::Any)
            .with_status(404)
            .create_async()
            .await;

        let config = test_config();
        let listing_client = ListingClient::with_base_url("test-key", server.url());
        let quote_client = QuoteClient::with_base_url(server.url());

        let (df, stats) = collect_etf_kpis(&config, &listing_client, &quote_client)
            .await
            .unwrap();

        // 필터 통과 2건, 시세 없는 종목의 행도 유지
        assert_eq!(df.height(), 2);
        assert_eq!(stats.total, 2);
        assert_eq!(stats.success, 1);
        assert_eq!(stats.not_found, 1);
        assert_eq!(df.column("previous_close").unwrap().null_count(), 1);
    }

    #[tokio::test]
    async fn test_collect_etf_kpis_quote_server_error_aborts() {
        let mut server = mockito::Server::new_async().await;

        let listing_body = "symbol,name,exchange,assetType,ipoDate,delistingDate,status\n\
            ZZZ,Z Fund,NYSE,ETF,2021-05-01,null,Active\n";
        server
            .mock("GET", "/query")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(listing_body)
            .create_async()
            .await;
        server
            .mock("GET", "/v10/finance/quoteSummary/ZZZ")
            .match_query(mockito::Matcher::Any)
            .with_status(500)
            .create_async()
            .await;

        let config = test_config();
        let listing_client = ListingClient::with_base_url("test-key", server.url());
        let quote_client = QuoteClient::with_base_url(server.url());

        let result = collect_etf_kpis(&config, &listing_client, &quote_client).await;
        assert!(result.is_err());
    }
}
