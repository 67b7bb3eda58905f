//! 상승률 상위 종목 수집 모듈.
//!
//! ETF KPI 파이프라인과 같은 구조를 따르되, 상승률 상위 페이로드에는
//! 상장일이 없으므로 날짜 필터와 표본 추출이 없습니다
//! (엔드포인트 자체가 상위 20개로 제한됨).

use crate::{CollectionStats, CollectorConfig, Result};
use kpis_data::{build_gainers_frame, cast_gainers_frame, EtfQuote, GainersClient, QuoteClient};
use polars::prelude::DataFrame;
use std::collections::HashMap;
use std::time::Instant;

/// 상승률 상위 종목 데이터셋 수집
pub async fn collect_top_gainers(
    config: &CollectorConfig,
    gainers_client: &GainersClient,
    quote_client: &QuoteClient,
) -> Result<(DataFrame, CollectionStats)> {
    let start = Instant::now();
    let mut stats = CollectionStats::new();

    tracing::info!("상승률 상위 종목 수집 시작");

    // 1. 상승률 상위 종목 조회 (실패 시 실행 중단)
    let gainers = gainers_client.fetch_top_gainers().await?;

    // 2. 종목별 시세 조회
    let mut quotes: HashMap<String, EtfQuote> = HashMap::with_capacity(gainers.len());
    for (idx, gainer) in gainers.iter().enumerate() {
        stats.total += 1;

        tracing::debug!(
            symbol = %gainer.ticker,
            progress = format!("{}/{}", idx + 1, gainers.len()),
            "시세 조회"
        );

        match quote_client.fetch_quote(&gainer.ticker).await {
            Ok(Some(quote)) => {
                stats.success += 1;
                quotes.insert(gainer.ticker.clone(), quote);
            }
            Ok(None) => {
                stats.not_found += 1;
                quotes.insert(gainer.ticker.clone(), EtfQuote::empty(&gainer.ticker));
            }
            Err(e) => {
                stats.errors += 1;
                tracing::error!(symbol = %gainer.ticker, error = %e, "시세 조회 실패 (중단)");
                return Err(e.into());
            }
        }

        // Rate limiting
        tokio::time::sleep(config.quote_delay()).await;
    }

    // 3. left join 후 캐스팅
    let df = cast_gainers_frame(build_gainers_frame(&gainers, &quotes)?)?;

    stats.elapsed = start.elapsed();
    Ok((df, stats))
}
