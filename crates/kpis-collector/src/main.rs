//! ETF KPIs 수집 작업 CLI.

use chrono::Utc;
use clap::{Parser, Subcommand};
use kpis_collector::{modules, CollectorConfig, CollectorError, Result};
use kpis_data::{is_all_null, DatasetWriter, GainersClient, ListingClient, QuoteClient, S3Writer};
use polars::prelude::DataFrame;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "kpis-collector")]
#[command(about = "Daily ETF KPIs Collector", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// ETF KPI 수집 (상장 종목 + 시세 → S3)
    CollectEtfs,

    /// 상승률 상위 종목 수집
    CollectGainers,

    /// 전체 워크플로우 실행 (ETF → 상승률 상위)
    RunAll,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // 로깅 초기화
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("kpis_collector={}", cli.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 오류 경계: 잡히지 않은 오류는 전부 여기서 로그 후 종료 코드 1로 변환
    if let Err(e) = run(cli.command).await {
        tracing::error!(error = %e, "[ERROR] 수집 작업 실패");
        std::process::exit(1);
    }
}

async fn run(command: Commands) -> Result<()> {
    // 설정 로드 (필수 값 누락 시 외부 호출 전에 실패)
    let config = CollectorConfig::from_env()?;
    tracing::info!(env = %config.env, max_etfs = config.max_etfs, "수집 작업 시작");

    let listing_client = ListingClient::new(&config.api_key);
    let gainers_client = GainersClient::new(&config.api_key);
    let quote_client = QuoteClient::new();
    let writer = S3Writer::from_default_config(&config.s3_bucket).await;

    match command {
        Commands::CollectEtfs => {
            run_etf_job(&config, &listing_client, &quote_client, &writer).await?;
        }
        Commands::CollectGainers => {
            run_gainers_job(&config, &gainers_client, &quote_client, &writer).await?;
        }
        Commands::RunAll => {
            tracing::info!("=== 전체 워크플로우 시작 ===");

            tracing::info!("Step 1/2: ETF KPI 수집");
            run_etf_job(&config, &listing_client, &quote_client, &writer).await?;

            tracing::info!("Step 2/2: 상승률 상위 수집");
            run_gainers_job(&config, &gainers_client, &quote_client, &writer).await?;

            tracing::info!("=== 전체 워크플로우 완료 ===");
        }
    }

    tracing::info!("[SUCCESS] 수집 작업 완료");
    Ok(())
}

/// ETF KPI 작업: 제한 시간 내 조회 → 전체 null 검증 → S3 기록.
async fn run_etf_job(
    config: &CollectorConfig,
    listing_client: &ListingClient,
    quote_client: &QuoteClient,
    writer: &dyn DatasetWriter,
) -> Result<()> {
    let fetch = modules::collect_etf_kpis(config, listing_client, quote_client);
    let (df, stats) = match tokio::time::timeout(config.fetch_timeout(), fetch).await {
        Ok(result) => result?,
        Err(_) => {
            tracing::error!(
                timeout_secs = config.fetch_timeout_secs,
                "[ERROR] ETF 조회가 제한 시간을 초과했습니다"
            );
            return Err(CollectorError::Timeout(config.fetch_timeout_secs));
        }
    };
    stats.log_summary("ETF KPI 수집");

    let key_prefix = format!("daily-kpis/etf_kpis_{}", Utc::now().format("%Y_%m_%d"));
    write_dataset(config, writer, df, &key_prefix).await
}

/// 상승률 상위 작업: 조회 → 전체 null 검증 → S3 기록.
async fn run_gainers_job(
    config: &CollectorConfig,
    gainers_client: &GainersClient,
    quote_client: &QuoteClient,
    writer: &dyn DatasetWriter,
) -> Result<()> {
    let fetch = modules::collect_top_gainers(config, gainers_client, quote_client);
    let (df, stats) = match tokio::time::timeout(config.fetch_timeout(), fetch).await {
        Ok(result) => result?,
        Err(_) => {
            tracing::error!(
                timeout_secs = config.fetch_timeout_secs,
                "[ERROR] 상승률 상위 조회가 제한 시간을 초과했습니다"
            );
            return Err(CollectorError::Timeout(config.fetch_timeout_secs));
        }
    };
    stats.log_summary("상승률 상위 수집");

    let key_prefix = format!("daily-kpis/top_gainers_{}", Utc::now().format("%Y_%m_%d"));
    write_dataset(config, writer, df, &key_prefix).await
}

/// 전체 null 데이터셋을 거부한 뒤 S3에 기록.
async fn write_dataset(
    config: &CollectorConfig,
    writer: &dyn DatasetWriter,
    mut df: DataFrame,
    key_prefix: &str,
) -> Result<()> {
    if is_all_null(&df) {
        tracing::error!("[ERROR] 수집 결과가 전부 null입니다. 저장하지 않음");
        return Err(CollectorError::EmptyDataset);
    }

    let path = writer
        .write_frame(&mut df, key_prefix, config.output_format())
        .await?;
    tracing::info!(path = %path, rows = df.height(), "저장 완료");
    Ok(())
}
