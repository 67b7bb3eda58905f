//! 환경변수 기반 설정 모듈.

use crate::error::CollectorError;
use crate::Result;
use chrono::{NaiveDate, Utc};
use kpis_data::OutputFormat;
use std::time::Duration;

/// Collector 전체 설정
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// 실행 환경 (dev / prod)
    pub env: String,
    /// 시세를 조회할 최대 ETF 수
    pub max_etfs: usize,
    /// 조회 단계 전체 제한 시간 (초)
    pub fetch_timeout_secs: u64,
    /// 이 날짜 이후에 상장된 ETF만 유지
    pub ipo_cutoff: NaiveDate,
    /// 결과를 업로드할 S3 버킷
    pub s3_bucket: String,
    /// Alpha Vantage API 키
    pub api_key: String,
    /// Parquet 출력 여부 (false면 CSV)
    pub parquet: bool,
    /// 표본 추출 시드 (재현 가능한 샘플링)
    pub sample_seed: u64,
    /// 시세 요청 간 딜레이 (밀리초)
    pub quote_delay_ms: u64,
}

impl CollectorConfig {
    /// 환경변수에서 설정 로드.
    ///
    /// dev 환경은 작은 조회 수와 짧은 제한 시간을 사용하고,
    /// 그 외 환경은 prod 프로파일을 따릅니다. 필수 값이 비어 있으면
    /// 외부 호출 전에 실패합니다.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let env = std::env::var("ENV").unwrap_or_else(|_| "dev".to_string());

        let (max_etfs, fetch_timeout_secs) = if env == "dev" {
            (20, 60 * 5)
        } else {
            (env_var_parse("MAX_ETFS", 1), 60 * 45)
        };

        let ipo_cutoff = match std::env::var("IPO_DATE") {
            Ok(value) => NaiveDate::parse_from_str(&value, "%Y-%m-%d").map_err(|e| {
                CollectorError::Config(format!("IPO_DATE 파싱 실패 ({}): {}", value, e))
            })?,
            Err(_) => Utc::now().date_naive(),
        };

        let s3_bucket = require_env("S3_BUCKET")?;
        let api_key = require_env("API_KEY")?;

        Ok(Self {
            env,
            max_etfs,
            fetch_timeout_secs,
            ipo_cutoff,
            s3_bucket,
            api_key,
            parquet: env_var_bool("PARQUET", false),
            sample_seed: env_var_parse("SAMPLE_SEED", 42),
            quote_delay_ms: env_var_parse("QUOTE_REQUEST_DELAY_MS", 1000),
        })
    }

    /// 조회 단계 제한 시간을 Duration으로 반환
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// 시세 요청 간 딜레이를 Duration으로 반환
    pub fn quote_delay(&self) -> Duration {
        Duration::from_millis(self.quote_delay_ms)
    }

    /// 출력 형식 (PARQUET 플래그 기반)
    pub fn output_format(&self) -> OutputFormat {
        OutputFormat::from_parquet_flag(self.parquet)
    }
}

/// 필수 환경변수 로드 (비어 있으면 설정 에러)
fn require_env(key: &str) -> Result<String> {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(CollectorError::Config(format!(
            "{} 환경변수가 설정되지 않았습니다",
            key
        ))),
    }
}

/// 환경변수에서 값을 파싱 (실패 시 기본값 사용)
fn env_var_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// 환경변수에서 bool 값 파싱
fn env_var_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| v == "True" || v == "true" || v == "1")
        .unwrap_or(default)
}
