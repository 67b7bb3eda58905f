//! ETF KPIs 수집 작업.
//!
//! 이 crate는 스케줄러(ECS Fargate)에서 주기적으로 실행되는 수집
//! 바이너리를 제공합니다:
//! - ETF KPI 수집 (상장 종목 + 종목별 시세 → S3)
//! - 상승률 상위 종목 수집

pub mod config;
pub mod error;
pub mod modules;
pub mod stats;

pub use config::CollectorConfig;
pub use error::{CollectorError, Result};
pub use stats::CollectionStats;
