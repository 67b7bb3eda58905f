//! ETF KPIs 파이프라인의 데이터 계층.
//!
//! 이 crate는 다음을 제공합니다:
//! - 상장 종목 / 시세 / 상승률 상위 Provider (Alpha Vantage, Yahoo Finance)
//! - 종목 + 시세 left join 데이터셋 조립 (polars)
//! - S3 저장소 writer (Parquet / CSV)

pub mod dataset;
pub mod error;
pub mod provider;
pub mod storage;

pub use error::{DataError, Result};

// Provider 재내보내기
pub use provider::{
    filter_etfs, sample_listings, EtfListing, EtfQuote, GainerRow, GainersClient, ListingClient,
    ListingRow, QuoteClient,
};

// 데이터셋 유틸리티 재내보내기
pub use dataset::{
    build_gainers_frame, build_kpi_frame, cast_gainers_frame, cast_kpi_frame, is_all_null,
};

// 저장소 재내보내기
pub use storage::{serialize_frame, DatasetWriter, OutputFormat, S3Writer};
