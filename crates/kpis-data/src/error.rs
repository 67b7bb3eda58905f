//! 데이터 모듈 오류 타입.

use thiserror::Error;

/// 데이터 관련 오류.
#[derive(Debug, Error)]
pub enum DataError {
    /// 외부 소스 조회 오류 (Alpha Vantage, Yahoo Finance)
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// 응답 파싱 오류
    #[error("Parse error: {0}")]
    Parse(String),

    /// 데이터프레임 구성/변환 오류
    #[error("Frame error: {0}")]
    Frame(String),

    /// 저장소 오류 (S3)
    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<reqwest::Error> for DataError {
    fn from(err: reqwest::Error) -> Self {
        DataError::Fetch(err.to_string())
    }
}

impl From<csv::Error> for DataError {
    fn from(err: csv::Error) -> Self {
        DataError::Parse(err.to_string())
    }
}

impl From<polars::error::PolarsError> for DataError {
    fn from(err: polars::error::PolarsError) -> Self {
        DataError::Frame(err.to_string())
    }
}

impl From<serde_json::Error> for DataError {
    fn from(err: serde_json::Error) -> Self {
        DataError::Parse(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DataError>;
