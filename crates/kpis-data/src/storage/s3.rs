//! S3 데이터셋 기록.
//!
//! DataFrame을 Parquet 또는 CSV로 직렬화하여
//! `s3://<bucket>/<prefix>.<ext>` 경로에 업로드합니다.
//! 재시도는 없으며 실패는 상위 경계에서 치명적 오류로 처리됩니다.

use crate::error::{DataError, Result};
use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use polars::prelude::*;
use std::io::Cursor;

/// 출력 파일 형식.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Parquet,
    Csv,
}

impl OutputFormat {
    /// 파일 확장자.
    pub fn ext(&self) -> &'static str {
        match self {
            OutputFormat::Parquet => "parquet",
            OutputFormat::Csv => "csv",
        }
    }

    /// PARQUET 플래그 값으로부터 형식 결정.
    pub fn from_parquet_flag(parquet: bool) -> Self {
        if parquet {
            OutputFormat::Parquet
        } else {
            OutputFormat::Csv
        }
    }
}

/// DataFrame을 메모리 버퍼로 직렬화.
pub fn serialize_frame(df: &mut DataFrame, format: OutputFormat) -> Result<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());
    match format {
        OutputFormat::Parquet => {
            ParquetWriter::new(&mut buffer).finish(df)?;
        }
        OutputFormat::Csv => {
            CsvWriter::new(&mut buffer).include_header(true).finish(df)?;
        }
    }
    Ok(buffer.into_inner())
}

/// 데이터셋 writer 추상화.
///
/// 저장 전 검증(전체 null 거부 등)을 실제 업로드 없이 테스트할 수
/// 있도록 저장 호출을 trait으로 분리합니다. 전역 싱글턴 클라이언트
/// 대신 명시적으로 전달되는 의존성입니다.
#[async_trait]
pub trait DatasetWriter: Send + Sync {
    /// 프레임을 직렬화하여 `<key_prefix>.<ext>` 위치에 저장.
    ///
    /// # Returns
    /// 저장된 전체 경로.
    async fn write_frame(
        &self,
        df: &mut DataFrame,
        key_prefix: &str,
        format: OutputFormat,
    ) -> Result<String>;
}

/// S3 데이터셋 writer.
#[derive(Clone)]
pub struct S3Writer {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3Writer {
    /// 새로운 writer 생성.
    pub fn new(client: aws_sdk_s3::Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    /// 기본 AWS 설정으로 writer 생성.
    pub async fn from_default_config(bucket: impl Into<String>) -> Self {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self::new(aws_sdk_s3::Client::new(&config), bucket)
    }
}

#[async_trait]
impl DatasetWriter for S3Writer {
    /// 프레임을 직렬화하여 `s3://<bucket>/<key_prefix>.<ext>`에 업로드.
    async fn write_frame(
        &self,
        df: &mut DataFrame,
        key_prefix: &str,
        format: OutputFormat,
    ) -> Result<String> {
        let bytes = serialize_frame(df, format)?;
        let key = format!("{}.{}", key_prefix, format.ext());

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            size_bytes = bytes.len(),
            "S3 업로드 시작"
        );

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| DataError::Storage(format!("S3 업로드 실패 [{}]: {}", key, e)))?;

        let path = format!("s3://{}/{}", self.bucket, key);
        tracing::info!(path = %path, "S3 업로드 완료");
        Ok(path)
    }
}
