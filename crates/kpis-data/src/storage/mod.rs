//! 결과 데이터셋 저장소.

pub mod s3;

pub use s3::{serialize_frame, DatasetWriter, OutputFormat, S3Writer};
