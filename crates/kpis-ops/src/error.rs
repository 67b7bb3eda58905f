//! 운영 도구 오류 타입.

use thiserror::Error;

/// ECS 운영 관련 오류.
#[derive(Debug, Error)]
pub enum OpsError {
    /// 설정 오류 (필수 환경변수 누락 등)
    #[error("Configuration error: {0}")]
    Config(String),

    /// ECS API 호출 오류
    #[error("ECS API error: {0}")]
    Ecs(String),

    /// 작업 시작 실패 (run_task의 failures 목록)
    #[error("Task launch failed: {0}")]
    TaskLaunch(String),

    /// 작업 설명을 더 이상 조회할 수 없음 (리소스 소실)
    #[error("Task disappeared: {0}")]
    TaskLost(String),
}

pub type Result<T> = std::result::Result<T, OpsError>;
