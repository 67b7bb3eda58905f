//! ECS 운영 도구 라이브러리.
//!
//! 수집 파이프라인의 ECS 작업을 수동으로 실행하는 트리거와, 경보 규칙
//! 검증용 실패 주입 테스트를 제공합니다.

pub mod ecs;
pub mod error;
pub mod failtest;
pub mod trigger;

pub use ecs::{AwsEcs, EcsApi};
pub use error::{OpsError, Result};
pub use failtest::{run_harness, HarnessConfig, Verdict};
pub use trigger::{trigger_task, TriggerConfig};
