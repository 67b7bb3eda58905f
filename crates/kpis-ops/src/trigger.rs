//! ECS Fargate 수집 작업 트리거.
//!
//! 스케줄러(EventBridge)가 호출하는 진입점입니다. 환경변수에서 클러스터
//! 설정을 읽고, task definition의 최신 revision을 해석한 뒤, 단일
//! FARGATE 작업을 시작합니다. 작업 완료는 기다리지 않습니다.

use crate::ecs::{EcsApi, TaskLaunch};
use crate::error::{OpsError, Result};

/// 트리거 환경 설정.
#[derive(Debug, Clone)]
pub struct TriggerConfig {
    /// 대상 ECS 클러스터
    pub cluster_name: String,
    /// task definition family
    pub task_definition: String,
    /// 환경변수 오버라이드를 받을 컨테이너 이름
    pub container_name: String,
    pub subnet_1: String,
    pub subnet_2: String,
    pub security_group: String,
    pub assign_public_ip: bool,
    /// 기본 실행 환경 (호출 시 오버라이드 가능)
    pub env: String,
}

impl TriggerConfig {
    /// 환경변수에서 설정 로드.
    ///
    /// 필수 값이 하나라도 비어 있으면 누락 목록을 담은 설정 에러로
    /// 실패합니다 (외부 호출 전에 중단).
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            cluster_name: env_or_blank("ECS_CLUSTER_NAME"),
            task_definition: env_or_blank("ECS_TASK_DEFINITION"),
            container_name: env_or_blank("ECS_CONTAINER_NAME"),
            subnet_1: env_or_blank("SUBNET_1"),
            subnet_2: env_or_blank("SUBNET_2"),
            security_group: env_or_blank("SECURITY_GROUP"),
            assign_public_ip: parse_assign_public_ip(&std::env::var("ASSIGN_PUBLIC_IP").ok())?,
            env: std::env::var("ENV").unwrap_or_else(|_| "prod".to_string()),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let required = [
            ("ECS_CLUSTER_NAME", &self.cluster_name),
            ("ECS_TASK_DEFINITION", &self.task_definition),
            ("ECS_CONTAINER_NAME", &self.container_name),
            ("SUBNET_1", &self.subnet_1),
            ("SUBNET_2", &self.subnet_2),
            ("SECURITY_GROUP", &self.security_group),
        ];
        let missing: Vec<&str> = required
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| *name)
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(OpsError::Config(format!(
                "필수 환경변수 누락: {}",
                missing.join(", ")
            )))
        }
    }
}

fn env_or_blank(key: &str) -> String {
    std::env::var(key).unwrap_or_default()
}

fn parse_assign_public_ip(value: &Option<String>) -> Result<bool> {
    match value.as_deref() {
        None | Some("DISABLED") => Ok(false),
        Some("ENABLED") => Ok(true),
        Some(other) => Err(OpsError::Config(format!(
            "ASSIGN_PUBLIC_IP는 ENABLED 또는 DISABLED여야 합니다: {}",
            other
        ))),
    }
}

/// 최신 revision의 수집 작업 1개 시작.
///
/// `env_override`가 있으면 컨테이너의 `ENV` 환경변수를 그 값으로
/// 오버라이드합니다. 스케줄링 호출 오류는 로그 후 그대로 전파됩니다.
///
/// # Returns
/// 시작된 작업의 ARN.
pub async fn trigger_task(
    ecs: &dyn EcsApi,
    config: &TriggerConfig,
    env_override: Option<String>,
) -> Result<String> {
    let env = env_override.unwrap_or_else(|| config.env.clone());

    // 숫자상 최신 revision 해석
    let revision = ecs.latest_revision(&config.task_definition).await?;
    tracing::info!(
        family = %config.task_definition,
        revision,
        env = %env,
        "최신 revision 해석 완료"
    );

    let launch = TaskLaunch {
        cluster: config.cluster_name.clone(),
        task_definition: format!("{}:{}", config.task_definition, revision),
        subnets: vec![config.subnet_1.clone(), config.subnet_2.clone()],
        security_groups: vec![config.security_group.clone()],
        assign_public_ip: config.assign_public_ip,
        container_env: Some((
            config.container_name.clone(),
            "ENV".to_string(),
            env.clone(),
        )),
    };

    let outcome = match ecs.run_task(&launch).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!(error = %e, "작업 시작 호출 실패");
            return Err(e);
        }
    };

    match outcome.task_arn {
        Some(task_arn) => {
            tracing::info!(task_arn = %task_arn, "작업 시작됨");
            Ok(task_arn)
        }
        None => {
            let reason = outcome.failures.join("; ");
            tracing::error!(failures = %reason, "작업이 시작되지 않았습니다");
            Err(OpsError::TaskLaunch(reason))
        }
    }
}
