//! ECS API 추상화.
//!
//! 트리거와 실패 주입 테스트가 사용하는 ECS 호출만 좁은 trait으로
//! 묶어, 테스트에서 스크립트된 fake로 대체할 수 있게 합니다.
//! 전역 싱글턴 클라이언트 대신 명시적으로 전달되는 의존성입니다.

use crate::error::{OpsError, Result};
use async_trait::async_trait;
use aws_sdk_ecs::error::DisplayErrorContext;
use aws_sdk_ecs::types::{
    AssignPublicIp, AwsVpcConfiguration, Compatibility, ContainerDefinition, ContainerOverride,
    KeyValuePair, LaunchType, NetworkConfiguration, NetworkMode, TaskOverride,
};

/// 시작이 불가능하도록 구성된 task definition 스펙.
#[derive(Debug, Clone)]
pub struct FailingTaskDef {
    /// 고유 접미사가 붙은 family 이름
    pub family: String,
    pub execution_role_arn: String,
    pub cpu: String,
    pub memory: String,
    pub container_name: String,
    /// 존재하지 않는 이미지 태그. 작업이 시작될 수 없음을 보장
    pub image: String,
    pub command: Vec<String>,
}

/// 단일 작업 실행 파라미터.
#[derive(Debug, Clone)]
pub struct TaskLaunch {
    pub cluster: String,
    /// `family:revision` 또는 task definition ARN
    pub task_definition: String,
    pub subnets: Vec<String>,
    pub security_groups: Vec<String>,
    pub assign_public_ip: bool,
    /// 컨테이너 환경변수 오버라이드 (컨테이너 이름, 변수 이름, 값)
    pub container_env: Option<(String, String, String)>,
}

/// run_task 호출 결과.
#[derive(Debug, Clone, Default)]
pub struct RunOutcome {
    pub task_arn: Option<String>,
    /// 작업 단위 실패 사유 목록 (비어 있지 않으면 시작된 작업 없음)
    pub failures: Vec<String>,
}

/// describe_tasks에서 관찰한 작업 상태.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskStatus {
    pub last_status: String,
    /// STOPPED 직후에는 비어 있을 수 있음 (분류가 늦게 채워지는 백엔드 존재)
    pub stop_code: Option<String>,
    pub stopped_reason: Option<String>,
}

/// 트리거/실패 주입 테스트가 필요로 하는 ECS 호출 집합.
#[async_trait]
pub trait EcsApi: Send + Sync {
    /// family의 숫자상 최신 revision 조회.
    async fn latest_revision(&self, family: &str) -> Result<i32>;

    /// 시작 불가능한 task definition 등록. 새 revision의 ARN 반환.
    async fn register_failing_task_definition(&self, spec: &FailingTaskDef) -> Result<String>;

    /// FARGATE 작업 1개 실행.
    async fn run_task(&self, launch: &TaskLaunch) -> Result<RunOutcome>;

    /// 작업 상태 조회. 작업을 찾을 수 없으면 `None`.
    async fn describe_task(&self, cluster: &str, task_arn: &str) -> Result<Option<TaskStatus>>;

    /// task definition revision 등록 해제 (INACTIVE 전환).
    async fn deregister_task_definition(&self, arn: &str) -> Result<()>;

    /// INACTIVE revision 삭제.
    async fn delete_task_definition(&self, arn: &str) -> Result<()>;
}

/// AWS SDK 기반 구현.
#[derive(Clone)]
pub struct AwsEcs {
    client: aws_sdk_ecs::Client,
}

impl AwsEcs {
    pub fn new(client: aws_sdk_ecs::Client) -> Self {
        Self { client }
    }

    /// 기본 AWS 설정으로 클라이언트 생성.
    pub async fn from_default_config() -> Self {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self::new(aws_sdk_ecs::Client::new(&config))
    }
}

fn ecs_err<E: std::error::Error + Send + Sync + 'static>(
    err: aws_sdk_ecs::error::SdkError<E>,
) -> OpsError {
    OpsError::Ecs(format!("{}", DisplayErrorContext(err)))
}

#[async_trait]
impl EcsApi for AwsEcs {
    async fn latest_revision(&self, family: &str) -> Result<i32> {
        let output = self
            .client
            .describe_task_definition()
            .task_definition(family)
            .send()
            .await
            .map_err(ecs_err)?;

        output
            .task_definition()
            .map(|td| td.revision())
            .ok_or_else(|| OpsError::Ecs(format!("task definition 없음: {}", family)))
    }

    async fn register_failing_task_definition(&self, spec: &FailingTaskDef) -> Result<String> {
        let container = ContainerDefinition::builder()
            .name(&spec.container_name)
            .image(&spec.image)
            .essential(true)
            .set_command(Some(spec.command.clone()))
            .readonly_root_filesystem(true)
            .build();

        let output = self
            .client
            .register_task_definition()
            .family(&spec.family)
            .network_mode(NetworkMode::Awsvpc)
            .requires_compatibilities(Compatibility::Fargate)
            .cpu(&spec.cpu)
            .memory(&spec.memory)
            .execution_role_arn(&spec.execution_role_arn)
            .container_definitions(container)
            .send()
            .await
            .map_err(ecs_err)?;

        output
            .task_definition()
            .and_then(|td| td.task_definition_arn())
            .map(String::from)
            .ok_or_else(|| OpsError::Ecs("등록 응답에 task definition ARN 없음".to_string()))
    }

    async fn run_task(&self, launch: &TaskLaunch) -> Result<RunOutcome> {
        let assign_public_ip = if launch.assign_public_ip {
            AssignPublicIp::Enabled
        } else {
            AssignPublicIp::Disabled
        };

        let vpc_config = AwsVpcConfiguration::builder()
            .set_subnets(Some(launch.subnets.clone()))
            .set_security_groups(Some(launch.security_groups.clone()))
            .assign_public_ip(assign_public_ip)
            .build()
            .map_err(|e| OpsError::Ecs(format!("네트워크 설정 구성 실패: {}", e)))?;

        let mut request = self
            .client
            .run_task()
            .cluster(&launch.cluster)
            .task_definition(&launch.task_definition)
            .count(1)
            .launch_type(LaunchType::Fargate)
            .network_configuration(
                NetworkConfiguration::builder()
                    .awsvpc_configuration(vpc_config)
                    .build(),
            );

        if let Some((container, name, value)) = &launch.container_env {
            let container_override = ContainerOverride::builder()
                .name(container)
                .environment(KeyValuePair::builder().name(name).value(value).build())
                .build();
            request = request.overrides(
                TaskOverride::builder()
                    .container_overrides(container_override)
                    .build(),
            );
        }

        let output = request.send().await.map_err(ecs_err)?;

        let task_arn = output
            .tasks()
            .first()
            .and_then(|t| t.task_arn())
            .map(String::from);
        let failures = output
            .failures()
            .iter()
            .map(|f| {
                format!(
                    "arn={} reason={} detail={}",
                    f.arn().unwrap_or("<none>"),
                    f.reason().unwrap_or("<none>"),
                    f.detail().unwrap_or("<none>"),
                )
            })
            .collect();

        Ok(RunOutcome { task_arn, failures })
    }

    async fn describe_task(&self, cluster: &str, task_arn: &str) -> Result<Option<TaskStatus>> {
        let output = self
            .client
            .describe_tasks()
            .cluster(cluster)
            .tasks(task_arn)
            .send()
            .await
            .map_err(ecs_err)?;

        Ok(output.tasks().first().map(|task| TaskStatus {
            last_status: task.last_status().unwrap_or_default().to_string(),
            stop_code: task.stop_code().map(|code| code.as_str().to_string()),
            stopped_reason: task.stopped_reason().map(String::from),
        }))
    }

    async fn deregister_task_definition(&self, arn: &str) -> Result<()> {
        self.client
            .deregister_task_definition()
            .task_definition(arn)
            .send()
            .await
            .map_err(ecs_err)?;
        Ok(())
    }

    async fn delete_task_definition(&self, arn: &str) -> Result<()> {
        self.client
            .delete_task_definitions()
            .task_definitions(arn)
            .send()
            .await
            .map_err(ecs_err)?;
        Ok(())
    }
}
