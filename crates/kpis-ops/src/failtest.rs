//! ECS 작업 실패 주입 테스트.
//!
//! 외부 경보 규칙(EventBridge)을 검증하기 위해 의도적으로 작업 단위
//! 실패를 발생시킵니다.
//!
//! # 흐름
//!
//! 1. 존재하지 않는 이미지 태그를 가진 임시 task definition 등록
//! 2. 대상 클러스터에서 작업 1개 실행
//! 3. STOPPED 대기 후 stopCode가 채워질 때까지 추가 폴링 (2단계 대기)
//! 4. stopCode를 기대값과 비교하여 판정
//! 5. 정리: 결과와 무관하게 task definition revision 등록 해제 + 삭제

use crate::ecs::{EcsApi, FailingTaskDef, TaskLaunch, TaskStatus};
use crate::error::{OpsError, Result};
use rand::Rng;
use std::time::Duration;
use tokio::time::Instant;

/// 시작 실패 시 기대되는 stop code.
pub const EXPECTED_STOP_CODE: &str = "TaskFailedToStart";

/// 풀 수 없는 이미지. 작업이 시작될 수 없음을 보장.
const BAD_IMAGE: &str = "public.ecr.aws/amazonlinux/amazonlinux:this-tag-does-not-exist";

/// 실패 주입 테스트 설정.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// 대상 ECS 클러스터 ARN
    pub cluster_arn: String,
    /// ECS task execution role ARN
    pub execution_role_arn: String,
    /// awsvpc 네트워킹용 서브넷 ID
    pub subnets: Vec<String>,
    /// awsvpc 네트워킹용 보안 그룹 ID
    pub security_groups: Vec<String>,
    /// 작업 CPU 단위 (Fargate)
    pub cpu: String,
    /// 작업 메모리 (Fargate)
    pub memory: String,
    /// 임시 task definition family 접두사
    pub family_prefix: String,
    pub assign_public_ip: bool,
    /// 1단계: STOPPED 대기 제한 시간
    pub stopped_wait: Duration,
    pub stopped_poll: Duration,
    /// 2단계: stopCode 폴링 제한 시간
    pub stop_code_wait: Duration,
    pub stop_code_poll: Duration,
}

impl HarnessConfig {
    /// 필수 값만 받고 나머지는 기본값으로 설정.
    pub fn new(
        cluster_arn: impl Into<String>,
        execution_role_arn: impl Into<String>,
        subnets: Vec<String>,
        security_groups: Vec<String>,
    ) -> Self {
        Self {
            cluster_arn: cluster_arn.into(),
            execution_role_arn: execution_role_arn.into(),
            subnets,
            security_groups,
            cpu: "256".to_string(),
            memory: "512".to_string(),
            family_prefix: "fail-on-purpose".to_string(),
            assign_public_ip: true,
            stopped_wait: Duration::from_secs(600),
            stopped_poll: Duration::from_secs(6),
            stop_code_wait: Duration::from_secs(60),
            stop_code_poll: Duration::from_secs(5),
        }
    }
}

/// 테스트 실행 판정.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// 기대한 시작 실패가 재현됨
    Passed,
    /// 작업이 다른 이유로 종료됨
    WrongStopCode { observed: String },
    /// 등록/실행/대기 중 오류
    Error(String),
}

impl Verdict {
    /// 프로세스 종료 코드 매핑 (0 = 재현, 1 = 오류, 2 = 다른 종료 사유).
    pub fn exit_code(&self) -> i32 {
        match self {
            Verdict::Passed => 0,
            Verdict::Error(_) => 1,
            Verdict::WrongStopCode { .. } => 2,
        }
    }
}

/// 짧은 소문자 영숫자 접미사 생성.
fn rand_suffix(n: usize) -> String {
    const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();
    (0..n)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

/// 실패 주입 테스트 실행.
///
/// 어떤 경로로 끝나든 생성된 task definition의 정리를 항상 시도합니다.
/// 정리 실패는 경고로만 기록되며 판정을 바꾸지 않습니다.
pub async fn run_harness(ecs: &dyn EcsApi, config: &HarnessConfig) -> Verdict {
    let mut task_def_arn: Option<String> = None;

    let verdict = match execute(ecs, config, &mut task_def_arn).await {
        Ok(verdict) => verdict,
        Err(e) => {
            tracing::error!(error = %e, "실패 주입 테스트 오류");
            Verdict::Error(e.to_string())
        }
    };

    // 정리는 무조건 수행
    if let Some(arn) = &task_def_arn {
        if let Err(e) = cleanup_task_definition(ecs, arn).await {
            tracing::warn!(arn = %arn, error = %e, "정리 실패");
        }
    }

    verdict
}

async fn execute(
    ecs: &dyn EcsApi,
    config: &HarnessConfig,
    task_def_arn: &mut Option<String>,
) -> Result<Verdict> {
    // 1. 시작 불가능한 task definition 등록 (고유 family)
    let family = format!("{}-{}", config.family_prefix, rand_suffix(6));
    let spec = FailingTaskDef {
        family,
        execution_role_arn: config.execution_role_arn.clone(),
        cpu: config.cpu.clone(),
        memory: config.memory.clone(),
        container_name: "bad-container".to_string(),
        image: BAD_IMAGE.to_string(),
        command: vec![
            "sh".to_string(),
            "-c".to_string(),
            "this should never run".to_string(),
        ],
    };
    let arn = ecs.register_failing_task_definition(&spec).await?;
    tracing::info!(arn = %arn, "task definition 등록됨");
    *task_def_arn = Some(arn.clone());

    // 2. 작업 1개 실행
    let launch = TaskLaunch {
        cluster: config.cluster_arn.clone(),
        task_definition: arn,
        subnets: config.subnets.clone(),
        security_groups: config.security_groups.clone(),
        assign_public_ip: config.assign_public_ip,
        container_env: None,
    };
    let outcome = ecs.run_task(&launch).await?;
    if !outcome.failures.is_empty() {
        // 시작된 작업이 없으므로 기다릴 대상도 없음
        return Err(OpsError::TaskLaunch(outcome.failures.join("; ")));
    }
    let task_arn = outcome
        .task_arn
        .ok_or_else(|| OpsError::TaskLaunch("run_task 응답에 작업 ARN 없음".to_string()))?;
    tracing::info!(task_arn = %task_arn, "작업 시작됨");

    // 3. 2단계 대기
    let status = wait_for_stopped_and_describe(ecs, config, &task_arn).await?;
    tracing::info!(
        stop_code = ?status.stop_code,
        stopped_reason = ?status.stopped_reason,
        "작업 종료 관찰"
    );

    // 4. 판정
    match status.stop_code.as_deref() {
        Some(code) if code == EXPECTED_STOP_CODE => Ok(Verdict::Passed),
        other => Ok(Verdict::WrongStopCode {
            observed: other.unwrap_or("<none>").to_string(),
        }),
    }
}

/// STOPPED까지 대기한 뒤, stopCode가 채워질 때까지 추가 폴링.
///
/// 일부 백엔드는 상태가 STOPPED가 된 뒤에야 실패 분류(stopCode)를
/// 채웁니다. 2단계 제한 시간이 지나면 마지막으로 관찰한 설명으로
/// 진행하고, 설명을 한 번도 관찰하지 못했다면 치명적 오류입니다.
async fn wait_for_stopped_and_describe(
    ecs: &dyn EcsApi,
    config: &HarnessConfig,
    task_arn: &str,
) -> Result<TaskStatus> {
    // 1단계: STOPPED 대기
    let deadline = Instant::now() + config.stopped_wait;
    loop {
        if let Some(status) = ecs.describe_task(&config.cluster_arn, task_arn).await? {
            if status.last_status == "STOPPED" {
                break;
            }
        }
        if Instant::now() >= deadline {
            return Err(OpsError::Ecs(format!(
                "작업이 {}초 내에 STOPPED 상태에 도달하지 않았습니다",
                config.stopped_wait.as_secs()
            )));
        }
        tokio::time::sleep(config.stopped_poll).await;
    }

    // 2단계: stopCode 폴링
    let deadline = Instant::now() + config.stop_code_wait;
    let mut last_status: Option<TaskStatus> = None;
    loop {
        tracing::debug!(task_arn = %task_arn, "stopCode 폴링");
        if let Some(status) = ecs.describe_task(&config.cluster_arn, task_arn).await? {
            let has_code = status.stop_code.is_some();
            last_status = Some(status);
            if has_code {
                break;
            }
        }
        if Instant::now() >= deadline {
            // 제한 시간 초과 시 마지막 관찰값으로 진행
            break;
        }
        tokio::time::sleep(config.stop_code_poll).await;
    }

    last_status.ok_or_else(|| {
        OpsError::TaskLost("STOPPED 이후 작업 설명을 조회할 수 없습니다".to_string())
    })
}

/// 생성한 task definition revision 등록 해제 후 삭제.
///
/// 삭제는 revision이 INACTIVE 상태일 것을 요구하며, 등록 해제가 이를
/// 보장합니다.
async fn cleanup_task_definition(ecs: &dyn EcsApi, task_def_arn: &str) -> Result<()> {
    ecs.deregister_task_definition(task_def_arn).await?;
    tracing::info!(arn = %task_def_arn, "task definition 등록 해제됨");

    ecs.delete_task_definition(task_def_arn).await?;
    tracing::info!(arn = %task_def_arn, "task definition 삭제됨");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::RunOutcome;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// 스크립트된 ECS fake.
    struct FakeEcs {
        run_failures: Vec<String>,
        statuses: Mutex<VecDeque<Option<TaskStatus>>>,
        final_status: Option<TaskStatus>,
        calls: Mutex<Vec<&'static str>>,
    }

    impl FakeEcs {
        fn with_final_status(status: Option<TaskStatus>) -> Self {
            Self {
                run_failures: Vec::new(),
                statuses: Mutex::new(VecDeque::new()),
                final_status: status,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().unwrap().clone()
        }
    }

    fn stopped(stop_code: Option<&str>) -> TaskStatus {
        TaskStatus {
            last_status: "STOPPED".to_string(),
            stop_code: stop_code.map(String::from),
            stopped_reason: stop_code.map(|_| "CannotPullContainerError".to_string()),
        }
    }

    #[async_trait]
    impl EcsApi for FakeEcs {
        async fn latest_revision(&self, _family: &str) -> Result<i32> {
            unimplemented!("실패 주입 테스트는 revision을 조회하지 않음")
        }

        async fn register_failing_task_definition(&self, spec: &FailingTaskDef) -> Result<String> {
            self.calls.lock().unwrap().push("register");
            assert!(spec.family.starts_with("fail-on-purpose-"));
            Ok(format!("arn:aws:ecs:task-definition/{}:1", spec.family))
        }

        async fn run_task(&self, _launch: &TaskLaunch) -> Result<RunOutcome> {
            self.calls.lock().unwrap().push("run");
            Ok(RunOutcome {
                task_arn: if self.run_failures.is_empty() {
                    Some("arn:aws:ecs:task/abc".to_string())
                } else {
                    None
                },
                failures: self.run_failures.clone(),
            })
        }

        async fn describe_task(&self, _: &str, _: &str) -> Result<Option<TaskStatus>> {
            self.calls.lock().unwrap().push("describe");
            match self.statuses.lock().unwrap().pop_front() {
                Some(status) => Ok(status),
                None => Ok(self.final_status.clone()),
            }
        }

        async fn deregister_task_definition(&self, _: &str) -> Result<()> {
            self.calls.lock().unwrap().push("deregister");
            Ok(())
        }

        async fn delete_task_definition(&self, _: &str) -> Result<()> {
            self.calls.lock().unwrap().push("delete");
            Ok(())
        }
    }

    fn fast_config() -> HarnessConfig {
        let mut config = HarnessConfig::new(
            "arn:aws:ecs:cluster/test",
            "arn:aws:iam::role/test",
            vec!["subnet-1".to_string()],
            vec!["sg-1".to_string()],
        );
        config.stopped_wait = Duration::from_millis(50);
        config.stopped_poll = Duration::from_millis(1);
        config.stop_code_wait = Duration::from_millis(50);
        config.stop_code_poll = Duration::from_millis(1);
        config
    }

    #[tokio::test]
    async fn test_expected_stop_code_passes_and_cleans_up() {
        let ecs = FakeEcs::with_final_status(Some(stopped(Some("TaskFailedToStart"))));
        let verdict = run_harness(&ecs, &fast_config()).await;

        assert_eq!(verdict, Verdict::Passed);
        assert_eq!(verdict.exit_code(), 0);
        let calls = ecs.calls();
        assert!(calls.ends_with(&["deregister", "delete"]));
    }

    #[tokio::test]
    async fn test_wrong_stop_code_exits_2_and_cleans_up() {
        let ecs = FakeEcs::with_final_status(Some(stopped(Some("EssentialContainerExited"))));
        let verdict = run_harness(&ecs, &fast_config()).await;

        assert_eq!(
            verdict,
            Verdict::WrongStopCode {
                observed: "EssentialContainerExited".to_string()
            }
        );
        assert_eq!(verdict.exit_code(), 2);
        assert!(ecs.calls().ends_with(&["deregister", "delete"]));
    }

    #[tokio::test]
    async fn test_launch_failures_error_and_clean_up() {
        let mut ecs = FakeEcs::with_final_status(None);
        ecs.run_failures = vec!["reason=RESOURCE:MEMORY".to_string()];

        let verdict = run_harness(&ecs, &fast_config()).await;

        assert!(matches!(verdict, Verdict::Error(_)));
        assert_eq!(verdict.exit_code(), 1);
        // 기다릴 작업이 없어도 정리는 수행
        let calls = ecs.calls();
        assert!(!calls.contains(&"describe"));
        assert!(calls.ends_with(&["deregister", "delete"]));
    }

    #[tokio::test]
    async fn test_stop_code_timeout_degrades_to_last_observation() {
        // STOPPED는 되었지만 stopCode가 끝내 채워지지 않는 경우
        let ecs = FakeEcs::with_final_status(Some(stopped(None)));
        let verdict = run_harness(&ecs, &fast_config()).await;

        assert_eq!(
            verdict,
            Verdict::WrongStopCode {
                observed: "<none>".to_string()
            }
        );
        assert_eq!(verdict.exit_code(), 2);
        assert!(ecs.calls().ends_with(&["deregister", "delete"]));
    }

    #[tokio::test]
    async fn test_task_never_stops_is_error() {
        let ecs = FakeEcs::with_final_status(Some(TaskStatus {
            last_status: "PENDING".to_string(),
            stop_code: None,
            stopped_reason: None,
        }));
        let verdict = run_harness(&ecs, &fast_config()).await;

        assert!(matches!(verdict, Verdict::Error(_)));
        assert!(ecs.calls().ends_with(&["deregister", "delete"]));
    }

    #[tokio::test]
    async fn test_stop_code_arrives_on_later_poll() {
        let ecs = FakeEcs::with_final_status(Some(stopped(Some("TaskFailedToStart"))));
        // 처음 두 번은 stopCode 없이 관찰됨
        {
            let mut statuses = ecs.statuses.lock().unwrap();
            statuses.push_back(Some(stopped(None)));
            statuses.push_back(Some(stopped(None)));
        }

        let verdict = run_harness(&ecs, &fast_config()).await;
        assert_eq!(verdict, Verdict::Passed);
    }

    #[test]
    fn test_rand_suffix_charset() {
        let suffix = rand_suffix(8);
        assert_eq!(suffix.len(), 8);
        assert!(suffix
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }
}
