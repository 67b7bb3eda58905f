//! ECS 작업 실패 경보 검증 CLI.
//!
//! 의도적으로 시작에 실패하는 작업을 실행하여 작업 실패 경보 경로를
//! 종단 간 검증합니다. 종료 코드: 0 = 기대한 실패 재현, 1 = 오류,
//! 2 = 다른 종료 사유 관찰.

use aws_config::{BehaviorVersion, Region};
use clap::Parser;
use kpis_ops::{run_harness, AwsEcs, HarnessConfig};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser, Debug)]
#[command(name = "kpis-failtest", about = "ECS 작업 실패 주입 테스트")]
struct Cli {
    /// 대상 ECS 클러스터 ARN
    #[arg(long, alias = "cluster_arn")]
    cluster_arn: String,

    /// ECS task execution role ARN
    #[arg(long, alias = "execution_role_arn")]
    execution_role_arn: String,

    /// awsvpc 서브넷 ID (1개 이상)
    #[arg(long, num_args = 1.., required = true)]
    subnets: Vec<String>,

    /// awsvpc 보안 그룹 ID (1개 이상)
    #[arg(long, num_args = 1.., required = true)]
    security_groups: Vec<String>,

    /// AWS 리전 (미지정 시 기본 설정 체인)
    #[arg(long)]
    region: Option<String>,

    /// AWS 프로필 이름
    #[arg(long)]
    profile: Option<String>,

    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(region) = cli.region.clone() {
        loader = loader.region(Region::new(region));
    }
    if let Some(profile) = cli.profile.as_deref() {
        loader = loader.profile_name(profile);
    }
    let sdk_config = loader.load().await;
    let ecs = AwsEcs::new(aws_sdk_ecs::Client::new(&sdk_config));

    let config = HarnessConfig::new(
        cli.cluster_arn,
        cli.execution_role_arn,
        cli.subnets,
        cli.security_groups,
    );

    let verdict = run_harness(&ecs, &config).await;
    tracing::info!(verdict = ?verdict, exit_code = verdict.exit_code(), "실패 주입 테스트 종료");
    std::process::exit(verdict.exit_code());
}

fn init_tracing(level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("kpis_ops={level}")));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
