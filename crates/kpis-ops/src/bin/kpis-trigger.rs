//! ECS 수집 작업 수동 트리거 CLI.
//!
//! 환경 변수로 클러스터/네트워크 설정을 읽고, 대상 task definition의
//! 최신 revision으로 Fargate 작업 1개를 실행합니다.

use clap::Parser;
use kpis_ops::{trigger_task, AwsEcs, TriggerConfig};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser, Debug)]
#[command(name = "kpis-trigger", about = "ETF KPI 수집 ECS 작업 수동 실행")]
struct Cli {
    /// 컨테이너 ENV 환경 변수 덮어쓰기 (미지정 시 ENV 환경 변수 사용)
    #[arg(long)]
    env: Option<String>,

    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    if let Err(e) = run(cli).await {
        tracing::error!(error = %e, "작업 트리거 실패");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> kpis_ops::Result<()> {
    let config = TriggerConfig::from_env()?;
    let ecs = AwsEcs::from_default_config().await;

    let task_arn = trigger_task(&ecs, &config, cli.env).await?;
    tracing::info!(task_arn = %task_arn, "작업 실행 요청 완료");
    Ok(())
}

fn init_tracing(level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("kpis_ops={level}")));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
