//! Market Pulse CLI.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use pulse_analytics::TaIndicatorSource;
use pulse_core::{init_logging, AppConfig, LogConfig, MarketDataKind, MarketDataSource};
use pulse_data::{CandleExporter, CsvDirectorySource, YahooMarketData};
use pulse_notification::{TelegramBotHandler, TelegramConfig, TelegramSender};
use pulse_runner::{
    candles_filename, shutdown_signal, PipelineRunner, PipelineSettings, PulseCommandHandler,
    Scheduler,
};
use tokio::sync::watch;

#[derive(Parser)]
#[command(name = "pulse")]
#[command(about = "Market Pulse report pipeline", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 설정 파일 경로
    #[arg(long, global = true, default_value = "config/default.toml")]
    config: PathBuf,

    /// 로그 레벨 (trace, debug, info, warn, error). 설정 파일보다 우선
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// 리포트 파이프라인 1회 실행
    RunOnce,

    /// 데몬 모드: 주기적으로 리포트 실행 (봇 명령 수신 포함)
    Daemon,

    /// 캔들 CSV 내보내기
    ExportCandles {
        /// 종목 (티커, ISIN 등)
        #[arg(long)]
        instrument: String,

        /// 타임프레임 (예: 1d, 1h)
        #[arg(long, default_value = "1d")]
        timeframe: String,

        /// 최근 N일
        #[arg(long, default_value_t = 30)]
        days: u32,

        /// 출력 파일 (기본: candles_{instrument}_{timeframe}.csv)
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // 설정 로드
    let config = AppConfig::load(&cli.config)
        .with_context(|| format!("설정 파일 로드 실패: {}", cli.config.display()))?;

    // 로깅 초기화
    let mut log_config = LogConfig::from_settings(&config.logging);
    if let Some(level) = &cli.log_level {
        log_config.level = level.clone();
    }
    init_logging(log_config).map_err(|e| anyhow!("로깅 초기화 실패: {}", e))?;

    tracing::info!("Market Pulse 시작");

    let market = build_market_source(&config)?;
    tracing::debug!(provider = market.name(), "시장 데이터 제공자 준비 완료");

    match cli.command {
        Commands::RunOnce => {
            config.validate().context("설정 검증 실패")?;
            let runner = build_runner(&config, market)?;
            runner.run_once().await;
        }
        Commands::Daemon => {
            config.validate().context("설정 검증 실패")?;
            run_daemon(&config, market).await?;
        }
        Commands::ExportCandles {
            instrument,
            timeframe,
            days,
            output,
        } => {
            let to = Utc::now();
            let from = to - Duration::days(i64::from(days));
            let bytes = CandleExporter::new(market)
                .export(&instrument, &timeframe, from, to)
                .await
                .with_context(|| format!("캔들 내보내기 실패: {}", instrument))?;

            let path =
                output.unwrap_or_else(|| PathBuf::from(candles_filename(&instrument, &timeframe)));
            tokio::fs::write(&path, &bytes)
                .await
                .with_context(|| format!("파일 저장 실패: {}", path.display()))?;
            tracing::info!(path = %path.display(), bytes = bytes.len(), "CSV 저장 완료");
        }
    }

    tracing::info!("Market Pulse 종료");
    Ok(())
}

fn build_market_source(config: &AppConfig) -> anyhow::Result<Arc<dyn MarketDataSource>> {
    let source: Arc<dyn MarketDataSource> = match config.market_data.provider {
        MarketDataKind::Yahoo => {
            Arc::new(YahooMarketData::new().context("Yahoo Finance 클라이언트 생성 실패")?)
        }
        MarketDataKind::Csv => Arc::new(CsvDirectorySource::new(&config.market_data.csv_dir)),
    };
    Ok(source)
}

fn build_runner(
    config: &AppConfig,
    market: Arc<dyn MarketDataSource>,
) -> anyhow::Result<PipelineRunner> {
    let settings = PipelineSettings::from_config(config)?;
    let mut runner =
        PipelineRunner::new(settings, market).with_indicators(Arc::new(TaIndicatorSource::new()));

    if config.telegram.enabled {
        match TelegramSender::from_env() {
            Some(sender) => runner = runner.with_sink(Arc::new(sender)),
            None => tracing::warn!(
                "telegram.enabled지만 TELEGRAM_BOT_TOKEN/TELEGRAM_CHAT_ID가 없어 전송하지 않습니다"
            ),
        }
    } else {
        tracing::debug!("텔레그램 비활성화, 리포트는 로그에만 기록됩니다");
    }
    Ok(runner)
}

async fn run_daemon(config: &AppConfig, market: Arc<dyn MarketDataSource>) -> anyhow::Result<()> {
    let runner = Arc::new(build_runner(config, Arc::clone(&market))?);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let signal = shutdown_signal().context("종료 신호 등록 실패")?;
    tokio::spawn(async move {
        let name = signal.await;
        tracing::info!(signal = name, "종료 신호 수신, 데몬 종료 중...");
        let _ = shutdown_tx.send(true);
    });

    let bot_task = if config.telegram.handle_commands {
        match TelegramConfig::from_env() {
            Some(telegram) => {
                let handler = Arc::new(PulseCommandHandler::new(
                    CandleExporter::new(market),
                    Arc::clone(&runner),
                ));
                let bot = TelegramBotHandler::new(telegram, handler)
                    .with_allowed_chat_ids(config.telegram.allowed_chat_id.into_iter().collect());
                let rx = shutdown_rx.clone();
                Some(tokio::spawn(async move { bot.start_polling(rx).await }))
            }
            None => {
                tracing::warn!("telegram.handle_commands지만 봇 토큰이 없어 명령을 받지 않습니다");
                None
            }
        }
    } else {
        None
    };

    Scheduler::new(runner, &config.scheduler)
        .run(shutdown_rx)
        .await;

    if let Some(task) = bot_task {
        if let Err(e) = task.await {
            tracing::error!(error = %e, "봇 태스크 실패");
        }
    }
    Ok(())
}
