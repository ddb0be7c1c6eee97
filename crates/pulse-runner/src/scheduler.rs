//! 주기 실행 스케줄러.
//!
//! 타이머 틱마다 파이프라인 실행을 별도 태스크로 띄웁니다. 이전 실행이 끝나지 않았으면
//! 새 실행은 single-flight 잠금에서 바로 건너뛰므로 밀린 실행이 쌓이지 않습니다.
//! 종료 신호를 받으면 다음 틱 전에 루프를 빠져나가고, 진행 중인 실행은 끝까지 기다립니다.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use pulse_core::SchedulerConfig;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{error, info};

use crate::pipeline::{PipelineRunner, RunOutcome};

/// 파이프라인 스케줄러.
pub struct Scheduler {
    runner: Arc<PipelineRunner>,
    interval: Duration,
    run_on_start: bool,
}

impl Scheduler {
    pub fn new(runner: Arc<PipelineRunner>, config: &SchedulerConfig) -> Self {
        Self {
            runner,
            interval: config.interval(),
            run_on_start: config.run_on_start,
        }
    }

    /// 종료 신호(`true`)가 오거나 송신 측이 사라질 때까지 실행합니다.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval_secs = self.interval.as_secs(),
            run_on_start = self.run_on_start,
            "=== 스케줄러 시작 ==="
        );

        let mut runs: JoinSet<RunOutcome> = JoinSet::new();
        if self.run_on_start {
            self.spawn_run(&mut runs);
        }

        // 첫 틱은 한 주기 뒤
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                biased;

                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("종료 신호 수신, 스케줄러 종료 중...");
                        break;
                    }
                }
                Some(joined) = runs.join_next(), if !runs.is_empty() => {
                    if let Err(e) = joined {
                        error!(error = %e, "파이프라인 태스크 실패");
                    }
                }
                _ = ticker.tick() => {
                    self.spawn_run(&mut runs);
                    info!(
                        "=== 다음 실행: {}초 후 ===",
                        self.interval.as_secs()
                    );
                }
            }
        }

        // 진행 중인 실행은 끝까지 기다림
        while let Some(joined) = runs.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "파이프라인 태스크 실패");
            }
        }
        info!("=== 스케줄러 종료 ===");
    }

    fn spawn_run(&self, runs: &mut JoinSet<RunOutcome>) {
        let runner = Arc::clone(&self.runner);
        runs.spawn(async move { runner.run_once().await });
    }
}

/// 종료 신호 대기를 등록합니다.
///
/// 핸들러는 호출 시점에 등록되고, 반환된 future는 SIGINT나 SIGTERM을 받으면
/// 신호 이름으로 끝납니다. 컨테이너/systemd 중지도 정상 종료 경로를 탑니다.
#[cfg(unix)]
pub fn shutdown_signal() -> std::io::Result<impl Future<Output = &'static str>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;
    Ok(async move {
        tokio::select! {
            _ = interrupt.recv() => "SIGINT",
            _ = terminate.recv() => "SIGTERM",
        }
    })
}

/// 종료 신호 대기를 등록합니다 (Ctrl+C만 지원).
#[cfg(not(unix))]
pub fn shutdown_signal() -> std::io::Result<impl Future<Output = &'static str>> {
    Ok(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "종료 신호 대기 실패");
            std::future::pending::<()>().await;
        }
        "ctrl_c"
    })
}
