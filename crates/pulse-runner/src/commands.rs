//! 텔레그램 봇 명령 처리.
//!
//! `/candles`는 캔들 내보내기 서비스로, `/report`는 스케줄러와 같은
//! single-flight 잠금을 거쳐 파이프라인으로 연결합니다.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use pulse_data::CandleExporter;
use pulse_notification::{escape_html, BotCommandHandler, CommandResponse, NotificationResult};
use tracing::{info, warn};

use crate::pipeline::{PipelineRunner, RunOutcome};

/// 봇 명령 핸들러.
pub struct PulseCommandHandler {
    exporter: CandleExporter,
    runner: Arc<PipelineRunner>,
}

impl PulseCommandHandler {
    pub fn new(exporter: CandleExporter, runner: Arc<PipelineRunner>) -> Self {
        Self { exporter, runner }
    }
}

/// CSV 파일 이름.
pub fn candles_filename(instrument: &str, timeframe: &str) -> String {
    format!("candles_{}_{}.csv", instrument, timeframe)
}

#[async_trait]
impl BotCommandHandler for PulseCommandHandler {
    async fn handle_candles(
        &self,
        instrument: &str,
        timeframe: &str,
        last_days: u32,
    ) -> NotificationResult<CommandResponse> {
        let to = Utc::now();
        let from = to - Duration::days(i64::from(last_days));

        match self.exporter.export(instrument, timeframe, from, to).await {
            Ok(bytes) => Ok(CommandResponse::document(
                candles_filename(instrument, timeframe),
                bytes,
            )),
            Err(e) => {
                warn!(instrument, timeframe, error = %e, "캔들 내보내기 실패");
                Ok(CommandResponse::html(format!(
                    "Error: {}",
                    escape_html(&e.to_string())
                )))
            }
        }
    }

    async fn handle_report(&self) -> NotificationResult<CommandResponse> {
        info!("봇 명령으로 리포트 실행");
        let text = match self.runner.run_once().await {
            RunOutcome::Skipped => "⏳ 이전 리포트 실행이 진행 중이라 건너뛰었습니다".to_string(),
            RunOutcome::Completed(stats) if stats.rows == 0 => {
                "⚠️ 리포트할 종목이 없어 전송하지 않았습니다".to_string()
            }
            RunOutcome::Completed(stats) => format!(
                "✅ 리포트 실행 완료: {}/{} 종목 ({:.1}초)",
                stats.rows,
                stats.total,
                stats.elapsed.as_secs_f64()
            ),
        };
        Ok(CommandResponse::html(text))
    }
}
