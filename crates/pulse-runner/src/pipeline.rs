//! 리포트 파이프라인.
//!
//! 실행 한 번의 흐름:
//! 1. single-flight 잠금 획득 (실패하면 건너뜀)
//! 2. 설정 순서대로 종목별 조회 → 계산 (종목 실패는 건너뛰고 계속)
//! 3. 행이 하나도 없으면 전송 없이 종료
//! 4. 요약 리포트 전송, 이어서 종목별 차트 전송
//!
//! 잠금은 모든 종료 경로에서 해제됩니다.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use pulse_core::{
    instrument_span, is_chronological, AppConfig, Candle, FeaturesConfig, IndicatorSource,
    MarketDataSource, PulseError, PulseResult, StructureConfig, Timeframe,
};
use pulse_notification::{PhotoItem, ReportSink};
use thiserror::Error;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::chart::{build_ema_overlays, build_zigzag_markers, ChartInput, ChartRenderer};
use crate::report::{format_for_log, format_for_telegram, InstrumentMetrics, ReportData};
use crate::stats::RunStats;

// =============================================================================
// SingleFlight
// =============================================================================

/// 비차단 실행 잠금.
///
/// 동시에 하나의 실행만 허용합니다. 잠금을 얻지 못한 호출은 대기하지 않고 바로 실패합니다.
#[derive(Debug, Default)]
pub struct SingleFlight {
    running: AtomicBool,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// 잠금을 시도합니다. 이미 실행 중이면 `None`.
    pub fn try_acquire(&self) -> Option<FlightGuard<'_>> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| FlightGuard {
                running: &self.running,
            })
    }

    /// 실행 중인지 확인합니다.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

/// 잠금 보유 표시. drop 시 잠금이 해제됩니다.
#[derive(Debug)]
pub struct FlightGuard<'a> {
    running: &'a AtomicBool,
}

impl FlightGuard<'_> {
    /// 잠금을 명시적으로 해제합니다.
    pub fn release(self) {}
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}

// =============================================================================
// 종목 평가
// =============================================================================

/// 종목을 건너뛴 이유.
#[derive(Debug, Error)]
pub enum SkipReason {
    #[error("종목을 찾을 수 없음")]
    NotFound,

    #[error("종목 조회 실패: {0}")]
    Lookup(PulseError),

    #[error("캔들 조회 실패: {0}")]
    Fetch(PulseError),

    #[error("캔들 없음")]
    NoCandles,

    #[error("캔들이 시간순이 아님")]
    Unordered,
}

/// 리포트 행과 차트용 캔들.
#[derive(Debug, Clone)]
pub struct EvaluatedInstrument {
    pub metrics: InstrumentMetrics,
    pub candles: Vec<Candle>,
}

/// 종목 하나의 평가 결과.
#[derive(Debug)]
pub enum InstrumentOutcome {
    Ok(EvaluatedInstrument),
    Skip(SkipReason),
}

/// 실행 결과.
#[derive(Debug)]
pub enum RunOutcome {
    /// 이전 실행이 진행 중이라 건너뜀
    Skipped,
    /// 실행 완료 (행이 0개인 경우 포함)
    Completed(RunStats),
}

impl RunOutcome {
    pub fn is_skipped(&self) -> bool {
        matches!(self, RunOutcome::Skipped)
    }

    pub fn stats(&self) -> Option<&RunStats> {
        match self {
            RunOutcome::Completed(stats) => Some(stats),
            RunOutcome::Skipped => None,
        }
    }
}

// =============================================================================
// PipelineRunner
// =============================================================================

/// 실행마다 바뀌지 않는 파이프라인 설정.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// 종목 질의 (리포트 행 순서)
    pub instruments: Vec<String>,
    /// 조회 구간
    pub lookback: chrono::Duration,
    /// 캔들 간격
    pub timeframe: Timeframe,
    /// EMA 기간
    pub features: FeaturesConfig,
    /// 스윙 윈도우와 ZigZag 임계값
    pub structure: StructureConfig,
}

impl PipelineSettings {
    pub fn from_config(config: &AppConfig) -> PulseResult<Self> {
        Ok(Self {
            instruments: config.instruments.iter().map(|i| i.query.clone()).collect(),
            lookback: config.candles.lookback(),
            timeframe: config.candles.timeframe()?,
            features: config.features,
            structure: config.structure,
        })
    }
}

/// 예약/수동 실행을 처리하는 파이프라인.
pub struct PipelineRunner {
    settings: PipelineSettings,
    market: Arc<dyn MarketDataSource>,
    indicators: Option<Arc<dyn IndicatorSource>>,
    sink: Option<Arc<dyn ReportSink>>,
    charts: Option<Arc<dyn ChartRenderer>>,
    flight: SingleFlight,
}

impl PipelineRunner {
    pub fn new(settings: PipelineSettings, market: Arc<dyn MarketDataSource>) -> Self {
        Self {
            settings,
            market,
            indicators: None,
            sink: None,
            charts: None,
            flight: SingleFlight::new(),
        }
    }

    /// 지표 제공자를 설정합니다. 없으면 지표/EMA 피처를 계산하지 않습니다.
    pub fn with_indicators(mut self, indicators: Arc<dyn IndicatorSource>) -> Self {
        self.indicators = Some(indicators);
        self
    }

    /// 리포트 전송 채널을 설정합니다.
    pub fn with_sink(mut self, sink: Arc<dyn ReportSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// 차트 렌더러를 설정합니다.
    pub fn with_charts(mut self, charts: Arc<dyn ChartRenderer>) -> Self {
        self.charts = Some(charts);
        self
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// 실행 중인지 확인합니다.
    pub fn is_running(&self) -> bool {
        self.flight.is_running()
    }

    /// 파이프라인을 한 번 실행합니다.
    ///
    /// 다른 실행이 진행 중이면 기다리지 않고 [`RunOutcome::Skipped`]를 반환합니다.
    /// 데이터/네트워크 에러로 실패하지 않습니다.
    pub async fn run_once(&self) -> RunOutcome {
        let Some(guard) = self.flight.try_acquire() else {
            info!("이전 실행이 진행 중이라 이번 실행을 건너뜁니다");
            return RunOutcome::Skipped;
        };

        let run_id = Uuid::new_v4();
        let stats = self
            .execute(run_id)
            .instrument(info_span!("pipeline_run", run_id = %run_id))
            .await;

        guard.release();
        RunOutcome::Completed(stats)
    }

    async fn execute(&self, run_id: Uuid) -> RunStats {
        let start = Instant::now();
        let mut stats = RunStats::new(run_id);
        info!(
            instruments = self.settings.instruments.len(),
            timeframe = %self.settings.timeframe,
            "파이프라인 시작"
        );

        let to = Utc::now();
        let from = to - self.settings.lookback;

        let mut evaluated = Vec::with_capacity(self.settings.instruments.len());
        for query in &self.settings.instruments {
            stats.total += 1;
            let span = instrument_span!("evaluate_instrument", query);
            match self.evaluate_instrument(query, from, to).instrument(span).await {
                InstrumentOutcome::Ok(item) => {
                    stats.success += 1;
                    evaluated.push(item);
                }
                InstrumentOutcome::Skip(reason) => {
                    stats.skipped += 1;
                    match reason {
                        SkipReason::NoCandles => debug!(instrument = %query, "캔들 없음, 건너뜀"),
                        reason => warn!(instrument = %query, reason = %reason, "종목 건너뜀"),
                    }
                }
            }
        }
        stats.rows = evaluated.len();

        if evaluated.is_empty() {
            warn!("리포트할 종목이 없어 전송을 건너뜁니다");
        } else {
            let data = ReportData {
                as_of: to,
                rows: evaluated.iter().map(|e| e.metrics.clone()).collect(),
            };
            info!(instruments = data.rows.len(), "리포트 생성 완료");
            debug!("리포트 전문:\n{}", format_for_log(&data));

            stats.dispatched = self.dispatch(&data, &evaluated).await;
        }

        stats.elapsed = start.elapsed();
        stats.log_summary("리포트 파이프라인");
        stats
    }

    /// 종목 하나를 조회하고 리포트 행을 계산합니다.
    pub async fn evaluate_instrument(
        &self,
        query: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> InstrumentOutcome {
        let instrument = match self.market.find_instrument(query).await {
            Ok(Some(instrument)) => instrument,
            Ok(None) => return InstrumentOutcome::Skip(SkipReason::NotFound),
            Err(e) => return InstrumentOutcome::Skip(SkipReason::Lookup(e)),
        };

        let candles = match self
            .market
            .get_candles(&instrument, from, to, self.settings.timeframe)
            .await
        {
            Ok(candles) => candles,
            Err(e) => return InstrumentOutcome::Skip(SkipReason::Fetch(e)),
        };
        if candles.is_empty() {
            return InstrumentOutcome::Skip(SkipReason::NoCandles);
        }
        if !is_chronological(&candles) {
            return InstrumentOutcome::Skip(SkipReason::Unordered);
        }

        let name = if instrument.name.is_empty() {
            instrument.ticker.as_str()
        } else {
            instrument.name.as_str()
        };
        let metrics = InstrumentMetrics::compute(
            name,
            &candles,
            self.indicators.as_deref(),
            self.settings.features,
            self.settings.structure,
        );
        debug!(candles = candles.len(), "종목 계산 완료");

        InstrumentOutcome::Ok(EvaluatedInstrument { metrics, candles })
    }

    /// 리포트와 차트를 전송합니다. 전송 채널에 넘겼으면 true.
    ///
    /// 전송 실패는 기록만 하고 재시도하지 않습니다.
    async fn dispatch(&self, data: &ReportData, evaluated: &[EvaluatedInstrument]) -> bool {
        let Some(sink) = self.sink.as_deref().filter(|s| s.is_enabled()) else {
            debug!("전송 채널이 비활성화되어 리포트를 보내지 않습니다");
            return false;
        };

        if let Err(e) = sink.send_message(&format_for_telegram(data)).await {
            error!(sink = sink.name(), error = %e, "리포트 전송 실패");
        }

        let album = self.render_charts(evaluated);
        match album.as_slice() {
            [] => {}
            [single] => {
                if let Err(e) = sink
                    .send_photo(&single.caption, &single.filename, &single.data)
                    .await
                {
                    error!(sink = sink.name(), error = %e, "차트 전송 실패");
                }
            }
            items => {
                if let Err(e) = sink.send_photo_album(items).await {
                    error!(sink = sink.name(), error = %e, "차트 앨범 전송 실패");
                }
            }
        }
        true
    }

    /// 종목별 차트를 렌더링합니다. 실패하거나 빈 이미지는 제외합니다.
    fn render_charts(&self, evaluated: &[EvaluatedInstrument]) -> Vec<PhotoItem> {
        let Some(renderer) = self.charts.as_deref() else {
            return Vec::new();
        };
        let periods = [self.settings.features.ema_fast, self.settings.features.ema_slow];

        evaluated
            .iter()
            .enumerate()
            .filter_map(|(i, item)| {
                let name = &item.metrics.name;
                let overlays =
                    build_ema_overlays(self.indicators.as_deref(), &item.candles, &periods);
                let input = ChartInput::from_candles(name.clone(), &item.candles, overlays)
                    .with_markers(build_zigzag_markers(&item.metrics.structure));
                if let Err(e) = input.validate() {
                    warn!(instrument = %name, error = %e, "차트 입력 오류");
                    return None;
                }

                match renderer.render(&input) {
                    Ok(bytes) if bytes.is_empty() => None,
                    Ok(bytes) => Some(PhotoItem::new(
                        format!("{} ({})", name, self.settings.timeframe.caption()),
                        format!("chart_{i}.png"),
                        bytes,
                    )),
                    Err(e) => {
                        warn!(instrument = %name, error = %e, "차트 생성 실패");
                        None
                    }
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_flight_try_acquire() {
        let flight = SingleFlight::new();
        let guard = flight.try_acquire().expect("first acquire");
        assert!(flight.is_running());
        assert!(flight.try_acquire().is_none());

        guard.release();
        assert!(!flight.is_running());
        assert!(flight.try_acquire().is_some());
    }

    #[test]
    fn test_guard_released_on_drop() {
        let flight = SingleFlight::new();
        {
            let _guard = flight.try_acquire().unwrap();
            assert!(flight.is_running());
        }
        assert!(!flight.is_running());
    }

    #[test]
    fn test_guard_released_on_panic() {
        let flight = SingleFlight::new();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = flight.try_acquire().unwrap();
            panic!("boom");
        }));
        assert!(result.is_err());
        assert!(!flight.is_running());
    }

    #[test]
    fn test_settings_from_config() {
        let config = AppConfig {
            instruments: vec![
                pulse_core::InstrumentConfig::new("B"),
                pulse_core::InstrumentConfig::new("A"),
            ],
            ..Default::default()
        };
        let settings = PipelineSettings::from_config(&config).unwrap();
        assert_eq!(settings.instruments, vec!["B", "A"]);
        assert_eq!(settings.timeframe, Timeframe::D1);
        assert_eq!(settings.lookback, chrono::Duration::days(365));
        assert_eq!(settings.structure, StructureConfig::default());
    }
}
