//! 시장 리포트 파이프라인.
//!
//! 이 crate는 분석 코어를 실행 가능한 서비스로 묶습니다:
//! - 종목별 리포트 행 계산과 로그/텔레그램 포맷
//! - single-flight 잠금으로 보호되는 파이프라인 실행
//! - 주기 실행 스케줄러
//! - 텔레그램 봇 명령 연결 (`/candles`, `/report`)

pub mod chart;
pub mod commands;
pub mod pipeline;
pub mod report;
pub mod scheduler;
pub mod stats;

pub use chart::{
    build_ema_overlays, build_zigzag_markers, ChartError, ChartInput, ChartPoint, ChartRenderer,
    LineSeries,
};
pub use commands::{candles_filename, PulseCommandHandler};
pub use pipeline::{
    EvaluatedInstrument, FlightGuard, InstrumentOutcome, PipelineRunner, PipelineSettings,
    RunOutcome, SingleFlight, SkipReason,
};
pub use report::{format_for_log, format_for_telegram, InstrumentMetrics, ReportData};
pub use scheduler::{shutdown_signal, Scheduler};
pub use stats::RunStats;
