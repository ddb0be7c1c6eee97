//! 리포트 데이터와 전송 채널별 포맷터.
//!
//! [`ReportData`]는 원시 값만 담고, 문자열은 포맷터가 만듭니다.
//! - [`format_for_log`]: 디버그 로그용 상세 리포트
//! - [`format_for_telegram`]: 텔레그램용 요약 리포트 (HTML)
//!
//! 워밍업이 끝나지 않은 값은 에러 대신 `N/A`로 표시합니다.

use std::fmt::Write;

use chrono::{DateTime, Utc};
use pulse_analytics::indicators::{EMA_PERIOD, RSI_PERIOD, SMA_PERIOD};
use pulse_analytics::{
    compute_ema_features, EmaFeature, EmaFeatureSet, MarketStructure, SeriesSummary,
};
use pulse_core::{
    closes, volumes, Candle, FeaturesConfig, IndicatorSnapshot, IndicatorSource, StructureConfig,
};
use pulse_notification::escape_html;
use serde::Serialize;

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M";
const DAY_FORMAT: &str = "%Y-%m-%d";
const NOT_AVAILABLE: &str = "N/A";

/// 종목 하나의 리포트 행.
///
/// 실행마다 한 번 만들어지고 리포트 포맷 후 버려집니다.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstrumentMetrics {
    /// 종목 이름
    pub name: String,
    /// 통계 요약
    pub summary: SeriesSummary,
    /// 지표 스냅샷 (지표 제공자가 없으면 `None`)
    pub indicators: Option<IndicatorSnapshot>,
    /// EMA 피처 (지표 제공자가 없으면 `None`)
    pub ema_features: Option<EmaFeatureSet>,
    /// 스윙 추세와 ZigZag 피벗
    pub structure: MarketStructure,
}

impl InstrumentMetrics {
    /// 캔들에서 리포트 행을 계산합니다.
    pub fn compute(
        name: impl Into<String>,
        candles: &[Candle],
        indicators: Option<&dyn IndicatorSource>,
        features: FeaturesConfig,
        structure: StructureConfig,
    ) -> Self {
        let closes = closes(candles);
        let volumes = volumes(candles);

        let (snapshot, ema_features) = match indicators {
            Some(source) => (
                Some(source.compute_snapshot(&closes)),
                Some(compute_ema_features(
                    Some(source),
                    &closes,
                    features.ema_fast,
                    features.ema_slow,
                )),
            ),
            None => (None, None),
        };

        Self {
            name: name.into(),
            summary: SeriesSummary::from_series(&closes, &volumes),
            indicators: snapshot,
            ema_features,
            structure: MarketStructure::analyze(
                candles,
                structure.swing_window,
                structure.zigzag_threshold,
            ),
        }
    }
}

/// 포맷터 입력.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportData {
    /// 기준 시각
    pub as_of: DateTime<Utc>,
    /// 설정 순서대로 정렬된 행
    pub rows: Vec<InstrumentMetrics>,
}

fn opt(value: Option<f64>, precision: usize) -> String {
    value
        .map(|v| format!("{:.*}", precision, v))
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

fn events(tags: &[String]) -> String {
    format!("[{}]", tags.join(", "))
}

/// EMA 한 줄. 준비되지 않았으면 `N/A`.
fn ema_line(feature: &EmaFeature, period: usize, indent: &str, sep: &str) -> String {
    if !feature.ready {
        return format!("{indent}EMA{period}{sep}{NOT_AVAILABLE}\n");
    }
    let mut line = format!(
        "{indent}EMA{period}{sep}{:.2}  Δ {:.2}",
        feature.value, feature.delta
    );
    if !feature.events.is_empty() {
        line.push_str("  ");
        line.push_str(&events(&feature.events));
    }
    line.push('\n');
    line
}

/// fast/slow 비교 한 줄.
fn trend_line(set: &EmaFeatureSet, indent: &str) -> String {
    let (fast, slow) = (set.fast_period, set.slow_period);
    if !set.above_ready {
        return format!("{indent}EMA{fast}/EMA{slow} {NOT_AVAILABLE}\n");
    }
    let side = if set.fast_above_slow { "above" } else { "below" };
    let mut line = format!("{indent}EMA{fast} {side} EMA{slow}");
    if !set.combined_events.is_empty() {
        line.push_str("  ");
        line.push_str(&events(&set.combined_events));
    }
    line.push('\n');
    line
}

/// 추세 한 줄 (로그용).
fn structure_trend_line(structure: &MarketStructure) -> String {
    match structure.last_change() {
        Some(change) => format!(
            "   Trend: {} (since {}, {} swings)\n",
            structure.trend,
            change.swing.candle.time.format(DAY_FORMAT),
            structure.swing_count
        ),
        None => format!(
            "   Trend: {} ({} swings)\n",
            structure.trend, structure.swing_count
        ),
    }
}

/// ZigZag 한 줄 (로그용).
fn structure_zigzag_line(structure: &MarketStructure) -> String {
    let label = format!("ZigZag({:.0}%)", structure.zigzag_threshold * 100.0);
    match structure.last_pivot() {
        Some(pivot) => format!(
            "   {label}: {} pivots, last {} {:.2} @ {}\n",
            structure.zigzag.len(),
            pivot.kind,
            pivot.price,
            pivot.candle.time.format(DAY_FORMAT)
        ),
        None => format!("   {label}: {NOT_AVAILABLE}\n"),
    }
}

/// 로그용 상세 리포트.
pub fn format_for_log(data: &ReportData) -> String {
    let mut out = format!("Market Pulse Report {}\n\n", data.as_of.format(DATE_FORMAT));

    for row in &data.rows {
        let s = &row.summary;
        let _ = writeln!(out, "** {}", row.name);
        let _ = writeln!(
            out,
            "   Last: {:.2}  |  1d: {:+.2}%  7d: {:+.2}%  30d: {:+.2}%",
            s.last, s.change_1d, s.change_7d, s.change_30d
        );
        let _ = writeln!(
            out,
            "   Range: {:.2} - {:.2}  |  AvgVol: {:.0}  |  Vol(day): {:.4}  MaxDD: {:.1}%",
            s.min,
            s.max,
            s.avg_volume,
            s.volatility,
            s.max_drawdown * 100.0
        );
        if let Some(snapshot) = &row.indicators {
            let _ = writeln!(
                out,
                "   SMA{SMA_PERIOD}: {}  EMA{EMA_PERIOD}: {}  RSI{RSI_PERIOD}: {}",
                opt(snapshot.sma, 2),
                opt(snapshot.ema, 2),
                opt(snapshot.rsi, 1)
            );
        }
        if let Some(set) = &row.ema_features {
            out.push_str(&ema_line(&set.fast, set.fast_period, "   ", ": "));
            out.push_str(&ema_line(&set.slow, set.slow_period, "   ", ": "));
            out.push_str(&trend_line(set, "   "));
        }
        out.push_str(&structure_trend_line(&row.structure));
        out.push_str(&structure_zigzag_line(&row.structure));
        out.push('\n');
    }
    out
}

/// 텔레그램용 요약 리포트 (HTML 파싱 모드).
pub fn format_for_telegram(data: &ReportData) -> String {
    let mut out = format!("📊 Report {}\n\n", data.as_of.format(DATE_FORMAT));

    for row in &data.rows {
        let s = &row.summary;
        let _ = writeln!(out, "• <b>{}</b>", escape_html(&row.name));
        let _ = writeln!(
            out,
            "  {:.2}  1d:{:+.1}% 7d:{:+.1}% 30d:{:+.1}%",
            s.last, s.change_1d, s.change_7d, s.change_30d
        );
        let _ = writeln!(
            out,
            "  Range {:.2}-{:.2}  Vol {:.0}  MaxDD {:.1}%",
            s.min,
            s.max,
            s.avg_volume,
            s.max_drawdown * 100.0
        );
        if let Some(snapshot) = &row.indicators {
            let _ = writeln!(
                out,
                "  SMA{SMA_PERIOD} {}  EMA{EMA_PERIOD} {}  RSI {}",
                opt(snapshot.sma, 2),
                opt(snapshot.ema, 2),
                opt(snapshot.rsi, 0)
            );
        }
        if let Some(set) = &row.ema_features {
            out.push_str(&ema_line(&set.fast, set.fast_period, "  ", " "));
            out.push_str(&ema_line(&set.slow, set.slow_period, "  ", " "));
            out.push_str(&trend_line(set, "  "));
        }
        let pivot = row
            .structure
            .last_pivot()
            .map(|p| format!("{} {:.2}", p.kind, p.price))
            .unwrap_or_else(|| NOT_AVAILABLE.to_string());
        let _ = writeln!(out, "  Trend {}  ZZ {}", row.structure.trend, pivot);
        out.push('\n');
    }
    out
}
