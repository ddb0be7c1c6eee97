//! 통계 지표 모듈.
//!
//! 종가/거래량 시리즈에 대한 순수 함수 모음입니다:
//! - 마지막 값, 변동률(%), 최소/최대
//! - 평균 거래량
//! - 일간 수익률, 표준편차, 실현 변동성
//! - 최대 낙폭 (Maximum Drawdown)
//!
//! 데이터가 부족하면 에러 대신 0을 반환합니다.
//!
//! # 사용 예시
//!
//! ```rust
//! use pulse_analytics::metrics;
//!
//! let closes = [100.0, 120.0, 90.0];
//! assert_eq!(metrics::max_drawdown(&closes), 0.25);
//! assert_eq!(metrics::percent_change(&closes, 1), -25.0);
//! ```

use serde::{Deserialize, Serialize};

/// 마지막 종가. 비어 있으면 0.
pub fn last(closes: &[f64]) -> f64 {
    closes.last().copied().unwrap_or(0.0)
}

/// `periods_ago` 전 대비 변동률(%).
///
/// `periods_ago <= 0`, 길이 부족, 기준가 0이면 0을 반환합니다.
pub fn percent_change(closes: &[f64], periods_ago: i64) -> f64 {
    if periods_ago <= 0 {
        return 0.0;
    }
    let back = periods_ago as usize;
    if closes.len() < back + 1 {
        return 0.0;
    }
    let last = closes[closes.len() - 1];
    let base = closes[closes.len() - 1 - back];
    if base == 0.0 {
        return 0.0;
    }
    (last - base) / base * 100.0
}

/// 최소/최대 종가. 비어 있으면 `(0, 0)`.
pub fn min_max(closes: &[f64]) -> (f64, f64) {
    let Some((&first, rest)) = closes.split_first() else {
        return (0.0, 0.0);
    };
    rest.iter()
        .fold((first, first), |(lo, hi), &c| (lo.min(c), hi.max(c)))
}

/// 평균 거래량. 비어 있으면 0.
pub fn avg_volume(volumes: &[i64]) -> f64 {
    if volumes.is_empty() {
        return 0.0;
    }
    let sum: i128 = volumes.iter().map(|&v| i128::from(v)).sum();
    sum as f64 / volumes.len() as f64
}

/// 일간 수익률 `(c[i] - c[i-1]) / c[i-1]`.
///
/// 직전 종가가 0인 구간은 건너뛰므로 길이는 `n - 1` 이하입니다.
pub fn daily_returns(closes: &[f64]) -> Vec<f64> {
    closes
        .windows(2)
        .filter(|w| w[0] != 0.0)
        .map(|w| (w[1] - w[0]) / w[0])
        .collect()
}

/// 모집단 표준편차. 값이 2개 미만이면 0.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt()
}

/// 실현 변동성: 일간 수익률의 표준편차 (연율화하지 않음).
pub fn realised_volatility(closes: &[f64]) -> f64 {
    std_dev(&daily_returns(closes))
}

/// 최대 낙폭 (0 ~ 1).
///
/// 누적 고점 대비 하락률의 최댓값입니다. 값이 2개 미만이면 0,
/// 고점이 0 이하인 구간은 계산에서 제외합니다.
pub fn max_drawdown(closes: &[f64]) -> f64 {
    if closes.len() < 2 {
        return 0.0;
    }
    let mut peak = closes[0];
    let mut max_dd = 0.0_f64;
    for &close in &closes[1..] {
        if close > peak {
            peak = close;
        }
        if peak <= 0.0 {
            continue;
        }
        max_dd = max_dd.max((peak - close) / peak);
    }
    max_dd
}

/// 한 종목 시리즈의 요약 통계.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SeriesSummary {
    /// 마지막 종가
    pub last: f64,
    /// 1봉 변동률(%)
    pub change_1d: f64,
    /// 7봉 변동률(%)
    pub change_7d: f64,
    /// 30봉 변동률(%)
    pub change_30d: f64,
    /// 구간 최저 종가
    pub min: f64,
    /// 구간 최고 종가
    pub max: f64,
    /// 평균 거래량
    pub avg_volume: f64,
    /// 실현 변동성 (일간)
    pub volatility: f64,
    /// 최대 낙폭 (0 ~ 1)
    pub max_drawdown: f64,
}

impl SeriesSummary {
    /// 종가/거래량 시리즈에서 요약 통계를 계산합니다.
    pub fn from_series(closes: &[f64], volumes: &[i64]) -> Self {
        let (min, max) = min_max(closes);
        Self {
            last: last(closes),
            change_1d: percent_change(closes, 1),
            change_7d: percent_change(closes, 7),
            change_30d: percent_change(closes, 30),
            min,
            max,
            avg_volume: avg_volume(volumes),
            volatility: realised_volatility(closes),
            max_drawdown: max_drawdown(closes),
        }
    }
}
