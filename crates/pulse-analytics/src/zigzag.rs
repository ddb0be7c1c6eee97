//! ZigZag 피벗 탐지.
//!
//! 두 가지 독립적인 알고리즘을 제공합니다:
//! - [`zigzag_by_threshold`]: 마지막 피벗 대비 상대 변화율로 고점/저점을 번갈아 등록
//! - [`zigzag`]: depth/deviation/backstep 규칙으로 피벗 후보 추출
//!
//! depth 방식은 같은 인덱스에서 고점과 저점을 모두 낼 수 있고 교대도 보장하지 않습니다.
//! 교대가 필요한 소비자는 [`enforce_alternation`]을 따로 적용해야 합니다.

use pulse_core::{Candle, Extremum, ZigZagPoint};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    None,
    Up,
    Down,
}

/// 임계값 기반 ZigZag.
///
/// 첫 캔들을 종가 기준 고점 피벗으로 시작합니다. 이후:
/// - 방향이 없거나, 하락 중이고 고가 변화율이 `threshold` 이상이면 고점 피벗 (상승 전환)
/// - 상승 중이고 저가 변화율이 `-threshold` 이하이면 저점 피벗 (하락 전환)
///
/// 방향이 없을 때의 첫 고점은 시작 피벗(역시 고점)을 대체합니다.
/// 따라서 결과는 항상 고점/저점이 엄격히 교대합니다.
/// 마지막 피벗 가격이 0이면 변화율을 0으로 취급합니다.
pub fn zigzag_by_threshold(candles: &[Candle], threshold: f64) -> Vec<ZigZagPoint> {
    let Some((first, rest)) = candles.split_first() else {
        return Vec::new();
    };

    let mut pivot = ZigZagPoint {
        candle: *first,
        kind: Extremum::High,
        price: first.close,
    };
    let mut points = vec![pivot];
    let mut direction = Direction::None;

    for candle in rest {
        let change = |price: f64| {
            if pivot.price == 0.0 {
                0.0
            } else {
                (price - pivot.price) / pivot.price
            }
        };
        let change_high = change(candle.high);
        let change_low = change(candle.low);

        if direction == Direction::None
            || (direction == Direction::Down && change_high >= threshold)
        {
            pivot = ZigZagPoint {
                candle: *candle,
                kind: Extremum::High,
                price: candle.high,
            };
            if direction == Direction::None {
                points.clear();
            }
            points.push(pivot);
            direction = Direction::Up;
        } else if direction == Direction::Up && change_low <= -threshold {
            pivot = ZigZagPoint {
                candle: *candle,
                kind: Extremum::Low,
                price: candle.low,
            };
            points.push(pivot);
            direction = Direction::Down;
        }
    }
    points
}

/// depth/deviation/backstep ZigZag.
///
/// `i >= depth`인 각 인덱스에서 `[i - depth, i]` 구간의 최고 고가/최저 저가와 그 위치를 구하고:
/// - `candles[i].high - window_high >= deviation` 이고 최고가 위치가 `i - backstep`보다 앞이면 고점
/// - `window_low - candles[i].low >= deviation` 이고 최저가 위치가 `i - backstep`보다 앞이면 저점
///
/// 피벗의 `price`는 구간 극값, `candle`은 `candles[i]`입니다.
/// `i + backstep >= len`이 되면 탐색을 멈춥니다.
/// 구간 동률은 가장 앞선 인덱스를 극값 위치로 봅니다.
pub fn zigzag(candles: &[Candle], depth: usize, deviation: f64, backstep: usize) -> Vec<ZigZagPoint> {
    let mut points = Vec::new();

    for i in depth..candles.len() {
        if i + backstep >= candles.len() {
            break;
        }
        let window = &candles[i - depth..=i];
        let (high, high_idx) = extreme(window, |c| c.high, |a, b| a > b);
        let (low, low_idx) = extreme(window, |c| c.low, |a, b| a < b);
        let high_idx = i - depth + high_idx;
        let low_idx = i - depth + low_idx;

        let current = &candles[i];
        if current.high - high >= deviation && high_idx + backstep < i {
            points.push(ZigZagPoint {
                candle: *current,
                kind: Extremum::High,
                price: high,
            });
        }
        if low - current.low >= deviation && low_idx + backstep < i {
            points.push(ZigZagPoint {
                candle: *current,
                kind: Extremum::Low,
                price: low,
            });
        }
    }
    points
}

/// 구간 극값과 (구간 내) 위치. 동률이면 앞선 위치를 유지합니다.
fn extreme(
    window: &[Candle],
    value: impl Fn(&Candle) -> f64,
    better: impl Fn(f64, f64) -> bool,
) -> (f64, usize) {
    let mut best = value(&window[0]);
    let mut best_idx = 0;
    for (idx, candle) in window.iter().enumerate().skip(1) {
        let v = value(candle);
        if better(v, best) {
            best = v;
            best_idx = idx;
        }
    }
    (best, best_idx)
}

/// 연속된 같은 종류의 피벗을 하나로 합칩니다.
///
/// 고점 연속은 더 높은 가격, 저점 연속은 더 낮은 가격을 남기며 동률이면 앞의 것을 유지합니다.
/// 결과는 엄격히 교대합니다.
pub fn enforce_alternation(points: &[ZigZagPoint]) -> Vec<ZigZagPoint> {
    let mut out: Vec<ZigZagPoint> = Vec::with_capacity(points.len());
    for point in points {
        match out.last_mut() {
            Some(last) if last.kind == point.kind => {
                let more_extreme = match point.kind {
                    Extremum::High => point.price > last.price,
                    Extremum::Low => point.price < last.price,
                };
                if more_extreme {
                    *last = *point;
                }
            }
            _ => out.push(*point),
        }
    }
    out
}
