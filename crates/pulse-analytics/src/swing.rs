//! 스윙 고점/저점 탐지.
//!
//! 캔들 `i`의 좌우 `n`개 이웃(총 `2n`개)과 비교해 국소 극값을 찾습니다.
//! - 스윙 고점: `high`가 모든 이웃의 `high`보다 엄격히 큼
//! - 스윙 저점: `low`가 모든 이웃의 `low`보다 엄격히 작음
//!
//! 두 조건은 독립적으로 평가됩니다. 둘 다 성립하는 캔들(외봉)은
//! 같은 캔들에 대해 고점, 저점 순으로 레코드 두 개를 만듭니다.
//! 처음과 마지막 `n`개 캔들은 문맥이 부족하므로 결과에 나오지 않습니다.

use pulse_core::{Candle, Extremum, Swing};

/// 스윙 고점/저점을 캔들 순서대로 반환합니다.
///
/// `n == 0`이면 비교할 이웃이 없으므로 빈 결과입니다.
pub fn find_swings(candles: &[Candle], n: usize) -> Vec<Swing> {
    if n == 0 || candles.len() < 2 * n + 1 {
        return Vec::new();
    }

    let mut swings = Vec::new();
    for i in n..candles.len() - n {
        let current = &candles[i];
        let neighbours = candles[i - n..=i + n]
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != n)
            .map(|(_, c)| c);

        let (mut is_high, mut is_low) = (true, true);
        for other in neighbours {
            is_high &= current.high > other.high;
            is_low &= current.low < other.low;
            if !is_high && !is_low {
                break;
            }
        }

        if is_high {
            swings.push(Swing {
                candle: *current,
                period: n,
                kind: Extremum::High,
            });
        }
        if is_low {
            swings.push(Swing {
                candle: *current,
                period: n,
                kind: Extremum::Low,
            });
        }
    }
    swings
}
