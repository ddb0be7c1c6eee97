//! 스윙 기반 추세 분류.
//!
//! 스윙 시퀀스를 시간 순서대로 소비하는 상태 기계입니다.
//! 최근 두 고점(`prev_high`, `last_high`)과 두 저점(`prev_low`, `last_low`)을 추적하며:
//! - **Up**: 고점 상승 AND 저점 상승
//! - **Down**: 고점 하락 AND 저점 하락
//! - **None**: 그 외
//!
//! 추세가 실제로 바뀐 스윙에서만 `TrendChange`를 기록합니다.

use pulse_core::{Extremum, Swing, TrendChange, TrendState};

/// 추세 분류 상태 기계.
///
/// 한 번에 스윙 하나씩 밀어 넣을 수 있어 스트리밍 소비자도 같은 규칙을 씁니다.
#[derive(Debug, Clone, Default)]
pub struct TrendClassifier {
    prev_high: f64,
    last_high: f64,
    prev_low: f64,
    last_low: f64,
    current: TrendState,
}

impl TrendClassifier {
    /// 초기 상태 (모든 기준값 0, 추세 None).
    pub fn new() -> Self {
        Self::default()
    }

    /// 현재 추세.
    pub fn current(&self) -> TrendState {
        self.current
    }

    /// 스윙 하나를 반영합니다. 추세가 바뀌면 변화 기록을 반환합니다.
    pub fn push(&mut self, swing: &Swing) -> Option<TrendChange> {
        match swing.kind {
            Extremum::High => {
                self.prev_high = self.last_high;
                self.last_high = swing.candle.high;
            }
            Extremum::Low => {
                self.prev_low = self.last_low;
                self.last_low = swing.candle.low;
            }
        }

        let next = self.evaluate();
        if next == self.current {
            return None;
        }
        self.current = next;
        Some(TrendChange {
            swing: *swing,
            trend: next,
        })
    }

    fn evaluate(&self) -> TrendState {
        if self.last_high > self.prev_high && self.last_low > self.prev_low {
            TrendState::Up
        } else if self.last_low < self.prev_low && self.last_high < self.prev_high {
            TrendState::Down
        } else {
            TrendState::None
        }
    }
}

/// 스윙 시퀀스 전체를 분류해 최종 추세와 변화 목록을 반환합니다.
///
/// `swings`는 시간 오름차순이어야 합니다 (`find_swings`의 출력 순서).
pub fn classify(swings: &[Swing]) -> (TrendState, Vec<TrendChange>) {
    let mut classifier = TrendClassifier::new();
    let changes = swings
        .iter()
        .filter_map(|swing| classifier.push(swing))
        .collect();
    (classifier.current(), changes)
}
