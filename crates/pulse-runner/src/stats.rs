//! 파이프라인 실행 통계.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// 한 번의 파이프라인 실행 통계
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunStats {
    /// 실행 ID
    pub run_id: Uuid,
    /// 설정된 종목 수
    pub total: usize,
    /// 행 생성에 성공한 종목 수
    pub success: usize,
    /// 건너뛴 종목 수 (조회 실패, 캔들 없음 등)
    pub skipped: usize,
    /// 리포트 행 수
    pub rows: usize,
    /// 리포트를 전송 채널에 넘겼는지 여부
    pub dispatched: bool,
    /// 소요 시간
    #[serde(skip)]
    pub elapsed: Duration,
}

impl RunStats {
    /// 새 통계 객체 생성
    pub fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            ..Default::default()
        }
    }

    /// 성공률 계산 (%)
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.success as f64 / self.total as f64) * 100.0
        }
    }

    /// 통계 요약 로그 출력
    pub fn log_summary(&self, operation: &str) {
        tracing::info!(
            operation = operation,
            run_id = %self.run_id,
            total = self.total,
            success = self.success,
            skipped = self.skipped,
            rows = self.rows,
            dispatched = self.dispatched,
            success_rate = format!("{:.1}%", self.success_rate()),
            elapsed = format!("{:.1}s", self.elapsed.as_secs_f64()),
            "실행 완료"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_rate() {
        let mut stats = RunStats::new(Uuid::new_v4());
        assert_eq!(stats.success_rate(), 0.0);

        stats.total = 4;
        stats.success = 3;
        assert_eq!(stats.success_rate(), 75.0);
    }
}
