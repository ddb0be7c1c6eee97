//! 리포트 시스템의 에러 타입.
//!
//! 데이터 부족은 에러가 아닙니다. `ready = false` 또는 빈 결과로 표현되며
//! 이 모듈의 에러는 외부 협력자 실패와 설정 오류만 다룹니다.

use thiserror::Error;

/// 핵심 에러.
#[derive(Debug, Error)]
pub enum PulseError {
    /// 설정 에러
    #[error("설정 에러: {0}")]
    Config(String),

    /// 시장 데이터 조회 에러
    #[error("시장 데이터 에러: {0}")]
    MarketData(String),

    /// 종목을 찾을 수 없음
    #[error("종목을 찾을 수 없음: {0}")]
    NotFound(String),

    /// 지표 계산 에러
    #[error("지표 에러: {0}")]
    Indicator(String),

    /// 네트워크 에러
    #[error("네트워크 에러: {0}")]
    Network(String),

    /// 요청 한도 초과
    #[error("요청 한도 초과: {0}")]
    RateLimit(String),

    /// 잘못된 입력
    #[error("잘못된 입력: {0}")]
    InvalidInput(String),

    /// 직렬화 에러
    #[error("직렬화 에러: {0}")]
    Serialization(String),

    /// 내부 에러
    #[error("내부 에러: {0}")]
    Internal(String),
}

/// 핵심 작업을 위한 Result 타입.
pub type PulseResult<T> = Result<T, PulseError>;

impl PulseError {
    /// 재시도 가능한 에러인지 확인합니다.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PulseError::Network(_) | PulseError::RateLimit(_))
    }

    /// 종목 단위로 건너뛰면 되는 에러인지 확인합니다.
    ///
    /// 설정 에러만 프로세스 시작을 막습니다.
    pub fn is_per_instrument(&self) -> bool {
        !matches!(self, PulseError::Config(_))
    }
}

impl From<serde_json::Error> for PulseError {
    fn from(err: serde_json::Error) -> Self {
        PulseError::Serialization(err.to_string())
    }
}

impl From<config::ConfigError> for PulseError {
    fn from(err: config::ConfigError) -> Self {
        PulseError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_retryable() {
        let network_err = PulseError::Network("timeout".to_string());
        assert!(network_err.is_retryable());

        let not_found = PulseError::NotFound("SBER".to_string());
        assert!(!not_found.is_retryable());
    }

    #[test]
    fn test_error_per_instrument() {
        assert!(PulseError::MarketData("503".to_string()).is_per_instrument());
        assert!(PulseError::NotFound("X".to_string()).is_per_instrument());
        assert!(!PulseError::Config("missing".to_string()).is_per_instrument());
    }

    #[test]
    fn test_error_display() {
        let err = PulseError::NotFound("RU000A0JX0J2".to_string());
        assert_eq!(err.to_string(), "종목을 찾을 수 없음: RU000A0JX0J2");
    }
}
