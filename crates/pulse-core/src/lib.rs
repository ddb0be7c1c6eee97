//! # Pulse Core
//!
//! 시장 리포트 시스템의 핵심 도메인 모델 및 타입을 제공합니다.
//!
//! 이 크레이트는 전체 워크스페이스에서 사용되는 기본 타입을 제공합니다:
//! - 캔들(OHLCV) 및 종목 타입
//! - 스윙/추세/지그재그 결과 타입
//! - 외부 협력자 계약 (시장 데이터, 지표 계산)
//! - 타임프레임 정의
//! - 설정 관리
//! - 로깅 인프라

pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod types;

pub use config::*;
pub use domain::*;
pub use error::*;
pub use logging::*;
pub use types::*;
