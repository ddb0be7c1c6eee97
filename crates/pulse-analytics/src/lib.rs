//! 결정적 분석 엔진.
//!
//! 이 크레이트는 이미 조회된 캔들 슬라이스에 대한 순수 계산만 제공합니다:
//! - 통계 지표 (변동률, 변동성, 최대 낙폭)
//! - 스윙 고점/저점 탐지와 추세 분류
//! - 스윙/추세/ZigZag를 묶은 시장 구조 요약
//! - ZigZag 피벗 (임계값 방식, depth/deviation/backstep 방식)
//! - EMA 피처와 교차 이벤트
//! - `ta` 기반 기본 지표 제공자
//!
//! 모든 함수는 같은 입력에 대해 항상 같은 결과를 반환하며 공유 상태가 없습니다.

pub mod features;
pub mod indicators;
pub mod metrics;
pub mod structure;
pub mod swing;
pub mod trend;
pub mod zigzag;

pub use features::{build_feature, compute_ema_features, EmaFeature, EmaFeatureSet};
pub use indicators::TaIndicatorSource;
pub use metrics::SeriesSummary;
pub use structure::MarketStructure;
pub use swing::find_swings;
pub use trend::{classify, TrendClassifier};
pub use zigzag::{enforce_alternation, zigzag, zigzag_by_threshold};
