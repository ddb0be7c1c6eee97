//! 지표 시리즈 기반 결정적 피처 계산.
//!
//! 지표 값 자체는 [`pulse_core::IndicatorSource`]가 계산하고,
//! 이 모듈은 그 값이 의미하는 바(준비 여부, 이벤트)만 정의합니다.

pub mod ema;

pub use ema::{build_feature, compute_ema_features, EmaFeature, EmaFeatureSet};
