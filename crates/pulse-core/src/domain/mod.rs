//! 리포트 파이프라인의 도메인 모델.

mod market_data;
mod providers;
mod signals;

pub use market_data::*;
pub use providers::*;
pub use signals::*;
