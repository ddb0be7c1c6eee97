//! # Pulse Notification
//!
//! 리포트 전송 서비스.
//!
//! 지원 채널:
//! - Telegram (메시지, 사진, 앨범, 파일)
//!
//! # 텔레그램 봇 명령어
//!
//! 봇 명령어 핸들러를 통해 다음 명령어를 지원합니다:
//! - `/candles <instrument> <timeframe> <last_days>` - 캔들 CSV
//! - `/report` - 리포트 즉시 실행
//! - `/help` - 도움말

pub mod bot_handler;
pub mod telegram;
pub mod types;

pub use bot_handler::*;
pub use telegram::*;
pub use types::*;
