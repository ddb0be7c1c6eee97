//! 설정 관리.
//!
//! TOML 설정 파일을 읽고 `PULSE__` 접두사 환경 변수로 덮어씁니다.
//! 시작 시 한 번 로드되며 프로세스 수명 동안 변경되지 않습니다.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{PulseError, PulseResult};
use crate::types::Timeframe;

/// 애플리케이션 설정.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// 로깅 설정
    #[serde(default)]
    pub logging: LoggingConfig,
    /// 캔들 조회 설정
    #[serde(default)]
    pub candles: CandlesConfig,
    /// 리포트 대상 종목 (설정 순서가 리포트 행 순서)
    #[serde(default)]
    pub instruments: Vec<InstrumentConfig>,
    /// 스케줄러 설정
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    /// EMA 피처 설정
    #[serde(default)]
    pub features: FeaturesConfig,
    /// 스윙/ZigZag 설정
    #[serde(default)]
    pub structure: StructureConfig,
    /// 텔레그램 전송 설정
    #[serde(default)]
    pub telegram: TelegramSettings,
    /// 시장 데이터 제공자 설정
    #[serde(default)]
    pub market_data: MarketDataConfig,
}

/// 로깅 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 로그 레벨
    pub level: String,
    /// 로그 형식 (pretty, json, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// 캔들 조회 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CandlesConfig {
    /// 조회 구간 (일)
    pub lookback_days: u32,
    /// 캔들 간격 (예: "1d")
    pub timeframe: String,
}

impl Default for CandlesConfig {
    fn default() -> Self {
        Self {
            lookback_days: 365,
            timeframe: "1d".to_string(),
        }
    }
}

impl CandlesConfig {
    /// 조회 구간을 chrono 기간으로 반환합니다.
    pub fn lookback(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.lookback_days))
    }

    /// 타임프레임을 파싱합니다.
    pub fn timeframe(&self) -> PulseResult<Timeframe> {
        self.timeframe.parse().map_err(PulseError::Config)
    }
}

/// 종목 설정.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct InstrumentConfig {
    /// 종목 질의 (ISIN, 티커 등)
    pub query: String,
}

impl InstrumentConfig {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
        }
    }
}

/// 스케줄러 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// 실행 주기 (초). 0이면 1시간.
    pub interval_secs: u64,
    /// 시작 직후 한 번 실행할지 여부
    pub run_on_start: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_secs: 3600,
            run_on_start: true,
        }
    }
}

impl SchedulerConfig {
    /// 실행 주기를 Duration으로 반환합니다.
    pub fn interval(&self) -> Duration {
        if self.interval_secs == 0 {
            Duration::from_secs(3600)
        } else {
            Duration::from_secs(self.interval_secs)
        }
    }
}

/// EMA 피처 설정.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(default)]
pub struct FeaturesConfig {
    /// 단기 EMA 기간
    pub ema_fast: usize,
    /// 장기 EMA 기간
    pub ema_slow: usize,
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            ema_fast: 20,
            ema_slow: 100,
        }
    }
}

/// 스윙/ZigZag 설정.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct StructureConfig {
    /// 스윙 윈도우 반경 (좌우 캔들 수)
    pub swing_window: usize,
    /// ZigZag 임계값 (비율, 0.05 = 5%)
    pub zigzag_threshold: f64,
}

impl Default for StructureConfig {
    fn default() -> Self {
        Self {
            swing_window: 2,
            zigzag_threshold: 0.05,
        }
    }
}

/// 텔레그램 전송 토글.
///
/// 봇 토큰과 채팅 ID는 환경 변수에서 읽습니다.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TelegramSettings {
    /// 리포트 전송 여부
    #[serde(default)]
    pub enabled: bool,
    /// 봇 명령어 수신 여부
    #[serde(default)]
    pub handle_commands: bool,
    /// 명령어를 허용할 채팅 ID (없으면 전송 대상 채팅만)
    #[serde(default)]
    pub allowed_chat_id: Option<i64>,
}

/// 시장 데이터 제공자 종류.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketDataKind {
    /// Yahoo Finance chart API
    #[default]
    Yahoo,
    /// 로컬 CSV 디렉토리
    Csv,
}

/// 시장 데이터 제공자 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MarketDataConfig {
    /// 제공자 종류
    pub provider: MarketDataKind,
    /// CSV 제공자가 읽을 디렉토리
    pub csv_dir: String,
}

impl Default for MarketDataConfig {
    fn default() -> Self {
        Self {
            provider: MarketDataKind::Yahoo,
            csv_dir: "./data".to_string(),
        }
    }
}

impl AppConfig {
    /// 파일과 환경 변수에서 설정을 로드합니다.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            .set_default("scheduler.interval_secs", 3600)?
            .set_default("scheduler.run_on_start", true)?
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("PULSE")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// 기본 경로(`config/default.toml`)에서 설정을 로드합니다.
    pub fn load_default() -> Result<Self, config::ConfigError> {
        Self::load("config/default.toml")
    }

    /// 시작 시점 검증.
    ///
    /// 여기서 실패하면 프로세스를 시작하지 않습니다.
    pub fn validate(&self) -> PulseResult<()> {
        if self.instruments.is_empty() {
            return Err(PulseError::Config("instruments가 비어 있습니다".to_string()));
        }
        if let Some(empty) = self.instruments.iter().position(|i| i.query.trim().is_empty()) {
            return Err(PulseError::Config(format!(
                "instruments[{}].query가 비어 있습니다",
                empty
            )));
        }
        if self.candles.lookback_days == 0 {
            return Err(PulseError::Config(
                "candles.lookback_days는 0보다 커야 합니다".to_string(),
            ));
        }
        self.candles.timeframe()?;
        if self.features.ema_fast == 0 || self.features.ema_fast >= self.features.ema_slow {
            return Err(PulseError::Config(format!(
                "features.ema_fast({})는 0보다 크고 ema_slow({})보다 작아야 합니다",
                self.features.ema_fast, self.features.ema_slow
            )));
        }
        if self.structure.swing_window == 0 {
            return Err(PulseError::Config(
                "structure.swing_window는 0보다 커야 합니다".to_string(),
            ));
        }
        if !(self.structure.zigzag_threshold > 0.0 && self.structure.zigzag_threshold < 1.0) {
            return Err(PulseError::Config(format!(
                "structure.zigzag_threshold({})는 0과 1 사이여야 합니다",
                self.structure.zigzag_threshold
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> AppConfig {
        AppConfig {
            instruments: vec![InstrumentConfig::new("SBER")],
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.features.ema_fast, 20);
        assert_eq!(config.features.ema_slow, 100);
        assert_eq!(config.candles.timeframe().unwrap(), Timeframe::D1);
        assert!(config.scheduler.run_on_start);
        assert!(!config.telegram.enabled);
    }

    #[test]
    fn test_interval_zero_falls_back_to_hour() {
        let scheduler = SchedulerConfig {
            interval_secs: 0,
            run_on_start: false,
        };
        assert_eq!(scheduler.interval(), Duration::from_secs(3600));
    }

    #[test]
    fn test_validate() {
        assert!(valid().validate().is_ok());

        assert!(AppConfig::default().validate().is_err());

        let mut bad_tf = valid();
        bad_tf.candles.timeframe = "7d".to_string();
        assert!(matches!(bad_tf.validate(), Err(PulseError::Config(_))));

        let mut bad_ema = valid();
        bad_ema.features.ema_fast = 100;
        assert!(bad_ema.validate().is_err());

        let mut bad_lookback = valid();
        bad_lookback.candles.lookback_days = 0;
        assert!(bad_lookback.validate().is_err());

        let mut bad_window = valid();
        bad_window.structure.swing_window = 0;
        assert!(bad_window.validate().is_err());

        let mut bad_threshold = valid();
        bad_threshold.structure.zigzag_threshold = 5.0;
        assert!(bad_threshold.validate().is_err());
    }

    #[test]
    fn test_load_from_toml_file() {
        let dir = std::env::temp_dir().join(format!("pulse-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("test.toml");
        std::fs::write(
            &path,
            r#"
[candles]
lookback_days = 120
timeframe = "4h"

[[instruments]]
query = "RU0009029540"

[[instruments]]
query = "AAPL"

[features]
ema_fast = 10
ema_slow = 50

[telegram]
enabled = true
"#,
        )
        .unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.candles.lookback_days, 120);
        assert_eq!(config.candles.timeframe().unwrap(), Timeframe::H4);
        assert_eq!(config.instruments.len(), 2);
        assert_eq!(config.instruments[1].query, "AAPL");
        assert_eq!(config.features.ema_fast, 10);
        assert!(config.telegram.enabled);
        assert_eq!(config.scheduler.interval_secs, 3600);
        assert_eq!(config.market_data.provider, MarketDataKind::Yahoo);
        assert!(config.validate().is_ok());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_load_partial_tables_uses_defaults() {
        let dir = std::env::temp_dir().join(format!("pulse-config-partial-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("partial.toml");
        std::fs::write(
            &path,
            r#"
[logging]
level = "debug"

[candles]
lookback_days = 90

[scheduler]
run_on_start = false

[features]
ema_slow = 200

[market_data]
provider = "csv"

[[instruments]]
query = "SPY"
"#,
        )
        .unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, "pretty");
        assert_eq!(config.candles.lookback_days, 90);
        assert_eq!(config.candles.timeframe, "1d");
        assert!(!config.scheduler.run_on_start);
        assert_eq!(config.scheduler.interval_secs, 3600);
        assert_eq!(config.features.ema_fast, 20);
        assert_eq!(config.features.ema_slow, 200);
        assert_eq!(config.structure.swing_window, 2);
        assert_eq!(config.market_data.provider, MarketDataKind::Csv);
        assert_eq!(config.market_data.csv_dir, "./data");
        assert!(config.validate().is_ok());

        std::fs::remove_dir_all(&dir).ok();
    }
}
