//! 텔레그램 봇 명령어 핸들러.
//!
//! Long polling으로 명령어를 수신하고 처리합니다.
//! - `/candles <instrument> <timeframe> <last_days>` - 캔들 CSV 파일
//! - `/report` - 리포트 즉시 실행
//! - `/help`, `/start` - 도움말

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::{watch, RwLock};
use tracing::{debug, error, info, warn};

use crate::telegram::{check_response, escape_html, TelegramConfig, TelegramSender};
use crate::types::{NotificationError, NotificationResult, ReportSink};

/// getUpdates 서버 측 대기 시간 (초)
const POLL_TIMEOUT_SECS: u64 = 30;

/// `/candles` 사용법
pub const CANDLES_USAGE: &str =
    "Usage: /candles &lt;instrument&gt; &lt;timeframe&gt; &lt;last_days&gt;\nExample: /candles SBER 1d 30";

/// 텔레그램 봇 업데이트 응답.
#[derive(Debug, Deserialize)]
struct TelegramUpdates {
    ok: bool,
    result: Vec<TelegramUpdate>,
}

/// 개별 업데이트.
#[derive(Debug, Deserialize)]
struct TelegramUpdate {
    update_id: i64,
    message: Option<TelegramMessage>,
}

/// 메시지 정보.
#[derive(Debug, Deserialize)]
struct TelegramMessage {
    chat: TelegramChat,
    text: Option<String>,
}

/// 채팅 정보.
#[derive(Debug, Deserialize)]
struct TelegramChat {
    id: i64,
}

/// 봇 명령어 타입.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotCommand {
    /// 캔들 CSV 내보내기
    Candles {
        instrument: String,
        timeframe: String,
        last_days: u32,
    },
    /// 인자가 잘못된 명령 (사유 포함)
    InvalidArgs(String),
    /// 리포트 즉시 실행
    Report,
    /// 도움말
    Help,
    /// 알 수 없는 명령어
    Unknown(String),
}

impl BotCommand {
    /// 텍스트에서 명령어 파싱.
    pub fn parse(text: &str) -> Self {
        let text = text.trim();

        // /명령어 형식 확인
        let Some(body) = text.strip_prefix('/') else {
            return BotCommand::Unknown(text.to_string());
        };

        let parts: Vec<&str> = body.split_whitespace().collect();
        // 그룹 채팅의 `/candles@bot_name` 형식 처리
        let command = parts
            .first()
            .map(|s| s.split('@').next().unwrap_or_default().to_lowercase());

        match command.as_deref() {
            Some("candles") => Self::parse_candles(&parts[1..]),
            Some("report") | Some("r") => BotCommand::Report,
            Some("help") | Some("h") | Some("start") => BotCommand::Help,
            _ => BotCommand::Unknown(text.to_string()),
        }
    }

    fn parse_candles(args: &[&str]) -> Self {
        let [instrument, timeframe, last_days, ..] = args else {
            return BotCommand::InvalidArgs(
                "need instrument, timeframe and last_days (e.g. SBER 1d 30)".to_string(),
            );
        };
        match last_days.parse::<u32>() {
            Ok(days) if days > 0 => BotCommand::Candles {
                instrument: instrument.to_string(),
                timeframe: timeframe.to_string(),
                last_days: days,
            },
            _ => BotCommand::InvalidArgs("last_days must be a positive number".to_string()),
        }
    }
}

/// 명령어 응답 데이터.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResponse {
    /// 응답 텍스트 (HTML 형식)
    pub text: String,
    /// 파싱 모드
    pub parse_mode: String,
    /// 첨부 파일 (파일 이름, 내용)
    pub document: Option<(String, Vec<u8>)>,
}

impl CommandResponse {
    /// HTML 형식 응답 생성.
    pub fn html(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            parse_mode: "HTML".to_string(),
            document: None,
        }
    }

    /// 파일 응답 생성.
    pub fn document(filename: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            text: String::new(),
            parse_mode: "HTML".to_string(),
            document: Some((filename.into(), data)),
        }
    }
}

/// 봇 명령어 핸들러 trait.
///
/// 각 명령어의 실제 로직을 구현합니다.
#[async_trait]
pub trait BotCommandHandler: Send + Sync {
    /// 최근 `last_days`일 캔들을 CSV로 내보냅니다.
    async fn handle_candles(
        &self,
        instrument: &str,
        timeframe: &str,
        last_days: u32,
    ) -> NotificationResult<CommandResponse>;

    /// 리포트를 즉시 실행합니다.
    async fn handle_report(&self) -> NotificationResult<CommandResponse>;
}

/// 텔레그램 봇 핸들러.
///
/// Long polling으로 업데이트를 수신하고 명령어를 처리합니다.
pub struct TelegramBotHandler<H: BotCommandHandler> {
    config: TelegramConfig,
    client: reqwest::Client,
    sender: TelegramSender,
    handler: Arc<H>,
    last_update_id: RwLock<i64>,
    /// 허용된 채팅 ID 목록 (보안을 위해)
    allowed_chat_ids: Vec<i64>,
}

impl<H: BotCommandHandler> TelegramBotHandler<H> {
    /// 새 봇 핸들러 생성.
    pub fn new(config: TelegramConfig, handler: Arc<H>) -> Self {
        // 설정된 chat_id를 허용 목록에 추가
        let allowed_chat_ids = config.chat_id_i64().into_iter().collect();

        Self {
            sender: TelegramSender::new(config.clone()),
            config,
            client: reqwest::Client::new(),
            handler,
            last_update_id: RwLock::new(0),
            allowed_chat_ids,
        }
    }

    /// 추가 허용 채팅 ID 설정.
    pub fn with_allowed_chat_ids(mut self, chat_ids: Vec<i64>) -> Self {
        self.allowed_chat_ids.extend(chat_ids);
        self
    }

    /// 봇 폴링 시작.
    ///
    /// 종료 신호(`true`)를 받거나 송신 측이 사라질 때까지 업데이트를 수신합니다.
    /// 종료 신호는 long poll 대기만 취소합니다. 이미 받은 업데이트는 끝까지 처리한 뒤 종료합니다.
    pub async fn start_polling(&self, mut shutdown: watch::Receiver<bool>) {
        info!("텔레그램 봇 폴링 시작");

        while !*shutdown.borrow() {
            let fetched = tokio::select! {
                result = self.poll_updates() => result,
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
            };

            match fetched {
                Ok(updates) => {
                    self.handle_updates(updates).await;
                }
                Err(e) => {
                    error!(error = %e, "업데이트 폴링 실패");
                    // 에러 발생 시 잠시 대기
                    tokio::select! {
                        _ = tokio::time::sleep(Duration::from_secs(5)) => {}
                        changed = shutdown.changed() => {
                            if changed.is_err() {
                                break;
                            }
                        }
                    }
                }
            }
        }

        info!("텔레그램 봇 폴링 종료");
    }

    /// 업데이트를 한 번 가져와 처리합니다. 처리한 업데이트 수를 반환합니다.
    pub async fn poll_once(&self) -> NotificationResult<usize> {
        let updates = self.poll_updates().await?;
        Ok(self.handle_updates(updates).await)
    }

    /// 마지막으로 처리한 업데이트 ID.
    pub async fn last_update_id(&self) -> i64 {
        *self.last_update_id.read().await
    }

    /// 받은 업데이트를 순서대로 처리합니다.
    ///
    /// 오프셋은 업데이트 하나를 처리한 뒤에 올립니다.
    async fn handle_updates(&self, updates: Vec<TelegramUpdate>) -> usize {
        let count = updates.len();
        for update in updates {
            let update_id = update.update_id;
            if let Err(e) = self.process_update(update).await {
                error!(update_id, error = %e, "업데이트 처리 실패");
            }
            let mut last = self.last_update_id.write().await;
            *last = (*last).max(update_id);
        }
        count
    }

    /// 업데이트 폴링. 오프셋은 바꾸지 않습니다.
    async fn poll_updates(&self) -> NotificationResult<Vec<TelegramUpdate>> {
        let last_id = *self.last_update_id.read().await;

        let params = serde_json::json!({
            "offset": last_id + 1,
            "timeout": POLL_TIMEOUT_SECS,
            "allowed_updates": ["message"],
        });

        let response = self
            .client
            .post(self.config.method_url("getUpdates"))
            .json(&params)
            .timeout(Duration::from_secs(POLL_TIMEOUT_SECS + 5))
            .send()
            .await?;

        let updates: TelegramUpdates = response.json().await?;

        if !updates.ok {
            return Err(NotificationError::SendFailed(
                "텔레그램 API 응답 실패".to_string(),
            ));
        }

        Ok(updates.result)
    }

    /// 개별 업데이트 처리.
    async fn process_update(&self, update: TelegramUpdate) -> NotificationResult<()> {
        let Some(message) = update.message else {
            return Ok(());
        };

        let chat_id = message.chat.id;

        // 허용된 채팅 ID 확인
        if !self.allowed_chat_ids.contains(&chat_id) {
            warn!(chat_id = chat_id, "허용되지 않은 채팅 ID에서 메시지 수신");
            return Ok(());
        }

        let Some(text) = message.text else {
            return Ok(());
        };

        debug!(chat_id = chat_id, text = %text, "명령어 수신");

        // 명령어 파싱 및 처리
        let command = BotCommand::parse(&text);
        let response = match self.execute_command(command).await {
            Ok(response) => response,
            Err(e) => {
                warn!(chat_id = chat_id, error = %e, "명령어 처리 실패");
                CommandResponse::html(format!("Error: {}", escape_html(&e.to_string())))
            }
        };

        self.send_response(chat_id, &response).await
    }

    /// 명령어 실행.
    async fn execute_command(&self, command: BotCommand) -> NotificationResult<CommandResponse> {
        match command {
            BotCommand::Candles {
                instrument,
                timeframe,
                last_days,
            } => {
                self.handler
                    .handle_candles(&instrument, &timeframe, last_days)
                    .await
            }
            BotCommand::InvalidArgs(reason) => Ok(CommandResponse::html(format!(
                "{}\nError: {}",
                CANDLES_USAGE,
                escape_html(&reason)
            ))),
            BotCommand::Report => self.handler.handle_report().await,
            BotCommand::Help => Ok(Self::help_message()),
            BotCommand::Unknown(text) => Ok(CommandResponse::html(format!(
                "❓ <b>알 수 없는 명령어</b>\n\n\
                 입력: <code>{}</code>\n\n\
                 /help 명령어로 사용 가능한 명령어를 확인하세요.",
                escape_html(&text)
            ))),
        }
    }

    /// 도움말 메시지 생성.
    fn help_message() -> CommandResponse {
        CommandResponse::html(
            "🤖 <b>Market Pulse 봇</b>\n\n\
             <b>사용 가능한 명령어:</b>\n\n\
             /candles &lt;instrument&gt; &lt;timeframe&gt; &lt;last_days&gt; - 📄 캔들 CSV\n\
             /report (r) - 📈 리포트 즉시 실행\n\
             /help (h) - ❓ 도움말\n\n\
             <i>예시: /candles SBER 1d 30</i>",
        )
    }

    /// 응답 메시지 전송.
    async fn send_response(
        &self,
        chat_id: i64,
        response: &CommandResponse,
    ) -> NotificationResult<()> {
        if let Some((filename, data)) = &response.document {
            if let Err(e) = self.sender.send_document(chat_id, filename, data).await {
                error!(chat_id = chat_id, error = %e, "파일 전송 실패");
                let text = format!("Failed to send file: {}", escape_html(&e.to_string()));
                return self.send_text(chat_id, &text, &response.parse_mode).await;
            }
        }
        if !response.text.is_empty() {
            self.send_text(chat_id, &response.text, &response.parse_mode)
                .await?;
        }
        debug!(chat_id = chat_id, "응답 전송 완료");
        Ok(())
    }

    async fn send_text(&self, chat_id: i64, text: &str, parse_mode: &str) -> NotificationResult<()> {
        let params = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": parse_mode,
            "disable_web_page_preview": true,
        });

        let response = self
            .client
            .post(self.config.method_url("sendMessage"))
            .json(&params)
            .send()
            .await?;
        check_response(response, "sendMessage").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_candles_command() {
        assert_eq!(
            BotCommand::parse("/candles SBER 1d 30"),
            BotCommand::Candles {
                instrument: "SBER".to_string(),
                timeframe: "1d".to_string(),
                last_days: 30,
            }
        );
        assert_eq!(
            BotCommand::parse("  /candles@pulse_bot AAPL 1h 7  "),
            BotCommand::Candles {
                instrument: "AAPL".to_string(),
                timeframe: "1h".to_string(),
                last_days: 7,
            }
        );
    }

    #[test]
    fn test_parse_candles_invalid_args() {
        assert!(matches!(
            BotCommand::parse("/candles SBER 1d"),
            BotCommand::InvalidArgs(_)
        ));
        assert!(matches!(
            BotCommand::parse("/candles SBER 1d 0"),
            BotCommand::InvalidArgs(_)
        ));
        assert!(matches!(
            BotCommand::parse("/candles SBER 1d -5"),
            BotCommand::InvalidArgs(_)
        ));
    }

    #[test]
    fn test_parse_report_and_help() {
        assert_eq!(BotCommand::parse("/report"), BotCommand::Report);
        assert_eq!(BotCommand::parse("/r"), BotCommand::Report);
        assert_eq!(BotCommand::parse("/help"), BotCommand::Help);
        assert_eq!(BotCommand::parse("/start"), BotCommand::Help);
    }

    #[test]
    fn test_parse_unknown_command() {
        assert!(matches!(BotCommand::parse("/unknown"), BotCommand::Unknown(_)));
        assert!(matches!(BotCommand::parse("not a command"), BotCommand::Unknown(_)));
        assert!(matches!(BotCommand::parse("/"), BotCommand::Unknown(_)));
    }

    #[test]
    fn test_document_response() {
        let response = CommandResponse::document("candles_SBER_1d.csv", b"time\n".to_vec());
        assert!(response.text.is_empty());
        assert_eq!(response.document.unwrap().0, "candles_SBER_1d.csv");
    }
}
