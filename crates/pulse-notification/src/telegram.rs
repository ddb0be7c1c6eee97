//! 텔레그램 리포트 전송.
//!
//! Telegram Bot API로 리포트 텍스트, 차트 이미지, CSV 파일을 전송합니다.
//! - 긴 메시지는 줄 단위로 나눠 여러 번 전송
//! - 앨범은 요청당 최대 10장씩 나눠 전송하고, 실패하면 한 장씩 다시 전송

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use crate::types::{NotificationError, NotificationResult, PhotoItem, ReportSink};

/// 기본 Bot API 주소
pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// `sendMediaGroup` 한 번에 보낼 수 있는 최대 사진 수
pub const MAX_MEDIA_GROUP_SIZE: usize = 10;

/// 메시지 한 건의 최대 길이 (문자 수)
pub const MAX_MESSAGE_LEN: usize = 4096;

/// 텔레그램 전송 설정.
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    /// @BotFather에서 받은 봇 토큰
    pub bot_token: String,
    /// 메시지를 보낼 채팅 ID
    pub chat_id: String,
    /// 전송 활성화 여부
    pub enabled: bool,
    /// 파싱 모드 (HTML 또는 MarkdownV2)
    pub parse_mode: String,
    /// Bot API 주소
    pub api_base: String,
}

impl TelegramConfig {
    /// 새 텔레그램 설정을 생성합니다.
    pub fn new(bot_token: String, chat_id: String) -> Self {
        Self {
            bot_token,
            chat_id,
            enabled: true,
            parse_mode: "HTML".to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }

    /// 환경 변수에서 설정을 생성합니다.
    pub fn from_env() -> Option<Self> {
        let bot_token = std::env::var("TELEGRAM_BOT_TOKEN").ok()?;
        let chat_id = std::env::var("TELEGRAM_CHAT_ID").ok()?;
        let enabled = std::env::var("TELEGRAM_ENABLED")
            .map(|v| v.to_lowercase() == "true")
            .unwrap_or(true);

        Some(Self {
            enabled,
            ..Self::new(bot_token, chat_id)
        })
    }

    /// Bot API 주소를 바꿉니다 (테스트 서버 등).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// 설정된 채팅 ID를 숫자로 반환합니다.
    pub fn chat_id_i64(&self) -> Option<i64> {
        self.chat_id.trim().parse().ok()
    }

    /// Bot API 메서드 URL.
    pub(crate) fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.bot_token, method)
    }
}

/// HTML 파싱 모드용 이스케이프.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// 긴 텍스트를 `max_len` 문자 이하의 조각으로 나눕니다.
///
/// 가능하면 줄 경계에서 자르고, 한 줄이 너무 길면 문자 단위로 자릅니다.
pub fn split_message(text: &str, max_len: usize) -> Vec<String> {
    if text.chars().count() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in text.split_inclusive('\n') {
        let line_len = line.chars().count();
        if current_len + line_len > max_len && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if line_len > max_len {
            let chars: Vec<char> = line.chars().collect();
            for piece in chars.chunks(max_len) {
                chunks.push(piece.iter().collect());
            }
            continue;
        }
        current.push_str(line);
        current_len += line_len;
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Bot API 에러 응답의 일부.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    parameters: Option<ApiErrorParameters>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorParameters {
    retry_after: Option<u64>,
}

/// HTTP 응답을 결과로 변환합니다. 429는 `retry_after`를 읽어 `RateLimited`로 변환합니다.
pub(crate) async fn check_response(
    response: reqwest::Response,
    method: &str,
) -> NotificationResult<()> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let body = response.text().await.unwrap_or_default();

    // 요청 한도 제한 확인
    if status.as_u16() == 429 {
        let retry_after = serde_json::from_str::<ApiErrorBody>(&body)
            .ok()
            .and_then(|b| b.parameters)
            .and_then(|p| p.retry_after)
            .unwrap_or(60);
        warn!(method, retry_after, "Telegram rate limited");
        return Err(NotificationError::RateLimited(retry_after));
    }

    error!(method, status = %status, body = %body, "Telegram API 호출 실패");
    Err(NotificationError::SendFailed(format!("HTTP {}: {}", status, body)))
}

/// 텔레그램 리포트 전송기.
pub struct TelegramSender {
    config: TelegramConfig,
    client: reqwest::Client,
}

impl TelegramSender {
    /// 새 텔레그램 전송기를 생성합니다.
    pub fn new(config: TelegramConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    /// 환경 변수에서 전송기를 생성합니다.
    pub fn from_env() -> Option<Self> {
        TelegramConfig::from_env().map(Self::new)
    }

    pub fn config(&self) -> &TelegramConfig {
        &self.config
    }

    fn image_part(filename: &str, data: &[u8]) -> NotificationResult<Part> {
        Ok(Part::bytes(data.to_vec())
            .file_name(filename.to_string())
            .mime_str("image/png")?)
    }

    async fn post_text(&self, chat_id: &str, text: &str) -> NotificationResult<()> {
        for chunk in split_message(text, MAX_MESSAGE_LEN) {
            let params = serde_json::json!({
                "chat_id": chat_id,
                "text": chunk,
                "parse_mode": self.config.parse_mode,
                "disable_web_page_preview": true,
            });

            debug!(chat_id = %chat_id, len = chunk.len(), "Sending Telegram message");

            let response = self
                .client
                .post(self.config.method_url("sendMessage"))
                .json(&params)
                .send()
                .await?;
            check_response(response, "sendMessage").await?;
        }
        Ok(())
    }

    /// 앨범 한 묶음(최대 10장)을 전송합니다.
    async fn send_media_group_chunk(&self, chunk: &[PhotoItem]) -> NotificationResult<()> {
        let media: Vec<serde_json::Value> = chunk
            .iter()
            .map(|item| {
                serde_json::json!({
                    "type": "photo",
                    "media": format!("attach://{}", item.filename),
                    "caption": item.caption,
                })
            })
            .collect();

        let mut form = Form::new()
            .text("chat_id", self.config.chat_id.clone())
            .text("media", serde_json::to_string(&media)?);
        for item in chunk {
            form = form.part(item.filename.clone(), Self::image_part(&item.filename, &item.data)?);
        }

        let response = self
            .client
            .post(self.config.method_url("sendMediaGroup"))
            .multipart(form)
            .send()
            .await?;
        check_response(response, "sendMediaGroup").await
    }
}

#[async_trait]
impl ReportSink for TelegramSender {
    async fn send_message(&self, text: &str) -> NotificationResult<()> {
        if !self.is_enabled() {
            debug!("Telegram notifications are disabled, skipping");
            return Ok(());
        }
        self.post_text(&self.config.chat_id, text).await?;
        info!("Telegram report sent successfully");
        Ok(())
    }

    async fn send_message_to_chat(&self, chat_id: i64, text: &str) -> NotificationResult<()> {
        if self.config.bot_token.is_empty() {
            return Err(NotificationError::InvalidConfig("bot token is empty".to_string()));
        }
        self.post_text(&chat_id.to_string(), text).await
    }

    async fn send_photo(&self, caption: &str, filename: &str, data: &[u8]) -> NotificationResult<()> {
        if !self.is_enabled() {
            debug!("Telegram notifications are disabled, skipping photo");
            return Ok(());
        }

        let form = Form::new()
            .text("chat_id", self.config.chat_id.clone())
            .text("caption", caption.to_string())
            .part("photo", Self::image_part(filename, data)?);

        let response = self
            .client
            .post(self.config.method_url("sendPhoto"))
            .multipart(form)
            .send()
            .await?;
        check_response(response, "sendPhoto").await
    }

    async fn send_photo_album(&self, items: &[PhotoItem]) -> NotificationResult<()> {
        if !self.is_enabled() {
            debug!("Telegram notifications are disabled, skipping album");
            return Ok(());
        }

        for chunk in items.chunks(MAX_MEDIA_GROUP_SIZE) {
            // 한 장짜리 묶음은 앨범으로 보낼 수 없음
            if let [single] = chunk {
                self.send_photo(&single.caption, &single.filename, &single.data)
                    .await?;
                continue;
            }

            if let Err(e) = self.send_media_group_chunk(chunk).await {
                warn!(error = %e, size = chunk.len(), "앨범 전송 실패, 한 장씩 다시 전송");
                for item in chunk {
                    self.send_photo(&item.caption, &item.filename, &item.data)
                        .await?;
                }
            }
        }
        Ok(())
    }

    async fn send_document(&self, chat_id: i64, filename: &str, data: &[u8]) -> NotificationResult<()> {
        if self.config.bot_token.is_empty() {
            return Err(NotificationError::InvalidConfig("bot token is empty".to_string()));
        }

        let part = Part::bytes(data.to_vec())
            .file_name(filename.to_string())
            .mime_str("text/csv")?;
        let form = Form::new()
            .text("chat_id", chat_id.to_string())
            .part("document", part);

        let response = self
            .client
            .post(self.config.method_url("sendDocument"))
            .multipart(form)
            .send()
            .await?;
        check_response(response, "sendDocument").await
    }

    fn is_enabled(&self) -> bool {
        self.config.enabled && !self.config.bot_token.is_empty() && !self.config.chat_id.is_empty()
    }

    fn name(&self) -> &str {
        "telegram"
    }
}
