//! 리포트 전송 타입 및 trait 정의.

use async_trait::async_trait;

/// 알림 작업용 Result 타입.
pub type NotificationResult<T> = Result<T, NotificationError>;

/// 알림 에러.
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("알림 전송 실패: {0}")]
    SendFailed(String),

    #[error("잘못된 설정: {0}")]
    InvalidConfig(String),

    #[error("요청 한도 초과: {0}초 후 재시도")]
    RateLimited(u64),

    #[error("네트워크 에러: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("직렬화 에러: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// 앨범 전송용 이미지 한 장.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoItem {
    /// 사진 캡션
    pub caption: String,
    /// 앨범 내에서 고유한 파일 이름 (예: `chart_0.png`)
    pub filename: String,
    /// 이미지 바이트 (PNG)
    pub data: Vec<u8>,
}

impl PhotoItem {
    pub fn new(caption: impl Into<String>, filename: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            caption: caption.into(),
            filename: filename.into(),
            data,
        }
    }
}

/// 리포트 전송 채널 trait.
///
/// 설정이 비어 있는 구현체는 에러 없이 전송을 건너뛸 수 있습니다 (`is_enabled`).
#[async_trait]
pub trait ReportSink: Send + Sync {
    /// 기본 채팅으로 텍스트를 전송합니다.
    async fn send_message(&self, text: &str) -> NotificationResult<()>;

    /// 지정한 채팅으로 텍스트를 전송합니다 (명령 응답 등).
    async fn send_message_to_chat(&self, chat_id: i64, text: &str) -> NotificationResult<()>;

    /// 기본 채팅으로 사진 한 장을 전송합니다.
    async fn send_photo(&self, caption: &str, filename: &str, data: &[u8]) -> NotificationResult<()>;

    /// 여러 사진을 앨범으로 전송합니다. 구현체가 크기 제한에 맞춰 나눌 수 있습니다.
    async fn send_photo_album(&self, items: &[PhotoItem]) -> NotificationResult<()>;

    /// 지정한 채팅으로 파일을 전송합니다 (CSV 등).
    async fn send_document(&self, chat_id: i64, filename: &str, data: &[u8]) -> NotificationResult<()>;

    /// 전송기가 활성화되어 있는지 확인합니다.
    fn is_enabled(&self) -> bool;

    /// 전송기 이름을 반환합니다.
    fn name(&self) -> &str;
}
