//! 텔레그램 전송/봇 통합 테스트
//!
//! mockito 서버를 Bot API 대신 사용합니다.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mockito::{Matcher, Server};
use pulse_notification::{
    BotCommandHandler, CommandResponse, NotificationError, NotificationResult, PhotoItem,
    ReportSink, TelegramBotHandler, TelegramConfig, TelegramSender,
};
use tokio::sync::{watch, Notify};

const TOKEN: &str = "TEST";

fn config(server: &Server) -> TelegramConfig {
    TelegramConfig::new(TOKEN.to_string(), "42".to_string()).with_api_base(server.url())
}

fn photos(n: usize) -> Vec<PhotoItem> {
    (0..n)
        .map(|i| PhotoItem::new(format!("chart {i}"), format!("chart_{i}.png"), vec![0x89, 0x50]))
        .collect()
}

#[tokio::test]
async fn test_send_message() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/botTEST/sendMessage")
        .match_body(Matcher::PartialJson(serde_json::json!({
            "chat_id": "42",
            "text": "<b>report</b>",
            "parse_mode": "HTML",
        })))
        .with_status(200)
        .with_body(r#"{"ok":true,"result":{}}"#)
        .expect(1)
        .create_async()
        .await;

    let sender = TelegramSender::new(config(&server));
    sender.send_message("<b>report</b>").await.unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn test_rate_limit_reads_retry_after() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/botTEST/sendMessage")
        .with_status(429)
        .with_body(r#"{"ok":false,"error_code":429,"parameters":{"retry_after":7}}"#)
        .create_async()
        .await;

    let sender = TelegramSender::new(config(&server));
    let err = sender.send_message("hi").await.unwrap_err();
    assert!(matches!(err, NotificationError::RateLimited(7)));
}

#[tokio::test]
async fn test_disabled_sender_skips_network() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let mut cfg = config(&server);
    cfg.enabled = false;
    let sender = TelegramSender::new(cfg);

    sender.send_message("hi").await.unwrap();
    sender.send_photo_album(&photos(3)).await.unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn test_album_is_chunked_by_ten() {
    let mut server = Server::new_async().await;
    let group = server
        .mock("POST", "/botTEST/sendMediaGroup")
        .with_status(200)
        .with_body(r#"{"ok":true,"result":[]}"#)
        .expect(2)
        .create_async()
        .await;
    let photo = server
        .mock("POST", "/botTEST/sendPhoto")
        .with_status(200)
        .with_body(r#"{"ok":true,"result":{}}"#)
        .expect(1)
        .create_async()
        .await;

    // 21장 → 10 + 10 (앨범) + 1 (단일 사진)
    let sender = TelegramSender::new(config(&server));
    sender.send_photo_album(&photos(21)).await.unwrap();

    group.assert_async().await;
    photo.assert_async().await;
}

#[tokio::test]
async fn test_album_failure_falls_back_to_single_photos() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/botTEST/sendMediaGroup")
        .with_status(400)
        .with_body(r#"{"ok":false,"description":"Bad Request"}"#)
        .create_async()
        .await;
    let photo = server
        .mock("POST", "/botTEST/sendPhoto")
        .with_status(200)
        .with_body(r#"{"ok":true,"result":{}}"#)
        .expect(3)
        .create_async()
        .await;

    let sender = TelegramSender::new(config(&server));
    sender.send_photo_album(&photos(3)).await.unwrap();
    photo.assert_async().await;
}

#[tokio::test]
async fn test_send_document() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/botTEST/sendDocument")
        .match_body(Matcher::Regex("candles_SBER_1d.csv".to_string()))
        .with_status(200)
        .with_body(r#"{"ok":true,"result":{}}"#)
        .create_async()
        .await;

    let sender = TelegramSender::new(config(&server));
    sender
        .send_document(7, "candles_SBER_1d.csv", b"time,open\n")
        .await
        .unwrap();
    mock.assert_async().await;
}

/// 호출 횟수를 세는 명령 핸들러
#[derive(Default)]
struct CountingHandler {
    reports: AtomicUsize,
}

#[async_trait]
impl BotCommandHandler for CountingHandler {
    async fn handle_candles(
        &self,
        instrument: &str,
        timeframe: &str,
        _last_days: u32,
    ) -> NotificationResult<CommandResponse> {
        Ok(CommandResponse::document(
            format!("candles_{instrument}_{timeframe}.csv"),
            b"time,open,high,low,close,volume\n".to_vec(),
        ))
    }

    async fn handle_report(&self) -> NotificationResult<CommandResponse> {
        self.reports.fetch_add(1, Ordering::SeqCst);
        Ok(CommandResponse::html("📈 리포트 실행"))
    }
}

#[tokio::test]
async fn test_bot_processes_only_allowed_chats() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/botTEST/getUpdates")
        .with_status(200)
        .with_body(
            r#"{"ok":true,"result":[
                {"update_id":10,"message":{"message_id":1,"chat":{"id":42},"text":"/report","date":0}},
                {"update_id":11,"message":{"message_id":2,"chat":{"id":999},"text":"/report","date":0}},
                {"update_id":12,"message":{"message_id":3,"chat":{"id":42},"date":0}}
            ]}"#,
        )
        .create_async()
        .await;
    let reply = server
        .mock("POST", "/botTEST/sendMessage")
        .match_body(Matcher::PartialJson(serde_json::json!({"chat_id": 42})))
        .with_status(200)
        .with_body(r#"{"ok":true,"result":{}}"#)
        .expect(1)
        .create_async()
        .await;

    let handler = Arc::new(CountingHandler::default());
    let bot = TelegramBotHandler::new(config(&server), handler.clone());

    assert_eq!(bot.last_update_id().await, 0);
    let processed = bot.poll_once().await.unwrap();
    assert_eq!(processed, 3);
    assert_eq!(handler.reports.load(Ordering::SeqCst), 1);
    assert_eq!(bot.last_update_id().await, 12);
    reply.assert_async().await;
}

#[tokio::test]
async fn test_bot_candles_replies_with_document_and_usage() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/botTEST/getUpdates")
        .with_status(200)
        .with_body(
            r#"{"ok":true,"result":[
                {"update_id":1,"message":{"chat":{"id":42},"text":"/candles SBER 1d 30"}},
                {"update_id":2,"message":{"chat":{"id":42},"text":"/candles SBER"}}
            ]}"#,
        )
        .create_async()
        .await;
    let document = server
        .mock("POST", "/botTEST/sendDocument")
        .with_status(200)
        .with_body(r#"{"ok":true,"result":{}}"#)
        .expect(1)
        .create_async()
        .await;
    let usage = server
        .mock("POST", "/botTEST/sendMessage")
        .match_body(Matcher::Regex("Usage: /candles".to_string()))
        .with_status(200)
        .with_body(r#"{"ok":true,"result":{}}"#)
        .expect(1)
        .create_async()
        .await;

    let bot = TelegramBotHandler::new(config(&server), Arc::new(CountingHandler::default()));
    bot.poll_once().await.unwrap();

    document.assert_async().await;
    usage.assert_async().await;
}

/// `/report` 처리에 시간이 걸리는 핸들러
#[derive(Default)]
struct SlowReportHandler {
    entered: Notify,
    finished: AtomicBool,
}

#[async_trait]
impl BotCommandHandler for SlowReportHandler {
    async fn handle_candles(
        &self,
        _instrument: &str,
        _timeframe: &str,
        _last_days: u32,
    ) -> NotificationResult<CommandResponse> {
        Ok(CommandResponse::html("unused"))
    }

    async fn handle_report(&self) -> NotificationResult<CommandResponse> {
        self.entered.notify_one();
        tokio::time::sleep(Duration::from_millis(300)).await;
        self.finished.store(true, Ordering::SeqCst);
        Ok(CommandResponse::html("리포트 완료"))
    }
}

#[tokio::test]
async fn test_shutdown_lets_in_flight_report_finish() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/botTEST/getUpdates")
        .with_status(200)
        .with_body(
            r#"{"ok":true,"result":[
                {"update_id":7,"message":{"chat":{"id":42},"text":"/report"}}
            ]}"#,
        )
        .create_async()
        .await;
    let reply = server
        .mock("POST", "/botTEST/sendMessage")
        .match_body(Matcher::Regex("리포트 완료".to_string()))
        .with_status(200)
        .with_body(r#"{"ok":true,"result":{}}"#)
        .expect(1)
        .create_async()
        .await;

    let handler = Arc::new(SlowReportHandler::default());
    let bot = Arc::new(TelegramBotHandler::new(config(&server), handler.clone()));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let listener = tokio::spawn({
        let bot = Arc::clone(&bot);
        async move { bot.start_polling(shutdown_rx).await }
    });

    handler.entered.notified().await;
    shutdown_tx.send(true).unwrap();

    tokio::time::timeout(Duration::from_secs(5), listener)
        .await
        .expect("listener should exit after shutdown")
        .unwrap();

    assert!(handler.finished.load(Ordering::SeqCst));
    // 처리가 끝난 업데이트만 확인 처리됨
    assert_eq!(bot.last_update_id().await, 7);
    reply.assert_async().await;
}
