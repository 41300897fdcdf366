//! Exchange orchestration.
//!
//! A [`Terminal`] owns one link and one staged request slot per category.
//! `process` consumes the staged request, runs the exchange, and files the
//! decoded response, which stays readable until the next exchange of that
//! category. Responses are only visible for exchanges that completed; a
//! timeout, cancellation or error clears the slot instead.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use ecrlink_protocol::{
    BatchRequest, BatchResponse, Category, EncodeError, ManageRequest, ManageResponse,
    PaymentRequest, PaymentResponse, ReportRequest, ReportResponse, Request, Response,
};

use crate::config::CommConfig;
use crate::error::LinkError;
use crate::link::{Link, LinkState};
use crate::trace::WireLog;

/// How an exchange ended, for integrators that key on three buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeOutcome {
    /// The terminal answered; its response is filed.
    Ok,
    /// The terminal never answered in time: deadline, cancellation or an
    /// exhausted retry budget.
    Timeout,
    /// The exchange failed outright.
    Error,
}

/// Result of one `process` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeResult {
    pub outcome: ExchangeOutcome,
    pub message: String,
}

impl ExchangeResult {
    fn ok(message: String) -> Self {
        ExchangeResult {
            outcome: ExchangeOutcome::Ok,
            message,
        }
    }

    fn timeout(message: String) -> Self {
        ExchangeResult {
            outcome: ExchangeOutcome::Timeout,
            message,
        }
    }

    fn error(message: String) -> Self {
        ExchangeResult {
            outcome: ExchangeOutcome::Error,
            message,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.outcome == ExchangeOutcome::Ok
    }
}

/// Terminal readiness as answered to a status enquiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalStatus {
    /// Idle and ready for a transaction.
    Ready,
    /// Busy with a transaction or prompt.
    Busy,
    /// A report this table does not know.
    Unknown(String),
}

impl TerminalStatus {
    fn from_report(report: &str) -> Self {
        match report.trim() {
            "0" => TerminalStatus::Ready,
            "1" => TerminalStatus::Busy,
            other => TerminalStatus::Unknown(other.to_string()),
        }
    }
}

/// Cancels the exchange currently in flight. Handles stay valid across
/// exchanges and may be triggered from any task or thread.
#[derive(Debug, Clone)]
pub struct Canceller {
    current: Arc<Mutex<CancellationToken>>,
}

impl Canceller {
    pub fn cancel(&self) {
        self.current.lock().cancel();
    }
}

/// A connected terminal with staged requests and filed responses.
pub struct Terminal {
    link: Link,
    current_cancel: Arc<Mutex<CancellationToken>>,
    payment_request: Option<PaymentRequest>,
    manage_request: Option<ManageRequest>,
    batch_request: Option<BatchRequest>,
    report_request: Option<ReportRequest>,
    payment_response: Option<PaymentResponse>,
    manage_response: Option<ManageResponse>,
    batch_response: Option<BatchResponse>,
    report_response: Option<ReportResponse>,
}

impl Terminal {
    /// Connects the configured channel.
    pub async fn connect(config: &CommConfig) -> Result<Terminal, LinkError> {
        let link = Link::connect(config).await?;
        Ok(Terminal {
            link,
            current_cancel: Arc::new(Mutex::new(CancellationToken::new())),
            payment_request: None,
            manage_request: None,
            batch_request: None,
            report_request: None,
            payment_response: None,
            manage_response: None,
            batch_response: None,
            report_response: None,
        })
    }

    /// Stages a request; the previous staged request of the same category is
    /// replaced.
    pub fn stage(&mut self, request: impl Into<Request>) {
        match request.into() {
            Request::Payment(r) => self.payment_request = Some(r),
            Request::Manage(r) => self.manage_request = Some(r),
            Request::Batch(r) => self.batch_request = Some(r),
            Request::Report(r) => self.report_request = Some(r),
        }
    }

    /// Handle for cancelling whatever exchange is in flight.
    pub fn canceller(&self) -> Canceller {
        Canceller {
            current: Arc::clone(&self.current_cancel),
        }
    }

    pub fn link_state(&self) -> LinkState {
        self.link.state()
    }

    /// Installs a sink that receives every byte written to or read from
    /// the channel.
    pub fn set_wire_log(&mut self, log: Box<dyn WireLog>) {
        self.link.set_wire_log(log);
    }

    /// Runs the staged request of `category` against the terminal.
    ///
    /// The staged request is consumed whether or not the exchange succeeds.
    /// The category's previous response is cleared up front and refiled only
    /// when the terminal answers.
    pub async fn process(&mut self, category: Category) -> ExchangeResult {
        self.clear_response(category);
        let request = match self.take_request(category) {
            Some(r) => r,
            None => {
                let err = EncodeError::RequestNotSet;
                tracing::debug!(%category, code = err.code(), "nothing staged");
                return ExchangeResult::error(err.to_string());
            }
        };
        let body = match request.encode() {
            Ok(b) => b,
            Err(e) => {
                tracing::debug!(%category, code = e.code(), error = %e, "encode failed");
                return ExchangeResult::error(e.to_string());
            }
        };

        let cancel = CancellationToken::new();
        *self.current_cancel.lock() = cancel.clone();

        tracing::debug!(%category, len = body.len(), "processing");
        match self.link.exchange(&body, &cancel).await {
            Ok(raw) => {
                let response = Response::decode(category, &raw);
                let message = format!("{} {}", response.result_code(), response.result_text())
                    .trim()
                    .to_string();
                tracing::debug!(%category, result = %message, "terminal answered");
                self.file_response(response);
                ExchangeResult::ok(message)
            }
            Err(e) if e.is_interruption() => {
                tracing::warn!(%category, error = %e, "exchange interrupted");
                ExchangeResult::timeout(e.to_string())
            }
            Err(e) => {
                tracing::warn!(%category, error = %e, "exchange failed");
                ExchangeResult::error(e.to_string())
            }
        }
    }

    /// Asks the terminal whether it is ready, without disturbing staged
    /// requests or filed responses.
    pub async fn status(&mut self) -> Result<TerminalStatus, LinkError> {
        let cancel = CancellationToken::new();
        *self.current_cancel.lock() = cancel.clone();
        let report = self.link.enquire(&cancel).await?;
        Ok(TerminalStatus::from_report(&report))
    }

    pub fn payment_response(&self) -> Option<&PaymentResponse> {
        self.payment_response.as_ref()
    }

    pub fn manage_response(&self) -> Option<&ManageResponse> {
        self.manage_response.as_ref()
    }

    pub fn batch_response(&self) -> Option<&BatchResponse> {
        self.batch_response.as_ref()
    }

    pub fn report_response(&self) -> Option<&ReportResponse> {
        self.report_response.as_ref()
    }

    /// Closes the link.
    pub async fn close(self) -> Result<(), LinkError> {
        self.link.shutdown().await
    }

    fn take_request(&mut self, category: Category) -> Option<Request> {
        match category {
            Category::Payment => self.payment_request.take().map(Request::Payment),
            Category::Manage => self.manage_request.take().map(Request::Manage),
            Category::Batch => self.batch_request.take().map(Request::Batch),
            Category::Report => self.report_request.take().map(Request::Report),
        }
    }

    fn clear_response(&mut self, category: Category) {
        match category {
            Category::Payment => self.payment_response = None,
            Category::Manage => self.manage_response = None,
            Category::Batch => self.batch_response = None,
            Category::Report => self.report_response = None,
        }
    }

    fn file_response(&mut self, response: Response) {
        match response {
            Response::Payment(r) => self.payment_response = Some(r),
            Response::Manage(r) => self.manage_response = Some(r),
            Response::Batch(r) => self.batch_response = Some(r),
            Response::Report(r) => self.report_response = Some(r),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;
    use ecrlink_protocol::packet::{self, WireEvent, ACK, EOT};
    use ecrlink_protocol::{Integrity, Money, TenderType, MAX_FRAME_PAYLOAD};
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    fn test_config(port: u16) -> CommConfig {
        let mut config = CommConfig::default();
        config.network.port = port;
        config.timeout_ms = 2_000;
        config
    }

    async fn bind() -> (TcpListener, u16) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        (listener, port)
    }

    async fn mock_recv(sock: &mut TcpStream) -> Vec<u8> {
        let mut buf = BytesMut::new();
        let mut body = Vec::new();
        loop {
            match packet::decode(&mut buf, Integrity::Lrc, MAX_FRAME_PAYLOAD) {
                Ok(Some(WireEvent::Frame(p))) => {
                    body.extend_from_slice(&p);
                    sock.write_all(&[ACK]).await.unwrap();
                }
                Ok(Some(WireEvent::EndOfTransmission)) => return body,
                Ok(Some(_)) => {}
                Ok(None) => {
                    let n = sock.read_buf(&mut buf).await.unwrap();
                    if n == 0 {
                        return body;
                    }
                }
                Err(e) => panic!("mock decode failed: {e}"),
            }
        }
    }

    async fn mock_send(sock: &mut TcpStream, body: &str) {
        for part in packet::chunks(body.as_bytes(), MAX_FRAME_PAYLOAD) {
            let frame = packet::encode_frame(part, Integrity::Lrc, MAX_FRAME_PAYLOAD).unwrap();
            sock.write_all(&frame).await.unwrap();
            let mut one = [0u8; 1];
            sock.read_exact(&mut one).await.unwrap();
            assert_eq!(one[0], ACK);
        }
        sock.write_all(&[EOT]).await.unwrap();
    }

    #[tokio::test]
    async fn test_process_without_staged_request() {
        let (listener, port) = bind().await;
        let server = tokio::spawn(async move {
            let _sock = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_millis(500)).await;
        });

        let mut terminal = Terminal::connect(&test_config(port)).await.unwrap();
        let result = terminal.process(Category::Payment).await;
        assert_eq!(result.outcome, ExchangeOutcome::Error);
        assert!(result.message.contains("staged"));
        server.abort();
    }

    #[tokio::test]
    async fn test_process_sale_files_response() {
        let (listener, port) = bind().await;
        let server = tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let request = mock_recv(&mut sock).await;
            let text = String::from_utf8(request).unwrap();
            assert!(text.starts_with("T02\u{1c}1.28\u{1c}01\u{1c}1099"));
            mock_send(
                &mut sock,
                "000000\u{1c}OK\u{1c}AB1234\u{1c}1099\u{1c}\u{1c}************1111\u{1c}01",
            )
            .await;
        });

        let mut terminal = Terminal::connect(&test_config(port)).await.unwrap();
        terminal.stage(PaymentRequest::sale(
            TenderType::Credit,
            Money::from_cents(1099),
        ));
        let result = terminal.process(Category::Payment).await;
        assert!(result.is_ok(), "unexpected: {result:?}");
        assert_eq!(result.message, "000000 OK");

        let response = terminal.payment_response().unwrap();
        assert_eq!(response.result_code, "000000");
        assert_eq!(response.auth_code.as_deref(), Some("AB1234"));
        assert_eq!(response.approved_amount, Some(Money::from_cents(1099)));

        // The staged request was consumed.
        let rerun = terminal.process(Category::Payment).await;
        assert_eq!(rerun.outcome, ExchangeOutcome::Error);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_encode_error_reported_without_touching_wire() {
        let (listener, port) = bind().await;
        let server = tokio::spawn(async move {
            let _sock = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_millis(500)).await;
        });

        let mut terminal = Terminal::connect(&test_config(port)).await.unwrap();
        terminal.stage(PaymentRequest::new(
            TenderType::Credit,
            ecrlink_protocol::PaymentType::Sale,
        ));
        let result = terminal.process(Category::Payment).await;
        assert_eq!(result.outcome, ExchangeOutcome::Error);
        assert!(result.message.contains("amount"));
        server.abort();
    }

    #[tokio::test]
    async fn test_timeout_leaves_no_response() {
        let (listener, port) = bind().await;
        let server = tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let _ = mock_recv(&mut sock).await;
            tokio::time::sleep(Duration::from_secs(10)).await;
        });

        let mut config = test_config(port);
        config.timeout_ms = 100;
        let mut terminal = Terminal::connect(&config).await.unwrap();
        terminal.stage(BatchRequest::close());
        let result = terminal.process(Category::Batch).await;
        assert_eq!(result.outcome, ExchangeOutcome::Timeout);
        assert!(terminal.batch_response().is_none());
        server.abort();
    }

    #[tokio::test]
    async fn test_cancel_via_canceller() {
        let (listener, port) = bind().await;
        let server = tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let _ = mock_recv(&mut sock).await;
            tokio::time::sleep(Duration::from_secs(10)).await;
        });

        let mut terminal = Terminal::connect(&test_config(port)).await.unwrap();
        let canceller = terminal.canceller();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            canceller.cancel();
        });

        terminal.stage(ManageRequest::get_signature());
        let result = terminal.process(Category::Manage).await;
        assert_eq!(result.outcome, ExchangeOutcome::Timeout);
        assert!(result.message.contains("cancelled"));
        assert_eq!(terminal.link_state(), LinkState::Aborted);
        assert!(terminal.manage_response().is_none());
        server.abort();
    }

    #[tokio::test]
    async fn test_canceller_outlives_exchange() {
        let (listener, port) = bind().await;
        let server = tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            // First exchange answers normally.
            let _ = mock_recv(&mut sock).await;
            mock_send(&mut sock, "000000\u{1c}OK").await;
            // Second exchange hangs until cancelled.
            let _ = mock_recv(&mut sock).await;
            tokio::time::sleep(Duration::from_secs(10)).await;
        });

        let mut terminal = Terminal::connect(&test_config(port)).await.unwrap();
        let canceller = terminal.canceller();

        terminal.stage(BatchRequest::close());
        assert!(terminal.process(Category::Batch).await.is_ok());

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            canceller.cancel();
        });
        terminal.stage(BatchRequest::close());
        let result = terminal.process(Category::Batch).await;
        assert_eq!(result.outcome, ExchangeOutcome::Timeout);
        server.abort();
    }

    #[tokio::test]
    async fn test_status_enquiry() {
        let (listener, port) = bind().await;
        let server = tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut one = [0u8; 1];
            sock.read_exact(&mut one).await.unwrap();
            assert_eq!(one[0], packet::ENQ);
            mock_send(&mut sock, "0").await;
        });

        let mut terminal = Terminal::connect(&test_config(port)).await.unwrap();
        let status = terminal.status().await.unwrap();
        assert_eq!(status, TerminalStatus::Ready);
        server.await.unwrap();
    }

    #[test]
    fn test_status_report_mapping() {
        assert_eq!(TerminalStatus::from_report("0"), TerminalStatus::Ready);
        assert_eq!(TerminalStatus::from_report("1"), TerminalStatus::Busy);
        assert_eq!(
            TerminalStatus::from_report("9"),
            TerminalStatus::Unknown("9".to_string())
        );
    }
}
