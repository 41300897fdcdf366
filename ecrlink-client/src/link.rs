//! Framed transport over a channel.
//!
//! A link runs strict turn-taking exchanges: every outbound frame must be
//! ACKed before the next goes out, a NAK triggers a resend against a bounded
//! retry budget, and a bare EOT closes each direction's transmission. One
//! deadline covers the whole exchange; a cancellation token is honored at
//! every await point.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use ecrlink_protocol::packet::{self, WireEvent, ACK, ENQ, EOT, NAK};
use ecrlink_protocol::{Integrity, ProtocolError, MAX_BODY_SIZE, MAX_FRAME_PAYLOAD};

use crate::channel::Channel;
use crate::config::{ChannelKind, CommConfig};
use crate::error::LinkError;
use crate::trace::{Direction, TracingWireLog, WireLog};

/// Exchange lifecycle, exposed for observability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Idle,
    Connecting,
    Sending,
    AwaitingAck,
    Retrying,
    AwaitingResponse,
    Reassembling,
    Complete,
    Aborted,
}

impl LinkState {
    pub fn as_str(self) -> &'static str {
        match self {
            LinkState::Idle => "idle",
            LinkState::Connecting => "connecting",
            LinkState::Sending => "sending",
            LinkState::AwaitingAck => "awaiting_ack",
            LinkState::Retrying => "retrying",
            LinkState::AwaitingResponse => "awaiting_response",
            LinkState::Reassembling => "reassembling",
            LinkState::Complete => "complete",
            LinkState::Aborted => "aborted",
        }
    }
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A connected terminal link.
pub struct Link {
    channel: Channel,
    buf: BytesMut,
    integrity: Integrity,
    max_payload: usize,
    retry_limit: u32,
    timeout: Option<Duration>,
    state: LinkState,
    wire_log: Box<dyn WireLog>,
}

impl Link {
    /// Opens the channel named by `config` and wraps it in a link.
    pub async fn connect(config: &CommConfig) -> Result<Link, LinkError> {
        config.validate()?;
        tracing::debug!(kind = %config.kind, target = %config.target(), "opening channel");
        let channel = match config.kind {
            ChannelKind::Network => {
                Channel::connect_tcp(&config.network.host, config.network.port, config.timeout())
                    .await?
            }
            ChannelKind::Serial => Channel::open_serial(&config.serial)?,
            ChannelKind::Wireless => Channel::open_rfcomm(&config.wireless)?,
        };
        let mut link = Link {
            channel,
            buf: BytesMut::with_capacity(1024),
            integrity: config.integrity,
            max_payload: config.max_frame_payload,
            retry_limit: config.retry_limit,
            timeout: config.timeout(),
            state: LinkState::Connecting,
            wire_log: Box::new(TracingWireLog),
        };
        link.set_state(LinkState::Idle);
        Ok(link)
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Replaces the sink that receives raw wire traffic.
    pub fn set_wire_log(&mut self, log: Box<dyn WireLog>) {
        self.wire_log = log;
    }

    /// Sends `body` and returns the peer's reassembled response body.
    pub async fn exchange(
        &mut self,
        body: &str,
        cancel: &CancellationToken,
    ) -> Result<String, LinkError> {
        self.set_state(LinkState::Idle);
        let deadline = self.deadline();
        let result = self.run_exchange(body, deadline, cancel).await;
        match &result {
            Ok(_) => self.set_state(LinkState::Complete),
            Err(e) => {
                tracing::debug!(error = %e, "exchange aborted");
                self.set_state(LinkState::Aborted);
            }
        }
        result
    }

    /// Status enquiry: a bare ENQ, answered by a single frame whose payload
    /// reports the terminal state.
    pub async fn enquire(&mut self, cancel: &CancellationToken) -> Result<String, LinkError> {
        self.set_state(LinkState::Idle);
        let deadline = self.deadline();
        let result = self.run_enquiry(deadline, cancel).await;
        match &result {
            Ok(_) => self.set_state(LinkState::Complete),
            Err(_) => self.set_state(LinkState::Aborted),
        }
        result
    }

    /// Flushes and closes the channel.
    pub async fn shutdown(mut self) -> Result<(), LinkError> {
        self.channel.shutdown().await?;
        Ok(())
    }

    async fn run_exchange(
        &mut self,
        body: &str,
        deadline: Option<Instant>,
        cancel: &CancellationToken,
    ) -> Result<String, LinkError> {
        // Stale bytes from an aborted exchange must not bleed into this one.
        self.buf.clear();
        self.send_body(body.as_bytes(), deadline, cancel).await?;
        let response = self.recv_body(deadline, cancel).await?;
        tracing::debug!(len = response.len(), "exchange complete");
        Ok(response)
    }

    async fn run_enquiry(
        &mut self,
        deadline: Option<Instant>,
        cancel: &CancellationToken,
    ) -> Result<String, LinkError> {
        self.buf.clear();
        self.set_state(LinkState::Sending);
        self.write_guarded(&[ENQ], deadline, cancel).await?;
        self.set_state(LinkState::AwaitingResponse);
        let mut naks = 0u32;
        loop {
            match self.next_event(deadline, cancel).await {
                Ok(WireEvent::Frame(payload)) => {
                    self.write_guarded(&[ACK], deadline, cancel).await?;
                    return String::from_utf8(payload.to_vec())
                        .map_err(|_| LinkError::Protocol(ProtocolError::InvalidUtf8));
                }
                Ok(other) => {
                    tracing::warn!(event = ?other, "ignoring event while awaiting status");
                }
                Err(LinkError::Protocol(ProtocolError::TrailerMismatch { .. })) => {
                    naks += 1;
                    if naks >= self.retry_limit {
                        return Err(LinkError::RetryExhausted(naks));
                    }
                    self.write_guarded(&[NAK], deadline, cancel).await?;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn send_body(
        &mut self,
        body: &[u8],
        deadline: Option<Instant>,
        cancel: &CancellationToken,
    ) -> Result<(), LinkError> {
        let mut naks = 0u32;
        let chunks: Vec<&[u8]> = packet::chunks(body, self.max_payload).collect();
        let total = chunks.len();
        for (index, chunk) in chunks.into_iter().enumerate() {
            let frame = packet::encode_frame(chunk, self.integrity, self.max_payload)?;
            loop {
                self.set_state(LinkState::Sending);
                tracing::trace!(frame = index + 1, total, len = chunk.len(), "sending frame");
                self.write_guarded(&frame, deadline, cancel).await?;
                self.set_state(LinkState::AwaitingAck);
                if self.await_ack(deadline, cancel).await? {
                    break;
                }
                naks += 1;
                tracing::debug!(naks, limit = self.retry_limit, "frame rejected by peer");
                if naks >= self.retry_limit {
                    return Err(LinkError::RetryExhausted(naks));
                }
                self.set_state(LinkState::Retrying);
            }
        }
        self.write_guarded(&[EOT], deadline, cancel).await
    }

    /// True on ACK, false on NAK. Anything else while waiting is logged and
    /// skipped.
    async fn await_ack(
        &mut self,
        deadline: Option<Instant>,
        cancel: &CancellationToken,
    ) -> Result<bool, LinkError> {
        loop {
            match self.next_event(deadline, cancel).await {
                Ok(WireEvent::Ack) => return Ok(true),
                Ok(WireEvent::Nak) => return Ok(false),
                Ok(other) => {
                    tracing::warn!(event = ?other, "ignoring event while awaiting ack");
                }
                Err(LinkError::Protocol(e)) => {
                    tracing::warn!(error = %e, "ignoring garbled bytes while awaiting ack");
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn recv_body(
        &mut self,
        deadline: Option<Instant>,
        cancel: &CancellationToken,
    ) -> Result<String, LinkError> {
        self.set_state(LinkState::AwaitingResponse);
        let mut body: Vec<u8> = Vec::new();
        let mut naks = 0u32;
        loop {
            match self.next_event(deadline, cancel).await {
                Ok(WireEvent::Frame(payload)) => {
                    if body.len() + payload.len() > MAX_BODY_SIZE {
                        return Err(LinkError::Protocol(ProtocolError::BodyTooLarge {
                            size: body.len() + payload.len(),
                            max: MAX_BODY_SIZE,
                        }));
                    }
                    self.set_state(LinkState::Reassembling);
                    body.extend_from_slice(&payload);
                    self.write_guarded(&[ACK], deadline, cancel).await?;
                }
                Ok(WireEvent::EndOfTransmission) => break,
                Ok(other) => {
                    tracing::warn!(event = ?other, "ignoring event while awaiting response");
                }
                Err(LinkError::Protocol(ProtocolError::TrailerMismatch { .. })) => {
                    naks += 1;
                    tracing::debug!(naks, limit = self.retry_limit, "rejecting garbled frame");
                    if naks >= self.retry_limit {
                        return Err(LinkError::RetryExhausted(naks));
                    }
                    self.write_guarded(&[NAK], deadline, cancel).await?;
                }
                Err(e) => return Err(e),
            }
        }
        String::from_utf8(body).map_err(|_| LinkError::Protocol(ProtocolError::InvalidUtf8))
    }

    /// Decodes the next wire event, reading more bytes as needed. Noise
    /// bytes between events are skipped.
    async fn next_event(
        &mut self,
        deadline: Option<Instant>,
        cancel: &CancellationToken,
    ) -> Result<WireEvent, LinkError> {
        loop {
            match packet::decode(&mut self.buf, self.integrity, MAX_FRAME_PAYLOAD) {
                Ok(Some(event)) => return Ok(event),
                Ok(None) => self.read_more(deadline, cancel).await?,
                Err(ProtocolError::UnexpectedByte(byte)) => {
                    tracing::warn!(byte, "skipping noise byte");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn read_more(
        &mut self,
        deadline: Option<Instant>,
        cancel: &CancellationToken,
    ) -> Result<(), LinkError> {
        let channel = &mut self.channel;
        let buf = &mut self.buf;
        let wire_log = &mut self.wire_log;
        guarded(
            async move {
                let seen = buf.len();
                let n = channel.read_buf(buf).await?;
                if n == 0 {
                    return Err(LinkError::Closed);
                }
                wire_log.record(Direction::In, &buf[seen..]);
                Ok(())
            },
            deadline,
            cancel,
        )
        .await
    }

    async fn write_guarded(
        &mut self,
        bytes: &[u8],
        deadline: Option<Instant>,
        cancel: &CancellationToken,
    ) -> Result<(), LinkError> {
        let channel = &mut self.channel;
        let wire_log = &mut self.wire_log;
        guarded(
            async move {
                channel.write_all(bytes).await?;
                channel.flush().await?;
                wire_log.record(Direction::Out, bytes);
                Ok(())
            },
            deadline,
            cancel,
        )
        .await
    }

    fn deadline(&self) -> Option<Instant> {
        self.timeout.map(|t| Instant::now() + t)
    }

    fn set_state(&mut self, state: LinkState) {
        if self.state != state {
            tracing::trace!(from = %self.state, to = %state, "link state");
            self.state = state;
        }
    }
}

/// Races `fut` against cancellation and the exchange deadline.
async fn guarded<T, F>(
    fut: F,
    deadline: Option<Instant>,
    cancel: &CancellationToken,
) -> Result<T, LinkError>
where
    F: Future<Output = Result<T, LinkError>>,
{
    let watched = async {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(LinkError::Cancelled),
            result = fut => result,
        }
    };
    match deadline {
        Some(at) => tokio::time::timeout_at(at, watched)
            .await
            .map_err(|_| LinkError::Timeout)?,
        None => watched.await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
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

    /// Reads one full transmission, NAKing the first `naks` frames.
    async fn mock_recv(sock: &mut TcpStream, mut naks: u32) -> Vec<u8> {
        let mut buf = BytesMut::new();
        let mut body = Vec::new();
        loop {
            match packet::decode(&mut buf, Integrity::Lrc, MAX_FRAME_PAYLOAD) {
                Ok(Some(WireEvent::Frame(p))) => {
                    if naks > 0 {
                        naks -= 1;
                        sock.write_all(&[NAK]).await.unwrap();
                    } else {
                        body.extend_from_slice(&p);
                        sock.write_all(&[ACK]).await.unwrap();
                    }
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

    /// Sends `body` in `chunk`-sized frames, expecting an ACK after each.
    async fn mock_send(sock: &mut TcpStream, body: &str, chunk: usize) {
        for part in packet::chunks(body.as_bytes(), chunk) {
            let frame = packet::encode_frame(part, Integrity::Lrc, MAX_FRAME_PAYLOAD).unwrap();
            sock.write_all(&frame).await.unwrap();
            let mut one = [0u8; 1];
            sock.read_exact(&mut one).await.unwrap();
            assert_eq!(one[0], ACK, "mock expected ack");
        }
        sock.write_all(&[EOT]).await.unwrap();
    }

    #[tokio::test]
    async fn test_exchange_single_frame() {
        let (listener, port) = bind().await;
        let server = tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let request = mock_recv(&mut sock, 0).await;
            assert_eq!(request, b"B01\x1c1.28\x1c00\x1c\x1c");
            mock_send(&mut sock, "000000\u{1c}OK", MAX_FRAME_PAYLOAD).await;
        });

        let mut link = Link::connect(&test_config(port)).await.unwrap();
        let cancel = CancellationToken::new();
        let response = link
            .exchange("B01\u{1c}1.28\u{1c}00\u{1c}\u{1c}", &cancel)
            .await
            .unwrap();
        assert_eq!(response, "000000\u{1c}OK");
        assert_eq!(link.state(), LinkState::Complete);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_exchange_chunked_both_directions() {
        let (listener, port) = bind().await;
        let request_body = "T02\u{1c}1.28\u{1c}".to_string() + &"x".repeat(400);
        let response_body = "000000\u{1c}OK\u{1c}".to_string() + &"y".repeat(350);
        let expect_request = request_body.clone();
        let send_response = response_body.clone();

        let server = tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let request = mock_recv(&mut sock, 0).await;
            assert_eq!(request, expect_request.as_bytes());
            mock_send(&mut sock, &send_response, 100).await;
        });

        let mut link = Link::connect(&test_config(port)).await.unwrap();
        let cancel = CancellationToken::new();
        let response = link.exchange(&request_body, &cancel).await.unwrap();
        assert_eq!(response, response_body);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_nak_retry_within_budget() {
        let (listener, port) = bind().await;
        let server = tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            // Two rejections, then the third attempt is accepted.
            let request = mock_recv(&mut sock, 2).await;
            assert_eq!(request, b"A06\x1c1.28");
            mock_send(&mut sock, "000000\u{1c}OK", MAX_FRAME_PAYLOAD).await;
        });

        let mut link = Link::connect(&test_config(port)).await.unwrap();
        let cancel = CancellationToken::new();
        let response = link.exchange("A06\u{1c}1.28", &cancel).await.unwrap();
        assert_eq!(response, "000000\u{1c}OK");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_retry_budget_exhausted() {
        let (listener, port) = bind().await;
        let server = tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            mock_recv(&mut sock, 3).await;
        });

        let mut link = Link::connect(&test_config(port)).await.unwrap();
        let cancel = CancellationToken::new();
        let err = link.exchange("A06\u{1c}1.28", &cancel).await.unwrap_err();
        assert!(matches!(err, LinkError::RetryExhausted(3)));
        assert!(err.is_interruption());
        assert_eq!(link.state(), LinkState::Aborted);
        // Closing the socket lets the mock's read loop wind down.
        drop(link);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_exchange_timeout() {
        let (listener, port) = bind().await;
        let server = tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            // Swallow the request, never answer.
            let _ = mock_recv(&mut sock, 0).await;
            tokio::time::sleep(Duration::from_secs(10)).await;
        });

        let mut config = test_config(port);
        config.timeout_ms = 100;
        let mut link = Link::connect(&config).await.unwrap();
        let cancel = CancellationToken::new();
        let err = link.exchange("A06\u{1c}1.28", &cancel).await.unwrap_err();
        assert!(matches!(err, LinkError::Timeout));
        assert_eq!(link.state(), LinkState::Aborted);
        server.abort();
    }

    #[tokio::test]
    async fn test_exchange_cancelled() {
        let (listener, port) = bind().await;
        let server = tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let _ = mock_recv(&mut sock, 0).await;
            tokio::time::sleep(Duration::from_secs(10)).await;
        });

        let mut link = Link::connect(&test_config(port)).await.unwrap();
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let err = link.exchange("A06\u{1c}1.28", &cancel).await.unwrap_err();
        assert!(matches!(err, LinkError::Cancelled));
        assert_eq!(link.state(), LinkState::Aborted);
        server.abort();
    }

    #[tokio::test]
    async fn test_corrupt_response_frame_is_nakked() {
        let (listener, port) = bind().await;
        let server = tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let _ = mock_recv(&mut sock, 0).await;

            let mut bad = packet::encode_frame(b"000000\x1cOK", Integrity::Lrc, MAX_FRAME_PAYLOAD)
                .unwrap();
            let last = bad.len() - 1;
            bad[last] ^= 0xff;
            sock.write_all(&bad).await.unwrap();

            let mut one = [0u8; 1];
            sock.read_exact(&mut one).await.unwrap();
            assert_eq!(one[0], NAK);

            mock_send(&mut sock, "000000\u{1c}OK", MAX_FRAME_PAYLOAD).await;
        });

        let mut link = Link::connect(&test_config(port)).await.unwrap();
        let cancel = CancellationToken::new();
        let response = link.exchange("A06\u{1c}1.28", &cancel).await.unwrap();
        assert_eq!(response, "000000\u{1c}OK");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_enquire_status() {
        let (listener, port) = bind().await;
        let server = tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut one = [0u8; 1];
            sock.read_exact(&mut one).await.unwrap();
            assert_eq!(one[0], ENQ);
            mock_send(&mut sock, "0", MAX_FRAME_PAYLOAD).await;
        });

        let mut link = Link::connect(&test_config(port)).await.unwrap();
        let cancel = CancellationToken::new();
        let status = link.enquire(&cancel).await.unwrap();
        assert_eq!(status, "0");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_peer_close_mid_exchange() {
        let (listener, port) = bind().await;
        let server = tokio::spawn(async move {
            let (sock, _) = listener.accept().await.unwrap();
            drop(sock);
        });

        let mut link = Link::connect(&test_config(port)).await.unwrap();
        let cancel = CancellationToken::new();
        let err = link.exchange("A06\u{1c}1.28", &cancel).await.unwrap_err();
        // Either the write fails or the read sees a clean close.
        assert!(matches!(err, LinkError::Closed | LinkError::Io(_)));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_wire_log_records_raw_traffic() {
        use parking_lot::Mutex;
        use std::sync::Arc;

        #[derive(Clone)]
        struct SharedLog(Arc<Mutex<Vec<(Direction, Vec<u8>)>>>);
        impl WireLog for SharedLog {
            fn record(&mut self, direction: Direction, bytes: &[u8]) {
                self.0.lock().push((direction, bytes.to_vec()));
            }
        }

        let (listener, port) = bind().await;
        let server = tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let _ = mock_recv(&mut sock, 0).await;
            mock_send(&mut sock, "000000\u{1c}OK", MAX_FRAME_PAYLOAD).await;
        });

        let log = SharedLog(Arc::new(Mutex::new(Vec::new())));
        let mut link = Link::connect(&test_config(port)).await.unwrap();
        link.set_wire_log(Box::new(log.clone()));
        let cancel = CancellationToken::new();
        link.exchange("A06\u{1c}1.28", &cancel).await.unwrap();
        server.await.unwrap();

        let entries = log.0.lock();
        let (first_dir, first_bytes) = &entries[0];
        assert_eq!(*first_dir, Direction::Out);
        assert_eq!(first_bytes[0], packet::STX);
        let inbound: Vec<u8> = entries
            .iter()
            .filter(|(dir, _)| *dir == Direction::In)
            .flat_map(|(_, bytes)| bytes.clone())
            .collect();
        assert!(inbound.contains(&ACK));
        assert!(inbound.contains(&EOT));
    }
}
