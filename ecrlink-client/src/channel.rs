//! Physical channels.
//!
//! One enum hides which transport carries the link: a TCP stream, an RS-232
//! line, or a Bluetooth RFCOMM node (which the OS exposes as a serial
//! device). The link layer reads and writes through `AsyncRead`/`AsyncWrite`
//! without caring which it got.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use pin_project_lite::pin_project;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio_serial::{DataBits, Parity, SerialPortBuilderExt, SerialStream, StopBits};

use crate::config::{SerialConfig, WirelessConfig};
use crate::error::LinkError;

/// RFCOMM nodes run at a fixed line rate; the radio ignores it anyway.
const RFCOMM_BAUD: u32 = 115_200;

pin_project! {
    /// An open byte channel to a terminal.
    #[derive(Debug)]
    #[project = ChannelProj]
    pub enum Channel {
        Tcp {
            #[pin]
            stream: TcpStream,
        },
        Serial {
            #[pin]
            stream: SerialStream,
        },
    }
}

impl Channel {
    /// Opens a TCP channel. The connect itself races `timeout` when one is
    /// configured.
    pub async fn connect_tcp(
        host: &str,
        port: u16,
        timeout: Option<std::time::Duration>,
    ) -> Result<Channel, LinkError> {
        let target = format!("{}:{}", host, port);
        let connect = TcpStream::connect(&target);
        let stream = match timeout {
            Some(t) => tokio::time::timeout(t, connect)
                .await
                .map_err(|_| LinkError::Timeout)?,
            None => connect.await,
        }
        .map_err(|e| LinkError::Connect {
            target: target.clone(),
            reason: e.to_string(),
        })?;
        stream.set_nodelay(true)?;
        tracing::debug!(%target, "tcp channel open");
        Ok(Channel::Tcp { stream })
    }

    /// Opens an RS-232 channel with the configured line settings.
    pub fn open_serial(config: &SerialConfig) -> Result<Channel, LinkError> {
        let data_bits = match config.data_bits {
            5 => DataBits::Five,
            6 => DataBits::Six,
            7 => DataBits::Seven,
            _ => DataBits::Eight,
        };
        let stop_bits = match config.stop_bits {
            2 => StopBits::Two,
            _ => StopBits::One,
        };
        let parity = match config.parity.as_str() {
            "even" => Parity::Even,
            "odd" => Parity::Odd,
            _ => Parity::None,
        };
        let stream = tokio_serial::new(&config.device, config.baud_rate)
            .data_bits(data_bits)
            .stop_bits(stop_bits)
            .parity(parity)
            .open_native_async()?;
        tracing::debug!(device = %config.device, baud = config.baud_rate, "serial channel open");
        Ok(Channel::Serial { stream })
    }

    /// Opens a Bluetooth channel through its bound RFCOMM device node.
    pub fn open_rfcomm(config: &WirelessConfig) -> Result<Channel, LinkError> {
        let stream = tokio_serial::new(&config.device, RFCOMM_BAUD).open_native_async()?;
        tracing::debug!(
            device = %config.device,
            address = %config.address,
            "rfcomm channel open"
        );
        Ok(Channel::Serial { stream })
    }

    /// Flushes and closes the write side where the transport supports it.
    pub async fn shutdown(&mut self) -> io::Result<()> {
        use tokio::io::AsyncWriteExt;
        match self {
            Channel::Tcp { stream } => stream.shutdown().await,
            Channel::Serial { stream } => stream.flush().await,
        }
    }
}

impl AsyncRead for Channel {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.project() {
            ChannelProj::Tcp { stream } => stream.poll_read(cx, buf),
            ChannelProj::Serial { stream } => stream.poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for Channel {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.project() {
            ChannelProj::Tcp { stream } => stream.poll_write(cx, buf),
            ChannelProj::Serial { stream } => stream.poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.project() {
            ChannelProj::Tcp { stream } => stream.poll_flush(cx),
            ChannelProj::Serial { stream } => stream.poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.project() {
            ChannelProj::Tcp { stream } => stream.poll_shutdown(cx),
            ChannelProj::Serial { stream } => stream.poll_shutdown(cx),
        }
    }
}
