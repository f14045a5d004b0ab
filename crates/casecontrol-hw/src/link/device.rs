//! Controller link over a serial port.

use crate::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_serial::{DataBits, Parity, SerialPortBuilderExt, SerialStream, StopBits};
use tracing::{debug, trace};

use super::protocol::{expected_ack, Tag};

/// Opens byte streams to the controller.
pub trait Connector: Send {
    /// The opened byte stream.
    type Port: AsyncRead + AsyncWrite + Unpin + Send;

    /// Attempts to open the link once.
    fn connect(&mut self) -> impl Future<Output = Result<Self::Port>> + Send;

    /// Describes the link target for logs.
    fn name(&self) -> &str;
}

/// Opens the controller's serial port (8 data bits, no parity, 1 stop bit).
pub struct SerialConnector {
    port_path: String,
    baud_rate: u32,
}

impl SerialConnector {
    /// Creates a new serial connector.
    pub fn new(port_path: &str, baud_rate: u32) -> Self {
        Self {
            port_path: port_path.to_string(),
            baud_rate,
        }
    }
}

impl Connector for SerialConnector {
    type Port = SerialStream;

    fn connect(&mut self) -> impl Future<Output = Result<SerialStream>> + Send {
        let port_path = self.port_path.clone();
        let baud_rate = self.baud_rate;
        async move {
            let port = tokio_serial::new(&port_path, baud_rate)
                .data_bits(DataBits::Eight)
                .parity(Parity::None)
                .stop_bits(StopBits::One)
                .open_native_async()
                .map_err(|e| {
                    // Check if the error is due to device not existing
                    if let tokio_serial::ErrorKind::Io(kind) = &e.kind {
                        if *kind == std::io::ErrorKind::NotFound
                            || *kind == std::io::ErrorKind::PermissionDenied
                        {
                            if !std::path::Path::new(&port_path).exists() {
                                return Error::PortNotFound(port_path.clone());
                            }
                        }
                    }
                    Error::Serial(e)
                })?;

            debug!("Opened {} at {} baud", port_path, baud_rate);
            Ok(port)
        }
    }

    fn name(&self) -> &str {
        &self.port_path
    }
}

/// An open link that sends packets and waits for their acknowledgement.
pub struct DeviceLink<P> {
    port: P,
    ack_timeout: Duration,
}

impl<P: AsyncRead + AsyncWrite + Unpin> DeviceLink<P> {
    /// Wraps an opened port.
    pub fn new(port: P, ack_timeout: Duration) -> Self {
        Self { port, ack_timeout }
    }

    /// Sends one tagged packet and waits for its ACK byte.
    ///
    /// I/O failures mean the link is gone; a timeout or a wrong ACK value
    /// leaves the link usable.
    pub async fn send(&mut self, packet: &[u8]) -> Result<()> {
        let tag = packet
            .first()
            .copied()
            .and_then(Tag::from_byte)
            .ok_or_else(|| {
                Error::SerialIo(std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "packet has no valid tag",
                ))
            })?;

        self.discard_stale().await?;

        trace!("Sending {} packet: {:02X?}", tag, packet);
        self.port.write_all(packet).await?;
        self.port.flush().await?;

        let expected = expected_ack(packet);
        let mut ack = [0u8; 1];
        match tokio::time::timeout(self.ack_timeout, self.port.read_exact(&mut ack)).await {
            Err(_) => Err(Error::AckTimeout {
                tag,
                timeout_ms: self.ack_timeout.as_millis() as u64,
            }),
            Ok(Err(e)) => Err(e.into()),
            Ok(Ok(_)) if ack[0] != expected => Err(Error::AckMismatch {
                tag,
                expected,
                actual: ack[0],
            }),
            Ok(Ok(_)) => {
                trace!("{} packet acknowledged", tag);
                Ok(())
            }
        }
    }

    /// Drops bytes already waiting on the port, e.g. an ACK that arrived
    /// after its timeout.
    async fn discard_stale(&mut self) -> Result<()> {
        let mut buffer = [0u8; 64];
        loop {
            match tokio::time::timeout(Duration::ZERO, self.port.read(&mut buffer)).await {
                Err(_) => return Ok(()),
                Ok(Ok(0)) => {
                    return Err(Error::SerialIo(std::io::Error::from(
                        std::io::ErrorKind::UnexpectedEof,
                    )))
                }
                Ok(Ok(n)) => debug!("Discarded {} stale bytes: {:02X?}", n, &buffer[..n]),
                Ok(Err(e)) => return Err(e.into()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::protocol::{build_color_packet, build_text_packet};
    use crate::Rgb;
    use tokio::io::duplex;

    const TIMEOUT: Duration = Duration::from_millis(50);

    #[tokio::test]
    async fn test_send_acknowledged() {
        let (host, mut device) = duplex(256);
        let mut link = DeviceLink::new(host, TIMEOUT);

        let responder = tokio::spawn(async move {
            let mut packet = [0u8; 4];
            device.read_exact(&mut packet).await.unwrap();
            device.write_all(&[4]).await.unwrap();
            (packet, device)
        });

        let packet = build_color_packet(Tag::CaseColor, Rgb::new(9, 8, 7));
        link.send(&packet).await.unwrap();
        let (received, _device) = responder.await.unwrap();
        assert_eq!(received, [b'c', 9, 8, 7]);
    }

    #[tokio::test]
    async fn test_send_ack_timeout() {
        let (host, _device) = duplex(256);
        let mut link = DeviceLink::new(host, TIMEOUT);

        let packet = build_color_packet(Tag::LcdColor, Rgb::BLACK);
        let err = link.send(&packet).await.unwrap_err();
        assert!(matches!(
            err,
            Error::AckTimeout {
                tag: Tag::LcdColor,
                ..
            }
        ));
        assert!(!err.is_link_lost());
    }

    #[tokio::test]
    async fn test_send_ack_mismatch() {
        let (host, mut device) = duplex(256);
        let mut link = DeviceLink::new(host, TIMEOUT);

        let responder = tokio::spawn(async move {
            let mut packet = [0u8; 81];
            device.read_exact(&mut packet).await.unwrap();
            // Firmware that forgets to count the tag byte
            device.write_all(&[80]).await.unwrap();
            device
        });

        let packet = build_text_packet(&["hello"]);
        let err = link.send(&packet).await.unwrap_err();
        let _device = responder.await.unwrap();
        assert!(matches!(
            err,
            Error::AckMismatch {
                expected: 81,
                actual: 80,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_late_ack_is_discarded() {
        let (host, mut device) = duplex(256);
        let mut link = DeviceLink::new(host, TIMEOUT);

        // A late ACK from an earlier packet is already waiting
        device.write_all(&[4]).await.unwrap();

        let responder = tokio::spawn(async move {
            let mut packet = [0u8; 81];
            device.read_exact(&mut packet).await.unwrap();
            device.write_all(&[81]).await.unwrap();
            device
        });

        let packet = build_text_packet(&["x"]);
        link.send(&packet).await.unwrap();
        let _device = responder.await.unwrap();
    }

    #[tokio::test]
    async fn test_closed_link_is_lost() {
        let (host, device) = duplex(256);
        drop(device);
        let mut link = DeviceLink::new(host, TIMEOUT);

        let packet = build_color_packet(Tag::CaseColor, Rgb::BLACK);
        let err = link.send(&packet).await.unwrap_err();
        assert!(err.is_link_lost());
    }
}
