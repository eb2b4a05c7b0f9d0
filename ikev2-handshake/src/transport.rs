//! Datagram transport the handshake runs over.

use ikev2::error::Result;

use async_trait::async_trait;
use std::net::SocketAddr;
use tokio::net::UdpSocket;

/// Default IKE port
pub const IKE_PORT: u16 = 500;

/// Largest datagram accepted from the peer
pub const MAX_DATAGRAM_LEN: usize = 65536;

/// A connected, message oriented channel to one IKE responder.
#[async_trait]
pub trait Transport: Send {
    /// Send one complete IKE message.
    async fn send_packet(&mut self, packet: &[u8]) -> Result<()>;

    /// Wait for the next complete IKE message.
    async fn receive_packet(&mut self) -> Result<Vec<u8>>;

    /// Address the peer sees our messages coming from, before any NAT.
    fn local_addr(&self) -> Result<SocketAddr>;

    fn peer_addr(&self) -> SocketAddr;
}

/// IKE over plain UDP.
#[derive(Debug)]
pub struct UdpTransport {
    socket: UdpSocket,
    peer_addr: SocketAddr,
    recv_buffer: Vec<u8>,
}

impl UdpTransport {
    /// Bind an ephemeral local port and connect it to `peer_addr`.
    pub async fn connect(peer_addr: SocketAddr) -> Result<Self> {
        let bind_addr: SocketAddr = if peer_addr.is_ipv4() {
            (std::net::Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (std::net::Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(bind_addr).await?;
        socket.connect(peer_addr).await?;
        tracing::debug!(
            local = %socket.local_addr()?,
            peer = %peer_addr,
            "UDP transport connected"
        );
        Ok(Self {
            socket,
            peer_addr,
            recv_buffer: vec![0u8; MAX_DATAGRAM_LEN],
        })
    }
}

#[async_trait]
impl Transport for UdpTransport {
    async fn send_packet(&mut self, packet: &[u8]) -> Result<()> {
        self.socket.send(packet).await?;
        Ok(())
    }

    async fn receive_packet(&mut self) -> Result<Vec<u8>> {
        let len = self.socket.recv(&mut self.recv_buffer).await?;
        Ok(self.recv_buffer[..len].to_vec())
    }

    fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn loopback_round_trip() {
        let responder = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let responder_addr = responder.local_addr().unwrap();

        let mut transport = UdpTransport::connect(responder_addr).await.unwrap();
        assert_eq!(transport.peer_addr(), responder_addr);
        let local = transport.local_addr().unwrap();
        assert!(local.ip().is_loopback());

        transport.send_packet(&[0x01, 0x02, 0x03]).await.unwrap();
        let mut buffer = [0u8; 16];
        let (len, from) = responder.recv_from(&mut buffer).await.unwrap();
        assert_eq!(&buffer[..len], &[0x01, 0x02, 0x03]);
        assert_eq!(from, local);

        responder.send_to(&[0xff; 300], from).await.unwrap();
        assert_eq!(transport.receive_packet().await.unwrap(), vec![0xff; 300]);
    }
}
