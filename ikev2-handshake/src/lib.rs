//! IKE_SA_INIT initiator.
//!
//! Builds the request from a [`HandshakeConfig`], answers cookie challenges
//! up to the configured limit and derives the seven IKE SA keys once the
//! responder commits to the exchange.
//!
//! # Example
//!
//! ```no_run
//! use ikev2_handshake::{initiate, HandshakeConfig, IKE_PORT};
//! use std::net::{Ipv4Addr, SocketAddr};
//!
//! # async fn demo() -> ikev2::error::Result<()> {
//! let peer = SocketAddr::from((Ipv4Addr::new(192, 0, 2, 1), IKE_PORT));
//! let sa = initiate(peer, HandshakeConfig::default()).await?;
//! println!("SPIr {:016x}, NAT {:?}", sa.responder_spi, sa.nat);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod handshake;
pub mod logging;
pub mod nat;
pub mod transport;

pub use config::{HandshakeConfig, HandshakeConfigBuilder};
pub use handshake::{EstablishedSa, Handshake, HandshakeState, Session};
pub use nat::{nat_detection_hash, NatDetection, NatStatus};
pub use transport::{Transport, UdpTransport, IKE_PORT};

use ikev2::entropy::OsEntropy;
use ikev2::error::Result;

use std::net::SocketAddr;

/// Run one IKE_SA_INIT exchange with `peer` over UDP.
pub async fn initiate(peer: SocketAddr, config: HandshakeConfig) -> Result<EstablishedSa> {
    config.validate()?;
    let transport = UdpTransport::connect(peer).await?;
    Handshake::new(config, transport, OsEntropy).run().await
}
