//! NAT detection (RFC 7296 section 2.23).
//!
//! ```text
//! HASH = SHA-1(SPIi | SPIr | IP | Port)
//!
//! NAT_DETECTION_SOURCE_IP:      hash of the sender's address
//! NAT_DETECTION_DESTINATION_IP: hash of the address the sender sent to
//! ```

use ikev2_wire::{IkePacket, MessageType};

use sha1::{Digest, Sha1};
use std::net::{IpAddr, SocketAddr};

pub const NAT_HASH_LEN: usize = 20;

pub fn nat_detection_hash(spi_i: u64, spi_r: u64, addr: SocketAddr) -> [u8; NAT_HASH_LEN] {
    let mut hasher = Sha1::new();
    hasher.update(spi_i.to_be_bytes());
    hasher.update(spi_r.to_be_bytes());
    match addr.ip() {
        IpAddr::V4(ip) => hasher.update(ip.octets()),
        IpAddr::V6(ip) => hasher.update(ip.octets()),
    }
    hasher.update(addr.port().to_be_bytes());
    hasher.finalize().into()
}

/// Outcome of comparing the responder's NAT hashes with our own view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NatStatus {
    NoNat,
    /// We are behind a NAT: the responder saw a different source address
    LocalNat,
    /// The responder is behind a NAT
    RemoteNat,
    BothNat,
    /// The responder sent no NAT detection notifications
    Unsupported,
}

/// The two hashes carried in our request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NatDetection {
    pub source: [u8; NAT_HASH_LEN],
    pub destination: [u8; NAT_HASH_LEN],
}

impl NatDetection {
    /// Hashes for a request, where the responder SPI is still zero.
    pub fn for_request(spi_i: u64, local: SocketAddr, peer: SocketAddr) -> Self {
        Self {
            source: nat_detection_hash(spi_i, 0, local),
            destination: nat_detection_hash(spi_i, 0, peer),
        }
    }

    /// Check the responder's notifications against our addresses.
    ///
    /// The responder hashes with both SPIs from its header.
    pub fn detected(response: &IkePacket, local: SocketAddr, peer: SocketAddr) -> NatStatus {
        let spi_i = response.header.initiator_spi;
        let spi_r = response.header.responder_spi;
        let source = response.notify_data(MessageType::NatDetectionSourceIp);
        let destination = response.notify_data(MessageType::NatDetectionDestinationIp);

        match (source, destination) {
            (Some(source), Some(destination)) => {
                let remote_nat = source != nat_detection_hash(spi_i, spi_r, peer);
                let local_nat = destination != nat_detection_hash(spi_i, spi_r, local);
                match (local_nat, remote_nat) {
                    (false, false) => NatStatus::NoNat,
                    (true, false) => NatStatus::LocalNat,
                    (false, true) => NatStatus::RemoteNat,
                    (true, true) => NatStatus::BothNat,
                }
            }
            _ => NatStatus::Unsupported,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ikev2_wire::{ExchangeType, Header, IkeFlags, Notify, Payload};

    const SPI_I: u64 = 0x1234567890abcdef;
    const SPI_R: u64 = 0xfedcba0987654321;

    fn local() -> SocketAddr {
        "192.168.1.100:500".parse().unwrap()
    }

    fn peer() -> SocketAddr {
        "203.0.113.5:500".parse().unwrap()
    }

    fn response(source: SocketAddr, destination: SocketAddr) -> IkePacket {
        IkePacket {
            header: Header {
                initiator_spi: SPI_I,
                responder_spi: SPI_R,
                message_id: 0,
            },
            exchange_type: ExchangeType::IkeSaInit,
            flags: IkeFlags::RESPONSE,
            payloads: vec![
                Payload::Notify(Notify::nat_detection_source(
                    nat_detection_hash(SPI_I, SPI_R, source).to_vec(),
                )),
                Payload::Notify(Notify::nat_detection_destination(
                    nat_detection_hash(SPI_I, SPI_R, destination).to_vec(),
                )),
            ],
        }
    }

    #[test]
    fn hash_covers_every_field() {
        let base = nat_detection_hash(SPI_I, SPI_R, local());
        assert_eq!(base, nat_detection_hash(SPI_I, SPI_R, local()));
        assert_ne!(base, nat_detection_hash(SPI_I, 0, local()));
        assert_ne!(base, nat_detection_hash(SPI_I, SPI_R, "192.168.1.100:4500".parse().unwrap()));
        assert_ne!(base, nat_detection_hash(SPI_I, SPI_R, "192.168.1.101:500".parse().unwrap()));
        assert_ne!(base, nat_detection_hash(SPI_I, SPI_R, "[2001:db8::1]:500".parse().unwrap()));
    }

    #[test]
    fn known_hash() {
        // SHA-1 over 1234567890abcdef 0000000000000000 c0a80164 01f4
        assert_eq!(
            hex::encode(nat_detection_hash(SPI_I, 0, local())),
            "6409ffff877ca3d809ae0b4c4e93021c259b5001"
        );
    }

    #[test]
    fn no_nat() {
        assert_eq!(
            NatDetection::detected(&response(peer(), local()), local(), peer()),
            NatStatus::NoNat
        );
    }

    #[test]
    fn behind_nat() {
        let public: SocketAddr = "198.51.100.20:4500".parse().unwrap();
        assert_eq!(
            NatDetection::detected(&response(peer(), public), local(), peer()),
            NatStatus::LocalNat
        );
        assert_eq!(
            NatDetection::detected(&response(public, local()), local(), peer()),
            NatStatus::RemoteNat
        );
        assert_eq!(
            NatDetection::detected(&response(public, public), local(), peer()),
            NatStatus::BothNat
        );
    }

    #[test]
    fn responder_without_nat_detection() {
        let mut packet = response(peer(), local());
        packet.payloads.clear();
        assert_eq!(
            NatDetection::detected(&packet, local(), peer()),
            NatStatus::Unsupported
        );
    }

    #[test]
    fn request_hashes_use_zero_responder_spi() {
        let detection = NatDetection::for_request(SPI_I, local(), peer());
        assert_eq!(detection.source, nat_detection_hash(SPI_I, 0, local()));
        assert_eq!(detection.destination, nat_detection_hash(SPI_I, 0, peer()));
    }
}
