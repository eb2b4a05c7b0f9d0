//! An IKEv2 message codec as per [RFC7296](https://tools.ietf.org/html/rfc7296).
//!
//! Covers the payloads exchanged during IKE_SA_INIT: Security Association,
//! Key Exchange, Nonce, Notify and Certificate Request. Every length field is
//! checked against the bytes it covers, and any value outside the supported
//! set is an error rather than an "unknown" placeholder.
//!
//! # Example
//! ```
//! use ikev2::parser::Parse;
//! use ikev2_wire::{Ike, PayloadType};
//!
//! let bytes = [
//!     // Header
//!     0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08,
//!     0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
//!     0x28, 0x20, 0x22, 0x08,
//!     0x00, 0x00, 0x00, 0x00,
//!     0x00, 0x00, 0x00, 0x24,
//!     // Nonce
//!     0x00, 0x00, 0x00, 0x08, 0xca, 0xfe, 0xba, 0xbe,
//! ];
//!
//! match Ike::parse(&bytes) {
//!     Ok(packet) => {
//!         assert!(packet.contains(PayloadType::Nonce));
//!         assert_eq!(packet.nonce(), Some(&[0xca, 0xfe, 0xba, 0xbe][..]));
//!     }
//!     Err(err) => panic!("failed to parse: {}", err),
//! }
//! ```

#![deny(clippy::integer_arithmetic)]

pub mod header;
mod length;
pub mod notify;
pub mod payloads;
pub mod proposal;

pub use header::{ExchangeType, Header, IkeFlags, HEADER_LEN, IKE_VERSION};
pub use notify::{MessageType, Notify};
pub use payloads::{
    CertificateEncoding, CertificateRequest, KeyExchange, Payload, PayloadType, CA_HASH_LEN,
};
pub use proposal::{
    Attribute, DhGroup, EncryptionAlgorithm, PrfAlgorithm, Proposal, ProtocolId, Transform,
};

use ikev2::cursor::ByteCursor;
use ikev2::encoder::Encode;
use ikev2::error::{Error, ErrorKind, Result};
use ikev2::parser::Parse;
use ikev2::protocol::Protocol;

/// IKEv2 protocol handle
#[derive(Debug)]
pub struct Ike {}

impl Protocol for Ike {
    type Message = IkePacket;

    fn name() -> &'static str {
        "ikev2"
    }
}

impl Parse for Ike {
    fn parse(input: &[u8]) -> Result<Self::Message> {
        IkePacket::parse(input)
    }
}

impl Encode for Ike {
    fn encode(message: &Self::Message) -> Result<Vec<u8>> {
        message.encode()
    }
}

/// A complete IKE message.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct IkePacket {
    pub header: Header,
    pub exchange_type: ExchangeType,
    pub flags: IkeFlags,
    pub payloads: Vec<Payload>,
}

impl IkePacket {
    /// Decode one datagram. Either the whole payload chain decodes or
    /// nothing is returned.
    pub fn parse(input: &[u8]) -> Result<Self> {
        let mut cursor = ByteCursor::new(input);
        let contents = header::Header::parse(&mut cursor)?;

        let mut payloads = Vec::new();
        let mut next_payload = contents.next_payload;
        while next_payload != PayloadType::NoNextPayload {
            let (payload, following) = Payload::parse(&mut cursor, next_payload)?;
            payloads.push(payload);
            next_payload = following;
        }

        if !cursor.is_empty() {
            return Err(Error::new(ErrorKind::InvalidNextPayload).context(|| {
                format!("{} bytes after the last payload", cursor.remaining())
            }));
        }

        Ok(Self {
            header: contents.header,
            exchange_type: contents.exchange_type,
            flags: contents.flags,
            payloads,
        })
    }

    /// Encode the packet, computing every length field from the content.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut body = Vec::new();
        for (index, payload) in self.payloads.iter().enumerate() {
            let next_payload = index
                .checked_add(1)
                .and_then(|next| self.payloads.get(next))
                .map_or(PayloadType::NoNextPayload, Payload::payload_type);
            payload.encode(next_payload, &mut body)?;
        }
        let first_payload = self
            .payloads
            .first()
            .map_or(PayloadType::NoNextPayload, Payload::payload_type);

        let mut out = Vec::with_capacity(HEADER_LEN.saturating_add(body.len()));
        self.header
            .encode(self.exchange_type, self.flags, first_payload, &body, &mut out)?;
        Ok(out)
    }

    pub fn contains(&self, payload_type: PayloadType) -> bool {
        self.payloads
            .iter()
            .any(|payload| payload.payload_type() == payload_type)
    }

    pub fn nonce(&self) -> Option<&[u8]> {
        self.payloads.iter().find_map(|payload| match payload {
            Payload::Nonce(nonce) => Some(nonce.as_slice()),
            _ => None,
        })
    }

    pub fn key_exchange(&self) -> Option<&KeyExchange> {
        self.payloads.iter().find_map(|payload| match payload {
            Payload::KeyExchange(key_exchange) => Some(key_exchange),
            _ => None,
        })
    }

    /// Group of the Key Exchange payload.
    pub fn dh_group(&self) -> Option<DhGroup> {
        self.key_exchange().map(|key_exchange| key_exchange.group)
    }

    pub fn certificate_request(&self) -> Option<&CertificateRequest> {
        self.payloads.iter().find_map(|payload| match payload {
            Payload::CertificateRequest(request) => Some(request),
            _ => None,
        })
    }

    pub fn notifications(&self) -> impl Iterator<Item = &Notify> {
        self.payloads.iter().filter_map(|payload| match payload {
            Payload::Notify(notify) => Some(notify),
            _ => None,
        })
    }

    /// First Notify of the given type.
    pub fn notify(&self, message_type: MessageType) -> Option<&Notify> {
        self.notifications()
            .find(|notify| notify.message_type == message_type)
    }

    /// Notification data of the first Notify of the given type, for types
    /// that define a data field.
    pub fn notify_data(&self, message_type: MessageType) -> Option<&[u8]> {
        self.notify(message_type)
            .filter(|notify| notify.message_type.carries_data())
            .map(|notify| notify.data.as_slice())
    }

    /// First error notification, if the peer sent one.
    pub fn error_notify(&self) -> Option<MessageType> {
        self.notifications()
            .map(|notify| notify.message_type)
            .find(|message_type| message_type.is_error())
    }

    /// Transforms of every IKE proposal in every SA payload, in wire order.
    pub fn transforms(&self) -> impl Iterator<Item = &Transform> {
        self.payloads
            .iter()
            .filter_map(|payload| match payload {
                Payload::SecurityAssociation(proposals) => Some(proposals),
                _ => None,
            })
            .flatten()
            .flat_map(Proposal::transforms)
    }

    pub fn prf(&self) -> Option<PrfAlgorithm> {
        self.transforms().find_map(|transform| match transform {
            Transform::Prf(prf) => Some(*prf),
            _ => None,
        })
    }

    pub fn encryption(&self) -> Option<&EncryptionAlgorithm> {
        self.transforms().find_map(|transform| match transform {
            Transform::Encryption(algorithm) => Some(algorithm),
            _ => None,
        })
    }

    /// Size of SK_d, SK_pi and SK_pr.
    pub fn prf_key_size(&self) -> Result<usize> {
        self.prf()
            .map(PrfAlgorithm::key_size)
            .ok_or_else(|| Error::new(ErrorKind::NotNegotiated("PRF")))
    }

    /// Size of SK_ai and SK_ar.
    pub fn integrity_key_size(&self) -> Result<usize> {
        self.encryption()
            .map(EncryptionAlgorithm::integrity_key_size)
            .ok_or_else(|| Error::new(ErrorKind::NotNegotiated("encryption algorithm")))
    }

    /// Size of SK_ei and SK_er.
    pub fn encryption_key_size(&self) -> Result<usize> {
        self.encryption()
            .map(EncryptionAlgorithm::key_size)
            .ok_or_else(|| Error::new(ErrorKind::NotNegotiated("encryption algorithm")))
    }
}
