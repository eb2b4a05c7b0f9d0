use crate::length::{write_with_length, LengthField};
use crate::notify::Notify;
use crate::proposal::{DhGroup, Proposal};

use ikev2::cursor::ByteCursor;
use ikev2::error::{Error, ErrorKind, Result};

use byteorder::{BigEndian, WriteBytesExt};
use nom::number::complete::{be_u16, be_u8};
use nom::sequence::tuple;
use num_bigint::BigUint;
use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Length of the generic payload header
pub const PAYLOAD_HEADER_LEN: usize = 4;

/// Length of a SHA-1 certification authority hash in a CERTREQ
pub const CA_HASH_LEN: usize = 20;

#[derive(Debug, TryFromPrimitive, IntoPrimitive, PartialEq, Eq, Copy, Clone, Hash)]
#[repr(u8)]
pub enum PayloadType {
    NoNextPayload = 0,
    SecurityAssociation = 33,
    KeyExchange = 34,
    CertificateRequest = 38,
    Nonce = 40,
    Notify = 41,
}

#[derive(Debug, TryFromPrimitive, IntoPrimitive, PartialEq, Eq, Copy, Clone, Hash)]
#[repr(u8)]
pub enum CertificateEncoding {
    X509CertificateSignature = 4,
}

#[derive(Debug, PartialEq, Eq, Clone, Hash)]
pub struct KeyExchange {
    pub group: DhGroup,
    pub public_value: BigUint,
}

#[derive(Debug, PartialEq, Eq, Clone, Hash)]
pub struct CertificateRequest {
    pub encoding: CertificateEncoding,
    pub authorities: Vec<[u8; CA_HASH_LEN]>,
}

#[derive(Debug, PartialEq, Eq, Clone, Hash)]
pub enum Payload {
    SecurityAssociation(Vec<Proposal>),
    KeyExchange(KeyExchange),
    CertificateRequest(CertificateRequest),
    Nonce(Vec<u8>),
    Notify(Notify),
}

impl Payload {
    pub fn payload_type(&self) -> PayloadType {
        match self {
            Payload::SecurityAssociation(_) => PayloadType::SecurityAssociation,
            Payload::KeyExchange(_) => PayloadType::KeyExchange,
            Payload::CertificateRequest(_) => PayloadType::CertificateRequest,
            Payload::Nonce(_) => PayloadType::Nonce,
            Payload::Notify(_) => PayloadType::Notify,
        }
    }

    //                      1                   2                   3
    //  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
    // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    // | Next Payload  |C|  RESERVED   |         Payload Length        |
    // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    /// Decode one payload announced as `payload_type`, returning it with the
    /// type announced for the payload after it.
    pub(crate) fn parse(
        cursor: &mut ByteCursor<'_>,
        payload_type: PayloadType,
    ) -> Result<(Self, PayloadType)> {
        Self::parse_generic(cursor, payload_type)
            .map_err(|err| err.recast(ErrorKind::PayloadTooShort))
    }

    fn parse_generic(
        cursor: &mut ByteCursor<'_>,
        payload_type: PayloadType,
    ) -> Result<(Self, PayloadType)> {
        let (raw_next_payload, critical, length) = cursor.read(tuple((be_u8, be_u8, be_u16)))?;
        let next_payload = PayloadType::try_from(raw_next_payload).map_err(|_| {
            Error::new(ErrorKind::InvalidNextPayload)
                .context(|| format!("next payload {}", raw_next_payload))
        })?;
        if critical != 0 {
            return Err(Error::new(ErrorKind::UnexpectedCriticalBit)
                .context(|| format!("{:?} flags {:#04x}", payload_type, critical)));
        }
        let body_len = usize::from(length)
            .checked_sub(PAYLOAD_HEADER_LEN)
            .ok_or_else(|| {
                Error::new(ErrorKind::InvalidConversion)
                    .context(|| format!("{:?} length {}", payload_type, length))
            })?;

        let payload = cursor.scoped_exact(body_len, |body| match payload_type {
            PayloadType::SecurityAssociation => {
                Proposal::parse_all(body).map(Payload::SecurityAssociation)
            }
            PayloadType::KeyExchange => Self::parse_key_exchange(body),
            PayloadType::CertificateRequest => Self::parse_certificate_request(body),
            PayloadType::Nonce => Ok(Payload::Nonce(body.take_all().to_vec())),
            PayloadType::Notify => Notify::parse(body).map(Payload::Notify),
            PayloadType::NoNextPayload => Err(Error::new(ErrorKind::InvalidNextPayload)),
        })?;
        Ok((payload, next_payload))
    }

    //                      1                   2                   3
    //  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
    // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    // |   Diffie-Hellman Group Num    |           RESERVED            |
    // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    // |                                                               |
    // ~                       Key Exchange Data                       ~
    // |                                                               |
    // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    fn parse_key_exchange(body: &mut ByteCursor<'_>) -> Result<Self> {
        let group = body.map_u16(ErrorKind::InvalidDiffieHellmanGroup, |raw| {
            DhGroup::try_from(raw).ok()
        })?;
        let _reserved = body.take_u16()?;
        Ok(Payload::KeyExchange(KeyExchange {
            group,
            public_value: BigUint::from_bytes_be(body.take_all()),
        }))
    }

    //                      1                   2                   3
    //  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
    // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    // | Cert Encoding |                                               |
    // +-+-+-+-+-+-+-+-+                                               |
    // ~                    Certification Authority                    ~
    // |                                                               |
    // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    fn parse_certificate_request(body: &mut ByteCursor<'_>) -> Result<Self> {
        let encoding = body.map_u8(ErrorKind::InvalidCertificateType, |raw| {
            CertificateEncoding::try_from(raw).ok()
        })?;
        let mut authorities = Vec::new();
        while !body.is_empty() {
            let mut hash = [0u8; CA_HASH_LEN];
            hash.copy_from_slice(body.take(CA_HASH_LEN)?);
            authorities.push(hash);
        }
        Ok(Payload::CertificateRequest(CertificateRequest {
            encoding,
            authorities,
        }))
    }

    /// Append this payload, announcing `next_payload` as the one after it.
    pub(crate) fn encode(&self, next_payload: PayloadType, out: &mut Vec<u8>) -> Result<()> {
        let mut body = Vec::new();
        match self {
            Payload::SecurityAssociation(proposals) => Proposal::encode_all(proposals, &mut body)?,
            Payload::KeyExchange(key_exchange) => {
                let public_value = key_exchange.public_value.to_bytes_be();
                let padding = key_exchange
                    .group
                    .public_value_len()
                    .saturating_sub(public_value.len());
                body.write_u16::<BigEndian>(key_exchange.group.into())?;
                body.write_u16::<BigEndian>(0)?;
                body.resize(body.len().saturating_add(padding), 0);
                body.extend_from_slice(&public_value);
            }
            Payload::CertificateRequest(request) => {
                body.push(request.encoding.into());
                for authority in &request.authorities {
                    body.extend_from_slice(authority);
                }
            }
            Payload::Nonce(nonce) => body.extend_from_slice(nonce),
            Payload::Notify(notify) => notify.encode(&mut body)?,
        }
        write_with_length(out, &[next_payload.into(), 0], LengthField::U16, &body)
    }
}
