use crate::length::{write_with_length, LengthField};
use crate::payloads::PayloadType;

use ikev2::cursor::ByteCursor;
use ikev2::error::{Error, ErrorKind, Result};

use nom::number::complete::be_u64;
use nom::sequence::tuple;
use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Length of an IKE header
pub const HEADER_LEN: usize = 28;

/// Major version 2, minor version 0
pub const IKE_VERSION: u8 = 0x20;

#[derive(Debug, TryFromPrimitive, IntoPrimitive, PartialEq, Eq, Copy, Clone, Hash)]
#[repr(u8)]
pub enum ExchangeType {
    IkeSaInit = 34,
    IkeAuth = 35,
    CreateChildSa = 36,
    Informational = 37,
}

bitflags::bitflags! {
    /// Header flags. Bits outside the named ones are kept as received.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct IkeFlags: u8 {
        const RESPONSE = 0b0010_0000;
        const VERSION = 0b0001_0000;
        const INITIATOR = 0b0000_1000;
    }
}

/// The header fields that identify an exchange.
///
/// Version, next payload and length are derived from the rest of the packet
/// when encoding and validated when decoding, so they are not stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Header {
    pub initiator_spi: u64,
    pub responder_spi: u64,
    pub message_id: u32,
}

/// Everything the header tells the payload walker.
#[derive(Debug)]
pub(crate) struct HeaderContents {
    pub header: Header,
    pub exchange_type: ExchangeType,
    pub flags: IkeFlags,
    pub next_payload: PayloadType,
}

impl Header {
    //                      1                   2                   3
    //  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
    // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    // |                       IKE SA Initiator's SPI                  |
    // |                                                               |
    // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    // |                       IKE SA Responder's SPI                  |
    // |                                                               |
    // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    // |  Next Payload | MjVer | MnVer | Exchange Type |     Flags     |
    // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    // |                          Message ID                           |
    // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    // |                            Length                             |
    // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    pub(crate) fn parse(cursor: &mut ByteCursor<'_>) -> Result<HeaderContents> {
        let datagram_len = cursor.remaining();
        Self::parse_fields(cursor, datagram_len).map_err(|err| err.recast(ErrorKind::HeaderTooShort))
    }

    fn parse_fields(cursor: &mut ByteCursor<'_>, datagram_len: usize) -> Result<HeaderContents> {
        let (initiator_spi, responder_spi) = cursor.read(tuple((be_u64, be_u64)))?;
        let next_payload = cursor.map_u8(ErrorKind::InvalidNextPayload, |raw| {
            PayloadType::try_from(raw).ok()
        })?;
        cursor.map_u8(ErrorKind::InvalidIKEVersion, |raw| {
            (raw == IKE_VERSION).then_some(raw)
        })?;
        let exchange_type = cursor.map_u8(ErrorKind::InvalidExchangeType, |raw| {
            ExchangeType::try_from(raw).ok()
        })?;
        let flags = IkeFlags::from_bits_retain(cursor.take_u8()?);
        let message_id = cursor.take_u32()?;
        let length = cursor.take_u32()?;

        // Anything past the declared length is left for the payload walker
        // to reject, but a length that stops short of the datagram is wrong.
        if usize::try_from(length).map_or(false, |length| length < datagram_len) {
            return Err(Error::new(ErrorKind::InvalidPacketLength).context(|| {
                format!("declared {} bytes, received {}", length, datagram_len)
            }));
        }

        Ok(HeaderContents {
            header: Header {
                initiator_spi,
                responder_spi,
                message_id,
            },
            exchange_type,
            flags,
            next_payload,
        })
    }

    /// Append the header followed by `payloads`, with the length field
    /// covering both.
    pub(crate) fn encode(
        &self,
        exchange_type: ExchangeType,
        flags: IkeFlags,
        first_payload: PayloadType,
        payloads: &[u8],
        out: &mut Vec<u8>,
    ) -> Result<()> {
        let mut prefix = Vec::with_capacity(HEADER_LEN);
        prefix.extend_from_slice(&self.initiator_spi.to_be_bytes());
        prefix.extend_from_slice(&self.responder_spi.to_be_bytes());
        prefix.push(first_payload.into());
        prefix.push(IKE_VERSION);
        prefix.push(exchange_type.into());
        prefix.push(flags.bits());
        prefix.extend_from_slice(&self.message_id.to_be_bytes());
        write_with_length(out, &prefix, LengthField::U32, payloads)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const SA_INIT_HEADER: [u8; HEADER_LEN] = [
        0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, // ispi
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // rspi
        0x00, 0x20, 0x22, 0x08, // next, version, exchange, flags
        0x00, 0x00, 0x00, 0x00, // message id
        0x00, 0x00, 0x00, 0x1c, // length
    ];

    #[test]
    fn parse_header() {
        let mut cursor = ByteCursor::new(&SA_INIT_HEADER);
        let contents = Header::parse(&mut cursor).unwrap();
        assert_eq!(
            contents.header,
            Header {
                initiator_spi: 0x0102030405060708,
                responder_spi: 0,
                message_id: 0,
            }
        );
        assert_eq!(contents.exchange_type, ExchangeType::IkeSaInit);
        assert_eq!(contents.flags, IkeFlags::INITIATOR);
        assert_eq!(contents.next_payload, PayloadType::NoNextPayload);
        assert!(cursor.is_empty());
    }

    #[rstest(index, value, expected,
        case::next_payload(16, 0xff, ErrorKind::InvalidNextPayload),
        case::version_one(17, 0x10, ErrorKind::InvalidIKEVersion),
        case::minor_version(17, 0x21, ErrorKind::InvalidIKEVersion),
        case::exchange_type(18, 99, ErrorKind::InvalidExchangeType),
        case::exchange_ikev1(18, 2, ErrorKind::InvalidExchangeType),
        case::short_length(27, 0x1b, ErrorKind::InvalidPacketLength),
    )]
    fn parse_header_rejects(index: usize, value: u8, expected: ErrorKind) {
        let mut input = SA_INIT_HEADER;
        input[index] = value;
        assert_eq!(
            Header::parse(&mut ByteCursor::new(&input)).map(|_| ()),
            Err(Error::new(expected))
        );
    }

    #[test]
    fn parse_header_truncated() {
        for len in 0..HEADER_LEN {
            assert_eq!(
                Header::parse(&mut ByteCursor::new(&SA_INIT_HEADER[..len])).map(|_| ()),
                Err(Error::new(ErrorKind::HeaderTooShort)),
                "length {}",
                len
            );
        }
    }

    #[test]
    fn unknown_flag_bits_survive() {
        let mut input = SA_INIT_HEADER;
        input[19] = 0x29;
        let contents = Header::parse(&mut ByteCursor::new(&input)).unwrap();
        assert!(contents.flags.contains(IkeFlags::RESPONSE | IkeFlags::INITIATOR));
        assert_eq!(contents.flags.bits(), 0x29);
    }

    #[test]
    fn encode_header() {
        let header = Header {
            initiator_spi: 0x0102030405060708,
            responder_spi: 0,
            message_id: 0,
        };
        let mut out = Vec::new();
        header
            .encode(
                ExchangeType::IkeSaInit,
                IkeFlags::INITIATOR,
                PayloadType::NoNextPayload,
                &[],
                &mut out,
            )
            .unwrap();
        assert_eq!(out, SA_INIT_HEADER);
    }
}
