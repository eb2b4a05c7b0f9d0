use ikev2::cursor::ByteCursor;
use ikev2::error::{Error, ErrorKind, Result};

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Notify message types below this value report errors
const FIRST_STATUS_TYPE: u16 = 16384;

#[derive(Debug, TryFromPrimitive, IntoPrimitive, PartialEq, Eq, Copy, Clone, Hash)]
#[repr(u16)]
pub enum MessageType {
    InvalidSyntax = 7,
    NoProposalChosen = 14,
    InvalidKePayload = 17,
    NatDetectionSourceIp = 16388,
    NatDetectionDestinationIp = 16389,
    Cookie = 16390,
    RedirectSupported = 16406,
    FragmentationSupported = 16430,
}

impl MessageType {
    pub fn is_error(self) -> bool {
        u16::from(self) < FIRST_STATUS_TYPE
    }

    /// Whether the notification data field is defined for this type.
    pub fn carries_data(self) -> bool {
        !matches!(
            self,
            MessageType::RedirectSupported | MessageType::FragmentationSupported
        )
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Hash)]
pub struct Notify {
    pub protocol_id: u8,
    /// Empty when the notification concerns the IKE SA being set up
    pub spi: Vec<u8>,
    pub message_type: MessageType,
    /// Must stay empty for types without a data field
    pub data: Vec<u8>,
}

impl Notify {
    fn status(message_type: MessageType, data: Vec<u8>) -> Self {
        Self {
            protocol_id: 0,
            spi: vec![],
            message_type,
            data,
        }
    }

    pub fn redirect_supported() -> Self {
        Self::status(MessageType::RedirectSupported, Vec::new())
    }

    pub fn fragmentation_supported() -> Self {
        Self::status(MessageType::FragmentationSupported, Vec::new())
    }

    pub fn nat_detection_source(hash: Vec<u8>) -> Self {
        Self::status(MessageType::NatDetectionSourceIp, hash)
    }

    pub fn nat_detection_destination(hash: Vec<u8>) -> Self {
        Self::status(MessageType::NatDetectionDestinationIp, hash)
    }

    /// Echo a responder's cookie back to it.
    pub fn cookie(data: Vec<u8>) -> Self {
        Self::status(MessageType::Cookie, data)
    }

    //                      1                   2                   3
    //  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
    // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    // | Next Payload  |C|  RESERVED   |         Payload Length        |
    // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    // |  Protocol ID  |   SPI Size    |      Notify Message Type      |
    // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    // |                                                               |
    // ~                Security Parameter Index (SPI)                 ~
    // |                                                               |
    // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    // |                                                               |
    // ~                       Notification Data                       ~
    // |                                                               |
    // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    pub(crate) fn parse(body: &mut ByteCursor<'_>) -> Result<Self> {
        let protocol_id = body.take_u8()?;
        let spi_size = body.take_u8()?;
        let message_type = body.map_u16(ErrorKind::InvalidMessageType, |raw| {
            MessageType::try_from(raw).ok()
        })?;
        let spi = body.take(usize::from(spi_size))?.to_vec();
        // Types without a data field leave any trailing bytes unread, which
        // the enclosing length check reports.
        let data = if message_type.carries_data() {
            body.take_all().to_vec()
        } else {
            Vec::new()
        };

        Ok(Self {
            protocol_id,
            spi,
            message_type,
            data,
        })
    }

    pub(crate) fn encode(&self, out: &mut Vec<u8>) -> Result<()> {
        // The decoder rejects trailing bytes after these types
        if !self.message_type.carries_data() && !self.data.is_empty() {
            return Err(Error::new(ErrorKind::InvalidConversion).context(|| {
                format!("{:?} has no data field", self.message_type)
            }));
        }
        let spi_size = u8::try_from(self.spi.len()).map_err(|_| {
            Error::new(ErrorKind::LengthOverflow).context(|| "notify SPI".to_string())
        })?;
        out.push(self.protocol_id);
        out.push(spi_size);
        out.extend_from_slice(&u16::from(self.message_type).to_be_bytes());
        out.extend_from_slice(&self.spi);
        out.extend_from_slice(&self.data);
        Ok(())
    }
}
