use crate::error::Result;
use crate::protocol::Protocol;

pub trait Parse: Protocol {
    /// Parse one complete datagram into the protocol's Message type.
    ///
    /// A message is either decoded in full or not at all; partially decoded
    /// content is discarded on error.
    fn parse(input: &[u8]) -> Result<Self::Message>;
}
