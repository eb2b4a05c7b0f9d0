use crate::error::Result;
use crate::protocol::Protocol;

pub trait Encode: Protocol {
    /// Serialize a message into the bytes that go on the wire.
    ///
    /// Every length field is computed from the content being written.
    fn encode(message: &Self::Message) -> Result<Vec<u8>>;
}
