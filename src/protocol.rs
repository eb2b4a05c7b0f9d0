/// Represents the basic elements of a protocol
pub trait Protocol {
    /// Type of message carried by the protocol
    type Message;

    /// Protocol name string
    fn name() -> &'static str;
}
