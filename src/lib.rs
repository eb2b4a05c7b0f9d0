/*!
# ikev2: an IKEv2 initiator

This workspace implements the client side of the IKEv2 (RFC 7296)
IKE_SA_INIT exchange: a length-checked codec for the IKE wire format,
Diffie-Hellman key exchange with PRF-based key derivation, and the
handshake state machine that ties them to a datagram transport.

The base library contains the types and traits shared by the member
crates:
- [ikev2-wire](/ikev2-wire) IKE message model, decoder and encoder
- [ikev2-keys](/ikev2-keys) MODP Diffie-Hellman, PRF, prf+ and SK_* derivation
- [ikev2-handshake](/ikev2-handshake) IKE_SA_INIT initiator over UDP
*/

/// Return common errors
pub mod error;

/// Bounds-checked byte reading
pub mod cursor;

/// Secure random source
pub mod entropy;

/// Parse Messages
pub mod parser;

/// Encode Messages
pub mod encoder;

/// Describe a Protocol
pub mod protocol;
