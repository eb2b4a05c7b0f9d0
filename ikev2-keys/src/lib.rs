//! Keying for an IKE SA.
//!
//! [`dh`] runs the MODP Diffie-Hellman exchange carried in the KE payloads,
//! [`prf`] provides the negotiated pseudo-random function and prf+, and
//! [`keys`] turns the shared secret and both nonces into SK_d, SK_ai, SK_ar,
//! SK_ei, SK_er, SK_pi and SK_pr.
//!
//! # Example
//! ```
//! use ikev2::entropy::OsEntropy;
//! use ikev2_keys::{KeyMaterial, KeyPair, KeySizes};
//! use ikev2_wire::{DhGroup, PrfAlgorithm};
//!
//! let initiator = KeyPair::generate(DhGroup::Modp3072, &OsEntropy).unwrap();
//! let responder = KeyPair::generate(DhGroup::Modp3072, &OsEntropy).unwrap();
//! let secret = initiator
//!     .shared_secret(DhGroup::Modp3072, responder.public_value())
//!     .unwrap();
//!
//! let sizes = KeySizes { prf: 32, integrity: 16, encryption: 32 };
//! let keys = KeyMaterial::derive(
//!     PrfAlgorithm::HmacSha256,
//!     sizes,
//!     secret.as_bytes(),
//!     &[0x01; 32],
//!     &[0x02; 32],
//!     0x0102030405060708,
//!     0x1112131415161718,
//! )
//! .unwrap();
//! assert_eq!(keys.sk_ei.len(), 32);
//! ```

pub mod dh;
pub mod keys;
pub mod prf;

pub use dh::{group_parameters, GroupParameters, KeyPair, SharedSecret};
pub use keys::{skeyseed, KeyMaterial, KeySizes};
pub use prf::Prf;
