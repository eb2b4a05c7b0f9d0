use crate::length::{write_with_length, LengthField};

use ikev2::cursor::ByteCursor;
use ikev2::error::{Error, ErrorKind, Result};

use byteorder::{BigEndian, WriteBytesExt};
use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Proposal, transform and attribute sub-headers are all this long
pub const SUBSTRUCTURE_HEADER_LEN: usize = 4;

const LAST_PROPOSAL: u8 = 0;
const MORE_PROPOSALS: u8 = 2;
const LAST_TRANSFORM: u8 = 0;
const MORE_TRANSFORMS: u8 = 3;

/// Attribute Format bit: set for the two byte type/value form
const ATTRIBUTE_FORMAT_TV: u16 = 0x8000;

#[derive(Debug, TryFromPrimitive, IntoPrimitive, PartialEq, Eq, Copy, Clone, Hash)]
#[repr(u8)]
pub enum ProtocolId {
    Ike = 1,
}

#[derive(Debug, TryFromPrimitive, IntoPrimitive, PartialEq, Eq, Copy, Clone, Hash)]
#[repr(u8)]
pub enum TransformType {
    Encryption = 1,
    Prf = 2,
    DiffieHellman = 4,
}

#[derive(Debug, TryFromPrimitive, IntoPrimitive, PartialEq, Eq, Copy, Clone, Hash)]
#[repr(u16)]
pub enum EncryptionId {
    AesGcm16 = 20,
}

#[derive(Debug, TryFromPrimitive, IntoPrimitive, PartialEq, Eq, Copy, Clone, Hash)]
#[repr(u16)]
pub enum PrfAlgorithm {
    HmacSha256 = 5,
}

impl PrfAlgorithm {
    /// Output size of the PRF, which is also its preferred key size.
    pub fn key_size(self) -> usize {
        match self {
            PrfAlgorithm::HmacSha256 => 32,
        }
    }
}

#[derive(Debug, TryFromPrimitive, IntoPrimitive, PartialEq, Eq, Copy, Clone, Hash)]
#[repr(u16)]
pub enum DhGroup {
    Modp3072 = 15,
}

impl DhGroup {
    /// Length of a public value in a Key Exchange payload, the size of the
    /// group's prime.
    pub fn public_value_len(self) -> usize {
        match self {
            DhGroup::Modp3072 => 384,
        }
    }
}

#[derive(Debug, TryFromPrimitive, IntoPrimitive, PartialEq, Eq, Copy, Clone, Hash)]
#[repr(u16)]
pub enum AttributeType {
    KeyLength = 14,
}

#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash)]
pub enum Attribute {
    /// Key length in bits
    KeyLength(u16),
}

#[derive(Debug, PartialEq, Eq, Clone, Hash)]
pub enum EncryptionAlgorithm {
    AesGcm16(Vec<Attribute>),
}

impl EncryptionAlgorithm {
    /// AES-GCM with a 128 bit key unless a KeyLength attribute says otherwise.
    const DEFAULT_KEY_SIZE: usize = 16;
    /// AES-GCM authenticates on its own; this is the size the key schedule
    /// reserves for SK_ai and SK_ar regardless.
    const AEAD_INTEGRITY_KEY_SIZE: usize = 16;

    pub fn id(&self) -> EncryptionId {
        match self {
            EncryptionAlgorithm::AesGcm16(_) => EncryptionId::AesGcm16,
        }
    }

    pub fn attributes(&self) -> &[Attribute] {
        match self {
            EncryptionAlgorithm::AesGcm16(attributes) => attributes,
        }
    }

    pub fn key_length_bits(&self) -> Option<u16> {
        self.attributes().iter().find_map(|attribute| match attribute {
            Attribute::KeyLength(bits) => Some(*bits),
        })
    }

    /// Size in bytes of SK_ei and SK_er.
    pub fn key_size(&self) -> usize {
        self.key_length_bits()
            .and_then(|bits| bits.checked_div(8))
            .map_or(Self::DEFAULT_KEY_SIZE, usize::from)
    }

    /// Size in bytes of SK_ai and SK_ar.
    pub fn integrity_key_size(&self) -> usize {
        match self {
            EncryptionAlgorithm::AesGcm16(_) => Self::AEAD_INTEGRITY_KEY_SIZE,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Hash)]
pub enum Transform {
    Encryption(EncryptionAlgorithm),
    Prf(PrfAlgorithm),
    DiffieHellman(DhGroup),
}

impl Transform {
    pub fn transform_type(&self) -> TransformType {
        match self {
            Transform::Encryption(_) => TransformType::Encryption,
            Transform::Prf(_) => TransformType::Prf,
            Transform::DiffieHellman(_) => TransformType::DiffieHellman,
        }
    }

    //                      1                   2                   3
    //  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
    // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    // | Last Substruc |   RESERVED    |        Transform Length       |
    // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    // |Transform Type |   RESERVED    |          Transform ID         |
    // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    // |                                                               |
    // ~                      Transform Attributes                     ~
    // |                                                               |
    // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    fn parse(cursor: &mut ByteCursor<'_>, last: bool) -> Result<Self> {
        let expected = if last { LAST_TRANSFORM } else { MORE_TRANSFORMS };
        cursor.map_u8(ErrorKind::InvalidNextTransform, |raw| {
            (raw == expected).then_some(raw)
        })?;
        let _reserved = cursor.take_u8()?;
        let length = cursor.take_u16()?;
        let body_len = usize::from(length)
            .checked_sub(SUBSTRUCTURE_HEADER_LEN)
            .ok_or_else(|| {
                Error::new(ErrorKind::InvalidTransformLength)
                    .context(|| format!("transform length {}", length))
            })?;

        cursor
            .scoped_exact(body_len, Self::parse_body)
            .map_err(|err| match err.kind() {
                ErrorKind::InvalidConversion => Error::new(ErrorKind::InvalidTransformLength)
                    .context(|| format!("transform length {}", length)),
                _ => err,
            })
    }

    fn parse_body(body: &mut ByteCursor<'_>) -> Result<Self> {
        let transform_type = body.map_u8(ErrorKind::InvalidTransformType, |raw| {
            TransformType::try_from(raw).ok()
        })?;
        let _reserved = body.take_u8()?;

        Ok(match transform_type {
            TransformType::Encryption => {
                let id = body.map_u16(ErrorKind::InvalidTransformId, |raw| {
                    EncryptionId::try_from(raw).ok()
                })?;
                let mut attributes = Vec::new();
                while !body.is_empty() {
                    attributes.push(Attribute::parse(body)?);
                }
                match id {
                    EncryptionId::AesGcm16 => {
                        Transform::Encryption(EncryptionAlgorithm::AesGcm16(attributes))
                    }
                }
            }
            TransformType::Prf => Transform::Prf(body.map_u16(ErrorKind::InvalidTransformId, |raw| {
                PrfAlgorithm::try_from(raw).ok()
            })?),
            TransformType::DiffieHellman => Transform::DiffieHellman(
                body.map_u16(ErrorKind::InvalidDiffieHellmanGroup, |raw| {
                    DhGroup::try_from(raw).ok()
                })?,
            ),
        })
    }

    fn encode(&self, last: bool, out: &mut Vec<u8>) -> Result<()> {
        let mut body = vec![u8::from(self.transform_type()), 0];
        match self {
            Transform::Encryption(algorithm) => {
                body.write_u16::<BigEndian>(algorithm.id().into())?;
                for attribute in algorithm.attributes() {
                    attribute.encode(&mut body)?;
                }
            }
            Transform::Prf(prf) => body.write_u16::<BigEndian>((*prf).into())?,
            Transform::DiffieHellman(group) => body.write_u16::<BigEndian>((*group).into())?,
        }
        let next = if last { LAST_TRANSFORM } else { MORE_TRANSFORMS };
        write_with_length(out, &[next, 0], LengthField::U16, &body)
    }
}

impl Attribute {
    //                      1                   2                   3
    //  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
    // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    // |A|       Attribute Type        |    AF=0  Attribute Length     |
    // |F|                             |    AF=1  Attribute Value      |
    // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    // |                   AF=0  Attribute Value                       |
    // |                   AF=1  Not Transmitted                       |
    // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    fn parse(cursor: &mut ByteCursor<'_>) -> Result<Self> {
        let tagged = cursor.map_u16(ErrorKind::InvalidTransformAttribute, |raw| {
            AttributeType::try_from(raw & !ATTRIBUTE_FORMAT_TV)
                .ok()
                .map(|attribute_type| (raw & ATTRIBUTE_FORMAT_TV != 0, attribute_type))
        })?;

        match tagged {
            (true, AttributeType::KeyLength) => Ok(Attribute::KeyLength(cursor.take_u16()?)),
            // Key Length is only defined in the short form
            (false, AttributeType::KeyLength) => Err(Error::new(
                ErrorKind::InvalidTransformAttribute,
            )
            .context(|| "key length in type/length/value form".to_string())),
        }
    }

    fn encode(&self, out: &mut Vec<u8>) -> Result<()> {
        match self {
            Attribute::KeyLength(bits) => {
                out.write_u16::<BigEndian>(
                    ATTRIBUTE_FORMAT_TV | u16::from(AttributeType::KeyLength),
                )?;
                out.write_u16::<BigEndian>(*bits)?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Hash)]
pub enum Proposal {
    Ike {
        /// Empty in IKE_SA_INIT
        spi: Vec<u8>,
        transforms: Vec<Transform>,
    },
}

impl Proposal {
    pub fn protocol_id(&self) -> ProtocolId {
        match self {
            Proposal::Ike { .. } => ProtocolId::Ike,
        }
    }

    pub fn transforms(&self) -> &[Transform] {
        match self {
            Proposal::Ike { transforms, .. } => transforms,
        }
    }

    /// Read proposals until one says it is the last.
    pub(crate) fn parse_all(cursor: &mut ByteCursor<'_>) -> Result<Vec<Self>> {
        let mut proposals = Vec::new();
        loop {
            let (proposal, more) = Self::parse(cursor, proposals.len())?;
            proposals.push(proposal);
            if !more {
                return Ok(proposals);
            }
        }
    }

    //                      1                   2                   3
    //  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
    // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    // | Last Substruc |   RESERVED    |         Proposal Length       |
    // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    // | Proposal Num  |  Protocol ID  |    SPI Size   |Num  Transforms|
    // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    // ~                        SPI (variable)                         ~
    // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    // |                                                               |
    // ~                        <Transforms>                           ~
    // |                                                               |
    // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    fn parse(cursor: &mut ByteCursor<'_>, preceding: usize) -> Result<(Self, bool)> {
        let more = cursor.map_u8(ErrorKind::InvalidNextProposal, |raw| match raw {
            LAST_PROPOSAL => Some(false),
            MORE_PROPOSALS => Some(true),
            _ => None,
        })?;
        let _reserved = cursor.take_u8()?;
        let length = cursor.take_u16()?;
        let body_len = usize::from(length)
            .checked_sub(SUBSTRUCTURE_HEADER_LEN)
            .ok_or_else(|| {
                Error::new(ErrorKind::InvalidConversion)
                    .context(|| format!("proposal length {}", length))
            })?;

        let proposal = cursor.scoped_exact(body_len, |body| {
            let expected = preceding.checked_add(1);
            body.map_u8(ErrorKind::InvalidProposalNumber, |raw| {
                (Some(usize::from(raw)) == expected).then_some(raw)
            })?;
            let protocol_id = body.map_u8(ErrorKind::InvalidProposalID, |raw| {
                ProtocolId::try_from(raw).ok()
            })?;
            match protocol_id {
                ProtocolId::Ike => Self::parse_ike(body),
            }
        })?;
        Ok((proposal, more))
    }

    fn parse_ike(body: &mut ByteCursor<'_>) -> Result<Self> {
        let spi_size = body.take_u8()?;
        let transform_count = body.take_u8()?;
        let spi = body.take(usize::from(spi_size))?.to_vec();
        let transforms = (1..=transform_count)
            .map(|number| Transform::parse(body, number == transform_count))
            .collect::<Result<Vec<_>>>()?;
        Ok(Proposal::Ike { spi, transforms })
    }

    /// Append `proposals` numbered from 1 in order.
    pub(crate) fn encode_all(proposals: &[Self], out: &mut Vec<u8>) -> Result<()> {
        for (index, proposal) in proposals.iter().enumerate() {
            let last = Some(index) == proposals.len().checked_sub(1);
            let number = index
                .checked_add(1)
                .and_then(|number| u8::try_from(number).ok())
                .ok_or_else(|| Error::new(ErrorKind::LengthOverflow))?;
            proposal.encode(number, last, out)?;
        }
        Ok(())
    }

    fn encode(&self, number: u8, last: bool, out: &mut Vec<u8>) -> Result<()> {
        let mut body = vec![number, self.protocol_id().into()];
        match self {
            Proposal::Ike { spi, transforms } => {
                body.push(u8::try_from(spi.len()).map_err(|_| {
                    Error::new(ErrorKind::LengthOverflow).context(|| "proposal SPI".to_string())
                })?);
                body.push(u8::try_from(transforms.len()).map_err(|_| {
                    Error::new(ErrorKind::LengthOverflow)
                        .context(|| "transform count".to_string())
                })?);
                body.extend_from_slice(spi);
                for (index, transform) in transforms.iter().enumerate() {
                    let last = Some(index) == transforms.len().checked_sub(1);
                    transform.encode(last, &mut body)?;
                }
            }
        }
        let next = if last { LAST_PROPOSAL } else { MORE_PROPOSALS };
        write_with_length(out, &[next, 0], LengthField::U16, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest(input, expected,
        case::encryption(
            &[0x00, 0x00, 0x00, 0x0c, 0x01, 0x00, 0x00, 0x14, 0x80, 0x0e, 0x01, 0x00],
            Ok(Transform::Encryption(EncryptionAlgorithm::AesGcm16(vec![Attribute::KeyLength(256)])))
        ),
        case::encryption_without_attributes(
            &[0x00, 0x00, 0x00, 0x08, 0x01, 0x00, 0x00, 0x14],
            Ok(Transform::Encryption(EncryptionAlgorithm::AesGcm16(vec![])))
        ),
        case::prf(
            &[0x00, 0x00, 0x00, 0x08, 0x02, 0x00, 0x00, 0x05],
            Ok(Transform::Prf(PrfAlgorithm::HmacSha256))
        ),
        case::dh(
            &[0x00, 0x00, 0x00, 0x08, 0x04, 0x00, 0x00, 0x0f],
            Ok(Transform::DiffieHellman(DhGroup::Modp3072))
        ),
        case::dh_group_19(
            &[0x00, 0x00, 0x00, 0x08, 0x04, 0x00, 0x00, 0x13],
            Err(Error::new(ErrorKind::InvalidDiffieHellmanGroup))
        ),
        case::integrity_type(
            &[0x00, 0x00, 0x00, 0x08, 0x03, 0x00, 0x00, 0x0c],
            Err(Error::new(ErrorKind::InvalidTransformType))
        ),
        case::aes_cbc(
            &[0x00, 0x00, 0x00, 0x08, 0x01, 0x00, 0x00, 0x0c],
            Err(Error::new(ErrorKind::InvalidTransformId))
        ),
        case::prf_sha1(
            &[0x00, 0x00, 0x00, 0x08, 0x02, 0x00, 0x00, 0x02],
            Err(Error::new(ErrorKind::InvalidTransformId))
        ),
        case::long_form_key_length(
            &[0x00, 0x00, 0x00, 0x0e, 0x01, 0x00, 0x00, 0x14, 0x00, 0x0e, 0x00, 0x02, 0x01, 0x00],
            Err(Error::new(ErrorKind::InvalidTransformAttribute))
        ),
        case::unknown_attribute(
            &[0x00, 0x00, 0x00, 0x0c, 0x01, 0x00, 0x00, 0x14, 0x80, 0x01, 0x00, 0x01],
            Err(Error::new(ErrorKind::InvalidTransformAttribute))
        ),
        case::more_on_last(
            &[0x03, 0x00, 0x00, 0x08, 0x02, 0x00, 0x00, 0x05],
            Err(Error::new(ErrorKind::InvalidNextTransform))
        ),
        case::padded(
            &[0x00, 0x00, 0x00, 0x09, 0x02, 0x00, 0x00, 0x05, 0x00],
            Err(Error::new(ErrorKind::InvalidTransformLength))
        ),
        case::length_below_header(
            &[0x00, 0x00, 0x00, 0x03, 0x02, 0x00, 0x00, 0x05],
            Err(Error::new(ErrorKind::InvalidTransformLength))
        ),
        case::truncated(
            &[0x00, 0x00, 0x00, 0x07, 0x02, 0x00, 0x00],
            Err(Error::new(ErrorKind::OutOfBounds))
        ),
    )]
    fn parse_last_transform(input: &[u8], expected: Result<Transform>) {
        let mut cursor = ByteCursor::new(input);
        assert_eq!(Transform::parse(&mut cursor, true), expected);
        if expected.is_ok() {
            assert!(cursor.is_empty());
        }
    }

    #[test]
    fn transform_not_last_requires_more_marker() {
        let input = [0x00, 0x00, 0x00, 0x08, 0x02, 0x00, 0x00, 0x05];
        assert_eq!(
            Transform::parse(&mut ByteCursor::new(&input), false),
            Err(Error::new(ErrorKind::InvalidNextTransform))
        );
    }

    #[rstest(attributes, expected,
        case::default(vec![], 16),
        case::aes_128(vec![Attribute::KeyLength(128)], 16),
        case::aes_192(vec![Attribute::KeyLength(192)], 24),
        case::aes_256(vec![Attribute::KeyLength(256)], 32),
    )]
    fn encryption_key_size(attributes: Vec<Attribute>, expected: usize) {
        let algorithm = EncryptionAlgorithm::AesGcm16(attributes);
        assert_eq!(algorithm.key_size(), expected);
        assert_eq!(algorithm.integrity_key_size(), 16);
    }

    #[test]
    fn encode_transform_uses_short_key_length() {
        let transform =
            Transform::Encryption(EncryptionAlgorithm::AesGcm16(vec![Attribute::KeyLength(256)]));
        let mut out = Vec::new();
        transform.encode(false, &mut out).unwrap();
        assert_eq!(
            out,
            vec![0x03, 0x00, 0x00, 0x0c, 0x01, 0x00, 0x00, 0x14, 0x80, 0x0e, 0x01, 0x00]
        );
    }

    #[test]
    fn proposals_are_numbered_in_order() {
        let proposals = vec![
            Proposal::Ike {
                spi: vec![],
                transforms: vec![Transform::Prf(PrfAlgorithm::HmacSha256)],
            },
            Proposal::Ike {
                spi: vec![0xaa, 0xbb],
                transforms: vec![Transform::DiffieHellman(DhGroup::Modp3072)],
            },
        ];
        let mut out = Vec::new();
        Proposal::encode_all(&proposals, &mut out).unwrap();
        assert_eq!(
            out,
            vec![
                0x02, 0x00, 0x00, 0x10, 0x01, 0x01, 0x00, 0x01, // proposal 1, more follow
                0x00, 0x00, 0x00, 0x08, 0x02, 0x00, 0x00, 0x05, // prf
                0x00, 0x00, 0x00, 0x12, 0x02, 0x01, 0x02, 0x01, // proposal 2, last
                0xaa, 0xbb, // spi
                0x00, 0x00, 0x00, 0x08, 0x04, 0x00, 0x00, 0x0f, // dh
            ]
        );

        let mut cursor = ByteCursor::new(&out);
        assert_eq!(Proposal::parse_all(&mut cursor), Ok(proposals));
        assert!(cursor.is_empty());
    }

    #[rstest(input, expected,
        case::skipped_number(
            &[0x02, 0x00, 0x00, 0x08, 0x01, 0x01, 0x00, 0x00,
              0x00, 0x00, 0x00, 0x08, 0x03, 0x01, 0x00, 0x00],
            Err(Error::new(ErrorKind::InvalidProposalNumber))
        ),
        case::starts_at_zero(
            &[0x00, 0x00, 0x00, 0x08, 0x00, 0x01, 0x00, 0x00],
            Err(Error::new(ErrorKind::InvalidProposalNumber))
        ),
        case::protocol_zero(
            &[0x00, 0x00, 0x00, 0x08, 0x01, 0x00, 0x00, 0x00],
            Err(Error::new(ErrorKind::InvalidProposalID))
        ),
        case::esp(
            &[0x00, 0x00, 0x00, 0x08, 0x01, 0x03, 0x00, 0x00],
            Err(Error::new(ErrorKind::InvalidProposalID))
        ),
        case::bad_next_marker(
            &[0x03, 0x00, 0x00, 0x08, 0x01, 0x01, 0x00, 0x00],
            Err(Error::new(ErrorKind::InvalidNextProposal))
        ),
        case::padded(
            &[0x00, 0x00, 0x00, 0x09, 0x01, 0x01, 0x00, 0x00, 0x00],
            Err(Error::new(ErrorKind::InvalidConversion))
        ),
        case::empty(
            &[0x00, 0x00, 0x00, 0x08, 0x01, 0x01, 0x00, 0x00],
            Ok(vec![Proposal::Ike { spi: vec![], transforms: vec![] }])
        ),
    )]
    fn parse_proposals(input: &[u8], expected: Result<Vec<Proposal>>) {
        assert_eq!(Proposal::parse_all(&mut ByteCursor::new(input)), expected);
    }
}
