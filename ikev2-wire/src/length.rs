use ikev2::error::{Error, ErrorKind, Result};

/// Width of a self-inclusive length field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LengthField {
    U16,
    U32,
}

impl LengthField {
    fn width(self) -> usize {
        match self {
            LengthField::U16 => 2,
            LengthField::U32 => 4,
        }
    }
}

/// Append `prefix`, a length field, then `body`.
///
/// The length counts all three, which is how IKE sizes the packet, every
/// payload, proposal and transform.
pub(crate) fn write_with_length(
    out: &mut Vec<u8>,
    prefix: &[u8],
    field: LengthField,
    body: &[u8],
) -> Result<()> {
    let total = prefix
        .len()
        .checked_add(field.width())
        .and_then(|len| len.checked_add(body.len()))
        .ok_or_else(|| Error::new(ErrorKind::LengthOverflow))?;
    let overflow = || {
        Error::new(ErrorKind::LengthOverflow)
            .context(|| format!("{} bytes in a {:?} length field", total, field))
    };

    out.reserve(total);
    match field {
        LengthField::U16 => {
            let length = u16::try_from(total).map_err(|_| overflow())?;
            out.extend_from_slice(prefix);
            out.extend_from_slice(&length.to_be_bytes());
        }
        LengthField::U32 => {
            let length = u32::try_from(total).map_err(|_| overflow())?;
            out.extend_from_slice(prefix);
            out.extend_from_slice(&length.to_be_bytes());
        }
    }
    out.extend_from_slice(body);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest(prefix, field, body, expected,
        case::transform(&[0x03, 0x00], LengthField::U16, &[0x02, 0x00, 0x00, 0x05], vec![0x03, 0x00, 0x00, 0x08, 0x02, 0x00, 0x00, 0x05]),
        case::empty_body(&[0x00, 0x00], LengthField::U16, &[], vec![0x00, 0x00, 0x00, 0x04]),
        case::wide(&[0xaa], LengthField::U32, &[0xbb], vec![0xaa, 0x00, 0x00, 0x00, 0x06, 0xbb]),
    )]
    fn prefix_with_length(prefix: &[u8], field: LengthField, body: &[u8], expected: Vec<u8>) {
        let mut out = Vec::new();
        assert_eq!(write_with_length(&mut out, prefix, field, body), Ok(()));
        assert_eq!(out, expected);
    }

    #[test]
    fn appends_after_existing_output() {
        let mut out = vec![0xff];
        assert_eq!(
            write_with_length(&mut out, &[0x00, 0x00], LengthField::U16, &[0x01]),
            Ok(())
        );
        assert_eq!(out, vec![0xff, 0x00, 0x00, 0x00, 0x05, 0x01]);
    }

    #[test]
    fn body_too_large_for_field() {
        let mut out = Vec::new();
        let body = vec![0u8; usize::from(u16::MAX)];
        assert_eq!(
            write_with_length(&mut out, &[0x00, 0x00], LengthField::U16, &body),
            Err(Error::new(ErrorKind::LengthOverflow))
        );
        assert!(out.is_empty());
    }
}
