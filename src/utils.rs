use crate::{Error, Result};

/// Reads a nul-padded ascii field, trimming the padding.
///
/// Everything after the first nul is ignored, and bytes that aren't valid utf8 are replaced.
pub(crate) fn from_las_bytes(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).trim_end().to_string()
}

/// Writes a string into a nul-padded fixed width field.
pub(crate) fn to_las_bytes<const N: usize>(s: &str) -> Result<[u8; N]> {
    let bytes = s.as_bytes();
    if bytes.len() > N {
        return Err(Error::StringTooLong {
            string: s.to_string(),
            len: N,
        });
    }
    let mut field = [0; N];
    field[..bytes.len()].copy_from_slice(bytes);
    Ok(field)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_padding() {
        assert_eq!("LiDAR", from_las_bytes(&[76, 105, 68, 65, 82, 0, 33]));
        assert_eq!("LiDAR", from_las_bytes(b"LiDAR   "));
        assert_eq!("", from_las_bytes(&[0; 32]));
    }

    #[test]
    fn pads_with_nuls() {
        let field: [u8; 8] = to_las_bytes("abc").unwrap();
        assert_eq!(*b"abc\0\0\0\0\0", field);
    }

    #[test]
    fn too_long() {
        assert!(to_las_bytes::<4>("LASF!").is_err());
        assert!(to_las_bytes::<4>("LASF").is_ok());
    }
}
