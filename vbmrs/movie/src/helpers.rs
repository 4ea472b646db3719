use std::{borrow::Borrow, fmt::Display, str::FromStr};

use serde::{Serialize, Serializer};

use crate::error::StringFieldError;

/// Fixed-width text field as stored in a `.vbm` file.
///
/// Text ends at the first NUL byte, or at the end of the field if there is none.
/// Bytes after the terminator are kept so that files are rewritten verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StringField<const N: usize>([u8; N]);

impl<const N: usize> Default for StringField<N> {
    fn default() -> Self {
        Self([0u8; N])
    }
}

impl<const N: usize> StringField<N> {
    pub const MAX_LEN: usize = N;

    /// Returns a string field containing the specified string.
    ///
    /// # Errors
    /// This function errors if the specified string is too long.
    pub fn new<T: Borrow<str>>(data: T) -> Result<Self, StringFieldError> {
        let mut result = StringField::default();
        result.try_write_utf8(data)?;
        Ok(result)
    }

    /// Wraps raw field bytes without validation.
    pub const fn from_bytes(bytes: [u8; N]) -> Self {
        Self(bytes)
    }

    /// Raw field bytes, including anything past the terminator.
    pub fn as_bytes(&self) -> &[u8; N] {
        &self.0
    }

    /// The bytes up to (not including) the first NUL.
    pub fn trimmed_bytes(&self) -> &[u8] {
        match self.0.iter().position(|x| *x == b'\0') {
            Some(pos) => &self.0[..pos],
            None => &self.0,
        }
    }

    /// Tries to read a string from the string field.
    ///
    /// # Errors
    /// This function errors if the string field does not contain valid UTF-8.
    pub fn try_read_utf8(&self) -> Result<&str, StringFieldError> {
        std::str::from_utf8(self.trimmed_bytes()).map_err(StringFieldError::Utf8Invalid)
    }

    /// Reads the field, replacing invalid UTF-8 sequences.
    pub fn read_lossy(&self) -> String {
        String::from_utf8_lossy(self.trimmed_bytes()).into_owned()
    }

    /// Tries to write a string to the string field.
    ///
    /// # Errors
    /// This function errors if the provided string is too long to fit in the string field.
    pub fn try_write_utf8<T: Borrow<str>>(&mut self, data: T) -> Result<(), StringFieldError> {
        let data = data.borrow();
        let len = data.len();
        if len > N {
            Err(StringFieldError::FieldTooLong { max_len: N })
        } else {
            self.0 = [0u8; N];
            self.0[..len].copy_from_slice(data.as_bytes());
            Ok(())
        }
    }

    /// Writes to the string field, truncating on a character boundary so that
    /// the last byte of the field stays NUL. Returns the part that was written.
    pub fn write_utf8_terminated<'a>(&mut self, data: &'a str) -> &'a str {
        let limit = N.saturating_sub(1);
        // work backwards and find the closest character boundary
        let split_pos = (0..=limit.min(data.len()))
            .rev()
            .find(|n| data.is_char_boundary(*n))
            .unwrap_or(0);
        let slice = &data[..split_pos];
        self.0 = [0u8; N];
        self.0[..slice.len()].copy_from_slice(slice.as_bytes());
        slice
    }
}

impl<const N: usize> Display for StringField<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.read_lossy())
    }
}

impl<const N: usize> FromStr for StringField<N> {
    type Err = StringFieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl<const N: usize> Serialize for StringField<N> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.read_lossy())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminated_write_keeps_nul() {
        let mut field = StringField::<8>::default();
        let written = field.write_utf8_terminated("abcdefghij");
        assert_eq!(written, "abcdefg");
        assert_eq!(field.as_bytes()[7], 0);
        assert_eq!(field.try_read_utf8().unwrap(), "abcdefg");
    }

    #[test]
    fn test_terminated_write_respects_char_boundary() {
        let mut field = StringField::<4>::default();
        // 'é' is two bytes; the third byte would split it
        let written = field.write_utf8_terminated("aéb");
        assert_eq!(written, "aé");
        let written = field.write_utf8_terminated("abé");
        assert_eq!(written, "ab");
    }

    #[test]
    fn test_unterminated_field_reads_full_width() {
        let field = StringField::from_bytes(*b"POKEMON EMER");
        assert_eq!(field.try_read_utf8().unwrap(), "POKEMON EMER");
    }

    #[test]
    fn test_too_long() {
        assert!(matches!(
            StringField::<2>::new("abc"),
            Err(StringFieldError::FieldTooLong { max_len: 2 })
        ));
    }
}
