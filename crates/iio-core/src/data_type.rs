//! Sample data-type descriptors.
//!
//! IIO describes the storage of every scan element with a compact format
//! string such as `le:s12/16>>4`: little-endian, signed, 12 significant bits
//! stored in 16 bits, shifted left by 4. An optional `X<n>` suffix on the
//! storage size repeats the element (`le:s16/16X2>>0` for an I/Q pair).
//!
//! [`DataType`] parses and prints that format and converts a stored element
//! into a host-endian, right-aligned, sign-extended value of the same width.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::IioError;

/// Byte order of a stored element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Endianness {
    /// Least significant byte first
    #[default]
    Little,
    /// Most significant byte first
    Big,
}

/// Storage format of one channel sample inside a scan row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DataType {
    /// Byte order of the stored element
    pub endianness: Endianness,
    /// Whether the significant bits are two's complement
    pub signed: bool,
    /// Number of significant bits
    pub bits: u8,
    /// Storage width in bits (8, 16, 32 or 64)
    pub storage_bits: u8,
    /// Right shift applied before masking
    pub shift: u8,
    /// Number of consecutive elements per sample
    pub repeat: u8,
}

impl DataType {
    /// Plain little-endian signed 16-bit samples.
    pub const INT16: DataType = DataType {
        endianness: Endianness::Little,
        signed: true,
        bits: 16,
        storage_bits: 16,
        shift: 0,
        repeat: 1,
    };

    /// Create an unshifted little-endian type.
    pub fn new(signed: bool, bits: u8, storage_bits: u8) -> Result<Self, IioError> {
        let dtype = Self {
            endianness: Endianness::Little,
            signed,
            bits,
            storage_bits,
            shift: 0,
            repeat: 1,
        };
        dtype.validate()?;
        Ok(dtype)
    }

    /// Set the shift.
    pub fn with_shift(mut self, shift: u8) -> Self {
        self.shift = shift;
        self
    }

    /// Set the byte order.
    pub fn with_endianness(mut self, endianness: Endianness) -> Self {
        self.endianness = endianness;
        self
    }

    /// Set the repeat count.
    pub fn with_repeat(mut self, repeat: u8) -> Self {
        self.repeat = repeat;
        self
    }

    /// Check that the descriptor describes a representable layout.
    pub fn validate(&self) -> Result<(), IioError> {
        let invalid = |message: String| IioError::InvalidDataFormat {
            format: self.to_string(),
            message,
        };

        if !matches!(self.storage_bits, 8 | 16 | 32 | 64) {
            return Err(invalid(format!(
                "storage width {} is not 8, 16, 32 or 64 bits",
                self.storage_bits
            )));
        }
        if self.bits == 0 || self.bits > self.storage_bits {
            return Err(invalid(format!(
                "{} significant bits do not fit {} storage bits",
                self.bits, self.storage_bits
            )));
        }
        if u16::from(self.bits) + u16::from(self.shift) > u16::from(self.storage_bits) {
            return Err(invalid(format!(
                "shift {} pushes {} bits past the storage width",
                self.shift, self.bits
            )));
        }
        if self.repeat == 0 {
            return Err(invalid("repeat count must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Width of a single stored element in bytes.
    pub fn element_bytes(&self) -> usize {
        usize::from(self.storage_bits / 8)
    }

    /// Width of one sample (all repeated elements) in bytes.
    pub fn sample_bytes(&self) -> usize {
        self.element_bytes() * usize::from(self.repeat)
    }

    /// Name of the converted element type, e.g. `int16` or `uint32`.
    pub fn type_name(&self) -> String {
        let prefix = if self.signed { "int" } else { "uint" };
        format!("{}{}", prefix, self.storage_bits)
    }

    /// Convert one stored sample into host representation.
    ///
    /// `src` and `dst` must both hold at least [`Self::sample_bytes`] bytes.
    pub fn convert(&self, src: &[u8], dst: &mut [u8]) {
        let width = self.element_bytes();
        for (stored, out) in src
            .chunks_exact(width)
            .zip(dst.chunks_exact_mut(width))
            .take(usize::from(self.repeat))
        {
            let raw = match self.endianness {
                Endianness::Little => stored
                    .iter()
                    .rev()
                    .fold(0u64, |acc, &b| (acc << 8) | u64::from(b)),
                Endianness::Big => stored.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b)),
            };
            write_native(self.extract(raw), out);
        }
    }

    /// Shift, mask and sign-extend a raw stored value.
    fn extract(&self, raw: u64) -> u64 {
        let value = raw >> self.shift;
        if self.bits >= 64 {
            return value;
        }
        let mask = (1u64 << self.bits) - 1;
        let value = value & mask;
        if self.signed && (value >> (self.bits - 1)) & 1 == 1 {
            value | !mask
        } else {
            value
        }
    }
}

fn write_native(value: u64, out: &mut [u8]) {
    match out.len() {
        1 => out[0] = value as u8,
        2 => out.copy_from_slice(&(value as u16).to_ne_bytes()),
        4 => out.copy_from_slice(&(value as u32).to_ne_bytes()),
        8 => out.copy_from_slice(&value.to_ne_bytes()),
        _ => {}
    }
}

impl Default for DataType {
    fn default() -> Self {
        Self::INT16
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let endian = match self.endianness {
            Endianness::Little => "le",
            Endianness::Big => "be",
        };
        let sign = if self.signed { 's' } else { 'u' };
        write!(f, "{}:{}{}/{}", endian, sign, self.bits, self.storage_bits)?;
        if self.repeat > 1 {
            write!(f, "X{}", self.repeat)?;
        }
        write!(f, ">>{}", self.shift)
    }
}

impl FromStr for DataType {
    type Err = IioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |message: &str| IioError::InvalidDataFormat {
            format: s.to_string(),
            message: message.to_string(),
        };

        let (endian, rest) = s
            .split_once(':')
            .ok_or_else(|| invalid("missing endianness prefix"))?;
        let endianness = match endian {
            "le" => Endianness::Little,
            "be" => Endianness::Big,
            _ => return Err(invalid("endianness must be 'le' or 'be'")),
        };

        let (body, shift) = match rest.split_once(">>") {
            Some((body, shift)) => (
                body,
                shift.parse::<u8>().map_err(|_| invalid("bad shift"))?,
            ),
            None => (rest, 0),
        };

        let mut chars = body.chars();
        let signed = match chars.next() {
            Some('s') | Some('S') => true,
            Some('u') | Some('U') => false,
            _ => return Err(invalid("sign must be 's' or 'u'")),
        };

        let (bits, storage) = chars
            .as_str()
            .split_once('/')
            .ok_or_else(|| invalid("missing storage width"))?;
        let bits = bits.parse::<u8>().map_err(|_| invalid("bad bit count"))?;
        let (storage_bits, repeat) = match storage.split_once('X') {
            Some((storage, repeat)) => (
                storage,
                repeat.parse::<u8>().map_err(|_| invalid("bad repeat count"))?,
            ),
            None => (storage, 1),
        };
        let storage_bits = storage_bits
            .parse::<u8>()
            .map_err(|_| invalid("bad storage width"))?;

        let dtype = DataType {
            endianness,
            signed,
            bits,
            storage_bits,
            shift,
            repeat,
        };
        dtype.validate()?;
        Ok(dtype)
    }
}

impl TryFrom<String> for DataType {
    type Error = IioError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DataType> for String {
    fn from(value: DataType) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_shifted_format() {
        let dtype: DataType = "le:s12/16>>4".parse().unwrap();
        assert_eq!(dtype.endianness, Endianness::Little);
        assert!(dtype.signed);
        assert_eq!(dtype.bits, 12);
        assert_eq!(dtype.storage_bits, 16);
        assert_eq!(dtype.shift, 4);
        assert_eq!(dtype.repeat, 1);
        assert_eq!(dtype.to_string(), "le:s12/16>>4");
    }

    #[test]
    fn test_parse_repeat() {
        let dtype: DataType = "be:u16/16X2>>0".parse().unwrap();
        assert_eq!(dtype.repeat, 2);
        assert_eq!(dtype.sample_bytes(), 4);
        assert_eq!(dtype.type_name(), "uint16");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("s16/16".parse::<DataType>().is_err());
        assert!("le:x16/16>>0".parse::<DataType>().is_err());
        assert!("le:s16/12>>0".parse::<DataType>().is_err());
        assert!("le:s12/16>>8".parse::<DataType>().is_err());
        assert!("le:s8/24>>0".parse::<DataType>().is_err());
    }

    #[test]
    fn test_convert_sign_extends_shifted_value() {
        let dtype: DataType = "le:s12/16>>4".parse().unwrap();
        // -1 in 12 bits, stored shifted left by 4
        let stored = (0x0FFFu16 << 4).to_le_bytes();
        let mut out = [0u8; 2];
        dtype.convert(&stored, &mut out);
        assert_eq!(i16::from_ne_bytes(out), -1);
    }

    #[test]
    fn test_convert_big_endian_unsigned() {
        let dtype: DataType = "be:u10/16>>0".parse().unwrap();
        let stored = 0x03FFu16.to_be_bytes();
        let mut out = [0u8; 2];
        dtype.convert(&stored, &mut out);
        assert_eq!(u16::from_ne_bytes(out), 0x03FF);
    }

    #[test]
    fn test_convert_masks_unused_high_bits() {
        let dtype: DataType = "le:u12/16>>0".parse().unwrap();
        let stored = 0xF123u16.to_le_bytes();
        let mut out = [0u8; 2];
        dtype.convert(&stored, &mut out);
        assert_eq!(u16::from_ne_bytes(out), 0x0123);
    }

    #[test]
    fn test_serde_uses_format_string() {
        #[derive(Deserialize)]
        struct Wrapper {
            format: DataType,
        }
        let parsed: Wrapper = toml::from_str(r#"format = "le:s14/16>>2""#).unwrap();
        assert_eq!(parsed.format.bits, 14);
        assert_eq!(
            serde_json::to_string(&parsed.format).unwrap(),
            "\"le:s14/16>>2\""
        );
    }
}
