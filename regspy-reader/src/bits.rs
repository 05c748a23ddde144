//! Decoding and encoding of register bit-fields
//!
//! A bit-field is a named set of bit positions inside a 32 bit register. The
//! positions do not have to be contiguous: bit `k` of the field value is taken
//! from bit `positions[k]` of the register, with `positions` sorted ascending.
//!
//! ```
//! use regspy_reader::bits::{decode_field, encode_field};
//!
//! // Bits 3 and 7 form a two bit value
//! assert_eq!(decode_field(0b1000_1000, &[3, 7]), 0b11);
//! // Writing a field leaves all other bits alone
//! assert_eq!(encode_field(0xFFFF_FFFF, &[0, 7], 0b00), 0xFFFF_FF7E);
//! ```
use std::collections::BTreeMap;

use crate::error::BitFieldError;

/// Width of every register that holds bit-fields.
pub const CONTAINER_BITS: u8 = 32;

/// Little-endian unsigned value of the first `width` bytes of `raw`.
pub fn decode_whole(raw: &[u8], width: usize) -> u64 {
    raw.iter()
        .take(width.min(8))
        .enumerate()
        .fold(0u64, |value, (i, byte)| value | (u64::from(*byte) << (8 * i)))
}

/// The 32 bit register value stored little-endian in `raw`.
/// Missing bytes read as zero.
pub fn container(raw: &[u8]) -> u32 {
    decode_whole(raw, 4) as u32
}

/// Packs the register bits at `positions` into a value, lowest position first.
///
/// `positions` must be sorted ascending and below [`CONTAINER_BITS`].
pub fn decode_field(raw: u32, positions: &[u8]) -> u32 {
    debug_assert!(positions.windows(2).all(|w| w[0] < w[1]));
    positions
        .iter()
        .enumerate()
        .filter(|(_, pos)| raw & (1 << **pos) != 0)
        .fold(0, |value, (k, _)| value | (1 << k))
}

/// Mask covering all `positions`.
pub fn field_mask(positions: &[u8]) -> u32 {
    positions.iter().fold(0, |mask, pos| mask | (1 << pos))
}

/// Replaces the bits at `positions` in `raw` by the bits of `value`, the inverse of
/// [`decode_field`]. Bits of `value` beyond `positions.len()` are ignored.
pub fn encode_field(raw: u32, positions: &[u8], value: u32) -> u32 {
    let bits = positions
        .iter()
        .enumerate()
        .filter(|(k, _)| value & (1 << k) != 0)
        .fold(0, |bits, (_, pos)| bits | (1 << pos));
    (raw & !field_mask(positions)) | bits
}

/// True if `value` can be stored in a field of `bits` bits.
pub fn fits(value: u32, bits: usize) -> bool {
    bits >= CONTAINER_BITS as usize || value >> bits == 0
}

/// `name = 0x{hex} = 0b{binary} = {decimal}u`, followed by the description of the
/// value in parentheses if one is registered.
pub fn describe(
    name: &str,
    value: u32,
    bits: usize,
    value_descriptions: &BTreeMap<u32, String>,
) -> String {
    let mut res = format!(
        "{} = 0x{:X} = 0b{:0width$b} = {}u",
        name,
        value,
        value,
        value,
        width = bits
    );
    if let Some(description) = value_descriptions.get(&value) {
        res.push_str(&format!(" ({})", description));
    }
    res
}

/// Full register report: the value in hex, grouped binary and decimal, then one
/// line per bit-field.
pub fn describe_register(name: &str, raw: u32, fields: &[BitField]) -> String {
    let binary = format!("{:032b}", raw);
    let grouped = binary
        .as_bytes()
        .chunks(8)
        .map(|chunk| String::from_utf8_lossy(chunk))
        .collect::<Vec<_>>()
        .join("_");
    let mut res = format!("{} = 0x{:08X} = 0b{} = {}u", name, raw, grouped, raw);
    for field in fields {
        res.push('\n');
        res.push_str(&field.describe(raw));
    }
    res
}

/// Bit positions as ascending runs, e.g. `10-15,25-26`.
pub fn format_positions(positions: &[u8]) -> String {
    let mut runs: Vec<(u8, u8)> = Vec::new();
    for &position in positions {
        match runs.last_mut() {
            Some((_, end)) if u16::from(*end) + 1 == u16::from(position) => *end = position,
            _ => runs.push((position, position)),
        }
    }
    runs.iter()
        .map(|(start, end)| {
            if start == end {
                start.to_string()
            } else {
                format!("{}-{}", start, end)
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// A named set of bits inside a register.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BitField {
    name: String,
    positions: Vec<u8>,
    description: Option<String>,
    value_descriptions: BTreeMap<u32, String>,
}

impl BitField {
    /// Creates a field from its bit positions in any order.
    pub fn new(
        name: impl Into<String>,
        positions: impl IntoIterator<Item = u8>,
    ) -> Result<BitField, BitFieldError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(BitFieldError::BlankName);
        }
        let mut positions: Vec<u8> = positions.into_iter().collect();
        if positions.is_empty() {
            return Err(BitFieldError::NoPositions(name));
        }
        positions.sort_unstable();
        if let Some(&position) = positions.iter().find(|p| **p >= CONTAINER_BITS) {
            return Err(BitFieldError::PositionOutOfRange {
                field: name,
                position,
            });
        }
        if let Some(w) = positions.windows(2).find(|w| w[0] == w[1]) {
            return Err(BitFieldError::DuplicatePosition {
                field: name,
                position: w[0],
            });
        }
        Ok(BitField {
            name,
            positions,
            description: None,
            value_descriptions: BTreeMap::new(),
        })
    }

    /// A single bit field.
    pub fn bit(name: impl Into<String>, position: u8) -> Result<BitField, BitFieldError> {
        BitField::new(name, [position])
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Registers the meaning of one field value.
    pub fn with_value(mut self, value: u32, description: impl Into<String>) -> Self {
        self.value_descriptions.insert(value, description.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bit positions, ascending.
    pub fn positions(&self) -> &[u8] {
        &self.positions
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn value_description(&self, value: u32) -> Option<&str> {
        self.value_descriptions.get(&value).map(String::as_str)
    }

    /// Number of bits.
    pub fn bits(&self) -> usize {
        self.positions.len()
    }

    pub fn mask(&self) -> u32 {
        field_mask(&self.positions)
    }

    /// Field value within a register value.
    pub fn value(&self, raw: u32) -> u32 {
        decode_field(raw, &self.positions)
    }

    /// Register value with this field set to `value`.
    /// Returns `None` if `value` does not fit into the field.
    pub fn apply(&self, raw: u32, value: u32) -> Option<u32> {
        if !fits(value, self.bits()) {
            return None;
        }
        Some(encode_field(raw, &self.positions, value))
    }

    /// One line catalog entry: name, bit positions and description.
    pub fn summary(&self) -> String {
        let mut res = format!("{} [{}]", self.name, format_positions(&self.positions));
        if let Some(description) = &self.description {
            res.push(' ');
            res.push_str(description);
        }
        res
    }

    /// Human readable value of this field within a register value.
    pub fn describe(&self, raw: u32) -> String {
        describe(
            &self.name,
            self.value(raw),
            self.bits(),
            &self.value_descriptions,
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn field(positions: &[u8]) -> BitField {
        BitField::new("n", positions.iter().copied()).unwrap()
    }

    #[test]
    fn construction() {
        assert_eq!(field(&[31]).positions(), &[31]);
        assert_eq!(field(&[7, 3, 5]).positions(), &[3, 5, 7]);
        assert_eq!(field(&(29..32).collect::<Vec<u8>>()).positions(), &[29, 30, 31]);
    }

    #[test]
    fn invalid_construction() {
        assert_eq!(BitField::new("", [0]), Err(BitFieldError::BlankName));
        assert_eq!(
            BitField::new("n", []),
            Err(BitFieldError::NoPositions("n".into()))
        );
        assert_eq!(
            BitField::new("n", [31, 32]),
            Err(BitFieldError::PositionOutOfRange {
                field: "n".into(),
                position: 32
            })
        );
        assert_eq!(
            BitField::new("n", [4, 2, 4]),
            Err(BitFieldError::DuplicatePosition {
                field: "n".into(),
                position: 4
            })
        );
    }

    #[test]
    fn decode_single_bits() {
        for pos in 0..32u8 {
            assert_eq!(field(&[pos]).value(1 << pos), 1);
            assert_eq!(field(&[pos]).value(!(1u32 << pos)), 0);
        }
    }

    #[test]
    fn decode_non_contiguous() {
        assert_eq!(decode_field(0b1000_1000, &[3, 7]), 3);
        assert_eq!(decode_field(0b1000_1000, &[3]), 1);
        assert_eq!(decode_field(0b0000_1000, &[3, 7]), 0b01);
        assert_eq!(decode_field(0b1000_0000, &[3, 7]), 0b10);
        assert_eq!(decode_field(0b0110, &[1, 2]), 3);
        assert_eq!(decode_field(0xC000_0000, &[30, 31]), 3);
    }

    #[test]
    fn mask() {
        assert_eq!(field(&[0]).mask(), 0x0000_0001);
        assert_eq!(field(&[0, 31]).mask(), 0x8000_0001);
        assert_eq!(!field(&[0, 31]).mask(), 0x7FFF_FFFE);
    }

    #[test]
    fn encode_keeps_other_bits() {
        assert_eq!(encode_field(0b1010_1010, &[0], 0), 0b1010_1010);
        assert_eq!(encode_field(0b0101_0100, &[0], 1), 0b0101_0101);
        assert_eq!(encode_field(0b1111_1111, &[0], 0), 0b1111_1110);
        assert_eq!(encode_field(0b1111_1111, &[0, 7], 0), 0b0111_1110);
        assert_eq!(encode_field(0b1111_1111, &[0, 7], 1), 0b0111_1111);
        assert_eq!(encode_field(0b1111_1111, &[0, 7], 2), 0b1111_1110);
        assert_eq!(encode_field(0b1111_1111, &[0, 7], 3), 0b1111_1111);
        assert_eq!(encode_field(0xFFFF_FFFF, &[0, 7], 0), 0xFFFF_FF7E);
    }

    #[test]
    fn encode_then_decode() {
        let layouts: [&[u8]; 4] = [&[0], &[3, 7], &[10, 11, 12, 13, 14, 15, 25, 26], &[0, 31]];
        for positions in layouts {
            for raw in [0, 0xFFFF_FFFF, 0xA5A5_5A5A] {
                for value in 0..(1u32 << positions.len()).min(64) {
                    let encoded = encode_field(raw, positions, value);
                    assert_eq!(decode_field(encoded, positions), value);
                    assert_eq!(encoded & !field_mask(positions), raw & !field_mask(positions));
                }
            }
        }
    }

    #[test]
    fn whole_values() {
        assert_eq!(decode_whole(&[0x2a], 1), 0x2a);
        assert_eq!(decode_whole(&[0x78, 0x56, 0x34, 0x12], 4), 0x1234_5678);
        assert_eq!(decode_whole(&[0x78, 0x56, 0x34, 0x12], 2), 0x5678);
        assert_eq!(
            decode_whole(&[1, 0, 0, 0, 0, 0, 0, 0x80], 8),
            0x8000_0000_0000_0001
        );
        assert_eq!(container(&[0xff, 0x01]), 0x01ff);
    }

    #[test]
    fn fits_width() {
        assert!(fits(3, 2));
        assert!(!fits(4, 2));
        assert!(fits(u32::MAX, 32));
    }

    #[test]
    fn apply_value() {
        let field = field(&[4, 5]);
        assert_eq!(field.apply(0xFFFF_FFFF, 0), Some(0xFFFF_FFCF));
        assert_eq!(field.apply(0, 2), Some(0x20));
        assert_eq!(field.apply(0, 4), None);
    }

    #[test]
    fn description() {
        let field = BitField::new("n", [0, 1])
            .unwrap()
            .with_description("descr")
            .with_value(0, "zero")
            .with_value(2, "two");
        assert_eq!(field.describe(0b01), "n = 0x1 = 0b01 = 1u");
        assert_eq!(field.describe(0b10), "n = 0x2 = 0b10 = 2u (two)");
        assert_eq!(field.describe(0b00), "n = 0x0 = 0b00 = 0u (zero)");
    }

    #[test]
    fn position_runs() {
        assert_eq!(format_positions(&[16]), "16");
        assert_eq!(format_positions(&[0, 1, 2, 4]), "0-2,4");
        assert_eq!(
            format_positions(&[10, 11, 12, 13, 14, 15, 25, 26]),
            "10-15,25-26"
        );
    }

    #[test]
    fn summary() {
        let field = BitField::new("IT", (10..16).chain(25..27))
            .unwrap()
            .with_description("If-Then state");
        assert_eq!(field.summary(), "IT [10-15,25-26] If-Then state");
        assert_eq!(BitField::bit("N", 31).unwrap().summary(), "N [31]");
    }

    #[test]
    fn register_description() {
        let fields = [
            BitField::bit("ENABLE", 0).unwrap(),
            BitField::bit("COUNTFLAG", 16).unwrap(),
        ];
        assert_eq!(
            describe_register("SYST_CSR", 0x0001_0005, &fields),
            "SYST_CSR = 0x00010005 = 0b00000000_00000001_00000000_00000101 = 65541u\n\
             ENABLE = 0x1 = 0b1 = 1u\n\
             COUNTFLAG = 0x1 = 0b1 = 1u"
        );
    }
}
