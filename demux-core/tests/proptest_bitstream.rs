//! Property-based tests for bitstream operations.
//!
//! Uses proptest to verify round-trip correctness of BitReader/BitWriter,
//! Exp-Golomb coding, and emulation-prevention handling.

use proptest::prelude::*;

use demux_core::bitstream::{remove_emulation_prevention, BitReader, BitWriter};

/// Encoder-side emulation prevention: insert 0x03 after every two zero
/// bytes that would otherwise be followed by 0x00..=0x03.
fn add_emulation_prevention(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    let mut zeros = 0usize;
    for &byte in data {
        if zeros >= 2 && byte <= 3 {
            out.push(0x03);
            zeros = 0;
        }
        out.push(byte);
        if byte == 0 {
            zeros += 1;
        } else {
            zeros = 0;
        }
    }
    out
}

proptest! {
    /// Writing and reading arbitrary bit widths round-trips.
    #[test]
    fn roundtrip_bits_variable_width(value in 0u32..=0xFFFF, width in 1u8..=16) {
        let masked = value & ((1u32 << width) - 1);

        let mut writer = BitWriter::new();
        writer.write_bits(masked, width);
        writer.align_to_byte();

        let mut reader = BitReader::new(writer.data());
        prop_assert_eq!(reader.read_bits(width).unwrap(), masked);
    }

    /// Individual bits round-trip in order.
    #[test]
    fn roundtrip_individual_bits(bits in prop::collection::vec(any::<bool>(), 1..100)) {
        let mut writer = BitWriter::new();
        for &bit in &bits {
            writer.write_bit(bit);
        }
        writer.align_to_byte();

        let mut reader = BitReader::new(writer.data());
        for (i, &expected) in bits.iter().enumerate() {
            prop_assert_eq!(reader.read_bit().unwrap(), expected, "mismatch at bit {}", i);
        }
    }

    /// Unsigned Exp-Golomb round-trips: n leading zeros, a 1, and n suffix
    /// bits decode to (1 << n) - 1 + suffix.
    #[test]
    fn roundtrip_exp_golomb_unsigned(value in 0u32..=65534) {
        let mut writer = BitWriter::new();
        writer.write_ue(value);
        writer.align_to_byte();

        let mut reader = BitReader::new(writer.data());
        prop_assert_eq!(reader.read_ue().unwrap(), value);
    }

    /// Signed Exp-Golomb round-trips.
    #[test]
    fn roundtrip_exp_golomb_signed(value in -32767i32..=32767) {
        let mut writer = BitWriter::new();
        writer.write_se(value);
        writer.align_to_byte();

        let mut reader = BitReader::new(writer.data());
        prop_assert_eq!(reader.read_se().unwrap(), value);
    }

    /// Sequences of Exp-Golomb values survive in order.
    #[test]
    fn roundtrip_multiple_exp_golomb(values in prop::collection::vec(0u32..1000, 1..20)) {
        let mut writer = BitWriter::new();
        for &value in &values {
            writer.write_ue(value);
        }
        writer.align_to_byte();

        let mut reader = BitReader::new(writer.data());
        for (i, &expected) in values.iter().enumerate() {
            prop_assert_eq!(reader.read_ue().unwrap(), expected, "mismatch at index {}", i);
        }
    }

    /// Emulation prevention removal inverts insertion.
    #[test]
    fn roundtrip_emulation_prevention(data in prop::collection::vec(any::<u8>(), 0..200)) {
        let escaped = add_emulation_prevention(&data);
        prop_assert_eq!(remove_emulation_prevention(&escaped), data);
    }

    /// Removal is the identity on data without the 00 00 03 pattern.
    #[test]
    fn emulation_prevention_identity(data in prop::collection::vec(any::<u8>(), 0..200)) {
        let has_pattern = data.windows(3).any(|w| w == [0x00, 0x00, 0x03]);
        prop_assume!(!has_pattern);
        prop_assert_eq!(remove_emulation_prevention(&data), data);
    }

    /// An RBSP reader over escaped data sees the unescaped bytes.
    #[test]
    fn rbsp_reader_matches_unescaped(data in prop::collection::vec(any::<u8>(), 1..64)) {
        let escaped = add_emulation_prevention(&data);

        let mut rbsp = BitReader::rbsp(&escaped);
        let mut plain = BitReader::new(&data);
        for _ in 0..data.len() {
            prop_assert_eq!(rbsp.read_bits(8).unwrap(), plain.read_bits(8).unwrap());
        }
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_exp_golomb_powers_of_two() {
        for exp in 0..15 {
            let value = (1u32 << exp) - 1;
            let mut writer = BitWriter::new();
            writer.write_ue(value);
            writer.align_to_byte();

            let mut reader = BitReader::new(writer.data());
            assert_eq!(reader.read_ue().unwrap(), value, "failed for {value}");
        }
    }

    #[test]
    fn test_emulation_prevention_all_escape_targets() {
        for byte in 0u8..=3 {
            let data = vec![0x00, 0x00, byte];
            let escaped = add_emulation_prevention(&data);
            assert_eq!(escaped, vec![0x00, 0x00, 0x03, byte]);
            assert_eq!(remove_emulation_prevention(&escaped), data);
        }
    }
}
