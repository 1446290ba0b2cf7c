//! H.265/HEVC sequence parameter set parsing.
//!
//! Reads through the profile-tier-level block to the picture geometry and
//! bit depths; everything after `bit_depth_chroma_minus8` is irrelevant to
//! a demuxer and is not parsed.

use demux_core::bitstream::BitReader;
use demux_core::error::{CoreError, Result};

/// Parsed HEVC sequence parameter set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HevcSps {
    /// Chroma format IDC (0=mono, 1=4:2:0, 2=4:2:2, 3=4:4:4).
    pub chroma_format_idc: u8,
    /// Conformance-cropped picture width in pixels.
    pub width: u32,
    /// Conformance-cropped picture height in pixels.
    pub height: u32,
    /// Bit depth for luma, minus 8.
    pub bit_depth_luma_minus8: u8,
    /// Bit depth for chroma, minus 8.
    pub bit_depth_chroma_minus8: u8,
}

impl HevcSps {
    /// Parse a whole SPS NAL unit (two header bytes included).
    pub fn parse(nal: &[u8]) -> Result<Self> {
        if nal.len() < 4 {
            return Err(CoreError::invalid("HEVC SPS NAL too short"));
        }

        let mut reader = BitReader::rbsp(&nal[2..]);
        reader.skip(4)?; // sps_video_parameter_set_id
        let max_sub_layers_minus1 = reader.read_bits(3)? as u8;
        reader.skip(1)?; // sps_temporal_id_nesting_flag

        skip_profile_tier_level(&mut reader, max_sub_layers_minus1)?;

        reader.skip_ue()?; // sps_seq_parameter_set_id
        let chroma_format_idc = reader.read_ue()?;
        if chroma_format_idc > 3 {
            return Err(CoreError::invalid("chroma_format_idc out of range"));
        }
        if chroma_format_idc == 3 {
            reader.skip(1)?; // separate_colour_plane_flag
        }

        let pic_width_in_luma_samples = reader.read_ue()?;
        let pic_height_in_luma_samples = reader.read_ue()?;

        let (mut left, mut right, mut top, mut bottom) = (0u32, 0u32, 0u32, 0u32);
        if reader.read_bit()? {
            // conformance_window_flag
            left = reader.read_ue()?;
            right = reader.read_ue()?;
            top = reader.read_ue()?;
            bottom = reader.read_ue()?;
        }

        let bit_depth_luma_minus8 = reader.read_ue()? as u8;
        let bit_depth_chroma_minus8 = reader.read_ue()? as u8;

        let sub_width_c: u32 = match chroma_format_idc {
            1 | 2 => 2,
            _ => 1,
        };
        let sub_height_c: u32 = match chroma_format_idc {
            1 => 2,
            _ => 1,
        };

        let width = pic_width_in_luma_samples.saturating_sub(sub_width_c * (left + right));
        let height = pic_height_in_luma_samples.saturating_sub(sub_height_c * (top + bottom));

        Ok(Self {
            chroma_format_idc: chroma_format_idc as u8,
            width,
            height,
            bit_depth_luma_minus8,
            bit_depth_chroma_minus8,
        })
    }
}

fn skip_profile_tier_level(reader: &mut BitReader<'_>, max_sub_layers_minus1: u8) -> Result<()> {
    reader.skip(8)?; // profile_space(2) + tier_flag(1) + profile_idc(5)
    reader.skip(32)?; // profile compatibility flags
    reader.skip(48)?; // source flags(4) + reserved(44)
    reader.skip(8)?; // general_level_idc

    let mut profile_present = [false; 8];
    let mut level_present = [false; 8];
    for i in 0..max_sub_layers_minus1 as usize {
        profile_present[i] = reader.read_bit()?;
        level_present[i] = reader.read_bit()?;
    }
    if max_sub_layers_minus1 > 0 {
        for _ in max_sub_layers_minus1..8 {
            reader.skip(2)?; // reserved_zero_2bits
        }
    }
    for i in 0..max_sub_layers_minus1 as usize {
        if profile_present[i] {
            reader.skip(88)?;
        }
        if level_present[i] {
            reader.skip(8)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use demux_core::bitstream::BitWriter;

    /// Build a Main-profile SPS NAL with the given geometry.
    fn build_sps(width: u32, height: u32, chroma_format_idc: u32) -> Vec<u8> {
        let mut w = BitWriter::new();
        w.write_bits(0, 4); // sps_video_parameter_set_id
        w.write_bits(0, 3); // sps_max_sub_layers_minus1
        w.write_bit(true); // sps_temporal_id_nesting_flag

        // profile_tier_level
        w.write_bits(0, 2); // general_profile_space
        w.write_bit(false); // general_tier_flag
        w.write_bits(1, 5); // general_profile_idc: Main
        w.write_bits(0x6000_0000, 32); // compatibility flags
        w.write_bits(0b1001, 4); // progressive, frame-only
        w.write_bits(0, 32);
        w.write_bits(0, 12); // reserved
        w.write_bits(93, 8); // general_level_idc: 3.1

        w.write_ue(0); // sps_seq_parameter_set_id
        w.write_ue(chroma_format_idc);
        w.write_ue(width);
        w.write_ue(height);
        w.write_bit(false); // conformance_window_flag
        w.write_ue(0); // bit_depth_luma_minus8
        w.write_ue(0); // bit_depth_chroma_minus8
        w.write_rbsp_trailing_bits();

        let mut nal = vec![33 << 1, 0x01];
        nal.extend_from_slice(w.data());
        nal
    }

    #[test]
    fn test_sps_geometry() {
        let nal = build_sps(1920, 1080, 1);
        let sps = HevcSps::parse(&nal).unwrap();

        assert_eq!(sps.width, 1920);
        assert_eq!(sps.height, 1080);
        assert_eq!(sps.chroma_format_idc, 1);
        assert_eq!(sps.bit_depth_luma_minus8, 0);
        assert_eq!(sps.bit_depth_chroma_minus8, 0);
    }

    #[test]
    fn test_sps_mono_chroma() {
        let nal = build_sps(640, 360, 0);
        let sps = HevcSps::parse(&nal).unwrap();
        assert_eq!(sps.chroma_format_idc, 0);
        assert_eq!(sps.width, 640);
    }

    #[test]
    fn test_sps_too_short() {
        assert!(HevcSps::parse(&[0x42, 0x01]).is_err());
    }
}
