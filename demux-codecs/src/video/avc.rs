//! H.264/AVC sequence parameter set parsing.
//!
//! Reads the subset of the SPS a demuxer needs: coded picture dimensions,
//! sample aspect ratio, and the RFC 6381 codec string.

use demux_core::bitstream::BitReader;
use demux_core::error::{CoreError, Result};

/// Sample aspect ratios for aspect_ratio_idc 1..=16.
const SAR_TABLE: [[u32; 2]; 16] = [
    [1, 1],
    [12, 11],
    [10, 11],
    [16, 11],
    [40, 33],
    [24, 11],
    [20, 11],
    [32, 11],
    [80, 33],
    [18, 11],
    [15, 11],
    [64, 33],
    [160, 99],
    [4, 3],
    [3, 2],
    [2, 1],
];

/// Parsed AVC sequence parameter set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvcSps {
    /// Profile IDC.
    pub profile_idc: u8,
    /// Level IDC.
    pub level_idc: u8,
    /// Cropped picture width in pixels.
    pub width: u32,
    /// Cropped picture height in pixels.
    pub height: u32,
    /// Sample aspect ratio.
    pub pixel_ratio: [u32; 2],
    /// Codec string, e.g. `avc1.42c01e`.
    pub codec: String,
}

impl AvcSps {
    /// Parse a whole SPS NAL unit (header byte included).
    pub fn parse(nal: &[u8]) -> Result<Self> {
        if nal.len() < 4 {
            return Err(CoreError::invalid("SPS NAL too short"));
        }

        let codec = format!("avc1.{:02x}{:02x}{:02x}", nal[1], nal[2], nal[3]);

        let mut reader = BitReader::rbsp(&nal[1..]);
        let profile_idc = reader.read_bits(8)? as u8;
        reader.skip(8)?; // constraint flags + reserved
        let level_idc = reader.read_bits(8)? as u8;
        reader.skip_ue()?; // seq_parameter_set_id

        let mut chroma_format_idc = 1u32;
        if matches!(
            profile_idc,
            100 | 110 | 122 | 244 | 44 | 83 | 86 | 118 | 128 | 138 | 139 | 134 | 135
        ) {
            chroma_format_idc = reader.read_ue()?;
            if chroma_format_idc == 3 {
                reader.skip(1)?; // separate_colour_plane_flag
            }
            reader.skip_ue()?; // bit_depth_luma_minus8
            reader.skip_ue()?; // bit_depth_chroma_minus8
            reader.skip(1)?; // qpprime_y_zero_transform_bypass_flag
            if reader.read_bit()? {
                // seq_scaling_matrix_present_flag
                let count = if chroma_format_idc != 3 { 8 } else { 12 };
                for idx in 0..count {
                    if reader.read_bit()? {
                        skip_scaling_list(&mut reader, if idx < 6 { 16 } else { 64 })?;
                    }
                }
            }
        }

        reader.skip_ue()?; // log2_max_frame_num_minus4
        let pic_order_cnt_type = reader.read_ue()?;
        if pic_order_cnt_type == 0 {
            reader.skip_ue()?; // log2_max_pic_order_cnt_lsb_minus4
        } else if pic_order_cnt_type == 1 {
            reader.skip(1)?; // delta_pic_order_always_zero_flag
            reader.skip_se()?; // offset_for_non_ref_pic
            reader.skip_se()?; // offset_for_top_to_bottom_field
            let cycle = reader.read_ue()?;
            if cycle > 255 {
                return Err(CoreError::invalid(
                    "num_ref_frames_in_pic_order_cnt_cycle out of range",
                ));
            }
            for _ in 0..cycle {
                reader.skip_se()?;
            }
        }

        reader.skip_ue()?; // max_num_ref_frames
        reader.skip(1)?; // gaps_in_frame_num_value_allowed_flag
        let pic_width_in_mbs_minus1 = reader.read_ue()?;
        let pic_height_in_map_units_minus1 = reader.read_ue()?;
        let frame_mbs_only_flag = reader.read_bit()?;
        if !frame_mbs_only_flag {
            reader.skip(1)?; // mb_adaptive_frame_field_flag
        }
        reader.skip(1)?; // direct_8x8_inference_flag

        let (mut crop_left, mut crop_right, mut crop_top, mut crop_bottom) = (0u32, 0u32, 0u32, 0u32);
        if reader.read_bit()? {
            crop_left = reader.read_ue()?;
            crop_right = reader.read_ue()?;
            crop_top = reader.read_ue()?;
            crop_bottom = reader.read_ue()?;
        }

        let mut pixel_ratio = [1u32, 1u32];
        if reader.read_bit()? {
            // vui_parameters_present_flag
            if reader.read_bit()? {
                // aspect_ratio_info_present_flag
                let idc = reader.read_bits(8)? as usize;
                if idc == 255 {
                    pixel_ratio = [reader.read_bits(16)?, reader.read_bits(16)?];
                } else if (1..=SAR_TABLE.len()).contains(&idc) {
                    pixel_ratio = SAR_TABLE[idc - 1];
                }
            }
        }

        let chroma_scale: u32 = if chroma_format_idc == 0 { 1 } else { 2 };
        let field_scale: u32 = if frame_mbs_only_flag { 1 } else { 2 };
        let crop_unit_x = chroma_scale;
        let crop_unit_y = chroma_scale * field_scale;

        let width = pic_width_in_mbs_minus1
            .saturating_add(1)
            .saturating_mul(16)
            .saturating_sub(crop_unit_x.saturating_mul(crop_left + crop_right));
        let height = field_scale
            .saturating_mul(pic_height_in_map_units_minus1.saturating_add(1))
            .saturating_mul(16)
            .saturating_sub(crop_unit_y.saturating_mul(crop_top + crop_bottom));

        Ok(Self {
            profile_idc,
            level_idc,
            width,
            height,
            pixel_ratio,
            codec,
        })
    }
}

/// Read the slice_type of a coded slice NAL (header byte included).
pub fn slice_type(nal: &[u8]) -> Result<u32> {
    if nal.len() < 2 {
        return Err(CoreError::invalid("slice NAL too short"));
    }
    let mut reader = BitReader::rbsp(&nal[1..]);
    reader.skip_ue()?; // first_mb_in_slice
    reader.read_ue()
}

fn skip_scaling_list(reader: &mut BitReader<'_>, size: usize) -> Result<()> {
    let mut last_scale = 8i32;
    let mut next_scale = 8i32;

    for _ in 0..size {
        if next_scale != 0 {
            let delta_scale = reader.read_se()?;
            next_scale = (last_scale + delta_scale + 256) % 256;
        }
        last_scale = if next_scale == 0 { last_scale } else { next_scale };
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use demux_core::bitstream::BitWriter;

    /// Build a baseline-profile SPS NAL for the given macroblock counts,
    /// with a 1:1 sample aspect ratio signalled through VUI.
    fn build_sps(width_mbs_minus1: u32, height_map_units_minus1: u32) -> Vec<u8> {
        let mut w = BitWriter::new();
        w.write_bits(66, 8); // profile_idc: baseline
        w.write_bits(0xC0, 8); // constraint flags
        w.write_bits(30, 8); // level_idc 3.0
        w.write_ue(0); // seq_parameter_set_id
        w.write_ue(0); // log2_max_frame_num_minus4
        w.write_ue(0); // pic_order_cnt_type
        w.write_ue(0); // log2_max_pic_order_cnt_lsb_minus4
        w.write_ue(3); // max_num_ref_frames
        w.write_bit(false); // gaps_in_frame_num_value_allowed_flag
        w.write_ue(width_mbs_minus1);
        w.write_ue(height_map_units_minus1);
        w.write_bit(true); // frame_mbs_only_flag
        w.write_bit(false); // direct_8x8_inference_flag
        w.write_bit(false); // frame_cropping_flag
        w.write_bit(true); // vui_parameters_present_flag
        w.write_bit(true); // aspect_ratio_info_present_flag
        w.write_bits(1, 8); // aspect_ratio_idc: 1:1
        w.write_rbsp_trailing_bits();

        let mut nal = vec![0x67];
        nal.extend_from_slice(w.data());
        nal
    }

    #[test]
    fn test_sps_dimensions() {
        let nal = build_sps(79, 44); // 1280x720
        let sps = AvcSps::parse(&nal).unwrap();

        assert_eq!(sps.profile_idc, 66);
        assert_eq!(sps.level_idc, 30);
        assert_eq!(sps.width, 1280);
        assert_eq!(sps.height, 720);
        assert_eq!(sps.pixel_ratio, [1, 1]);
    }

    #[test]
    fn test_sps_codec_string() {
        let nal = build_sps(39, 29); // 640x480
        let sps = AvcSps::parse(&nal).unwrap();
        assert_eq!(sps.codec, "avc1.42c01e");
    }

    #[test]
    fn test_sps_too_short() {
        assert!(AvcSps::parse(&[0x67, 0x42]).is_err());
    }

    #[test]
    fn test_slice_type() {
        // first_mb_in_slice = 0 ("1"), slice_type = 7 ("0001000")
        let mut w = BitWriter::new();
        w.write_ue(0);
        w.write_ue(7);
        w.write_rbsp_trailing_bits();

        let mut nal = vec![0x65];
        nal.extend_from_slice(w.data());
        assert_eq!(slice_type(&nal).unwrap(), 7);
    }
}
