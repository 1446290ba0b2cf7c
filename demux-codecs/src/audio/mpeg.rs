//! MPEG-1/2 audio (Layer I/II/III) frame header parsing.

use demux_core::error::{CoreError, Result};

/// MPEG audio version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MpegVersion {
    /// MPEG Version 2.5 (unofficial extension).
    Mpeg25,
    /// MPEG Version 2.
    Mpeg2,
    /// MPEG Version 1.
    Mpeg1,
}

/// MPEG audio layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MpegLayer {
    /// Layer I.
    Layer1,
    /// Layer II.
    Layer2,
    /// Layer III.
    Layer3,
}

/// Bitrates in kbps, per (version group, layer), indexed by bitrate_index.
const BITRATES_V1_L1: [u32; 15] = [
    0, 32, 64, 96, 128, 160, 192, 224, 256, 288, 320, 352, 384, 416, 448,
];
const BITRATES_V1_L2: [u32; 15] = [
    0, 32, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 384,
];
const BITRATES_V1_L3: [u32; 15] = [
    0, 32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320,
];
const BITRATES_V2_L1: [u32; 15] = [
    0, 32, 48, 56, 64, 80, 96, 112, 128, 144, 160, 176, 192, 224, 256,
];
const BITRATES_V2_L23: [u32; 15] = [
    0, 8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160,
];

/// Sample rates indexed by [version][sample_rate_index].
const SAMPLE_RATES: [[u32; 3]; 3] = [
    [44100, 48000, 32000], // MPEG-1
    [22050, 24000, 16000], // MPEG-2
    [11025, 12000, 8000],  // MPEG-2.5
];

/// Check for an MPEG audio syncword at `offset`.
///
/// Requires the 11 sync bits plus non-reserved version and layer fields, so
/// random 0xFF bytes inside a frame body are rarely mistaken for a header.
pub fn is_header(data: &[u8], offset: usize) -> bool {
    offset + 1 < data.len()
        && data[offset] == 0xFF
        && (data[offset + 1] & 0xE0) == 0xE0
        && (data[offset + 1] & 0x18) != 0x08 // version not reserved
        && (data[offset + 1] & 0x06) != 0x00 // layer not reserved
}

/// Parsed MPEG audio frame header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MpegAudioHeader {
    /// MPEG version.
    pub version: MpegVersion,
    /// Layer.
    pub layer: MpegLayer,
    /// Bitrate index.
    pub bitrate_index: u8,
    /// Sample rate index.
    pub sample_rate_index: u8,
    /// Padding bit.
    pub padding: bool,
    /// Channel mode (0=stereo, 1=joint, 2=dual, 3=mono).
    pub channel_mode: u8,
}

impl MpegAudioHeader {
    /// Parse a frame header at `offset`.
    pub fn parse(data: &[u8], offset: usize) -> Result<Self> {
        if offset + 4 > data.len() {
            return Err(CoreError::UnexpectedEnd);
        }
        if !is_header(data, offset) {
            return Err(CoreError::invalid("missing MPEG audio syncword"));
        }

        let b = &data[offset..];
        let version = match (b[1] >> 3) & 3 {
            0 => MpegVersion::Mpeg25,
            2 => MpegVersion::Mpeg2,
            3 => MpegVersion::Mpeg1,
            _ => return Err(CoreError::invalid("reserved MPEG version")),
        };
        let layer = match (b[1] >> 1) & 3 {
            1 => MpegLayer::Layer3,
            2 => MpegLayer::Layer2,
            3 => MpegLayer::Layer1,
            _ => return Err(CoreError::invalid("reserved MPEG layer")),
        };

        let bitrate_index = (b[2] >> 4) & 0xF;
        if bitrate_index == 0 || bitrate_index == 15 {
            return Err(CoreError::invalid("invalid MPEG audio bitrate index"));
        }
        let sample_rate_index = (b[2] >> 2) & 3;
        if sample_rate_index == 3 {
            return Err(CoreError::invalid("reserved MPEG audio sample rate index"));
        }
        let padding = (b[2] >> 1) & 1 == 1;
        let channel_mode = (b[3] >> 6) & 3;

        Ok(Self {
            version,
            layer,
            bitrate_index,
            sample_rate_index,
            padding,
            channel_mode,
        })
    }

    /// Bitrate in bits per second.
    pub fn bitrate(&self) -> u32 {
        let table = match (self.version, self.layer) {
            (MpegVersion::Mpeg1, MpegLayer::Layer1) => &BITRATES_V1_L1,
            (MpegVersion::Mpeg1, MpegLayer::Layer2) => &BITRATES_V1_L2,
            (MpegVersion::Mpeg1, MpegLayer::Layer3) => &BITRATES_V1_L3,
            (_, MpegLayer::Layer1) => &BITRATES_V2_L1,
            (_, _) => &BITRATES_V2_L23,
        };
        table[self.bitrate_index as usize] * 1000
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        let version_idx = match self.version {
            MpegVersion::Mpeg1 => 0,
            MpegVersion::Mpeg2 => 1,
            MpegVersion::Mpeg25 => 2,
        };
        SAMPLE_RATES[version_idx][self.sample_rate_index as usize]
    }

    /// Number of PCM samples coded in one frame.
    pub fn samples_per_frame(&self) -> u32 {
        match (self.version, self.layer) {
            (_, MpegLayer::Layer1) => 384,
            (_, MpegLayer::Layer2) => 1152,
            (MpegVersion::Mpeg1, MpegLayer::Layer3) => 1152,
            (_, MpegLayer::Layer3) => 576,
        }
    }

    /// Frame size in bytes, header included.
    pub fn frame_size(&self) -> usize {
        let bitrate = self.bitrate();
        let sample_rate = self.sample_rate();
        let padding = self.padding as u32;

        let size = match self.layer {
            MpegLayer::Layer1 => (12 * bitrate / sample_rate + padding) * 4,
            _ => self.samples_per_frame() / 8 * bitrate / sample_rate + padding,
        };
        size as usize
    }

    /// Number of channels.
    pub fn channels(&self) -> u8 {
        if self.channel_mode == 3 {
            1
        } else {
            2
        }
    }

    /// Codec string for the layer.
    pub fn codec(&self) -> &'static str {
        match self.layer {
            MpegLayer::Layer3 => "mp3",
            MpegLayer::Layer2 => "mp2",
            MpegLayer::Layer1 => "mp1",
        }
    }
}
