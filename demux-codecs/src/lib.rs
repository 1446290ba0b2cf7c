//! # Demux Codecs
//!
//! Codec-level header parsing for the demux workspace. Nothing in this
//! crate decodes media; it reads just enough of each bitstream to describe
//! it: AVC and HEVC sequence parameter sets, SEI caption payloads, ADTS
//! and MPEG audio frame headers.

pub mod audio;
pub mod video;

pub use audio::adts::{self, AdtsHeader, AudioConfig};
pub use audio::mpeg::{self, MpegAudioHeader};
pub use video::avc::{slice_type, AvcSps};
pub use video::hevc::HevcSps;
pub use video::sei::{parse_sei_payloads, Cea608Payload};
