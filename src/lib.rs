//! # Demux
//!
//! MPEG-2 Transport Stream demultiplexing for HLS-style fragment
//! pipelines. This umbrella crate re-exports the workspace members:
//!
//! - [`core`](demux_core): bit readers, Exp-Golomb coding, the cross-buffer
//!   Annex-B NAL scanner
//! - [`codecs`](demux_codecs): AVC/HEVC parameter-set parsers, SEI caption
//!   extraction, ADTS and MPEG audio headers
//! - [`ts`](demux_ts): the push-based TS demuxer itself
//!
//! Most users only need [`TsDemuxer`] together with an [`Observer`] for
//! error reporting and a [`Remuxer`] sink for the demuxed tracks.

pub use demux_codecs as codecs;
pub use demux_core as core;
pub use demux_ts as ts;

pub use demux_ts::{
    AudioSample, AudioTrack, DemuxerConfig, ErrorData, ErrorDetails, ErrorType, Event,
    FragmentInfo, Id3Sample, Id3Track, NalUnit, Observer, Remuxer, TextSample, TextTrack,
    TsDemuxer, TypeSupported, VideoSample, VideoTrack,
};
