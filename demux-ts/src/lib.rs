//! # Demux TS
//!
//! A push-based MPEG-2 Transport Stream demultiplexer. Feed it byte buffers
//! holding TS fragments; it discovers the first program via PAT/PMT,
//! reassembles PES packets per PID, splits video payloads into access units
//! (H.264/AVC or H.265/HEVC), scans audio payloads into frames (AAC/ADTS or
//! MPEG audio), collects ID3 metadata and CEA-608 captions, and hands the
//! four resulting tracks to a [`Remuxer`].
//!
//! The demuxer is fully incremental: NAL units, start codes, ADTS frames,
//! and PES packets may all straddle the buffers passed to
//! [`TsDemuxer::push`].
//!
//! ## Example
//!
//! ```no_run
//! use demux_ts::{FragmentInfo, TsDemuxer};
//! # use demux_ts::{AudioTrack, Event, Id3Track, Observer, Remuxer, TextTrack, VideoTrack};
//! # struct Log;
//! # impl Observer for Log { fn trigger(&mut self, _: Event) {} }
//! # struct Sink;
//! # impl Remuxer for Sink {
//! #     fn remux(&mut self, _: &mut AudioTrack, _: &mut VideoTrack, _: &mut Id3Track,
//! #              _: &mut TextTrack, _: f64, _: bool, _: bool) {}
//! # }
//!
//! let mut demuxer = TsDemuxer::new(Log, Sink, Default::default(), Default::default());
//! let fragment: Vec<u8> = std::fs::read("segment.ts").unwrap();
//! assert!(TsDemuxer::<Log, Sink>::probe(&fragment));
//! demuxer.push(&fragment, &FragmentInfo::default());
//! ```

pub mod demuxer;
pub mod error;
pub mod events;
pub mod packet;
pub mod pes;
pub mod psi;
pub mod remux;
pub mod track;

pub use demuxer::{DemuxerConfig, FragmentInfo, TsDemuxer, TypeSupported};
pub use error::{Result, TsError};
pub use events::{ErrorData, ErrorDetails, ErrorType, Event, Observer};
pub use packet::{TsPacketHeader, PID_NULL, PID_PAT, PID_SDT, SYNC_BYTE, TS_PACKET_SIZE};
pub use pes::{parse_pes, PesAccumulator, PesData};
pub use psi::{parse_pat, parse_pmt, PmtResult, StreamType};
pub use remux::Remuxer;
pub use track::{
    AudioSample, AudioTrack, Id3Sample, Id3Track, NalUnit, TextSample, TextTrack, VideoSample,
    VideoTrack, TIMESCALE_90KHZ,
};
