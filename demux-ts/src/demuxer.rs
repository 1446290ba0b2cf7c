//! The push-based TS demuxer.
//!
//! [`TsDemuxer::push`] walks 188-byte packets, learns the first program's
//! elementary PIDs from PAT/PMT, reassembles PES payloads per PID, and runs
//! the per-codec parsers. All cross-buffer state (in-progress access unit,
//! NAL scanner state, ADTS overflow) lives here, so fragments can be fed in
//! arbitrary slices.

use std::mem;

use demux_codecs::audio::{adts, mpeg};
use demux_codecs::video::avc::{self, AvcSps};
use demux_codecs::video::hevc::HevcSps;
use demux_codecs::video::sei::parse_sei_payloads;
use demux_codecs::AudioConfig;
use demux_core::annexb::{NalCodec, NaluScanner, ScanOutcome};
use demux_core::bitstream::remove_emulation_prevention;
use tracing::{debug, trace, warn};

use crate::events::{ErrorData, ErrorDetails, ErrorType, Event, Observer};
use crate::packet::{TsPacketHeader, PID_NULL, PID_PAT, PID_SDT, TS_PACKET_SIZE};
use crate::pes::{parse_pes, PesAccumulator, PesData};
use crate::psi::{parse_pat, parse_pmt, StreamType};
use crate::remux::Remuxer;
use crate::track::{
    AudioSample, AudioTrack, Id3Sample, Id3Track, NalUnit, TextSample, TextTrack, VideoSample,
    VideoTrack,
};

/// Codec string reported for HEVC streams.
const HEVC_CODEC_STRING: &str = "hev1.1.6.L93.B0";

/// Demuxer options.
#[derive(Debug, Clone)]
pub struct DemuxerConfig {
    /// Drop access units until a keyframe (or parameter sets) after a
    /// discontinuity.
    pub force_key_frame_on_discontinuity: bool,
}

impl Default for DemuxerConfig {
    fn default() -> Self {
        Self {
            force_key_frame_on_discontinuity: true,
        }
    }
}

/// Playback-capability hints from the embedding player. The demuxer treats
/// these as opaque configuration; only the HE-AAC signalling path consults
/// them together with the manifest codec hint.
#[derive(Debug, Clone, Default)]
pub struct TypeSupported {
    /// MP4 container support.
    pub mp4: bool,
    /// MPEG audio passthrough support.
    pub mpeg: bool,
    /// MP3 container support.
    pub mp3: bool,
}

/// Caller context for one [`TsDemuxer::push`] call.
#[derive(Debug, Clone, Default)]
pub struct FragmentInfo {
    /// Manifest audio codec hint, e.g. `mp4a.40.5`.
    pub audio_codec: Option<String>,
    /// Manifest video codec hint.
    pub video_codec: Option<String>,
    /// Fragment start time in seconds, forwarded to the remuxer.
    pub time_offset: f64,
    /// Discontinuity counter of the fragment; the fragment is contiguous
    /// when it matches the previous push.
    pub cc: i32,
    /// Playlist level of the fragment.
    pub level: u32,
    /// Sequence number of the fragment.
    pub sn: u32,
    /// Fragment duration in seconds.
    pub duration: f64,
    /// Whether `time_offset` is exact, forwarded to the remuxer.
    pub accurate_time_offset: bool,
}

/// Push-based MPEG-TS demultiplexer.
pub struct TsDemuxer<O: Observer, R: Remuxer> {
    observer: O,
    remuxer: R,
    config: DemuxerConfig,
    #[allow(dead_code)]
    type_supported: TypeSupported,

    pmt_pid: Option<u16>,
    pmt_parsed: bool,
    last_cc: Option<i32>,

    video_track: VideoTrack,
    audio_track: AudioTrack,
    id3_track: Id3Track,
    text_track: TextTrack,

    /// In-progress video access unit; may straddle input buffers.
    video_sample: Option<VideoSample>,
    nalu_scanner: NaluScanner,
    aac_overflow: Option<Vec<u8>>,
    aac_last_pts: Option<f64>,

    audio_codec: Option<String>,
    video_codec: Option<String>,
}

impl<O: Observer, R: Remuxer> TsDemuxer<O, R> {
    /// Create a demuxer.
    pub fn new(
        observer: O,
        remuxer: R,
        config: DemuxerConfig,
        type_supported: TypeSupported,
    ) -> Self {
        Self {
            observer,
            remuxer,
            config,
            type_supported,
            pmt_pid: None,
            pmt_parsed: false,
            last_cc: None,
            video_track: VideoTrack::new(0.0),
            audio_track: AudioTrack::new(0.0),
            id3_track: Id3Track::new(),
            text_track: TextTrack::new(),
            video_sample: None,
            nalu_scanner: NaluScanner::new(NalCodec::Avc),
            aac_overflow: None,
            aac_last_pts: None,
            audio_codec: None,
            video_codec: None,
        }
    }

    /// Check whether `data` looks like a transport stream: three sync bytes
    /// spaced one packet apart within the scan window.
    pub fn probe(data: &[u8]) -> bool {
        Self::sync_offset(data).is_some()
    }

    /// Find the least offset with sync bytes at `i`, `i + 188`, `i + 376`.
    pub fn sync_offset(data: &[u8]) -> Option<usize> {
        if data.len() < 3 * TS_PACKET_SIZE {
            return None;
        }
        let scan_window = usize::min(1000, data.len() - 3 * TS_PACKET_SIZE);
        (0..=scan_window).find(|&i| {
            data[i] == 0x47 && data[i + TS_PACKET_SIZE] == 0x47 && data[i + 2 * TS_PACKET_SIZE] == 0x47
        })
    }

    /// Start a fresh track quadruplet, clearing all cross-buffer state.
    ///
    /// Called at stream start, on a discontinuity, or on a codec change.
    pub fn reset_init_segment(
        &mut self,
        audio_codec: Option<String>,
        video_codec: Option<String>,
        duration: f64,
    ) {
        self.pmt_pid = None;
        self.pmt_parsed = false;
        self.video_track = VideoTrack::new(duration);
        self.audio_track = AudioTrack::new(duration);
        self.id3_track = Id3Track::new();
        self.text_track = TextTrack::new();
        self.video_sample = None;
        self.nalu_scanner.reset();
        self.aac_overflow = None;
        self.aac_last_pts = None;
        self.audio_codec = audio_codec;
        self.video_codec = video_codec;
    }

    /// Timestamp continuity is handled by the remuxer; nothing to do on the
    /// TS side. Kept for interface parity.
    pub fn reset_timestamp(&mut self) {}

    /// Drop all state.
    pub fn destroy(&mut self) {
        self.reset_init_segment(None, None, 0.0);
        self.last_cc = None;
    }

    /// Demux one buffer of TS data and hand the tracks to the remuxer.
    ///
    /// The buffer may hold any number of fragments; a trailing partial
    /// packet is dropped. PES packets, NAL units, and ADTS frames may
    /// straddle consecutive calls.
    pub fn push(&mut self, data: &[u8], info: &FragmentInfo) {
        let sync_offset = match Self::sync_offset(data) {
            Some(offset) => offset,
            None => return,
        };
        let mut len = data.len();
        len -= (len + sync_offset) % TS_PACKET_SIZE;

        self.audio_codec = info.audio_codec.clone();
        self.video_codec = info.video_codec.clone();

        let mut avc_data = PesAccumulator::new();
        let mut audio_data = PesAccumulator::new();
        let mut id3_data = PesAccumulator::new();
        let mut unknown_pids = false;

        let mut start = sync_offset;
        while start < len && start + TS_PACKET_SIZE <= data.len() {
            let packet = &data[start..start + TS_PACKET_SIZE];
            let mut rewind = false;

            let header = match TsPacketHeader::parse(packet) {
                Ok(header) => header,
                Err(err) => {
                    self.trigger_error(false, format!("{err} at offset {start}"));
                    start += TS_PACKET_SIZE;
                    continue;
                }
            };

            let offset = match header.payload_offset(packet) {
                Some(offset) => offset,
                None => {
                    start += TS_PACKET_SIZE;
                    continue;
                }
            };

            match header.pid {
                PID_PAT => {
                    let mut off = offset;
                    if header.payload_unit_start {
                        off += packet[off] as usize + 1;
                    }
                    if let Ok(pmt_pid) = parse_pat(packet, off) {
                        self.pmt_pid = Some(pmt_pid);
                    }
                }
                pid if Some(pid) == self.pmt_pid => {
                    let mut off = offset;
                    if header.payload_unit_start {
                        off += packet[off] as usize + 1;
                    }
                    if let Ok(result) = parse_pmt(packet, off) {
                        if let Some(video_pid) = result.video_pid {
                            self.video_track.pid = Some(video_pid);
                            self.video_track.stream_type = result.video_stream_type;
                            let codec = if result.video_stream_type == StreamType::H265 as u8 {
                                NalCodec::Hevc
                            } else {
                                NalCodec::Avc
                            };
                            if self.nalu_scanner.codec() != codec {
                                self.nalu_scanner = NaluScanner::new(codec);
                            }
                            debug!(
                                pid = video_pid,
                                stream_type = result.video_stream_type,
                                hint = ?self.video_codec,
                                "video PID learned"
                            );
                        }
                        if let Some(audio_pid) = result.audio_pid {
                            self.audio_track.pid = Some(audio_pid);
                            self.audio_track.is_aac = result.audio_is_aac;
                        }
                        if let Some(id3_pid) = result.id3_pid {
                            self.id3_track.pid = Some(id3_pid);
                        }
                        if !self.pmt_parsed {
                            self.pmt_parsed = true;
                            if unknown_pids {
                                debug!("unknown PIDs seen before PMT, reparsing from sync offset");
                                unknown_pids = false;
                                rewind = true;
                            }
                        }
                    }
                }
                pid if self.video_track.pid == Some(pid) => {
                    if header.payload_unit_start && !avc_data.is_empty() {
                        if let Some(pes) = parse_pes(mem::take(&mut avc_data)) {
                            self.parse_video_pes(pes, false);
                        } else {
                            warn!("dropping truncated video PES");
                        }
                    }
                    avc_data.push(&packet[offset..]);
                }
                pid if self.audio_track.pid == Some(pid) => {
                    if header.payload_unit_start && !audio_data.is_empty() {
                        if let Some(pes) = parse_pes(mem::take(&mut audio_data)) {
                            if !self.parse_audio_pes(pes) {
                                return;
                            }
                        } else {
                            warn!("dropping truncated audio PES");
                        }
                    }
                    audio_data.push(&packet[offset..]);
                }
                pid if self.id3_track.pid == Some(pid) => {
                    if header.payload_unit_start && !id3_data.is_empty() {
                        if let Some(pes) = parse_pes(mem::take(&mut id3_data)) {
                            self.parse_id3_pes(pes);
                        } else {
                            warn!("dropping truncated ID3 PES");
                        }
                    }
                    id3_data.push(&packet[offset..]);
                }
                PID_SDT | PID_NULL => {}
                _ => {
                    unknown_pids = true;
                }
            }

            if rewind {
                start = sync_offset;
            } else {
                start += TS_PACKET_SIZE;
            }
        }

        // Terminal PES flush: the end of the buffer closes each open
        // accumulator.
        if !avc_data.is_empty() {
            if let Some(pes) = parse_pes(avc_data) {
                self.parse_video_pes(pes, true);
            } else {
                warn!("dropping truncated trailing video PES");
            }
        }
        if !audio_data.is_empty() {
            if let Some(pes) = parse_pes(audio_data) {
                if !self.parse_audio_pes(pes) {
                    return;
                }
            } else {
                warn!("dropping truncated trailing audio PES");
            }
        }
        if !id3_data.is_empty() {
            if let Some(pes) = parse_pes(id3_data) {
                self.parse_id3_pes(pes);
            } else {
                warn!("dropping truncated trailing ID3 PES");
            }
        }

        let contiguous = self.last_cc == Some(info.cc);
        self.last_cc = Some(info.cc);

        self.remuxer.remux(
            &mut self.audio_track,
            &mut self.video_track,
            &mut self.id3_track,
            &mut self.text_track,
            info.time_offset,
            contiguous,
            info.accurate_time_offset,
        );
    }

    fn trigger_error(&mut self, fatal: bool, reason: String) {
        self.observer.trigger(Event::Error(ErrorData {
            error_type: ErrorType::MediaError,
            details: ErrorDetails::FragParsingError,
            fatal,
            reason,
        }));
    }

    fn parse_video_pes(&mut self, pes: PesData, last: bool) {
        match StreamType::from_u8(self.video_track.stream_type) {
            Some(StreamType::H264) => self.parse_avc_pes(pes, last),
            Some(StreamType::H265) => self.parse_hevc_pes(pes, last),
            _ => {
                warn!(
                    stream_type = self.video_track.stream_type,
                    "unsupported video stream type"
                );
            }
        }
    }

    // ------------------------------------------------------------------
    // AVC elementary stream
    // ------------------------------------------------------------------

    fn parse_avc_pes(&mut self, pes: PesData, last: bool) {
        let passthrough = self.remuxer.passthrough();
        let outcome = self.nalu_scanner.scan(&pes.data);
        self.apply_video_overlap(&pes.data, &outcome);

        for scanned in &outcome.units {
            let unit_data = pes.data[scanned.start..scanned.end].to_vec();
            let ty = scanned.ty;
            let mut push = false;

            match ty {
                // Non-IDR slice
                1 => {
                    push = true;
                    self.open_slice_sample(&pes, true);
                    let sps_found = self.video_track.sps_found;
                    let key = sps_found
                        && unit_data.len() > 4
                        && matches!(avc::slice_type(&unit_data), Ok(2 | 4 | 7 | 9));
                    if let Some(sample) = self.video_sample.as_mut() {
                        sample.frame = true;
                        if key {
                            sample.key = true;
                        }
                    }
                }
                // IDR slice
                5 => {
                    push = true;
                    self.open_slice_sample(&pes, true);
                    if let Some(sample) = self.video_sample.as_mut() {
                        sample.frame = true;
                        sample.key = true;
                    }
                }
                // SEI
                6 => {
                    push = true;
                    if unit_data.len() > 1 {
                        let rbsp = remove_emulation_prevention(&unit_data[1..]);
                        for captions in parse_sei_payloads(&rbsp) {
                            if let Some(pts) = pes.pts {
                                self.text_track.insert_in_order(TextSample {
                                    pts,
                                    sample_type: 3,
                                    bytes: captions.bytes,
                                });
                            }
                        }
                    }
                }
                // SPS
                7 => {
                    push = true;
                    self.video_track.sps_found = true;
                    if self.video_track.sps.is_empty() {
                        match AvcSps::parse(&unit_data) {
                            Ok(sps) => {
                                self.video_track.width = sps.width;
                                self.video_track.height = sps.height;
                                self.video_track.pixel_ratio = sps.pixel_ratio;
                                self.video_track.codec = Some(sps.codec);
                                self.video_track.sps = vec![unit_data.clone()];
                            }
                            Err(err) => warn!(%err, "failed to parse AVC SPS"),
                        }
                    }
                }
                // PPS
                8 => {
                    push = true;
                    if self.video_track.pps.is_empty() {
                        self.video_track.pps = vec![unit_data.clone()];
                    }
                }
                // Access unit delimiter: closes the current unit, not kept
                9 => {
                    self.video_track.aud_found = true;
                    if let Some(sample) = self.video_sample.take() {
                        self.push_access_unit(sample);
                    }
                    self.video_sample = Some(VideoSample::new(false, pes.pts, pes.dts));
                }
                // Filler
                12 => {}
                other => {
                    trace!(nal_type = other, "dropping NAL unit");
                }
            }

            if push && !passthrough {
                if let Some(sample) = self.video_sample.as_mut() {
                    let mut unit = NalUnit::new(ty, unit_data);
                    unit.state = scanned.state;
                    sample.push_unit(unit);
                }
            }
        }

        if last {
            self.flush_video_sample();
        }
    }

    // ------------------------------------------------------------------
    // HEVC elementary stream
    // ------------------------------------------------------------------

    fn parse_hevc_pes(&mut self, pes: PesData, last: bool) {
        let passthrough = self.remuxer.passthrough();
        let outcome = self.nalu_scanner.scan(&pes.data);
        self.apply_video_overlap(&pes.data, &outcome);

        for scanned in &outcome.units {
            let unit_data = pes.data[scanned.start..scanned.end].to_vec();
            let ty = scanned.ty;
            let mut push = true;

            match ty {
                // VCL, non-keyframe: TRAIL_N/TSA_N/STSA_N/RADL_N/RASL_N and
                // the broken-link access types
                0 | 2 | 4 | 6 | 8 | 16 | 17 | 18 => {
                    self.open_slice_sample(&pes, false);
                    if let Some(sample) = self.video_sample.as_mut() {
                        sample.frame = true;
                    }
                }
                // VCL, keyframe: reference trailing pictures and
                // IDR_W_RADL/IDR_N_LP/CRA
                1 | 3 | 5 | 7 | 9 | 19 | 20 | 21 => {
                    self.open_slice_sample(&pes, false);
                    if let Some(sample) = self.video_sample.as_mut() {
                        sample.frame = true;
                        sample.key = true;
                    }
                }
                // VPS
                32 => {
                    if self.video_track.vps.is_empty() {
                        self.video_track.vps = vec![unit_data.clone()];
                    }
                }
                // SPS
                33 => {
                    self.video_track.sps_found = true;
                    if self.video_track.sps.is_empty() {
                        match HevcSps::parse(&unit_data) {
                            Ok(sps) => {
                                self.video_track.width = sps.width;
                                self.video_track.height = sps.height;
                                self.video_track.chroma_format_idc = sps.chroma_format_idc;
                                self.video_track.bit_depth_luma_minus8 = sps.bit_depth_luma_minus8;
                                self.video_track.bit_depth_chroma_minus8 =
                                    sps.bit_depth_chroma_minus8;
                                self.video_track.codec = Some(HEVC_CODEC_STRING.to_string());
                                self.video_track.sps = vec![unit_data.clone()];
                            }
                            Err(err) => warn!(%err, "failed to parse HEVC SPS"),
                        }
                    }
                }
                // PPS
                34 => {
                    if self.video_track.pps.is_empty() {
                        self.video_track.pps = vec![unit_data.clone()];
                    }
                }
                // Access unit delimiter closes the collected group
                35 => {
                    push = false;
                    self.video_track.aud_found = true;
                    if let Some(sample) = self.video_sample.take() {
                        self.push_access_unit(sample);
                    }
                }
                // EOS/EOB/FD/prefix SEI/suffix SEI ride along with the group
                36..=40 => {}
                other => {
                    push = false;
                    trace!(nal_type = other, "dropping NAL unit");
                }
            }

            if push && !passthrough {
                if self.video_sample.is_none() {
                    // Parameter sets and SEI ahead of the first slice open
                    // the group.
                    self.video_sample = Some(VideoSample::new(false, pes.pts, pes.dts));
                }
                if let Some(sample) = self.video_sample.as_mut() {
                    let mut unit = NalUnit::new(ty, unit_data);
                    unit.state = scanned.state;
                    sample.push_unit(unit);
                }
            }
        }

        if last {
            self.flush_video_sample();
        }
    }

    // ------------------------------------------------------------------
    // Shared video machinery
    // ------------------------------------------------------------------

    /// Prepare the in-progress access unit for an arriving slice NAL.
    ///
    /// Without access unit delimiters in the stream, a new slice closes the
    /// previous unit once it already contains a slice. A missing sample is
    /// created; AVC creates it with a conservative keyframe mark.
    fn open_slice_sample(&mut self, pes: &PesData, conservative_key: bool) {
        if !self.video_track.aud_found {
            let close = self
                .video_sample
                .as_ref()
                .map(|sample| sample.frame)
                .unwrap_or(false);
            if close {
                let sample = self.video_sample.take().unwrap();
                self.push_access_unit(sample);
                self.video_sample = Some(VideoSample::new(false, pes.pts, pes.dts));
            }
        }
        if self.video_sample.is_none() {
            self.video_sample = Some(VideoSample::new(conservative_key, pes.pts, pes.dts));
        }
    }

    /// Close the in-progress access unit at buffer end when it reached a
    /// natural boundary: it contains a coded slice and the scanner is not
    /// in the middle of a start code. Otherwise the unit is carried into
    /// the next push, where the boundary repair can still reach it.
    fn flush_video_sample(&mut self) {
        let at_boundary = self.nalu_scanner.state() == 0;
        let complete = at_boundary
            && self
                .video_sample
                .as_ref()
                .map(|sample| sample.frame)
                .unwrap_or(false);
        if complete {
            let sample = self.video_sample.take().unwrap();
            self.push_access_unit(sample);
        }
    }

    /// Queue a finished access unit on the video track.
    fn push_access_unit(&mut self, mut sample: VideoSample) {
        if sample.units.is_empty() || !sample.frame {
            return;
        }
        if sample.pts.is_none() {
            // Patch timing from the previous sample; without one the unit
            // cannot be scheduled at all.
            match self.video_track.samples.last() {
                Some(last) => {
                    sample.pts = last.pts;
                    sample.dts = last.dts;
                }
                None => {
                    self.video_track.dropped += 1;
                    return;
                }
            }
        }
        if !self.config.force_key_frame_on_discontinuity
            || sample.key
            || !self.video_track.sps.is_empty()
        {
            self.video_track.len += sample.len;
            self.video_track.samples.push(sample);
        } else {
            self.video_track.dropped += 1;
        }
    }

    /// Stitch scanner results onto the unit emitted at the end of the
    /// previous buffer: strip start-code bytes that straddled the boundary
    /// and append leading tail bytes.
    fn apply_video_overlap(&mut self, data: &[u8], outcome: &ScanOutcome) {
        if outcome.start_code_found {
            if outcome.strip_last > 0 {
                self.strip_last_video_unit(outcome.strip_last);
            }
            if outcome.leading > 0 {
                self.append_to_last_video_unit(&data[..outcome.leading]);
            }
        } else if !data.is_empty() {
            self.append_to_last_video_unit(data);
        }
    }

    fn strip_last_video_unit(&mut self, count: usize) {
        if let Some(sample) = self.video_sample.as_mut() {
            if let Some(unit) = sample.units.last_mut() {
                if unit.state != 0 && unit.data.len() >= count {
                    unit.data.truncate(unit.data.len() - count);
                    sample.len -= count;
                }
                return;
            }
        }
        if let Some(sample) = self.video_track.samples.last_mut() {
            if let Some(unit) = sample.units.last_mut() {
                if unit.state != 0 && unit.data.len() >= count {
                    unit.data.truncate(unit.data.len() - count);
                    sample.len -= count;
                    self.video_track.len -= count;
                }
            }
        }
    }

    fn append_to_last_video_unit(&mut self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        if let Some(sample) = self.video_sample.as_mut() {
            if let Some(unit) = sample.units.last_mut() {
                unit.data.extend_from_slice(bytes);
                sample.len += bytes.len();
                return;
            }
        }
        if let Some(sample) = self.video_track.samples.last_mut() {
            if let Some(unit) = sample.units.last_mut() {
                unit.data.extend_from_slice(bytes);
                sample.len += bytes.len();
                self.video_track.len += bytes.len();
            }
        }
    }

    // ------------------------------------------------------------------
    // Audio elementary streams
    // ------------------------------------------------------------------

    fn parse_audio_pes(&mut self, pes: PesData) -> bool {
        if self.audio_track.is_aac {
            self.parse_aac_pes(pes)
        } else {
            self.parse_mpeg_pes(pes);
            true
        }
    }

    /// Parse one AAC PES. Returns false on a fatal error, which aborts the
    /// current push before anything reaches the remuxer.
    fn parse_aac_pes(&mut self, pes: PesData) -> bool {
        let had_overflow = self.aac_overflow.is_some();
        let data = match self.aac_overflow.take() {
            Some(mut overflow) => {
                overflow.extend_from_slice(&pes.data);
                overflow
            }
            None => pes.data,
        };
        let len = data.len();
        if len == 0 {
            return true;
        }

        let mut offset = 0;
        while offset < len.saturating_sub(1) && !adts::is_header(&data, offset) {
            offset += 1;
        }
        if offset > 0 {
            if offset < len.saturating_sub(1) {
                self.trigger_error(
                    false,
                    format!("AAC PES did not start with ADTS header,offset:{offset}"),
                );
            } else {
                self.trigger_error(true, "no ADTS header found in AAC PES".to_string());
                return false;
            }
        }

        if self.audio_track.samplerate == 0 {
            match adts::AdtsHeader::parse(&data, offset) {
                Ok(header) => {
                    let config = AudioConfig::from_header(&header, self.audio_codec.as_deref());
                    debug!(
                        samplerate = config.samplerate,
                        channels = config.channel_config,
                        codec = %config.codec,
                        "AAC track configured"
                    );
                    self.audio_track.samplerate = config.samplerate;
                    self.audio_track.channel_config = config.channel_config;
                    self.audio_track.object_type = config.object_type;
                    self.audio_track.he_aac = config.he_aac;
                    self.audio_track.codec = Some(config.codec);
                }
                Err(_) => {
                    // Not enough bytes for a whole header yet; wait for the
                    // next PES.
                    self.aac_overflow = Some(data[offset..].to_vec());
                    return true;
                }
            }
        }
        let frame_duration = adts::frame_duration(self.audio_track.samplerate);

        let mut pts = match pes.pts {
            Some(pts) => pts as f64,
            None => match self.aac_last_pts {
                Some(last) => last + frame_duration,
                None => {
                    warn!("dropping AAC PES without PTS");
                    return true;
                }
            },
        };

        // An overflowing frame glues two PES payloads together; keep the
        // timeline contiguous from the last emitted frame.
        if had_overflow {
            if let Some(last_pts) = self.aac_last_pts {
                let new_pts = last_pts + frame_duration;
                if (new_pts - pts).abs() > 1.0 {
                    debug!(
                        delta = new_pts - pts,
                        "aligning AAC PTS over PES boundary"
                    );
                    pts = new_pts;
                }
            }
        }

        let passthrough = self.remuxer.passthrough();
        let mut frame_index = 0u32;
        let mut last_stamp = None;

        while offset < len {
            if !adts::is_header(&data, offset) || offset + 5 >= len {
                break;
            }
            let header = match adts::AdtsHeader::parse(&data, offset) {
                Ok(header) => header,
                Err(_) => break,
            };
            let frame_length = header.frame_length;
            if frame_length <= header.header_size() || offset + frame_length > len {
                break;
            }

            let stamp = pts + frame_index as f64 * frame_duration;
            if !passthrough {
                let sample_pts = stamp.round() as i64;
                let body = data[offset + header.header_size()..offset + frame_length].to_vec();
                self.audio_track.len += body.len();
                self.audio_track.samples.push(AudioSample {
                    pts: sample_pts,
                    dts: sample_pts,
                    data: body,
                });
            }
            last_stamp = Some(stamp);
            frame_index += 1;
            offset += frame_length;
        }

        self.aac_overflow = if offset < len {
            Some(data[offset..].to_vec())
        } else {
            None
        };
        if let Some(stamp) = last_stamp {
            self.aac_last_pts = Some(stamp);
        }
        true
    }

    /// Parse one MPEG audio PES. Frames are self-delimited, so no overflow
    /// is carried between PES packets.
    fn parse_mpeg_pes(&mut self, pes: PesData) {
        let data = &pes.data;
        let len = data.len();
        let pts = match pes.pts {
            Some(pts) => pts,
            None => {
                warn!("dropping MPEG audio PES without PTS");
                return;
            }
        };

        let passthrough = self.remuxer.passthrough();
        let mut frame_index = 0u32;
        let mut offset = 0;

        while offset < len {
            if !mpeg::is_header(data, offset) {
                offset += 1;
                continue;
            }
            let header = match mpeg::MpegAudioHeader::parse(data, offset) {
                Ok(header) => header,
                Err(_) => {
                    offset += 1;
                    continue;
                }
            };

            if self.audio_track.samplerate == 0 {
                debug!(
                    samplerate = header.sample_rate(),
                    codec = header.codec(),
                    "MPEG audio track configured"
                );
                self.audio_track.samplerate = header.sample_rate();
                self.audio_track.channel_config = header.channels();
                self.audio_track.codec = Some(header.codec().to_string());
            }

            let frame_size = header.frame_size();
            if frame_size == 0 || offset + frame_size > len {
                break;
            }

            let frame_duration =
                header.samples_per_frame() as f64 * 90000.0 / header.sample_rate() as f64;
            let stamp = (pts as f64 + frame_index as f64 * frame_duration).round() as i64;
            if !passthrough {
                self.audio_track.len += frame_size;
                self.audio_track.samples.push(AudioSample {
                    pts: stamp,
                    dts: stamp,
                    data: data[offset..offset + frame_size].to_vec(),
                });
            }
            frame_index += 1;
            offset += frame_size;
        }
    }

    // ------------------------------------------------------------------
    // ID3
    // ------------------------------------------------------------------

    /// ID3 PES payloads are queued whole; decoding is the consumer's job.
    fn parse_id3_pes(&mut self, pes: PesData) {
        self.id3_track.len += pes.data.len();
        self.id3_track.samples.push(Id3Sample {
            pts: pes.pts,
            dts: pes.dts,
            data: pes.data,
        });
    }
}
