//! Demuxed track and sample types.
//!
//! One track per elementary stream kind, with fixed ids: video 0, audio 1,
//! id3 2, text 3. Tracks live for the whole stream and are replaced only by
//! `reset_init_segment`; their PIDs may change at a PMT reparse.

/// The fixed 90 kHz input time scale of MPEG-TS timing.
pub const TIMESCALE_90KHZ: u32 = 90_000;

/// One NAL unit of a video sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NalUnit {
    /// NAL unit type.
    pub ty: u8,
    /// Unit bytes, header byte(s) included, start code excluded.
    pub data: Vec<u8>,
    /// Start-code scanner state recorded when this unit ended an input
    /// buffer; 0 otherwise.
    pub(crate) state: i32,
}

impl NalUnit {
    /// Create a unit from owned bytes.
    pub fn new(ty: u8, data: Vec<u8>) -> Self {
        Self { ty, data, state: 0 }
    }
}

/// A video access unit: one coded picture's NAL units in decode order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoSample {
    /// Presentation timestamp (90 kHz).
    pub pts: Option<i64>,
    /// Decode timestamp (90 kHz).
    pub dts: Option<i64>,
    /// Keyframe flag.
    pub key: bool,
    /// Whether the unit list contains a coded slice.
    pub frame: bool,
    /// NAL units in decode order.
    pub units: Vec<NalUnit>,
    /// Total byte length of `units`.
    pub len: usize,
}

impl VideoSample {
    /// Create an empty access unit.
    pub fn new(key: bool, pts: Option<i64>, dts: Option<i64>) -> Self {
        Self {
            pts,
            dts,
            key,
            frame: false,
            units: Vec::new(),
            len: 0,
        }
    }

    /// Append a unit, keeping the byte length in sync.
    pub fn push_unit(&mut self, unit: NalUnit) {
        self.len += unit.data.len();
        self.units.push(unit);
    }
}

/// The video elementary track.
#[derive(Debug)]
pub struct VideoTrack {
    /// Stable track id (always 0).
    pub id: u32,
    /// Elementary PID, `None` until the PMT names one.
    pub pid: Option<u16>,
    /// TS stream type (0x1B AVC, 0x24 HEVC).
    pub stream_type: u8,
    /// Codec string once a parameter set has been parsed.
    pub codec: Option<String>,
    /// Sequence parameter sets, as raw NAL bytes.
    pub sps: Vec<Vec<u8>>,
    /// Picture parameter sets.
    pub pps: Vec<Vec<u8>>,
    /// Video parameter sets (HEVC only).
    pub vps: Vec<Vec<u8>>,
    /// Coded width in pixels.
    pub width: u32,
    /// Coded height in pixels.
    pub height: u32,
    /// Sample aspect ratio (AVC).
    pub pixel_ratio: [u32; 2],
    /// Chroma format IDC (HEVC).
    pub chroma_format_idc: u8,
    /// Luma bit depth minus 8 (HEVC).
    pub bit_depth_luma_minus8: u8,
    /// Chroma bit depth minus 8 (HEVC).
    pub bit_depth_chroma_minus8: u8,
    /// Input time scale, fixed at 90 kHz.
    pub timescale: u32,
    /// Track duration hint in seconds.
    pub duration: f64,
    /// Queued access units.
    pub samples: Vec<VideoSample>,
    /// Sum of the byte lengths of `samples`.
    pub len: usize,
    /// Access units dropped waiting for a keyframe or parameter sets.
    pub dropped: u32,
    /// Whether an access unit delimiter has ever been seen.
    pub(crate) aud_found: bool,
    /// Whether a sequence parameter set has ever been seen.
    pub(crate) sps_found: bool,
}

impl VideoTrack {
    /// Fixed id of the video track.
    pub const ID: u32 = 0;

    /// Create an empty track.
    pub fn new(duration: f64) -> Self {
        Self {
            id: Self::ID,
            pid: None,
            stream_type: 0,
            codec: None,
            sps: Vec::new(),
            pps: Vec::new(),
            vps: Vec::new(),
            width: 0,
            height: 0,
            pixel_ratio: [1, 1],
            chroma_format_idc: 0,
            bit_depth_luma_minus8: 0,
            bit_depth_chroma_minus8: 0,
            timescale: TIMESCALE_90KHZ,
            duration,
            samples: Vec::new(),
            len: 0,
            dropped: 0,
            aud_found: false,
            sps_found: false,
        }
    }
}

/// One audio frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioSample {
    /// Presentation timestamp (90 kHz).
    pub pts: i64,
    /// Decode timestamp, equal to `pts` for audio.
    pub dts: i64,
    /// Frame bytes (ADTS header included for AAC).
    pub data: Vec<u8>,
}

/// The audio elementary track.
#[derive(Debug)]
pub struct AudioTrack {
    /// Stable track id (always 1).
    pub id: u32,
    /// Elementary PID, `None` until the PMT names one.
    pub pid: Option<u16>,
    /// TS stream type.
    pub stream_type: u8,
    /// Codec string once configured.
    pub codec: Option<String>,
    /// Sampling rate in Hz, 0 until configured.
    pub samplerate: u32,
    /// Channel configuration.
    pub channel_config: u8,
    /// AAC audio object type.
    pub object_type: u8,
    /// Whether the stream is AAC/ADTS (false: MPEG audio).
    pub is_aac: bool,
    /// Whether the stream is signalled as HE-AAC.
    pub he_aac: bool,
    /// Input time scale, fixed at 90 kHz.
    pub timescale: u32,
    /// Track duration hint in seconds.
    pub duration: f64,
    /// Queued frames.
    pub samples: Vec<AudioSample>,
    /// Sum of the byte lengths of `samples`.
    pub len: usize,
}

impl AudioTrack {
    /// Fixed id of the audio track.
    pub const ID: u32 = 1;

    /// Create an empty track.
    pub fn new(duration: f64) -> Self {
        Self {
            id: Self::ID,
            pid: None,
            stream_type: 0,
            codec: None,
            samplerate: 0,
            channel_config: 0,
            object_type: 0,
            is_aac: true,
            he_aac: false,
            timescale: TIMESCALE_90KHZ,
            duration,
            samples: Vec::new(),
            len: 0,
        }
    }
}

/// One ID3 metadata PES, carried opaque.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Id3Sample {
    /// Presentation timestamp (90 kHz).
    pub pts: Option<i64>,
    /// Decode timestamp (90 kHz).
    pub dts: Option<i64>,
    /// The whole PES payload, undecoded.
    pub data: Vec<u8>,
}

/// The timed-metadata (ID3) track.
#[derive(Debug)]
pub struct Id3Track {
    /// Stable track id (always 2).
    pub id: u32,
    /// Elementary PID, `None` until the PMT names one.
    pub pid: Option<u16>,
    /// Queued samples.
    pub samples: Vec<Id3Sample>,
    /// Sum of the byte lengths of `samples`.
    pub len: usize,
}

impl Id3Track {
    /// Fixed id of the ID3 track.
    pub const ID: u32 = 2;

    /// Create an empty track.
    pub fn new() -> Self {
        Self {
            id: Self::ID,
            pid: None,
            samples: Vec::new(),
            len: 0,
        }
    }
}

impl Default for Id3Track {
    fn default() -> Self {
        Self::new()
    }
}

/// One CEA-608 caption payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSample {
    /// Presentation timestamp (90 kHz).
    pub pts: i64,
    /// Sample type (3 = CEA-708/608 user data).
    pub sample_type: u8,
    /// Raw caption bytes.
    pub bytes: Vec<u8>,
}

/// The closed-caption text track.
#[derive(Debug)]
pub struct TextTrack {
    /// Stable track id (always 3).
    pub id: u32,
    /// Queued samples, sorted by PTS.
    pub samples: Vec<TextSample>,
}

impl TextTrack {
    /// Fixed id of the text track.
    pub const ID: u32 = 3;

    /// Create an empty track.
    pub fn new() -> Self {
        Self {
            id: Self::ID,
            samples: Vec::new(),
        }
    }

    /// Insert a sample keeping the queue sorted by PTS. Captions are
    /// emitted in decode order, so insertion is near the tail in practice.
    pub fn insert_in_order(&mut self, sample: TextSample) {
        let mut idx = self.samples.len();
        while idx > 0 && self.samples[idx - 1].pts > sample.pts {
            idx -= 1;
        }
        self.samples.insert(idx, sample);
    }
}

impl Default for TextTrack {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_ids_are_fixed() {
        assert_eq!(VideoTrack::new(0.0).id, 0);
        assert_eq!(AudioTrack::new(0.0).id, 1);
        assert_eq!(Id3Track::new().id, 2);
        assert_eq!(TextTrack::new().id, 3);
    }

    #[test]
    fn test_video_sample_length_accounting() {
        let mut sample = VideoSample::new(true, Some(0), Some(0));
        sample.push_unit(NalUnit::new(5, vec![0x65, 0x01, 0x02]));
        sample.push_unit(NalUnit::new(6, vec![0x66]));
        assert_eq!(sample.len, 4);
    }

    #[test]
    fn test_text_track_sorted_insert() {
        let mut track = TextTrack::new();
        for pts in [300, 100, 200, 100] {
            track.insert_in_order(TextSample {
                pts,
                sample_type: 3,
                bytes: Vec::new(),
            });
        }
        let order: Vec<i64> = track.samples.iter().map(|s| s.pts).collect();
        assert_eq!(order, vec![100, 100, 200, 300]);
    }
}
