//! The remuxer sink interface.

use crate::track::{AudioTrack, Id3Track, TextTrack, VideoTrack};

/// Downstream consumer of demuxed tracks, typically a fragmented-MP4
/// remuxer.
///
/// `remux` is invoked once per [`push`](crate::TsDemuxer::push) call after
/// the terminal PES flush. The remuxer owns the queued samples from that
/// point: it is expected to drain `samples` (and reset `len`) on the tracks
/// it consumes, and the caller must not retain references into the input
/// buffer afterwards.
pub trait Remuxer {
    /// Consume the demuxed tracks for one fragment.
    #[allow(clippy::too_many_arguments)]
    fn remux(
        &mut self,
        audio: &mut AudioTrack,
        video: &mut VideoTrack,
        id3: &mut Id3Track,
        text: &mut TextTrack,
        time_offset: f64,
        contiguous: bool,
        accurate_time_offset: bool,
    );

    /// When true, the demuxer stops queueing samples once both audio and
    /// video codecs are identified and emits empty sample lists.
    fn passthrough(&self) -> bool {
        false
    }
}

impl Remuxer for () {
    fn remux(
        &mut self,
        _audio: &mut AudioTrack,
        _video: &mut VideoTrack,
        _id3: &mut Id3Track,
        _text: &mut TextTrack,
        _time_offset: f64,
        _contiguous: bool,
        _accurate_time_offset: bool,
    ) {
    }
}
