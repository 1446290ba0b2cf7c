//! PES packet reassembly.
//!
//! TS payload fragments for one PID are collected into a [`PesAccumulator`]
//! until the end-of-PES signal (the next payload-unit-start on that PID, or
//! the end of the input buffer for the terminal PES). [`parse_pes`] then
//! validates the header, extracts the 33-bit PTS/DTS, and yields the
//! payload with timing.

use tracing::warn;

/// One PID's pending PES payload fragments.
#[derive(Debug, Default)]
pub struct PesAccumulator {
    slices: Vec<Vec<u8>>,
    size: usize,
}

impl PesAccumulator {
    /// Create an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one TS payload fragment.
    pub fn push(&mut self, fragment: &[u8]) {
        self.size += fragment.len();
        self.slices.push(fragment.to_vec());
    }

    /// Total buffered bytes.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Check whether any data has been buffered.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }
}

/// A reassembled PES payload with timing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PesData {
    /// The elementary-stream payload (PES header stripped).
    pub data: Vec<u8>,
    /// Presentation timestamp in 90 kHz ticks; wrapped values are negative.
    pub pts: Option<i64>,
    /// Decode timestamp; equals `pts` when the stream carries no DTS.
    pub dts: Option<i64>,
    /// Declared payload length (PES_packet_length minus the optional
    /// header), 0 for unbounded video PES.
    pub len: usize,
}

/// Parse a closed accumulator into a PES payload.
///
/// Returns `None` for anything that is not a whole, well-formed PES packet
/// (bad start code, truncated body); the caller recovers by dropping the
/// accumulator.
pub fn parse_pes(mut acc: PesAccumulator) -> Option<PesData> {
    if acc.is_empty() {
        return None;
    }

    // The fixed header plus both timestamps span 19 bytes; merge leading
    // fragments until the first one covers that.
    while acc.slices[0].len() < 19 && acc.slices.len() > 1 {
        let next = acc.slices.remove(1);
        acc.slices[0].extend_from_slice(&next);
    }

    let frag = &acc.slices[0];
    if frag.len() < 9 {
        return None;
    }

    let prefix = ((frag[0] as u32) << 16) | ((frag[1] as u32) << 8) | frag[2] as u32;
    if prefix != 1 {
        return None;
    }

    let pes_len = ((frag[4] as usize) << 8) | frag[5] as usize;
    if pes_len != 0 && pes_len > acc.size - 6 {
        // Truncated PES
        return None;
    }

    let flags = frag[7];
    let (mut pts, mut dts) = (None, None);
    if flags & 0xC0 != 0 {
        if frag.len() < 14 {
            return None;
        }
        let mut p = read_timestamp(&frag[9..14]);
        if flags & 0x40 != 0 {
            if frag.len() < 19 {
                return None;
            }
            let d = read_timestamp(&frag[14..19]);
            if p - d > 60 * 90000 {
                warn!(
                    pts = p,
                    dts = d,
                    "PTS/DTS delta larger than 60s, using DTS as PTS"
                );
                p = d;
            }
            pts = Some(p);
            dts = Some(d);
        } else {
            pts = Some(p);
            dts = Some(p);
        }
    }

    let hdr_len = frag[8] as usize;
    let payload_start = hdr_len + 9;
    if payload_start > acc.size {
        return None;
    }

    let mut data = Vec::with_capacity(acc.size - payload_start);
    let mut skip = payload_start;
    for slice in &acc.slices {
        if skip >= slice.len() {
            skip -= slice.len();
            continue;
        }
        data.extend_from_slice(&slice[skip..]);
        skip = 0;
    }

    let len = if pes_len != 0 {
        pes_len.saturating_sub(hdr_len + 3)
    } else {
        0
    };

    Some(PesData {
        data,
        pts,
        dts,
        len,
    })
}

/// Read a 33-bit PTS/DTS from its 5-byte encoding.
///
/// The reconstruction multiplies instead of shifting so the top bit cannot
/// overflow an intermediate 32-bit value; values above 2^32 − 1 wrap by
/// −2^33.
fn read_timestamp(b: &[u8]) -> i64 {
    let mut ts = (b[0] as i64 & 0x0E) * 536_870_912 // 2^29
        + (b[1] as i64) * 4_194_304 // 2^22
        + (b[2] as i64 & 0xFE) * 16_384 // 2^14
        + (b[3] as i64) * 128
        + (b[4] as i64 & 0xFE) / 2;
    if ts > 4_294_967_295 {
        ts -= 8_589_934_592;
    }
    ts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push_timestamp(out: &mut Vec<u8>, prefix: u8, value: u64) {
        out.push(prefix | (((value >> 30) & 0x07) as u8) << 1 | 0x01);
        out.push(((value >> 22) & 0xFF) as u8);
        out.push(((((value >> 15) & 0x7F) as u8) << 1) | 0x01);
        out.push(((value >> 7) & 0xFF) as u8);
        out.push((((value & 0x7F) as u8) << 1) | 0x01);
    }

    fn build_pes(pts: Option<u64>, dts: Option<u64>, payload: &[u8]) -> Vec<u8> {
        let mut flags = 0u8;
        let mut hdr_len = 0usize;
        if pts.is_some() {
            flags |= 0x80;
            hdr_len += 5;
        }
        if dts.is_some() {
            flags |= 0x40;
            hdr_len += 5;
        }
        let pes_len = 3 + hdr_len + payload.len();

        let mut out = vec![
            0x00,
            0x00,
            0x01,
            0xE0,
            (pes_len >> 8) as u8,
            (pes_len & 0xFF) as u8,
            0x80,
            flags,
            hdr_len as u8,
        ];
        if let Some(p) = pts {
            push_timestamp(&mut out, if dts.is_some() { 0x30 } else { 0x20 }, p);
        }
        if let Some(d) = dts {
            push_timestamp(&mut out, 0x10, d);
        }
        out.extend_from_slice(payload);
        out
    }

    fn accumulate(chunks: &[&[u8]]) -> PesAccumulator {
        let mut acc = PesAccumulator::new();
        for chunk in chunks {
            acc.push(chunk);
        }
        acc
    }

    #[test]
    fn test_parse_pes_with_pts_dts() {
        let payload = [0xAA, 0xBB, 0xCC];
        let pes = build_pes(Some(126000), Some(90000), &payload);
        let parsed = parse_pes(accumulate(&[&pes])).unwrap();

        assert_eq!(parsed.pts, Some(126000));
        assert_eq!(parsed.dts, Some(90000));
        assert_eq!(parsed.data, payload);
        assert_eq!(parsed.len, payload.len());
    }

    #[test]
    fn test_dts_defaults_to_pts() {
        let pes = build_pes(Some(90000), None, &[0x01]);
        let parsed = parse_pes(accumulate(&[&pes])).unwrap();

        assert_eq!(parsed.pts, Some(90000));
        assert_eq!(parsed.dts, Some(90000));
    }

    #[test]
    fn test_pts_round_trip_33_bits() {
        // Values up to 2^32 − 1 come back unchanged; larger 33-bit values
        // wrap to negative by 2^33.
        let cases: [(u64, i64); 4] = [
            (0, 0),
            (4_294_967_295, 4_294_967_295),
            (4_294_967_296, -4_294_967_296),
            (8_589_934_591, -1),
        ];
        for (raw, expected) in cases {
            let pes = build_pes(Some(raw), None, &[0x00]);
            let parsed = parse_pes(accumulate(&[&pes])).unwrap();
            assert_eq!(parsed.pts, Some(expected), "for raw value {raw}");
        }
    }

    #[test]
    fn test_pts_clamped_to_dts_on_large_delta() {
        let pes = build_pes(Some(90000 * 61), Some(0), &[0x00]);
        let parsed = parse_pes(accumulate(&[&pes])).unwrap();
        assert_eq!(parsed.pts, Some(0));
        assert_eq!(parsed.dts, Some(0));
    }

    #[test]
    fn test_header_split_across_fragments() {
        let payload: Vec<u8> = (0..32).collect();
        let pes = build_pes(Some(1234), Some(1200), &payload);

        // Split inside the 19-byte header.
        let parsed = parse_pes(accumulate(&[&pes[..7], &pes[7..16], &pes[16..]])).unwrap();
        assert_eq!(parsed.pts, Some(1234));
        assert_eq!(parsed.data, payload);
    }

    #[test]
    fn test_bad_start_code() {
        let mut pes = build_pes(Some(0), None, &[0x00]);
        pes[2] = 0x02;
        assert!(parse_pes(accumulate(&[&pes])).is_none());
    }

    #[test]
    fn test_truncated_pes_rejected() {
        let pes = build_pes(Some(0), None, &[0xAA; 32]);
        // Drop trailing bytes so the declared length exceeds the data.
        assert!(parse_pes(accumulate(&[&pes[..20]])).is_none());
    }

    #[test]
    fn test_empty_accumulator() {
        assert!(parse_pes(PesAccumulator::new()).is_none());
    }

    #[test]
    fn test_no_timestamps() {
        let pes = build_pes(None, None, &[0x42; 4]);
        let parsed = parse_pes(accumulate(&[&pes])).unwrap();
        assert_eq!(parsed.pts, None);
        assert_eq!(parsed.dts, None);
        assert_eq!(parsed.data, vec![0x42; 4]);
    }
}
