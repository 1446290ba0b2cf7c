//! # Demux Core
//!
//! Shared low-level building blocks for the demux workspace:
//! - Error types
//! - Bit-level readers and writers, including Exp-Golomb coding and
//!   H.264/HEVC emulation-prevention handling
//! - A stateful Annex-B NAL start-code scanner that works across buffer
//!   boundaries

pub mod annexb;
pub mod bitstream;
pub mod error;

pub use annexb::{NalCodec, NaluScanner, ScanOutcome, ScannedUnit};
pub use bitstream::{remove_emulation_prevention, BitReader, BitWriter};
pub use error::{CoreError, Result};
