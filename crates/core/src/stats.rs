//! Optional codec instrumentation

use serde::Serialize;

use crate::army::Reorder;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecEvent {
    CompressFast,
    CompressSlow,
    DecompressFast,
    DecompressSlow,
    Rescan { success: bool },
    Reorder(Reorder),
    SlowIndexClamped,
}

/// Receives an event for every codec step worth counting.
pub trait Instrument {
    fn record(&mut self, event: CodecEvent);
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoInstrument;

impl Instrument for NoInstrument {
    fn record(&mut self, _event: CodecEvent) {}
}

impl<I: Instrument + ?Sized> Instrument for &mut I {
    fn record(&mut self, event: CodecEvent) {
        (**self).record(event);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CodecStats {
    pub compress_fast: u64,
    pub compress_slow: u64,
    pub decompress_fast: u64,
    pub decompress_slow: u64,
    pub rescans: u64,
    pub failed_rescans: u64,
    pub rook_swaps: u64,
    pub knight_swaps: u64,
    pub queen_swaps: u64,
    /// Indexed by the number of slots a capturing pawn moved
    pub pawn_swaps: [u64; 8],
    pub slow_index_clamped: u64,
}

impl CodecStats {
    pub fn fast_ratio(&self) -> f64 {
        let fast = self.compress_fast + self.decompress_fast;
        let total = fast + self.compress_slow + self.decompress_slow;
        if total == 0 {
            0.0
        } else {
            fast as f64 / total as f64
        }
    }
}

impl Instrument for CodecStats {
    fn record(&mut self, event: CodecEvent) {
        match event {
            CodecEvent::CompressFast => self.compress_fast += 1,
            CodecEvent::CompressSlow => self.compress_slow += 1,
            CodecEvent::DecompressFast => self.decompress_fast += 1,
            CodecEvent::DecompressSlow => self.decompress_slow += 1,
            CodecEvent::Rescan { success } => {
                self.rescans += 1;
                if !success {
                    self.failed_rescans += 1;
                }
            }
            CodecEvent::Reorder(Reorder::None) => {}
            CodecEvent::Reorder(Reorder::Rooks) => self.rook_swaps += 1,
            CodecEvent::Reorder(Reorder::Knights) => self.knight_swaps += 1,
            CodecEvent::Reorder(Reorder::Queens) => self.queen_swaps += 1,
            CodecEvent::Reorder(Reorder::Pawns(n)) => {
                let idx = usize::from(n).min(self.pawn_swaps.len() - 1);
                self.pawn_swaps[idx] += 1;
            }
            CodecEvent::SlowIndexClamped => self.slow_index_clamped += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let mut stats = CodecStats::default();
        stats.record(CodecEvent::CompressFast);
        stats.record(CodecEvent::CompressFast);
        stats.record(CodecEvent::CompressSlow);
        stats.record(CodecEvent::Rescan { success: false });
        stats.record(CodecEvent::Reorder(Reorder::Pawns(2)));
        stats.record(CodecEvent::Reorder(Reorder::None));

        assert_eq!(stats.compress_fast, 2);
        assert_eq!(stats.compress_slow, 1);
        assert_eq!(stats.rescans, 1);
        assert_eq!(stats.failed_rescans, 1);
        assert_eq!(stats.pawn_swaps[2], 1);
        assert!((stats.fast_ratio() - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_serializes_to_json() {
        let stats = CodecStats::default();
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["compress_fast"], 0);
        assert_eq!(json["pawn_swaps"].as_array().map(|a| a.len()), Some(8));
    }
}
