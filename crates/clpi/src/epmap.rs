//! The Entry Point Map: a two-level sparse index per elementary stream.
//!
//! Coarse entries carry the high-order bits of packet number and
//! timestamp at sparse intervals; each owns a contiguous run of fine
//! entries carrying the low-order bits densely. Reconstruction splits
//! as follows:
//!
//! - packet: coarse supplies everything above the low 17 bits, fine
//!   supplies the low 17;
//! - timestamp: coarse bits (minus the LSB) shifted up 18, fine 11 bits
//!   shifted up 8 — the low 8 bits of time are never stored, so lookups
//!   are only precise to 256 ticks.
//!
//! Lookups are pure reads over immutable parsed data; concurrent
//! navigation sessions share one map without locking.

use tracing::warn;

/// Coarse entry: `(ref_fine_id 18, pts 14, spn 32)` on disc.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpCoarse {
    /// Index of the first fine entry belonging to this bucket.
    pub ref_fine_id: u32,
    /// High-order timestamp bits (14 on disc).
    pub pts: u32,
    /// Full source-packet number of the bucket start.
    pub spn: u32,
}

/// Fine entry: `(angle_change 1, end_offset 3, pts 11, spn 17)` on disc.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpFine {
    pub is_angle_change: bool,
    pub end_offset: u8,
    /// Middle timestamp bits (11 on disc).
    pub pts: u32,
    /// Low 17 packet-number bits.
    pub spn: u32,
}

/// A resolved entry: full packet number plus reconstructed timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessPoint {
    pub packet: u32,
    pub timestamp: u64,
}

/// Reconstructs a full packet number from the coarse/fine split.
#[inline]
pub fn join_packet(coarse_spn: u32, fine_spn: u32) -> u32 {
    (coarse_spn & !0x1FFFF) | (fine_spn & 0x1FFFF)
}

/// Reconstructs a timestamp from the coarse/fine split. The result has
/// its low 8 bits always zero.
#[inline]
pub fn join_timestamp(coarse_pts: u32, fine_pts: u32) -> u64 {
    (((coarse_pts & !1) as u64) << 18) | ((fine_pts as u64) << 8)
}

/// Entry Point Map for one elementary stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpMap {
    pub pid: u16,
    pub stream_type: u8,
    /// Sorted ascending by packet offset.
    pub coarse: Vec<EpCoarse>,
    /// One flat list; bucket `i` owns `ref_fine_id[i] .. ref_fine_id[i+1]`.
    pub fine: Vec<EpFine>,
}

impl EpMap {
    pub fn is_empty(&self) -> bool {
        self.coarse.is_empty() || self.fine.is_empty()
    }

    /// Coarse bucket owning the fine entry at `fine_idx`.
    fn coarse_for_fine(&self, fine_idx: usize) -> usize {
        let mut ci = 0;
        while ci + 1 < self.coarse.len()
            && (self.coarse[ci + 1].ref_fine_id as usize) <= fine_idx
        {
            ci += 1;
        }
        ci
    }

    fn point(&self, fine_idx: usize) -> AccessPoint {
        let c = &self.coarse[self.coarse_for_fine(fine_idx)];
        let f = &self.fine[fine_idx];
        AccessPoint {
            packet: join_packet(c.spn, f.spn),
            timestamp: join_timestamp(c.pts, f.pts),
        }
    }

    /// Converts a timestamp to a packet offset.
    ///
    /// Finds the first entry whose reconstructed timestamp exceeds
    /// `ts`; with `before`, steps back one entry. Degenerate answers,
    /// never errors: a timestamp before the first entry maps to packet
    /// 0, one at or past the last maps to `total_packets`, and an empty
    /// map yields 0 (`before`) or `total_packets`.
    pub fn packet_for_timestamp(&self, ts: u64, before: bool, total_packets: u32) -> u32 {
        if self.is_empty() {
            return if before { 0 } else { total_packets };
        }

        if ts < self.point(0).timestamp {
            return 0;
        }
        if ts >= self.point(self.fine.len() - 1).timestamp {
            return total_packets;
        }

        // coarse scan: last bucket starting at or before ts
        let mut ci = 0;
        while ci + 1 < self.coarse.len() {
            let next_start = self.coarse[ci + 1].ref_fine_id as usize;
            if next_start < self.fine.len() && self.point(next_start).timestamp <= ts {
                ci += 1;
            } else {
                break;
            }
        }

        // fine scan within (and, at run end, just past) the bucket
        let mut fi = self.coarse[ci].ref_fine_id as usize;
        while fi < self.fine.len() && self.point(fi).timestamp <= ts {
            fi += 1;
        }
        if before {
            fi -= 1; // fi > 0: ts is at/after the first entry here
        }
        self.point(fi).packet
    }

    /// Converts a packet offset to the nearest indexed point.
    ///
    /// `next` selects the entry at/after the offset instead of at/
    /// before. With `angle_change`, scanning continues forward across
    /// bucket boundaries until a fine entry with the angle-change flag
    /// is found; if none remains the answer is
    /// `(total_packets, timestamp 0)`, meaning "no further angle-change
    /// point".
    pub fn timestamp_for_packet(
        &self,
        pkt: u32,
        next: bool,
        angle_change: bool,
        total_packets: u32,
    ) -> AccessPoint {
        if self.is_empty() {
            return AccessPoint {
                packet: if next { total_packets } else { 0 },
                timestamp: 0,
            };
        }

        let mut fi = 0;
        while fi < self.fine.len() && self.point(fi).packet <= pkt {
            fi += 1;
        }
        if next {
            if fi == self.fine.len() {
                return AccessPoint {
                    packet: total_packets,
                    timestamp: 0,
                };
            }
        } else {
            fi = fi.saturating_sub(1);
        }

        if angle_change {
            while fi < self.fine.len() && !self.fine[fi].is_angle_change {
                fi += 1;
            }
            if fi == self.fine.len() {
                return AccessPoint {
                    packet: total_packets,
                    timestamp: 0,
                };
            }
        }

        self.point(fi)
    }

    /// Sanity checks logged after parsing: packet offsets must not
    /// exceed the clip's declared total, and reconstructed packet
    /// numbers within a bucket must be non-decreasing.
    pub(crate) fn check_consistency(&self, total_packets: u32) {
        let mut prev: Option<u32> = None;
        let mut prev_bucket = usize::MAX;
        for fi in 0..self.fine.len() {
            let bucket = self.coarse_for_fine(fi);
            let p = self.point(fi).packet;
            if p > total_packets {
                warn!(
                    pid = self.pid,
                    packet = p,
                    total = total_packets,
                    "entry point past declared end of clip"
                );
            }
            if bucket == prev_bucket
                && let Some(prev_p) = prev
                && p < prev_p
            {
                warn!(
                    pid = self.pid,
                    bucket, packet = p, "entry points out of order within bucket"
                );
            }
            prev = Some(p);
            prev_bucket = bucket;
        }
    }
}
