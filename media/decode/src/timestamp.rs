/*!
    Best-effort presentation timestamps.
*/

use media_types::Pts;

/**
    Picks between packet PTS and DTS the way FFmpeg computes
    `best_effort_timestamp`.

    Each timestamp sequence is counted as faulty whenever it fails to
    increase. PTS wins unless it has been wrong more often than DTS, or is
    missing altogether.
*/
#[derive(Clone, Debug, Default)]
pub struct BestEffortTimestamp {
    faulty_pts: u64,
    faulty_dts: u64,
    last_pts: Option<Pts>,
    last_dts: Option<Pts>,
}

impl BestEffortTimestamp {
    pub fn new() -> Self {
        Self::default()
    }

    /**
        Feed the timestamps of one decoded frame and return the guess.
    */
    pub fn guess(&mut self, pts: Option<Pts>, dts: Option<Pts>) -> Option<Pts> {
        if let Some(dts) = dts {
            if self.last_dts.is_some_and(|last| dts <= last) {
                self.faulty_dts += 1;
            }
            self.last_dts = Some(dts);
        }
        if let Some(pts) = pts {
            if self.last_pts.is_some_and(|last| pts <= last) {
                self.faulty_pts += 1;
            }
            self.last_pts = Some(pts);
        }

        match (pts, dts) {
            (Some(pts), None) => Some(pts),
            (Some(pts), Some(_)) if self.faulty_pts <= self.faulty_dts => Some(pts),
            (_, dts) => dts,
        }
    }

    /**
        Forget history after a discontinuity.
    */
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
