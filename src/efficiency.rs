//! Rolling window estimator of useful-fragment ratio.

use crate::config::EFFICIENCY_WINDOW;

/// Tracks `(useful, total)` fragment counts over the last
/// [`EFFICIENCY_WINDOW`] frames.
///
/// Advanced one slot per observed new frame (not per wall-clock interval);
/// see the data loop's new-frame detection.
#[derive(Debug, Clone, Copy)]
pub struct EfficiencyTracker {
    nb_useful: [u32; EFFICIENCY_WINDOW],
    nb_total: [u32; EFFICIENCY_WINDOW],
    idx: usize,
}

impl EfficiencyTracker {
    pub const fn new() -> Self {
        Self {
            nb_useful: [0; EFFICIENCY_WINDOW],
            nb_total: [0; EFFICIENCY_WINDOW],
            idx: 0,
        }
    }

    /// Advances to the next slot and zeroes it, called once per new-frame
    /// transition observed by the data loop.
    pub fn advance(&mut self) {
        self.idx = (self.idx + 1) % EFFICIENCY_WINDOW;
        self.nb_useful[self.idx] = 0;
        self.nb_total[self.idx] = 0;
    }

    /// Records one received fragment in the current slot. `useful` is
    /// true iff this fragment had not already been set in the bitmap.
    pub fn record(&mut self, useful: bool) {
        self.nb_total[self.idx] += 1;
        if useful {
            self.nb_useful[self.idx] += 1;
        }
    }

    /// `sum(nb_useful) / sum(nb_total)` over the window. Returns 0.0 when
    /// the window has seen no fragments. Clamped to 1.0 with a logged
    /// invariant violation if the ratio somehow exceeds 1.0.
    pub fn efficiency(&self) -> f32 {
        let total: u32 = self.nb_total.iter().sum();
        if total == 0 {
            return 0.0;
        }
        let useful: u32 = self.nb_useful.iter().sum();
        let ratio = useful as f32 / total as f32;
        if ratio > 1.0 {
            log::error!(
                "efficiency tracker invariant violated: useful={useful} > total={total}"
            );
            1.0
        } else {
            ratio
        }
    }
}

impl Default for EfficiencyTracker {
    fn default() -> Self {
        Self::new()
    }
}
