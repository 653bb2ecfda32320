//! Per-link filtering between the transport and the arbiter.

use std::collections::HashMap;

use tracing::trace;

use crate::domain::filter::RawAverager;
use crate::domain::registry::{LinkSettings, TabletCapabilities};
use crate::domain::tool::{RawSample, ToolState, ToolType};

use super::suppress::should_suppress;

#[derive(Debug, Clone, Default)]
struct ToolTrack {
    last: Option<ToolState>,
    averager: RawAverager,
}

/// Turns decoded tool states into arbiter samples for one physical link.
///
/// Keeps the last state reported for each tool role so unchanged reports can
/// be dropped, then applies the tablet rotation and, when enabled, averaging
/// over the last few in-proximity positions.
#[derive(Debug, Clone, Default)]
pub struct SampleProducer {
    tracks: HashMap<ToolType, ToolTrack>,
}

impl SampleProducer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the sample to dispatch, or `None` if `state` is suppressed or
    /// names no tool.
    pub fn produce(
        &mut self,
        state: &ToolState,
        settings: &LinkSettings,
        caps: &TabletCapabilities,
    ) -> Option<RawSample> {
        let Some(mut sample) = state.to_sample() else {
            trace!("state without tool type dropped");
            return None;
        };
        let track = self.tracks.entry(sample.tool).or_default();

        if let Some(last) = &track.last {
            // Touch strips are invisible to the suppression filter
            let strip_moved = last.strip_x != state.strip_x || last.strip_y != state.strip_y;
            if !strip_moved && should_suppress(last, state, settings.suppress) {
                trace!(tool = %sample.tool, "state suppressed");
                return None;
            }
        }
        track.last = Some(*state);

        (sample.x, sample.y) = settings
            .rotation
            .apply(sample.x, sample.y, caps.max_x, caps.max_y);

        if settings.raw_filter {
            if sample.proximity {
                (sample.x, sample.y) = track.averager.push(sample.x, sample.y, settings.raw_sample);
            } else {
                track.averager.reset();
            }
        }

        Some(sample)
    }

    /// Forgets every tool's history.
    pub fn reset(&mut self) {
        self.tracks.clear();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
