//! Live scope pipeline: tap queues → rolling windows → plot lines

use crate::audio::{block_queue, BlockProducer, ChannelMap, RollingWindow, Tap, TapPair};
use crate::render::LineSet;

/// Lifecycle of a live scope session
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScopeState {
    Init,
    Configured,
    Streaming,
    Closed,
    Failed,
}

impl ScopeState {
    /// Move to `next`, returning the state that was left.
    ///
    /// Only forward transitions are taken; anything else is logged and ignored.
    pub fn advance(&mut self, next: ScopeState) -> ScopeState {
        let allowed = matches!(
            (*self, next),
            (ScopeState::Init, ScopeState::Configured)
                | (ScopeState::Configured, ScopeState::Streaming)
                | (ScopeState::Configured, ScopeState::Failed)
                | (ScopeState::Streaming, ScopeState::Closed)
                | (ScopeState::Streaming, ScopeState::Failed)
        );
        let previous = *self;
        if allowed {
            log::info!("Scope state {:?} -> {:?}", previous, next);
            *self = next;
        } else {
            log::debug!("Ignoring scope state change {:?} -> {:?}", previous, next);
        }
        previous
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, ScopeState::Closed | ScopeState::Failed)
    }
}

/// Both taps plus their plot lines, owned by the redraw loop
pub struct ScopePipeline {
    taps: TapPair,
    input_lines: LineSet,
    output_lines: LineSet,
}

impl ScopePipeline {
    /// Allocate zeroed windows of `length` frames and the queues feeding them.
    ///
    /// Returns the pipeline and the input/output producers for the callbacks.
    pub fn new(map: &ChannelMap, length: usize, downsample: usize) -> (Self, BlockProducer, BlockProducer) {
        let (input_producer, input_consumer) = block_queue("input", map.clone(), downsample);
        let (output_producer, output_consumer) = block_queue("output", map.clone(), downsample);

        let taps = TapPair::new(
            Tap::new(input_consumer, RollingWindow::new(length, map.len())),
            Tap::new(output_consumer, RollingWindow::new(length, map.len())),
        );

        let pipeline = Self {
            taps,
            input_lines: LineSet::new(map.len(), length),
            output_lines: LineSet::new(map.len(), length),
        };

        (pipeline, input_producer, output_producer)
    }

    /// Drain queued blocks and refresh the plot lines. Returns drained pairs.
    pub fn refresh(&mut self) -> usize {
        let pairs = self.taps.drain();
        self.input_lines.update(self.taps.input().window());
        self.output_lines.update(self.taps.output().window());
        pairs
    }

    pub fn taps(&self) -> &TapPair {
        &self.taps
    }

    pub fn input_lines(&self) -> &LineSet {
        &self.input_lines
    }

    pub fn output_lines(&self) -> &LineSet {
        &self.output_lines
    }
}
