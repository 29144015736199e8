//! Input/output tap pair drained by the redraw loop

use super::buffer::{Block, BlockConsumer};
use super::window::RollingWindow;

/// One monitored path: its queue and its rolling window.
pub struct Tap {
    consumer: BlockConsumer,
    window: RollingWindow,
}

impl Tap {
    pub fn new(consumer: BlockConsumer, window: RollingWindow) -> Self {
        Self { consumer, window }
    }

    pub fn window(&self) -> &RollingWindow {
        &self.window
    }

    pub fn blocks_written(&self) -> u64 {
        self.consumer.blocks_written()
    }
}

/// The two taps, drained in lock-step.
///
/// Each drain step takes one block from each queue. When either queue runs
/// dry the drain stops, so taps filling at different rates drift apart.
/// A block already taken from the input queue while the output queue was
/// empty is held back for the next drain.
pub struct TapPair {
    input: Tap,
    output: Tap,
    pending: Option<Block>,
}

impl TapPair {
    pub fn new(input: Tap, output: Tap) -> Self {
        Self {
            input,
            output,
            pending: None,
        }
    }

    pub fn input(&self) -> &Tap {
        &self.input
    }

    pub fn output(&self) -> &Tap {
        &self.output
    }

    /// Merge all available block pairs into the windows. Returns the pair count.
    pub fn drain(&mut self) -> usize {
        let mut pairs = 0;
        loop {
            let input = match self.pending.take().or_else(|| self.input.consumer.try_next()) {
                Some(block) => block,
                None => break,
            };
            let output = match self.output.consumer.try_next() {
                Some(block) => block,
                None => {
                    self.pending = Some(input);
                    break;
                }
            };
            self.input.window.push(&input);
            self.output.window.push(&output);
            pairs += 1;
        }
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::buffer::{block_queue, BlockProducer, ChannelMap, StreamStatus};

    fn pair(len: usize) -> (BlockProducer, BlockProducer, TapPair) {
        let map = ChannelMap::from_one_based(&[1]).unwrap();
        let (in_prod, in_cons) = block_queue("input", map.clone(), 1);
        let (out_prod, out_cons) = block_queue("output", map, 1);
        let taps = TapPair::new(
            Tap::new(in_cons, RollingWindow::new(len, 1)),
            Tap::new(out_cons, RollingWindow::new(len, 1)),
        );
        (in_prod, out_prod, taps)
    }

    #[test]
    fn test_drain_empty_is_noop() {
        let (_in_prod, _out_prod, mut taps) = pair(4);
        assert_eq!(taps.drain(), 0);
        assert_eq!(taps.input().window().as_slice(), &[0.0; 4]);
        assert_eq!(taps.output().window().as_slice(), &[0.0; 4]);
    }

    #[test]
    fn test_drain_lock_step() {
        let (mut in_prod, mut out_prod, mut taps) = pair(4);
        in_prod.on_block(&[1.0f32, 2.0], 1, StreamStatus::default());
        in_prod.on_block(&[3.0f32], 1, StreamStatus::default());
        out_prod.on_block(&[9.0f32], 1, StreamStatus::default());

        assert_eq!(taps.drain(), 1);
        assert_eq!(taps.input().window().as_slice(), &[0.0, 0.0, 1.0, 2.0]);
        assert_eq!(taps.output().window().as_slice(), &[0.0, 0.0, 0.0, 9.0]);

        // The second input block waits for its partner.
        assert_eq!(taps.drain(), 0);
        assert_eq!(taps.input().window().as_slice(), &[0.0, 0.0, 1.0, 2.0]);

        out_prod.on_block(&[8.0f32], 1, StreamStatus::default());
        assert_eq!(taps.drain(), 1);
        assert_eq!(taps.input().window().as_slice(), &[0.0, 1.0, 2.0, 3.0]);
        assert_eq!(taps.output().window().as_slice(), &[0.0, 0.0, 9.0, 8.0]);
    }

    #[test]
    fn test_input_block_held_not_lost() {
        let (mut in_prod, mut out_prod, mut taps) = pair(2);
        in_prod.on_block(&[5.0f32], 1, StreamStatus::default());
        assert_eq!(taps.drain(), 0);
        assert_eq!(taps.drain(), 0);

        out_prod.on_block(&[6.0f32], 1, StreamStatus::default());
        assert_eq!(taps.drain(), 1);
        assert_eq!(taps.input().window().as_slice(), &[0.0, 5.0]);
        assert_eq!(taps.output().window().as_slice(), &[0.0, 6.0]);
    }

    #[test]
    fn test_output_only_data_stalls() {
        let (_in_prod, mut out_prod, mut taps) = pair(2);
        out_prod.on_block(&[1.0f32, 2.0], 1, StreamStatus::default());
        assert_eq!(taps.drain(), 0);
        assert_eq!(taps.output().window().as_slice(), &[0.0, 0.0]);
        assert_eq!(taps.output().blocks_written(), 1);
    }
}
