//! Fixed-length rolling display window
//!
//! The window keeps the most recent `len` displayed frames of a tap. New
//! blocks shift the contents left and land at the tail; the window never
//! grows or shrinks after creation.

use super::buffer::Block;

/// Number of displayed frames covering `window_ms` milliseconds.
pub fn window_length(window_ms: f64, sample_rate: f64, downsample: usize) -> usize {
    (window_ms * sample_rate / (1000.0 * downsample.max(1) as f64)) as usize
}

/// Rolling buffer of shape (len × channels), row-major.
#[derive(Clone, Debug, PartialEq)]
pub struct RollingWindow {
    len: usize,
    channels: usize,
    data: Vec<f32>,
}

impl RollingWindow {
    /// Zero-filled window.
    pub fn new(len: usize, channels: usize) -> Self {
        Self {
            len,
            channels,
            data: vec![0.0; len * channels],
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn frame(&self, index: usize) -> &[f32] {
        let start = index * self.channels;
        &self.data[start..start + self.channels]
    }

    /// Samples of one channel, oldest first.
    pub fn column(&self, channel: usize) -> impl Iterator<Item = f32> + '_ {
        self.data
            .iter()
            .skip(channel)
            .step_by(self.channels.max(1))
            .copied()
            .take(if channel < self.channels { self.len } else { 0 })
    }

    /// Drop the oldest `block.frames()` frames and append the block.
    ///
    /// A block longer than the window keeps only its most recent `len` frames.
    pub fn push(&mut self, block: &Block) {
        debug_assert_eq!(block.channels(), self.channels);
        let frames = block.frames();
        if frames == 0 || self.len == 0 || block.channels() != self.channels {
            return;
        }

        let samples = block.samples();
        if frames >= self.len {
            let start = (frames - self.len) * self.channels;
            self.data.copy_from_slice(&samples[start..]);
        } else {
            let shift = frames * self.channels;
            self.data.copy_within(shift.., 0);
            let tail = self.data.len() - shift;
            self.data[tail..].copy_from_slice(samples);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mono(values: &[f32]) -> Block {
        Block::from_interleaved(1, values.to_vec())
    }

    #[test]
    fn test_window_length() {
        assert_eq!(window_length(500.0, 48_000.0, 10), 2400);
        assert_eq!(window_length(500.0, 44_100.0, 10), 2205);
        assert_eq!(window_length(1.0, 1000.0, 10), 0);
    }

    #[test]
    fn test_new_window_is_zero_filled() {
        let window = RollingWindow::new(window_length(500.0, 48_000.0, 10), 2);
        assert_eq!(window.len(), 2400);
        assert_eq!(window.channels(), 2);
        assert_eq!(window.as_slice().len(), 4800);
        assert!(window.as_slice().iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_shift_and_write() {
        let mut window = RollingWindow::new(4, 1);
        window.push(&mono(&[1.0, 2.0]));
        assert_eq!(window.as_slice(), &[0.0, 0.0, 1.0, 2.0]);
        window.push(&mono(&[3.0]));
        assert_eq!(window.as_slice(), &[0.0, 1.0, 2.0, 3.0]);
        window.push(&mono(&[4.0, 5.0, 6.0]));
        assert_eq!(window.as_slice(), &[3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_oversized_block_keeps_most_recent() {
        let mut window = RollingWindow::new(3, 1);
        window.push(&mono(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]));
        assert_eq!(window.as_slice(), &[5.0, 6.0, 7.0]);
    }

    #[test]
    fn test_empty_block_is_noop() {
        let mut window = RollingWindow::new(3, 1);
        window.push(&mono(&[1.0]));
        let before = window.clone();
        window.push(&mono(&[]));
        assert_eq!(window, before);
    }

    #[test]
    fn test_zero_length_window() {
        let mut window = RollingWindow::new(0, 2);
        window.push(&Block::from_interleaved(2, vec![1.0, 2.0]));
        assert!(window.is_empty());
        assert_eq!(window.column(0).count(), 0);
    }

    #[test]
    fn test_columns() {
        let mut window = RollingWindow::new(3, 2);
        window.push(&Block::from_interleaved(2, vec![1.0, -1.0, 2.0, -2.0]));
        assert_eq!(window.column(0).collect::<Vec<_>>(), vec![0.0, 1.0, 2.0]);
        assert_eq!(window.column(1).collect::<Vec<_>>(), vec![0.0, -1.0, -2.0]);
        assert_eq!(window.frame(2), &[2.0, -2.0]);
        assert_eq!(window.column(2).count(), 0);
    }

    #[test]
    fn test_final_content_is_stream_tail() {
        let len = 50;
        let mut window = RollingWindow::new(len, 2);
        let mut stream = Vec::new();
        let mut next = 0.0;
        for size in [7usize, 13, 1, 0, 29, 64, 3, 11] {
            let samples: Vec<f32> = (0..size)
                .flat_map(|_| {
                    next += 1.0;
                    [next, next * 10.0]
                })
                .collect();
            stream.extend_from_slice(&samples);
            window.push(&Block::from_interleaved(2, samples));
        }
        assert!(stream.len() / 2 >= len);
        assert_eq!(window.as_slice(), &stream[stream.len() - len * 2..]);
    }
}
