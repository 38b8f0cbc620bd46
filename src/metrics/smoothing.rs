//! Moving-average smoothing for power and cadence.

/// Samples per moving-average window
pub const MOVING_AVG_SIZE: usize = 6;

/// Fixed-size circular moving average.
///
/// Until the window has been written `N` times the average is the latest
/// value; afterwards it is the truncating mean of the last `N` values.
#[derive(Debug, Clone)]
pub struct MovingAverage<const N: usize> {
    /// Ring of recent values
    buffer: [u16; N],
    /// Next slot to write
    cursor: usize,
    /// Whether the ring has wrapped at least once
    filled: bool,
    /// Latest reported average
    current: u16,
}

impl<const N: usize> MovingAverage<N> {
    /// Create an empty moving average.
    pub fn new() -> Self {
        Self {
            buffer: [0; N],
            cursor: 0,
            filled: false,
            current: 0,
        }
    }

    /// Add a new value and return the current average.
    pub fn add(&mut self, value: u16) -> u16 {
        self.buffer[self.cursor] = value;
        self.cursor = (self.cursor + 1) % N;
        if self.cursor == 0 {
            self.filled = true;
        }

        self.current = if self.filled {
            let sum: u32 = self.buffer.iter().map(|&v| v as u32).sum();
            (sum / N as u32) as u16
        } else {
            value
        };

        self.current
    }

    /// Get the current average without adding a value.
    pub fn average(&self) -> u16 {
        self.current
    }

    /// Check if the window has been filled once.
    pub fn is_full(&self) -> bool {
        self.filled
    }

    /// Reset the moving average.
    pub fn reset(&mut self) {
        self.buffer = [0; N];
        self.cursor = 0;
        self.filled = false;
        self.current = 0;
    }
}

impl<const N: usize> Default for MovingAverage<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// The window used for both pipeline channels.
pub type CyclingAverage = MovingAverage<MOVING_AVG_SIZE>;
