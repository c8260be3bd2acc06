use crate::BatchError;

/// Share of a batch, in whole percent, between two checkpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Threshold(u32);

impl Threshold {
    pub const DEFAULT: Self = Self(5);

    pub fn new(percent: u32) -> Result<Self, BatchError> {
        if !(1..=100).contains(&percent) {
            return Err(BatchError::InvalidThreshold(percent));
        }
        Ok(Self(percent))
    }

    pub fn percent(&self) -> u32 {
        self.0
    }

    /// Number of items between checkpoints for a batch of `total` items.
    ///
    /// Integer arithmetic, never below one. For totals that do not divide
    /// evenly the resulting percentages drift away from round numbers.
    pub fn interval(&self, total: usize) -> usize {
        (total * self.0 as usize / 100).max(1)
    }
}

impl Default for Threshold {
    fn default() -> Self {
        Self::DEFAULT
    }
}
