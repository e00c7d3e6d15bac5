use std::collections::VecDeque;

/// Fixed capacity FIFO history of CO2 readings for the local trend plot.
///
/// Values are stored as reported, without smoothing. Once the buffer is full,
/// every push evicts the oldest value.
#[derive(Clone, Debug, PartialEq)]
pub struct TrendBuffer {
    values: VecDeque<u32>,
    capacity: usize,
}

impl TrendBuffer {
    /// Create an empty buffer holding at most `capacity` values.
    ///
    /// A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = if capacity == 0 {
            log::warn!("Trend capacity of 0 requested, using 1");
            1
        } else {
            capacity
        };

        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append `value`, evicting the oldest value when the buffer is full.
    pub fn push(&mut self, value: u32) {
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    /// Current contents, oldest first.
    pub fn snapshot(&self) -> Vec<u32> {
        self.values.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Most recently pushed value.
    pub fn last(&self) -> Option<u32> {
        self.values.back().copied()
    }

    /// Smallest and largest value in the window.
    pub fn range(&self) -> Option<(u32, u32)> {
        let min = self.values.iter().min()?;
        let max = self.values.iter().max()?;
        Some((*min, *max))
    }
}

impl Default for TrendBuffer {
    fn default() -> Self {
        Self::new(crate::DEFAULT_TREND_CAPACITY)
    }
}

/// Rescale a window of values to `0.0..=1.0` using the window's own minimum
/// and maximum.
///
/// A flat window sits in the middle of the plot.
pub fn normalize(series: &[u32]) -> Vec<f32> {
    let (Some(min), Some(max)) = (series.iter().min(), series.iter().max()) else {
        return Vec::new();
    };

    if min == max {
        return vec![0.5; series.len()];
    }

    let span = (max - min) as f32;
    series
        .iter()
        .map(|value| (value - min) as f32 / span)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_only_the_last_values_in_push_order() {
        for capacity in 1..=8usize {
            let mut buffer = TrendBuffer::new(capacity);
            let pushed = capacity as u32 * 3 + 1;
            for value in 0..pushed {
                buffer.push(value);
            }

            let expected: Vec<u32> = (pushed - capacity as u32..pushed).collect();
            assert_eq!(buffer.len(), capacity);
            assert_eq!(buffer.snapshot(), expected);
        }
    }

    #[test]
    fn no_eviction_below_capacity() {
        let mut buffer = TrendBuffer::new(100);
        for value in [400, 410, 420] {
            buffer.push(value);
        }

        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.snapshot(), vec![400, 410, 420]);
        assert_eq!(buffer.last(), Some(420));
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        let mut buffer = TrendBuffer::new(0);
        buffer.push(1);
        buffer.push(2);

        assert_eq!(buffer.capacity(), 1);
        assert_eq!(buffer.snapshot(), vec![2]);
    }

    #[test]
    fn range_of_window() {
        let mut buffer = TrendBuffer::new(3);
        assert_eq!(buffer.range(), None);

        for value in [900, 450, 600, 500] {
            buffer.push(value);
        }
        assert_eq!(buffer.range(), Some((450, 600)));
    }

    #[test]
    fn normalize_uses_window_bounds() {
        assert_eq!(normalize(&[400, 500, 600]), vec![0.0, 0.5, 1.0]);
        assert_eq!(normalize(&[420, 420]), vec![0.5, 0.5]);
        assert!(normalize(&[]).is_empty());
    }
}
