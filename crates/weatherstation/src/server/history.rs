use std::collections::VecDeque;

use super::view::HistoryPoint;

/// Fixed-capacity ring buffer of recent samples, oldest first.
#[derive(Debug, Clone)]
pub struct History {
    points: VecDeque<HistoryPoint>,
    capacity: usize,
}

impl History {
    /// A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            points: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append `point`, evicting the oldest sample when full.
    ///
    /// A sample with the same timestamp as the newest replaces it.
    pub fn push(&mut self, point: HistoryPoint) {
        if let Some(last) = self.points.back_mut() {
            if last.time == point.time {
                *last = point;
                return;
            }
        }
        if self.points.len() == self.capacity {
            self.points.pop_front();
        }
        self.points.push_back(point);
    }

    pub fn points(&self) -> Vec<HistoryPoint> {
        self.points.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
