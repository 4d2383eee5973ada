
use serde::Serialize;

/// Running statistics over a stream of values, without retaining the values
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StreamStat {
    count: u64,
    min: f64,
    max: f64,
    sum: f64
}

impl StreamStat {
    /// Adds a value to the stream
    pub fn add(&mut self, value: f64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        self.sum += value;
        self.count += 1;
    }

    /// Returns a copy of this stream with `value` added, leaving this one untouched
    pub fn with_value(&self, value: f64) -> Self {
        let mut ret = *self;
        ret.add(value);
        ret
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn min(&self) -> Option<f64> {
        (self.count > 0).then_some(self.min)
    }

    pub fn max(&self) -> Option<f64> {
        (self.count > 0).then_some(self.max)
    }

    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }

    /// Freezes the current state into a summary, `None` if nothing was added
    pub fn summary(&self) -> Option<StatSummary> {
        Some(StatSummary {
            min: self.min()?,
            max: self.max()?,
            mean: self.mean()?
        })
    }
}

/// Final min/max/mean of a stream, as reported on a flushed block
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct StatSummary {
    pub min: f64,
    pub max: f64,
    pub mean: f64
}
