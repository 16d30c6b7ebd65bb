/// Streaming mean and standard-deviation accumulator (Welford update).
///
/// The standard deviation is the unbiased sample estimate (n - 1 divisor);
/// fewer than two samples yield 0.0. An empty accumulator reports a NaN mean
/// so a vacuous observation class stays visibly degenerate downstream instead
/// of being silently replaced by zero.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunningStatistics {
    count: usize,
    mean: f64,
    sum_of_squared_deviations: f64,
}

impl RunningStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.sum_of_squared_deviations += delta * (value - self.mean);
    }

    pub const fn count(&self) -> usize {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 { f64::NAN } else { self.mean }
    }

    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.sum_of_squared_deviations / (self.count - 1) as f64
        }
    }

    pub fn standard_deviation(&self) -> f64 {
        self.variance().sqrt()
    }
}

/// `count` evenly spaced values from `start` to `stop`, endpoints inclusive.
/// A single-point grid collapses to `stop`, matching MATLAB `linspace`.
pub fn linspace(start: f64, stop: f64, count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![stop],
        _ => {
            let step = (stop - start) / (count - 1) as f64;
            (0..count)
                .map(|index| {
                    if index + 1 == count {
                        stop
                    } else {
                        start + step * index as f64
                    }
                })
                .collect()
        }
    }
}
