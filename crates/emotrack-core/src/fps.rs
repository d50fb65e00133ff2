use std::collections::VecDeque;

/// Number of instantaneous rates averaged.
const FPS_WINDOW: usize = 10;

/// Rolling frame-rate estimate from frame arrival times.
#[derive(Debug, Clone, Default)]
pub struct FpsMeter {
    last_ms: Option<i64>,
    rates: VecDeque<f64>,
}

impl FpsMeter {
    /// Record a frame arriving at `now_ms` and return the updated mean rate.
    pub fn record(&mut self, now_ms: i64) -> f64 {
        if let Some(last) = self.last_ms {
            let elapsed = now_ms - last;
            if elapsed > 0 {
                self.rates.push_back(1000.0 / elapsed as f64);
                if self.rates.len() > FPS_WINDOW {
                    self.rates.pop_front();
                }
            }
        }
        self.last_ms = Some(now_ms);
        self.fps()
    }

    /// Mean of the retained rates; 0 before two arrivals.
    pub fn fps(&self) -> f64 {
        if self.rates.is_empty() {
            return 0.0;
        }
        self.rates.iter().sum::<f64>() / self.rates.len() as f64
    }

    pub fn reset(&mut self) {
        self.last_ms = None;
        self.rates.clear();
    }
}
