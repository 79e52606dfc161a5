//! Per-tick metrics for the main loop.
//!
//! [`TickMetrics`] captures timing and counts for a single tick. The loop
//! overwrites it after each `tick()`; read the most recent one with
//! [`MainLoop::last_metrics`](crate::MainLoop::last_metrics).

/// Timing and counters collected during a single tick.
///
/// Durations are in microseconds.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TickMetrics {
    /// Ticks run since the loop was created, including this one.
    pub tick: u64,
    /// Wall-clock time since the previous tick, in microseconds.
    pub measured_interval_us: u64,
    /// Wall-clock time spent inside this tick, in microseconds.
    pub busy_us: u64,
    /// Deferred calls run by the queue this tick.
    pub fired: usize,
    /// Posted calls moved from the inbox into the queue this tick.
    pub drained: usize,
    /// Cumulative number of posted calls the queue refused.
    pub inbox_rejections: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_metrics_are_zero() {
        let m = TickMetrics::default();
        assert_eq!(m.tick, 0);
        assert_eq!(m.measured_interval_us, 0);
        assert_eq!(m.busy_us, 0);
        assert_eq!(m.fired, 0);
        assert_eq!(m.drained, 0);
        assert_eq!(m.inbox_rejections, 0);
    }
}
