//! Queue configuration and validation.

use metronome_core::{ConfigError, Seconds};

/// Configuration for a [`DeferredQueue`](crate::DeferredQueue).
#[derive(Clone, Debug, PartialEq)]
pub struct QueueConfig {
    /// Number of message slots in the pool. Default: 128.
    pub capacity: usize,
    /// Delay before a call that returned
    /// [`Delivery::Retry`](crate::Delivery::Retry) runs again. Default: 1.0.
    pub retry_period: Seconds,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: 128,
            retry_period: 1.0,
        }
    }
}

impl QueueConfig {
    /// Configuration with the given capacity and the default retry period.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    /// Check structural invariants.
    ///
    /// The retry period must be strictly positive: a zero period would let a
    /// call that keeps returning `Retry` fire forever within one `update`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::ZeroQueueCapacity);
        }
        if u32::try_from(self.capacity).is_err() {
            return Err(ConfigError::QueueCapacityOverflow {
                value: self.capacity,
            });
        }
        if !self.retry_period.is_finite() || self.retry_period <= 0.0 {
            return Err(ConfigError::InvalidRetryPeriod {
                value: self.retry_period,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert!(QueueConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_capacity_rejected() {
        assert_eq!(
            QueueConfig::with_capacity(0).validate(),
            Err(ConfigError::ZeroQueueCapacity)
        );
    }

    #[test]
    fn bad_retry_period_rejected() {
        for value in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let config = QueueConfig {
                capacity: 4,
                retry_period: value,
            };
            assert!(matches!(
                config.validate(),
                Err(ConfigError::InvalidRetryPeriod { .. })
            ));
        }
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn oversized_capacity_rejected() {
        let config = QueueConfig::with_capacity(u32::MAX as usize + 1);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::QueueCapacityOverflow { .. })
        ));
    }
}
