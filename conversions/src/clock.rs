use std::time::SystemTime;

/// Source of the event time and click token creation time
pub trait Clock: Send + Sync {
    fn now(&self) -> SystemTime;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

#[cfg(test)]
pub(crate) struct FixedClock(pub SystemTime);

#[cfg(test)]
impl FixedClock {
    pub fn at_secs(secs: u64) -> Self {
        FixedClock(std::time::UNIX_EPOCH + std::time::Duration::from_secs(secs))
    }
}

#[cfg(test)]
impl Clock for FixedClock {
    fn now(&self) -> SystemTime {
        self.0
    }
}
