/// Health of one delivery agent, derived from its consecutive failure count.
///
/// ```text
/// Healthy --failure--> Degraded(n) --n reaches threshold--> Tripped
///    ^                     |                                   |
///    +------success--------+-------------pool reset------------+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthState {
    Healthy,
    Degraded(u32),
    Tripped,
}

impl HealthState {
    pub fn from_failures(failures: u32, threshold: u32) -> Self {
        match failures {
            0 => Self::Healthy,
            n if n < threshold => Self::Degraded(n),
            _ => Self::Tripped,
        }
    }

    /// Whether selection may hand out an agent in this state.
    pub fn is_available(self) -> bool {
        !matches!(self, Self::Tripped)
    }
}
