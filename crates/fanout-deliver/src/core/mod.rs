mod caption;
mod health;
mod throttle;

pub use caption::caption_for;
pub use health::HealthState;
pub use throttle::{classify, failure_wait, parse_retry_after, throttle_wait};
