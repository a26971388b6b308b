//! Pure transformations and decisions for fetching.
//!
//! Nothing in this module performs I/O or sleeps; the effects layer asks
//! these functions how long to wait and whether a response is usable.

mod dedup;
mod retry;
mod validation;

pub use dedup::dedup_by_key;
pub use retry::retry_delay;
pub use validation::{accept_body, is_success};
