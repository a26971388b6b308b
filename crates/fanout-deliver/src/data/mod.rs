mod item;
mod options;

pub use item::{ChatId, Delivery, DeliveryReference, Media, MessageId};
pub use options::{DEFAULT_MAX_ITEM_BYTES, DeliveryOptions};
