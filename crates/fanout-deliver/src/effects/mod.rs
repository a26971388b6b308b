mod agent;
mod channel;
mod dispatcher;
#[cfg(feature = "telegram")]
mod telegram;

pub use agent::{Agent, AgentPool, Pacer};
pub use channel::Channel;
pub use dispatcher::Dispatcher;
#[cfg(feature = "telegram")]
pub use telegram::{DEFAULT_API_URL, TelegramChannel};
