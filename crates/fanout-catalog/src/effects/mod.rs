mod auth;
mod catalog;
mod playlist;
mod spotify;

pub use catalog::Catalog;
pub use playlist::PlaylistWriter;
pub use spotify::{DEFAULT_API_URL, DEFAULT_AUTH_URL, SpotifyCatalog};
