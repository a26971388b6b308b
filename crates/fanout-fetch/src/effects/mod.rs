mod cache;
mod fetcher;
mod http;
mod pool;
mod stream;

pub use cache::TtlCache;
pub use fetcher::Fetcher;
pub use http::{BoxStream, HttpClient, HttpResponse};
pub use pool::WorkerPool;
pub use stream::{StreamObserver, StreamingCoordinator};

#[cfg(feature = "reqwest")]
pub use http::ReqwestClient;
