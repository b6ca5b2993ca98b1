pub mod http;
pub mod store;

pub use http::HttpSessionRefresher;
pub use store::{RefreshError, SessionRefresher};
