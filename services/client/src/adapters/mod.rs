pub mod file_store;
pub mod http;

pub use file_store::FileCapabilityStore;
pub use http::HttpSessionApi;
