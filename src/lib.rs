pub mod broker;
pub mod config;
pub mod context;
pub mod credentials;
pub mod error;
pub mod pipeline;
pub mod request;
pub mod response;
pub mod sts;
pub mod token;

pub use config::ExchangeConfig;
pub use credentials::TemporaryCredentials;
pub use error::{ErrorKind, ExchangeError};
pub use pipeline::{ExchangePipeline, Outcome, Stage};
pub use request::ExchangeRequest;
pub use response::ExchangeResponse;
