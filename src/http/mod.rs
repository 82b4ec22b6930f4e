pub mod client;
pub mod retry;


pub use client::{decode_json, user_agent, ServiceClient, ACCESS_KEY_HEADER, HTTP_CLIENT_TIMEOUT};
pub use retry::{RetryConfig, TransientServerErrors};
