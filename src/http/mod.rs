pub mod codec;
pub mod message;
pub mod reader;

pub use message::{HttpMessage, Headers, Request, Response};
