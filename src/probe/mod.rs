//! Differential request fan-out
//!
//! A `ProbeClient` takes one logical request and delivers it to every
//! configured environment, returning the responses in the same order.

mod client;
mod request;
mod response;
mod transport;

pub use crate::common::Environment;
pub use client::ProbeClient;
pub use request::{Method, MultipartFile, ProbeRequest, RequestBody};
pub use response::{decode_all, ProbeResponse};
pub use transport::{HttpTransport, Transport};
