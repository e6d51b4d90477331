//! Remote chat backend: typed port, tagged JSON codec, HTTP transport.

pub mod http;
pub mod port;
pub mod tdjson;
pub mod types;
