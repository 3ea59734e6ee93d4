pub mod http;

pub use http::HttpMcpClient;
