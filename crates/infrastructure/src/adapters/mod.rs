//! Port implementations.

pub mod challenge_file;
pub mod issuer_http;
pub mod panel_http;

pub use challenge_file::TempFileRenderer;
pub use issuer_http::HttpIssuerApi;
pub use panel_http::HttpPanelClient;
