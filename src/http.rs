//! Request/response boundary to the hosted services.
//!
//! Clients only see the [`Transport`] trait. The blocking `ureq` implementation
//! uses native-tls with the platform's root certificates.

use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct HttpReply {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json(&self) -> Result<Value, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },
    #[error("failed to encode request body: {0}")]
    Encode(#[from] serde_json::Error),
}

pub trait Transport {
    /// Sends `body` and returns the reply whatever its status code.
    fn post(&self, url: &str, content_type: &str, body: Vec<u8>) -> Result<HttpReply, TransportError>;

    fn post_json<T: Serialize + ?Sized>(&self, url: &str, payload: &T) -> Result<HttpReply, TransportError>
    where
        Self: Sized,
    {
        let body = serde_json::to_vec(payload)?;
        self.post(url, "application/json", body)
    }
}

impl<T: Transport + ?Sized> Transport for &T {
    fn post(&self, url: &str, content_type: &str, body: Vec<u8>) -> Result<HttpReply, TransportError> {
        (**self).post(url, content_type, body)
    }
}

#[cfg(feature = "http")]
pub use self::ureq_transport::UreqTransport;

#[cfg(feature = "http")]
mod ureq_transport {
    use super::{HttpReply, Transport, TransportError};
    use log::debug;
    use std::time::Duration;
    use ureq::Agent;
    use ureq::tls::{RootCerts, TlsConfig, TlsProvider};

    #[derive(Debug, Clone)]
    pub struct UreqTransport {
        agent: Agent,
    }

    impl UreqTransport {
        pub fn new(timeout: Duration) -> Self {
            let tls_config = TlsConfig::builder()
                .provider(TlsProvider::NativeTls)
                .root_certs(RootCerts::PlatformVerifier)
                .build();

            let agent = Agent::config_builder()
                .tls_config(tls_config)
                .timeout_global(Some(timeout))
                .http_status_as_error(false)
                .build()
                .into();
            Self { agent }
        }
    }

    impl Transport for UreqTransport {
        fn post(
            &self,
            url: &str,
            content_type: &str,
            body: Vec<u8>,
        ) -> Result<HttpReply, TransportError> {
            let request_error = |err: ureq::Error| TransportError::Request {
                url: url.to_string(),
                message: err.to_string(),
            };
            debug!("POST {url} ({} bytes)", body.len());
            let response = self
                .agent
                .post(url)
                .header("Content-Type", content_type)
                .send(&body[..])
                .map_err(request_error)?;
            let status = response.status().as_u16();
            let body = response
                .into_body()
                .read_to_vec()
                .map_err(request_error)?;
            debug!("POST {url} -> {status}");
            Ok(HttpReply { status, body })
        }
    }
}
