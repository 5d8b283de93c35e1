// ABOUTME: HTTP/1.1 health probe over a plain TCP connection.
// ABOUTME: Issues a single GET and reports the observed status code.

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::Empty;
use hyper::Request;
use hyper::header::HOST;
use hyper_util::rt::TokioIo;
use std::time::Duration;
use tokio::net::TcpStream;

use super::{HealthProbe, ProbeError, ProbeResponse};

/// Probe that speaks HTTP/1.1 directly. Only `http://` endpoints are
/// supported; TLS termination belongs to the infrastructure in front of
/// the health endpoint.
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpProbe;

impl HttpProbe {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl HealthProbe for HttpProbe {
    async fn probe(&self, endpoint: &str, _timeout: Duration) -> Result<ProbeResponse, ProbeError> {
        let target = ProbeTarget::parse(endpoint)?;

        let stream = TcpStream::connect((target.host.as_str(), target.port))
            .await
            .map_err(|e| ProbeError::Connect(e.to_string()))?;

        let (mut sender, conn) = hyper::client::conn::http1::handshake(TokioIo::new(stream))
            .await
            .map_err(|e| ProbeError::Connect(e.to_string()))?;

        // Drive the connection until the request completes.
        tokio::spawn(async move {
            if let Err(e) = conn.await {
                tracing::debug!("probe connection error: {}", e);
            }
        });

        let request = Request::builder()
            .uri(&target.path)
            .header(HOST, target.authority())
            .body(Empty::<Bytes>::new())
            .map_err(|e| ProbeError::Request(e.to_string()))?;

        let response = sender
            .send_request(request)
            .await
            .map_err(|e| ProbeError::Request(e.to_string()))?;

        Ok(ProbeResponse {
            status: response.status().as_u16(),
        })
    }
}

/// Parsed pieces of an `http://host[:port]/path` endpoint.
struct ProbeTarget {
    host: String,
    port: u16,
    path: String,
}

impl ProbeTarget {
    fn parse(endpoint: &str) -> Result<Self, ProbeError> {
        let rest = endpoint
            .strip_prefix("http://")
            .ok_or_else(|| ProbeError::InvalidUrl(format!("expected http:// URL: {endpoint}")))?;

        let (authority, path) = match rest.find('/') {
            Some(idx) => (&rest[..idx], &rest[idx..]),
            None => (rest, "/"),
        };

        if authority.is_empty() {
            return Err(ProbeError::InvalidUrl(format!("missing host: {endpoint}")));
        }

        let (host, port) = match authority.rsplit_once(':') {
            Some((host, port)) => {
                let port = port.parse::<u16>().map_err(|_| {
                    ProbeError::InvalidUrl(format!("invalid port in {endpoint}"))
                })?;
                (host, port)
            }
            None => (authority, 80),
        };

        Ok(Self {
            host: host.to_string(),
            port,
            path: path.to_string(),
        })
    }

    fn authority(&self) -> String {
        if self.port == 80 {
            self.host.clone()
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}
