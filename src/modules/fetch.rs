use crate::error::FetchError;
use std::io::Read;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct FetchedResource {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

impl FetchedResource {
    pub fn content_type_or_empty(&self) -> &str {
        self.content_type.as_deref().unwrap_or("")
    }
}

/// Source of remote bytes. The HTTP implementation is used by the app; tests
/// plug in their own.
pub trait ResourceFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> Result<FetchedResource, FetchError>;
}

pub struct HttpFetcher {
    agent: ureq::Agent,
}

impl HttpFetcher {
    pub fn new(timeout: Option<Duration>) -> Self {
        let mut builder = ureq::AgentBuilder::new();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Self { agent: builder.build() }
    }
}

impl ResourceFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<FetchedResource, FetchError> {
        let response = self.agent.get(url).call().map_err(|e| match e {
            ureq::Error::Status(status, _) => FetchError::Status { url: url.to_string(), status },
            ureq::Error::Transport(t) => FetchError::Transport { url: url.to_string(), reason: t.to_string() },
        })?;

        // ureq reports "text/plain" when the header is missing; only trust an explicit one.
        let content_type = response
            .header("content-type")
            .map(|_| response.content_type().to_ascii_lowercase());

        let mut bytes = Vec::new();
        response
            .into_reader()
            .read_to_end(&mut bytes)
            .map_err(|source| FetchError::Body { url: url.to_string(), source })?;

        tracing::debug!(url, bytes = bytes.len(), content_type = ?content_type, "fetched resource");
        Ok(FetchedResource { bytes, content_type })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory fetcher keyed by URL. Unknown URLs fail like a dead host.
    #[derive(Default)]
    pub struct StaticFetcher {
        routes: HashMap<String, FetchedResource>,
        pub calls: Mutex<Vec<String>>,
    }

    impl StaticFetcher {
        pub fn with(mut self, url: &str, content_type: &str, bytes: Vec<u8>) -> Self {
            self.routes.insert(
                url.to_string(),
                FetchedResource { bytes, content_type: Some(content_type.to_string()) },
            );
            self
        }
    }

    impl ResourceFetcher for StaticFetcher {
        fn fetch(&self, url: &str) -> Result<FetchedResource, FetchError> {
            if let Ok(mut calls) = self.calls.lock() {
                calls.push(url.to_string());
            }
            self.routes.get(url).cloned().ok_or_else(|| FetchError::Transport {
                url: url.to_string(),
                reason: "connection refused".to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::net::TcpListener;
    use std::thread;

    /// Answers exactly one request with `response` and returns the URL to hit.
    fn serve_once(response: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                let mut request = [0u8; 2048];
                let _ = stream.read(&mut request);
                let _ = stream.write_all(response.as_bytes());
            }
        });
        format!("http://{}/photo.png", addr)
    }

    fn fetcher() -> HttpFetcher {
        HttpFetcher::new(Some(Duration::from_secs(10)))
    }

    #[test]
    fn error_status_becomes_status_error() {
        let url = serve_once("HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");

        let err = fetcher().fetch(&url).unwrap_err();

        assert!(matches!(err, FetchError::Status { status: 404, url: ref u } if *u == url));
    }

    #[test]
    fn missing_content_type_stays_unknown() {
        let url = serve_once("HTTP/1.1 200 OK\r\nContent-Length: 3\r\nConnection: close\r\n\r\nabc");

        let resource = fetcher().fetch(&url).unwrap();

        assert_eq!(resource.content_type, None);
        assert_eq!(resource.content_type_or_empty(), "");
        assert_eq!(resource.bytes, b"abc");
    }

    #[test]
    fn content_type_is_lowercased_without_parameters() {
        let url = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Type: Image/PNG; charset=binary\r\nContent-Length: 2\r\nConnection: close\r\n\r\nok",
        );

        let resource = fetcher().fetch(&url).unwrap();

        assert_eq!(resource.content_type.as_deref(), Some("image/png"));
        assert_eq!(resource.bytes, b"ok");
    }

    #[test]
    fn unreachable_host_is_a_transport_error() {
        let port = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port();

        let err = fetcher().fetch(&format!("http://127.0.0.1:{}/gone.png", port)).unwrap_err();

        assert!(matches!(err, FetchError::Transport { .. }));
    }
}
