use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {reason}")]
    Transport { url: String, reason: String },
    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("failed to read body of {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: std::io::Error,
    },
}

/// Failure of a whole URL-list batch. Nothing from the batch is kept.
#[derive(Debug, Error)]
pub enum AcquireError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("{url} is not an image (content type: {content_type})")]
    NotAnImage { url: String, content_type: String },
}

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("failed to decode {name}: {source}")]
    Decode {
        name: String,
        #[source]
        source: image::ImageError,
    },
    #[error("failed to encode {name} as {format}: {source}")]
    Encode {
        name: String,
        format: &'static str,
        #[source]
        source: image::ImageError,
    },
    #[error("{name} did not finish converting within {secs}s")]
    Timeout { name: String, secs: u64 },
    #[error("conversion worker for {name} exited without a result")]
    WorkerLost { name: String },
}

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
