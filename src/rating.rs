use crate::http::{Transport, TransportError};
use chrono::Utc;
use log::{error, info};

#[derive(Debug, thiserror::Error)]
pub enum RatingError {
    #[error("rating must be between 1 and 5 stars, got {0}")]
    OutOfRange(u8),
    #[error("failed to submit rating: {0}")]
    Transport(#[from] TransportError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatingOutcome {
    Submitted { status: u16 },
    AlreadyRated,
}

pub struct RatingClient<T> {
    transport: T,
    url: String,
    source: String,
    has_rated: bool,
}

impl<T: Transport> RatingClient<T> {
    pub fn new(transport: T, url: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            transport,
            url: url.into(),
            source: source.into(),
            has_rated: false,
        }
    }

    /// Starts from a previously persisted flag.
    pub fn with_has_rated(mut self, has_rated: bool) -> Self {
        self.has_rated = has_rated;
        self
    }

    pub fn has_rated(&self) -> bool {
        self.has_rated
    }

    /// Sends `stars` out of five. Any reply from the service counts as rated.
    pub fn rate(&mut self, stars: u8) -> Result<RatingOutcome, RatingError> {
        if !(1..=5).contains(&stars) {
            return Err(RatingError::OutOfRange(stars));
        }
        if self.has_rated {
            return Ok(RatingOutcome::AlreadyRated);
        }

        let rating = format!("{stars}/5");
        let boundary = format!("----mmw-{}", Utc::now().timestamp_nanos_opt().unwrap_or_default());
        let body = multipart_body(&boundary, &[("rating", &rating), ("source", &self.source)]);
        let content_type = format!("multipart/form-data; boundary={boundary}");

        match self.transport.post(&self.url, &content_type, body) {
            Ok(reply) => {
                self.has_rated = true;
                info!("submitted rating {rating} (status {})", reply.status);
                Ok(RatingOutcome::Submitted {
                    status: reply.status,
                })
            }
            Err(err) => {
                error!("error submitting rating: {err}");
                Err(err.into())
            }
        }
    }
}

fn multipart_body(boundary: &str, fields: &[(&str, &str)]) -> Vec<u8> {
    let mut body = String::new();
    for (name, value) in fields {
        body.push_str(&format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
        ));
    }
    body.push_str(&format!("--{boundary}--\r\n"));
    body.into_bytes()
}
