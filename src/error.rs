use thiserror::Error;

/// Longest slice of a remote response body kept in an error message.
pub const RESPONSE_SNIPPET_CHARS: usize = 300;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("login failed. HTTP {status}\nResponse: {body}")]
    Auth { status: u16, body: String },

    #[error("download failed. HTTP {status}\nResponse: {body}")]
    Fetch { status: u16, body: String },

    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("could not read table: {0}")]
    Parse(String),

    #[error("missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("cure duration not configured for kilns: {}", join_kilns(.0))]
    IncompleteConfiguration(Vec<u32>),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<csv::Error> for ReportError {
    fn from(err: csv::Error) -> Self {
        ReportError::Parse(err.to_string())
    }
}

impl From<calamine::Error> for ReportError {
    fn from(err: calamine::Error) -> Self {
        ReportError::Parse(err.to_string())
    }
}

/// Cuts a response body down for diagnostics without splitting a character.
pub fn snippet(body: &str) -> String {
    body.chars().take(RESPONSE_SNIPPET_CHARS).collect()
}

fn join_kilns(kilns: &[u32]) -> String {
    kilns
        .iter()
        .map(|kiln| kiln.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
