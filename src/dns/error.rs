use std::fmt::Display;

#[derive(Debug, PartialEq, Eq)]
pub enum HandleError {
    /// The store or resolver was torn down while the request was in
    /// flight; the client gets a SERVFAIL.
    Closed,
}

impl Display for HandleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "subsystem closed while handling the request"),
        }
    }
}

impl std::error::Error for HandleError {}
