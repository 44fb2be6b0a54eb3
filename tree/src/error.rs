use thiserror::Error;

#[derive(Debug, Error)]
pub enum TreeError {
    #[error("XML error: {0}")]
    Xml(String),

    #[error("Unbalanced document: {0}")]
    Unbalanced(String),

    #[error("Document has no root element")]
    Empty,
}
