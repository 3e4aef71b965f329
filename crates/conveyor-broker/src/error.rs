/// Broker failure taxonomy.
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    /// Connection-level failure; retry later.
    #[error("broker unavailable: {0}")]
    Unavailable(String),
    /// The broker answered but refused the command.
    #[error("broker rejected request: {0}")]
    Rejected(String),
    /// A reply or entry did not have the expected shape.
    #[error("malformed broker reply: {0}")]
    Malformed(String),
}

impl BrokerError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}
