use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("store error: {0}")]
    Store(#[from] dbx_store::StoreError),

    #[error("ledger error: {0}")]
    Ledger(#[from] dbx_ledger::LedgerError),

    #[error("naming error: {0}")]
    Naming(#[from] dbx_naming::NamingError),

    #[error("protocol error: {0}")]
    Protocol(#[from] dbx_protocol::ProtocolError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AgentResult<T> = Result<T, AgentError>;
