//! Inbound port. UI (adapter) calls into the application.

use crate::domain::DomainError;

/// Input port: console/transport drives the ledger use cases.
#[async_trait::async_trait]
pub trait InputPort: Send + Sync {
    /// Run the interactive session until the user exits.
    async fn run(&self) -> Result<(), DomainError>;
}
