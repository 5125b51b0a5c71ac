use async_trait::async_trait;

use crate::error::Error;

/// Web-search capability: a query string in, candidate URLs out, in rank order.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn search(&self, query: &str) -> Result<Vec<String>, Error>;
}
