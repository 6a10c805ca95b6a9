use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::ServiceError;

/// Asynchronous key-value blob storage, the local persistence facility.
/// Implementations can be file-backed, in-memory, or platform storage.
#[async_trait]
pub trait KvBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, ServiceError>;
    async fn set(&self, key: &str, value: String) -> Result<(), ServiceError>;
    /// Returns whether the key existed.
    async fn remove(&self, key: &str) -> Result<bool, ServiceError>;
}

#[async_trait]
impl<T: KvBackend + ?Sized> KvBackend for Arc<T> {
    async fn get(&self, key: &str) -> Result<Option<String>, ServiceError> { (**self).get(key).await }
    async fn set(&self, key: &str, value: String) -> Result<(), ServiceError> { (**self).set(key, value).await }
    async fn remove(&self, key: &str) -> Result<bool, ServiceError> { (**self).remove(key).await }
}
