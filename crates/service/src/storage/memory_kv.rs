use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::errors::ServiceError;
use crate::storage::kv::KvBackend;

/// In-memory backend for tests and throwaway sessions.
///
/// `fail_writes` makes every `set`/`remove` return a storage error, and
/// `write_count` counts successful `set` calls.
#[derive(Clone, Debug, Default)]
pub struct MemoryKv {
    entries: Arc<Mutex<HashMap<String, String>>>,
    fail_writes: Arc<AtomicBool>,
    writes: Arc<AtomicUsize>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a backend with existing blobs.
    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let kv = Self::new();
        {
            let mut map = kv.lock();
            for (k, v) in entries {
                map.insert(k.into(), v.into());
            }
        }
        kv
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Synchronous peek, for assertions.
    pub fn raw(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        // a poisoned map is still a valid map
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check_writable(&self) -> Result<(), ServiceError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(ServiceError::Storage("memory backend is read-only".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl KvBackend for MemoryKv {
    async fn get(&self, key: &str) -> Result<Option<String>, ServiceError> {
        Ok(self.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<(), ServiceError> {
        self.check_writable()?;
        self.lock().insert(key.to_string(), value);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool, ServiceError> {
        self.check_writable()?;
        Ok(self.lock().remove(key).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_kv_basic_crud() -> Result<(), anyhow::Error> {
        let kv = MemoryKv::new();
        assert_eq!(kv.get("trips").await?, None);

        kv.set("trips", "{}".into()).await?;
        assert_eq!(kv.get("trips").await?.as_deref(), Some("{}"));
        assert_eq!(kv.write_count(), 1);

        assert!(kv.remove("trips").await?);
        assert!(!kv.remove("trips").await?);
        Ok(())
    }

    #[tokio::test]
    async fn failing_writes_leave_data_untouched() -> Result<(), anyhow::Error> {
        let kv = MemoryKv::with_entries([("trips", "{}")]);
        kv.set_fail_writes(true);
        assert!(matches!(kv.set("trips", "[]".into()).await, Err(ServiceError::Storage(_))));
        assert!(kv.remove("trips").await.is_err());
        assert_eq!(kv.raw("trips").as_deref(), Some("{}"));
        assert_eq!(kv.write_count(), 0);

        kv.set_fail_writes(false);
        kv.set("trips", "[]".into()).await?;
        assert_eq!(kv.raw("trips").as_deref(), Some("[]"));
        Ok(())
    }
}
