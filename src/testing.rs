//! 测试用内存存储：记录每次写入，可注入列举或写入失败。

use async_trait::async_trait;
use axum::body::Bytes;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use crate::storage::{StorageBackend, StorageError, StoredObject};

#[derive(Default)]
pub struct MemoryStorage {
    objects: Mutex<HashMap<String, BTreeMap<String, Bytes>>>,
    writes: Mutex<Vec<(String, String)>>,
    list_failure: Mutex<Option<String>>,
    upload_failures: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn with_objects(bucket: &str, names: &[&str]) -> Self {
        let storage = Self::default();
        {
            let mut objects = storage.objects.lock().expect("objects lock");
            let entries = objects.entry(bucket.to_string()).or_default();
            for name in names {
                entries.insert(name.to_string(), Bytes::from_static(b"x"));
            }
        }
        storage
    }

    pub fn fail_list(&self, message: &str) {
        *self.list_failure.lock().expect("list failure lock") = Some(message.to_string());
    }

    /// 对指定对象名的写入返回错误（空消息模拟无错误文本的失败）。
    pub fn fail_upload(&self, name: &str, message: &str) {
        self.upload_failures
            .lock()
            .expect("upload failure lock")
            .insert(name.to_string(), message.to_string());
    }

    /// 所有写入调用（含失败的调用），按 (bucket, name) 记录。
    pub fn writes(&self) -> Vec<(String, String)> {
        self.writes.lock().expect("writes lock").clone()
    }

    pub fn object(&self, bucket: &str, name: &str) -> Option<Bytes> {
        self.objects
            .lock()
            .expect("objects lock")
            .get(bucket)
            .and_then(|entries| entries.get(name).cloned())
    }
}

#[async_trait]
impl StorageBackend for MemoryStorage {
    async fn list(&self, bucket: &str) -> Result<Vec<StoredObject>, StorageError> {
        if let Some(message) = self.list_failure.lock().expect("list failure lock").clone() {
            return Err(StorageError::Remote {
                status: 500,
                message,
            });
        }
        Ok(self
            .objects
            .lock()
            .expect("objects lock")
            .get(bucket)
            .map(|entries| {
                entries
                    .keys()
                    .map(|name| StoredObject { name: name.clone() })
                    .collect()
            })
            .unwrap_or_default())
    }

    fn public_url(&self, bucket: &str, name: &str) -> String {
        format!("memory://{bucket}/{name}")
    }

    async fn upload(
        &self,
        bucket: &str,
        name: &str,
        data: Bytes,
        upsert: bool,
    ) -> Result<(), StorageError> {
        self.writes
            .lock()
            .expect("writes lock")
            .push((bucket.to_string(), name.to_string()));
        tokio::task::yield_now().await;

        if let Some(message) = self
            .upload_failures
            .lock()
            .expect("upload failure lock")
            .get(name)
            .cloned()
        {
            return Err(StorageError::Remote {
                status: 400,
                message,
            });
        }

        let mut objects = self.objects.lock().expect("objects lock");
        let entries = objects.entry(bucket.to_string()).or_default();
        if !upsert && entries.contains_key(name) {
            return Err(StorageError::AlreadyExists);
        }
        entries.insert(name.to_string(), data);
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "memory"
    }
}
