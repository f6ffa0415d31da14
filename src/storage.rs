//! 对象存储抽象与本地目录实现。

use async_trait::async_trait;
use axum::body::Bytes;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

const TEMP_PREFIX: &str = ".upload-";
const TEMP_SUFFIX: &str = ".tmp";

/// 桶中的一个对象。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredObject {
    pub name: String,
}

/// 存储后端需要提供的能力：列举、派生公开地址、写入。
#[async_trait]
pub trait StorageBackend: Send + Sync {
    async fn list(&self, bucket: &str) -> Result<Vec<StoredObject>, StorageError>;

    /// 公开访问地址，只依赖桶名与对象名，不会失败。
    fn public_url(&self, bucket: &str, name: &str) -> String;

    /// 写入对象；`upsert` 为真时覆盖同名对象。
    async fn upload(
        &self,
        bucket: &str,
        name: &str,
        data: Bytes,
        upsert: bool,
    ) -> Result<(), StorageError>;

    fn kind(&self) -> &'static str;
}

#[derive(Debug)]
pub enum StorageError {
    InvalidName,
    UnknownBucket,
    AlreadyExists,
    Io(io::Error),
    Http(reqwest::Error),
    Remote { status: u16, message: String },
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::InvalidName => f.write_str("invalid object name"),
            StorageError::UnknownBucket => f.write_str("Bucket not found"),
            StorageError::AlreadyExists => f.write_str("The resource already exists"),
            StorageError::Io(err) => write!(f, "{err}"),
            StorageError::Http(err) => write!(f, "{err}"),
            StorageError::Remote { message, .. } => f.write_str(message),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<io::Error> for StorageError {
    fn from(err: io::Error) -> Self {
        StorageError::Io(err)
    }
}

impl From<reqwest::Error> for StorageError {
    fn from(err: reqwest::Error) -> Self {
        StorageError::Http(err)
    }
}

/// 本地目录存储：根目录下每个桶一个子目录。
#[derive(Clone, Debug)]
pub struct LocalStorage {
    root: PathBuf,
    buckets: Vec<String>,
    public_base: String,
}

impl LocalStorage {
    pub fn new(root: PathBuf, buckets: &[&str], public_base: &str) -> Self {
        Self {
            root,
            buckets: buckets.iter().map(|bucket| bucket.to_string()).collect(),
            public_base: public_base.trim_end_matches('/').to_string(),
        }
    }

    /// 创建根目录与所有桶目录。
    pub async fn ensure_buckets(&self) -> io::Result<()> {
        for bucket in &self.buckets {
            fs::create_dir_all(self.root.join(bucket)).await?;
        }
        Ok(())
    }

    fn bucket_dir(&self, bucket: &str) -> Result<PathBuf, StorageError> {
        if !self.buckets.iter().any(|known| known == bucket) {
            return Err(StorageError::UnknownBucket);
        }
        Ok(self.root.join(bucket))
    }

    /// 解析对象路径，拒绝空名、`.`/`..` 与任何路径分隔符。
    pub fn object_path(&self, bucket: &str, name: &str) -> Result<PathBuf, StorageError> {
        if !is_valid_object_name(name) {
            return Err(StorageError::InvalidName);
        }
        Ok(self.bucket_dir(bucket)?.join(name))
    }
}

fn is_valid_object_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
        && !is_temp_name(name)
}

fn is_temp_name(name: &str) -> bool {
    name.starts_with(TEMP_PREFIX) && name.ends_with(TEMP_SUFFIX)
}

#[async_trait]
impl StorageBackend for LocalStorage {
    async fn list(&self, bucket: &str) -> Result<Vec<StoredObject>, StorageError> {
        let mut dir = fs::read_dir(self.bucket_dir(bucket)?).await?;
        let mut objects = Vec::new();

        while let Some(entry) = dir.next_entry().await? {
            let file_type = entry.file_type().await?;
            if !file_type.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if is_temp_name(&name) {
                continue;
            }
            objects.push(StoredObject { name });
        }

        Ok(objects)
    }

    fn public_url(&self, bucket: &str, name: &str) -> String {
        format!(
            "{}/files/{}/{}",
            self.public_base,
            encode_segment(bucket),
            encode_segment(name)
        )
    }

    async fn upload(
        &self,
        bucket: &str,
        name: &str,
        data: Bytes,
        upsert: bool,
    ) -> Result<(), StorageError> {
        let target = self.object_path(bucket, name)?;
        if !upsert && fs::try_exists(&target).await? {
            return Err(StorageError::AlreadyExists);
        }

        let temp = temp_path_for(&target);
        let written: io::Result<()> = async {
            let mut file = fs::File::create(&temp).await?;
            file.write_all(&data).await?;
            file.sync_all().await?;
            Ok(())
        }
        .await;
        if let Err(err) = written {
            let _ = fs::remove_file(&temp).await;
            return Err(err.into());
        }

        if let Err(err) = fs::rename(&temp, &target).await {
            let _ = fs::remove_file(&temp).await;
            return Err(err.into());
        }
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "local"
    }
}

fn temp_path_for(target: &Path) -> PathBuf {
    let temp_name = format!("{TEMP_PREFIX}{}{TEMP_SUFFIX}", Uuid::new_v4());
    match target.parent() {
        Some(parent) => parent.join(temp_name),
        None => PathBuf::from(temp_name),
    }
}

/// RFC 3986 非保留字符以外的字节都需要编码。
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// 对 URL 路径段做百分号编码。
pub fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, PATH_SEGMENT).to_string()
}
