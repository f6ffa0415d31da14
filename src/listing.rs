//! 乐谱列表处理器：列举桶内对象并按自然顺序返回。

use axum::extract::Extension;
use axum::response::Json as JsonResponse;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::Buckets;
use crate::names::natural_cmp;
use crate::storage::StorageBackend;

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct Song {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct SongList {
    pub songs: Vec<Song>,
}

/// 列出桶内所有乐谱；存储出错时返回空列表，页面始终可渲染。
pub async fn list_songs(storage: &dyn StorageBackend, bucket: &str) -> Vec<Song> {
    let objects = match storage.list(bucket).await {
        Ok(objects) => objects,
        Err(err) => {
            warn!(bucket, error = %err, "list failed, returning empty song list");
            return Vec::new();
        }
    };

    let mut songs: Vec<Song> = objects
        .into_iter()
        .map(|object| Song {
            url: storage.public_url(bucket, &object.name),
            name: object.name,
        })
        .collect();
    songs.sort_by(|a, b| natural_cmp(&a.name, &b.name));
    info!(bucket, count = songs.len(), "list songs");
    songs
}

/// 默认桶的乐谱列表。
pub async fn default_songs(
    Extension(storage): Extension<Arc<dyn StorageBackend>>,
    Extension(buckets): Extension<Arc<Buckets>>,
) -> JsonResponse<SongList> {
    let songs = list_songs(storage.as_ref(), &buckets.default).await;
    JsonResponse(SongList { songs })
}

/// 季节桶的乐谱列表。
pub async fn seasonal_songs(
    Extension(storage): Extension<Arc<dyn StorageBackend>>,
    Extension(buckets): Extension<Arc<Buckets>>,
) -> JsonResponse<SongList> {
    let songs = list_songs(storage.as_ref(), &buckets.seasonal).await;
    JsonResponse(SongList { songs })
}

/// 上传页可选的桶。
pub async fn bucket_names(Extension(buckets): Extension<Arc<Buckets>>) -> JsonResponse<Buckets> {
    JsonResponse(buckets.as_ref().clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryStorage;

    #[tokio::test]
    async fn songs_are_sorted_naturally_with_public_urls() {
        let storage = MemoryStorage::with_objects(
            "sheet-music",
            &["Song 10.pdf", "song 2.pdf", "Amazing Grace.pdf", "Song 1.pdf"],
        );

        let songs = list_songs(&storage, "sheet-music").await;
        let names: Vec<&str> = songs.iter().map(|song| song.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Amazing Grace.pdf", "Song 1.pdf", "song 2.pdf", "Song 10.pdf"]
        );
        assert_eq!(songs[0].url, "memory://sheet-music/Amazing Grace.pdf");
    }

    #[tokio::test]
    async fn list_error_degrades_to_empty() {
        let storage = MemoryStorage::with_objects("sheet-music", &["a.pdf"]);
        storage.fail_list("storage offline");

        assert!(list_songs(&storage, "sheet-music").await.is_empty());
    }

    #[tokio::test]
    async fn empty_bucket_lists_nothing() {
        let storage = MemoryStorage::default();
        assert!(list_songs(&storage, "christmas-music").await.is_empty());
    }

    #[tokio::test]
    async fn seasonal_handler_reads_seasonal_bucket() {
        let storage = MemoryStorage::with_objects("christmas-music", &["Silent Night.pdf"]);
        let storage: Arc<dyn StorageBackend> = Arc::new(storage);
        let buckets = Arc::new(Buckets {
            default: "sheet-music".into(),
            seasonal: "christmas-music".into(),
        });

        let JsonResponse(list) =
            seasonal_songs(Extension(storage.clone()), Extension(buckets.clone())).await;
        assert_eq!(list.songs.len(), 1);
        assert_eq!(list.songs[0].name, "Silent Night.pdf");

        let JsonResponse(list) = default_songs(Extension(storage), Extension(buckets)).await;
        assert!(list.songs.is_empty());
    }
}
