//! Supabase Storage REST 客户端。

use async_trait::async_trait;
use axum::body::Bytes;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, Response, Url};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::storage::{StorageBackend, StorageError, StoredObject, encode_segment};

const STORAGE_PATH: &str = "storage/v1";

/// 通过 Supabase Storage API 访问桶。
#[derive(Clone, Debug)]
pub struct SupabaseStorage {
    client: Client,
    base_url: String,
    list_limit: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ListRequest<'a> {
    prefix: &'a str,
    limit: u32,
    offset: u32,
    sort_by: SortBy<'a>,
}

#[derive(Serialize)]
struct SortBy<'a> {
    column: &'a str,
    order: &'a str,
}

#[derive(Deserialize)]
struct ListEntry {
    name: String,
}

#[derive(Deserialize, Default)]
struct RemoteError {
    message: Option<String>,
    error: Option<String>,
}

impl SupabaseStorage {
    pub fn new(project_url: &str, service_key: &str, list_limit: u32) -> Result<Self, StorageError> {
        Url::parse(project_url).map_err(|err| StorageError::Remote {
            status: 0,
            message: format!("invalid storage url: {err}"),
        })?;

        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {service_key}")).map_err(|_| {
            StorageError::Remote {
                status: 0,
                message: "invalid storage key".into(),
            }
        })?;
        let api_key = HeaderValue::from_str(service_key).map_err(|_| StorageError::Remote {
            status: 0,
            message: "invalid storage key".into(),
        })?;
        headers.insert(AUTHORIZATION, bearer);
        headers.insert("apikey", api_key);

        let client = Client::builder().default_headers(headers).build()?;
        Ok(Self {
            client,
            base_url: format!("{}/{STORAGE_PATH}", project_url.trim_end_matches('/')),
            list_limit,
        })
    }

    fn object_url(&self, bucket: &str, name: &str) -> String {
        format!(
            "{}/object/{}/{}",
            self.base_url,
            encode_segment(bucket),
            encode_segment(name)
        )
    }
}

/// 将非 2xx 响应转换为带消息的错误。
async fn check_response(response: Response) -> Result<Response, StorageError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(StorageError::Remote {
        status: status.as_u16(),
        message: remote_message(&body),
    })
}

fn remote_message(body: &str) -> String {
    let parsed: RemoteError = serde_json::from_str(body).unwrap_or_default();
    parsed
        .message
        .or(parsed.error)
        .unwrap_or_else(|| body.trim().to_string())
}

#[async_trait]
impl StorageBackend for SupabaseStorage {
    async fn list(&self, bucket: &str) -> Result<Vec<StoredObject>, StorageError> {
        let url = format!("{}/object/list/{}", self.base_url, encode_segment(bucket));
        let request = ListRequest {
            prefix: "",
            limit: self.list_limit,
            offset: 0,
            sort_by: SortBy {
                column: "name",
                order: "asc",
            },
        };
        let response = self.client.post(url).json(&request).send().await?;
        let entries: Vec<ListEntry> = check_response(response).await?.json().await?;
        debug!(bucket, count = entries.len(), "remote list");
        Ok(entries
            .into_iter()
            .map(|entry| StoredObject { name: entry.name })
            .collect())
    }

    fn public_url(&self, bucket: &str, name: &str) -> String {
        format!(
            "{}/object/public/{}/{}",
            self.base_url,
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
        let mime = mime_guess::from_path(name).first_or_octet_stream();
        let response = self
            .client
            .post(self.object_url(bucket, name))
            .header(CONTENT_TYPE, mime.essence_str())
            .header("x-upsert", if upsert { "true" } else { "false" })
            .header("cache-control", "max-age=3600")
            .body(data)
            .send()
            .await?;
        check_response(response).await?;
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "supabase"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage() -> SupabaseStorage {
        SupabaseStorage::new("https://demo.supabase.co/", "service-key", 100).expect("client")
    }

    #[test]
    fn public_url_points_at_public_object_path() {
        assert_eq!(
            storage().public_url("sheet-music", "Silent Night.pdf"),
            "https://demo.supabase.co/storage/v1/object/public/sheet-music/Silent%20Night.pdf"
        );
    }

    #[test]
    fn object_url_targets_bucket() {
        assert_eq!(
            storage().object_url("christmas-music", "Carol_1.pdf"),
            "https://demo.supabase.co/storage/v1/object/christmas-music/Carol_1.pdf"
        );
    }

    #[test]
    fn remote_message_prefers_message_field() {
        assert_eq!(
            remote_message(r#"{"statusCode":"403","error":"Unauthorized","message":"new row violates row-level security policy"}"#),
            "new row violates row-level security policy"
        );
        assert_eq!(remote_message(r#"{"error":"Bucket not found"}"#), "Bucket not found");
        assert_eq!(remote_message("gateway timeout\n"), "gateway timeout");
    }

    #[test]
    fn rejects_invalid_project_url() {
        assert!(SupabaseStorage::new("not a url", "key", 100).is_err());
    }
}
