//! 命令行参数、环境变量与桶配置。

use clap::Parser;
use clap::builder::NonEmptyStringValueParser;
use serde::Serialize;
use shadow_rs::formatcp;

use crate::build;

const VERSION_INFO: &str = formatcp!(
    r#"{}\ncommit_hash: {}\nbuild_time: {}\nbuild_env: {},{}"#,
    build::PKG_VERSION,
    build::SHORT_COMMIT,
    build::BUILD_TIME,
    build::RUST_VERSION,
    build::RUST_CHANNEL
);

pub const DEFAULT_BUCKET: &str = "sheet-music";
pub const DEFAULT_SEASONAL_BUCKET: &str = "christmas-music";
pub const DEFAULT_STORAGE_DIR: &str = ".sheetstand/storage";
pub const DEFAULT_UPLOAD_MAX_SIZE: u64 = 256 * 1024 * 1024;
pub const DEFAULT_LOG_FILTER: &str = "info";
pub const STORAGE_LIST_LIMIT: u32 = 100;
pub const SHUTDOWN_GRACE_SECS: u64 = 10;

/// CLI arguments and environment configuration for the server.
#[derive(Parser, Debug)]
#[command(name = "sheetstand", version = VERSION_INFO, about = "Sheet music shelf server")]
pub struct Args {
    #[arg(
        long,
        env = "SHEET_ADMIN_PASSWORD",
        hide_env_values = true,
        value_parser = NonEmptyStringValueParser::new(),
        help = "Shared admin password for uploads"
    )]
    pub admin_password: String,
    #[arg(
        short = 'b',
        long,
        env = "SHEET_BIND",
        default_value = "0.0.0.0",
        help = "Bind address"
    )]
    pub host: String,
    #[arg(
        short = 'p',
        long,
        env = "SHEET_PORT",
        default_value_t = 5173,
        help = "HTTP port"
    )]
    pub port: u16,
    #[arg(
        long,
        env = "SHEET_DEFAULT_BUCKET",
        default_value = DEFAULT_BUCKET,
        help = "Bucket listed on the main page"
    )]
    pub default_bucket: String,
    #[arg(
        long,
        env = "SHEET_SEASONAL_BUCKET",
        default_value = DEFAULT_SEASONAL_BUCKET,
        help = "Bucket listed on the seasonal page"
    )]
    pub seasonal_bucket: String,
    #[arg(
        long,
        env = "SHEET_STORAGE_URL",
        requires = "storage_key",
        help = "Supabase project URL (local storage is used when unset)"
    )]
    pub storage_url: Option<String>,
    #[arg(
        long,
        env = "SHEET_STORAGE_KEY",
        hide_env_values = true,
        help = "Supabase service key"
    )]
    pub storage_key: Option<String>,
    #[arg(
        short = 's',
        long,
        env = "SHEET_STORAGE_DIR",
        default_value = DEFAULT_STORAGE_DIR,
        help = "Root directory for the local storage backend"
    )]
    pub storage_dir: String,
    #[arg(
        long,
        env = "SHEET_PUBLIC_BASE_URL",
        default_value = "",
        help = "Prefix for public file URLs served by the local backend"
    )]
    pub public_base_url: String,
    #[arg(
        long,
        env = "SHEET_UPLOAD_MAX_SIZE",
        default_value_t = DEFAULT_UPLOAD_MAX_SIZE,
        help = "Max upload request size in bytes"
    )]
    pub upload_max_size: u64,
    #[arg(long, env = "SHEET_CORS_ORIGINS", help = "Comma separated CORS origins")]
    pub cors_origins: Option<String>,
    #[arg(
        long,
        env = "SHEET_LOG",
        default_value = DEFAULT_LOG_FILTER,
        help = "Log filter used when RUST_LOG is unset"
    )]
    pub log_filter: String,
}

impl Args {
    /// 由参数构建允许上传的桶集合。
    pub fn buckets(&self) -> Buckets {
        Buckets {
            default: self.default_bucket.clone(),
            seasonal: self.seasonal_bucket.clone(),
        }
    }
}

/// 允许访问的两个桶：默认桶与季节桶。
#[derive(Clone, Debug, Serialize)]
pub struct Buckets {
    pub default: String,
    pub seasonal: String,
}

impl Buckets {
    pub fn contains(&self, bucket: &str) -> bool {
        bucket == self.default || bucket == self.seasonal
    }

    pub fn all(&self) -> [&str; 2] {
        [self.default.as_str(), self.seasonal.as_str()]
    }

    /// 解析表单中的桶选择；缺省时落到默认桶，不在白名单内返回 `None`。
    pub fn resolve<'a>(&'a self, requested: Option<&'a str>) -> Option<&'a str> {
        match requested {
            None => Some(self.default.as_str()),
            Some(bucket) if self.contains(bucket) => Some(bucket),
            Some(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buckets() -> Buckets {
        Buckets {
            default: DEFAULT_BUCKET.to_string(),
            seasonal: DEFAULT_SEASONAL_BUCKET.to_string(),
        }
    }

    #[test]
    fn resolve_defaults_when_absent() {
        assert_eq!(buckets().resolve(None), Some(DEFAULT_BUCKET));
    }

    #[test]
    fn resolve_accepts_allow_listed_buckets() {
        let buckets = buckets();
        assert_eq!(
            buckets.resolve(Some("christmas-music")),
            Some(DEFAULT_SEASONAL_BUCKET)
        );
        assert_eq!(buckets.resolve(Some("sheet-music")), Some(DEFAULT_BUCKET));
    }

    #[test]
    fn resolve_rejects_unknown_bucket() {
        assert_eq!(buckets().resolve(Some("private")), None);
        assert_eq!(buckets().resolve(Some("Sheet-Music")), None);
    }

    #[test]
    fn args_require_admin_password() {
        let result = Args::try_parse_from(["sheetstand", "--admin-password", ""]);
        assert!(result.is_err());
    }

    #[test]
    fn args_storage_url_requires_key() {
        let result = Args::try_parse_from([
            "sheetstand",
            "--admin-password",
            "secret",
            "--storage-url",
            "https://example.supabase.co",
        ]);
        assert!(result.is_err());
    }
}
