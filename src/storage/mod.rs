pub mod minio;
pub mod redis;
