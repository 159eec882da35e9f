//! S3 client implementation
//!
//! Wraps aws-sdk-s3 and implements the ObjectStore trait from oget-core.

use async_trait::async_trait;
use aws_sdk_s3::error::{ProvideErrorMetadata, SdkError};
use aws_smithy_runtime_api::client::orchestrator::HttpResponse;
use futures::StreamExt;
use md5::{Digest, Md5};
use oget_core::{
    Alias, ByteStream, Error, ListOptions, ListResult, ObjectInfo, ObjectReader, ObjectStore,
    RemotePath, Result, RetryConfig, SseKey, is_retryable_error, retry_with_backoff,
};

/// The only algorithm S3 accepts for customer-provided keys
const SSE_ALGORITHM: &str = "AES256";

/// S3 client wrapper
pub struct S3Client {
    inner: aws_sdk_s3::Client,
    retry: RetryConfig,
}

impl S3Client {
    /// Create a new S3 client from an alias configuration
    pub async fn new(alias: Alias) -> Result<Self> {
        alias.validate()?;

        let credentials = aws_credential_types::Credentials::new(
            alias.access_key.clone(),
            alias.secret_key.clone(),
            None, // session token
            None, // expiry
            "oget-static-credentials",
        );

        let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(aws_config::Region::new(alias.region.clone()))
            .endpoint_url(&alias.endpoint)
            .load()
            .await;

        // Retries are driven by the alias settings, not the SDK defaults
        let s3_config = aws_sdk_s3::config::Builder::from(&config)
            .force_path_style(alias.bucket_lookup == "path" || alias.bucket_lookup == "auto")
            .retry_config(aws_sdk_s3::config::retry::RetryConfig::disabled())
            .build();

        tracing::debug!(alias = %alias.name, endpoint = %alias.endpoint, "S3 client ready");

        Ok(Self {
            inner: aws_sdk_s3::Client::from_conf(s3_config),
            retry: alias.retry_config(),
        })
    }
}

/// Format AWS SDK error into a detailed error message
fn format_sdk_error<E: std::fmt::Display>(error: &SdkError<E, HttpResponse>) -> String {
    match error {
        SdkError::ServiceError(service_err) => {
            let err = service_err.err();
            let meta = service_err.raw();
            let mut msg = format!("Service error: {}", err);
            if let Some(code) = meta.headers().get("x-amz-error-code")
                && let Ok(code_str) = std::str::from_utf8(code.as_bytes())
            {
                msg.push_str(&format!(" (code: {})", code_str));
            }
            msg
        }
        SdkError::ConstructionFailure(err) => {
            format!("Request construction failed: {:?}", err)
        }
        SdkError::TimeoutError(_) => "Request timeout".to_string(),
        SdkError::DispatchFailure(err) => {
            format!("Network dispatch error: {:?}", err)
        }
        SdkError::ResponseError(err) => {
            format!("Response error: {:?}", err)
        }
        _ => error.to_string(),
    }
}

/// Map an SDK failure for `url` onto the core error classes.
fn classify_sdk_error<E>(error: SdkError<E, HttpResponse>, url: &str) -> Error
where
    E: ProvideErrorMetadata + std::fmt::Display,
{
    let status = error.raw_response().map(|r| r.status().as_u16());
    let code = error
        .as_service_error()
        .and_then(|e| e.code())
        .map(str::to_string);
    classify(status, code.as_deref(), url, format_sdk_error(&error))
}

fn classify(status: Option<u16>, code: Option<&str>, url: &str, message: String) -> Error {
    match (status, code) {
        (_, Some("NoSuchKey" | "NoSuchBucket" | "NotFound")) | (Some(404), _) => {
            Error::NotFound(url.to_string())
        }
        (_, Some("AccessDenied" | "InvalidAccessKeyId" | "SignatureDoesNotMatch"))
        | (Some(401 | 403), _) => Error::AccessDenied(url.to_string()),
        (Some(status), _) if status == 429 || status >= 500 => {
            Error::Network(format!("{url}: HTTP {status}: {message}"))
        }
        _ => Error::Network(format!("{url}: {message}")),
    }
}

/// Header values for a customer-provided encryption key
#[derive(Debug, Clone, PartialEq, Eq)]
struct SseHeaders {
    key: String,
    key_md5: String,
}

impl SseHeaders {
    fn new(key: &SseKey) -> Self {
        Self {
            key: aws_smithy_types::base64::encode(key.as_bytes()),
            key_md5: aws_smithy_types::base64::encode(Md5::digest(key.as_bytes())),
        }
    }
}

fn split_sse(sse: Option<&SseKey>) -> (Option<String>, Option<String>, Option<String>) {
    match sse.map(SseHeaders::new) {
        Some(h) => (Some(SSE_ALGORITHM.to_string()), Some(h.key), Some(h.key_md5)),
        None => (None, None, None),
    }
}

fn timestamp(value: Option<&aws_smithy_types::DateTime>) -> Option<jiff::Timestamp> {
    value.and_then(|t| jiff::Timestamp::from_second(t.secs()).ok())
}

/// Metadata from a HEAD or GET response. A missing Content-Length leaves
/// the size unknown rather than zero.
fn object_info(
    key: &str,
    content_length: Option<i64>,
    last_modified: Option<&aws_smithy_types::DateTime>,
    etag: Option<&str>,
) -> ObjectInfo {
    let mut info = ObjectInfo::file(key, 0);
    info.size_bytes = content_length;
    info.last_modified = timestamp(last_modified);
    info.etag = etag.map(|e| e.trim_matches('"').to_string());
    info
}

#[async_trait]
impl ObjectStore for S3Client {
    async fn list_objects(&self, path: &RemotePath, options: ListOptions) -> Result<ListResult> {
        let url = path.to_string();
        let response = retry_with_backoff(
            &self.retry,
            "list_objects",
            || {
                let mut request = self.inner.list_objects_v2().bucket(&path.bucket);
                if !path.key.is_empty() {
                    request = request.prefix(&path.key);
                }
                // Delimiter only for non-recursive listing
                if !options.recursive {
                    request = request.delimiter("/");
                }
                if let Some(max) = options.max_keys {
                    request = request.max_keys(max);
                }
                if let Some(token) = &options.continuation_token {
                    request = request.continuation_token(token);
                }
                let url = url.clone();
                async move { request.send().await.map_err(|e| classify_sdk_error(e, &url)) }
            },
            is_retryable_error,
        )
        .await?;

        let mut items = Vec::new();

        for prefix in response.common_prefixes() {
            if let Some(p) = prefix.prefix() {
                items.push(ObjectInfo::dir(p));
            }
        }

        for object in response.contents() {
            let key = object.key().unwrap_or_default();
            let mut info = ObjectInfo::file(key, object.size().unwrap_or(0));
            info.last_modified = timestamp(object.last_modified());
            info.etag = object.e_tag().map(|e| e.trim_matches('"').to_string());
            items.push(info);
        }

        tracing::debug!(url = %url, items = items.len(), "Listed page");

        Ok(ListResult {
            items,
            truncated: response.is_truncated().unwrap_or(false),
            continuation_token: response.next_continuation_token().map(|s| s.to_string()),
        })
    }

    async fn head_object(&self, path: &RemotePath, sse: Option<SseKey>) -> Result<ObjectInfo> {
        let url = path.to_string();
        let (algorithm, key, key_md5) = split_sse(sse.as_ref());
        let response = retry_with_backoff(
            &self.retry,
            "head_object",
            || {
                let request = self
                    .inner
                    .head_object()
                    .bucket(&path.bucket)
                    .key(&path.key)
                    .set_sse_customer_algorithm(algorithm.clone())
                    .set_sse_customer_key(key.clone())
                    .set_sse_customer_key_md5(key_md5.clone());
                let url = url.clone();
                async move { request.send().await.map_err(|e| classify_sdk_error(e, &url)) }
            },
            is_retryable_error,
        )
        .await?;

        let info = object_info(
            &path.key,
            response.content_length(),
            response.last_modified(),
            response.e_tag(),
        );
        Ok(info)
    }

    async fn get_object(&self, path: &RemotePath, sse: Option<SseKey>) -> Result<ObjectReader> {
        let url = path.to_string();
        let (algorithm, key, key_md5) = split_sse(sse.as_ref());
        let response = retry_with_backoff(
            &self.retry,
            "get_object",
            || {
                let request = self
                    .inner
                    .get_object()
                    .bucket(&path.bucket)
                    .key(&path.key)
                    .set_sse_customer_algorithm(algorithm.clone())
                    .set_sse_customer_key(key.clone())
                    .set_sse_customer_key_md5(key_md5.clone());
                let url = url.clone();
                async move { request.send().await.map_err(|e| classify_sdk_error(e, &url)) }
            },
            is_retryable_error,
        )
        .await?;

        let info = object_info(
            &path.key,
            response.content_length(),
            response.last_modified(),
            response.e_tag(),
        );

        // The body phase is not retried: bytes may already be on disk
        let body: ByteStream = futures::stream::unfold(
            (response.body, url),
            |(mut body, url)| async move {
                let chunk = body.next().await?;
                let chunk = chunk.map_err(|e| Error::Network(format!("{url}: {e}")));
                Some((chunk, (body, url)))
            },
        )
        .boxed();

        Ok(ObjectReader { info, body })
    }
}
