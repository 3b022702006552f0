//! HTTP directory client.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, trace};

use sealpost_crypto::{FileEnvelope, PublicKey, UserId};

use crate::config::HttpDirectoryConfig;
use crate::directory::{
    AccountRecord, CreatedId, Directory, FileId, LoginRequest, RegisterRequest,
    SharedFileSummary, UploadRequest, UserRecord,
};
use crate::error::{ShareError, ShareResult};

/// Error body returned by the directory, in either of the shapes it uses.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(alias = "error")]
    message: String,
}

/// [`Directory`] backed by the directory's HTTP API.
pub struct HttpDirectory {
    client: Client,
    config: HttpDirectoryConfig,
}

impl HttpDirectory {
    /// Create a client with the given configuration.
    pub fn new(config: HttpDirectoryConfig) -> ShareResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| ShareError::Config(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            component = "http_directory",
            url = %config.base_url,
            authenticated = config.token.is_some(),
            "Initializing HTTP directory"
        );

        Ok(Self { client, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> ShareResult<Self> {
        Self::new(HttpDirectoryConfig::from_env())
    }

    /// Get the current configuration.
    pub fn config(&self) -> &HttpDirectoryConfig {
        &self.config
    }

    fn url(&self, endpoint: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        )
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match self.config.token {
            Some(ref token) => req.bearer_auth(token),
            None => req,
        }
    }

    fn get(&self, endpoint: &str) -> RequestBuilder {
        let url = self.url(endpoint);
        trace!(component = "http_directory", %url, "GET");
        self.authorize(self.client.get(url))
    }

    fn post(&self, endpoint: &str) -> RequestBuilder {
        let url = self.url(endpoint);
        trace!(component = "http_directory", %url, "POST");
        self.authorize(self.client.post(url))
    }

    /// Send a request and decode a successful JSON body.
    ///
    /// 404 maps to [`ShareError::NotFound`] with `what` as context; any other
    /// non-success status maps to [`ShareError::Directory`].
    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder, what: &str) -> ShareResult<T> {
        let response = req
            .send()
            .await
            .map_err(|e| ShareError::Request(format!("Request failed: {}", e)))?;

        let response = check_status(response, what).await?;

        response
            .json()
            .await
            .map_err(|e| ShareError::Serialization(format!("Failed to parse response: {}", e)))
    }
}

async fn check_status(response: Response, what: &str) -> ShareResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::NOT_FOUND {
        return Err(ShareError::NotFound(what.to_string()));
    }

    let text = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ErrorBody>(&text) {
        Ok(body) => body.message,
        Err(_) if text.trim().is_empty() => status
            .canonical_reason()
            .unwrap_or("Unknown error")
            .to_string(),
        Err(_) => text.trim().to_string(),
    };

    debug!(
        component = "http_directory",
        status = status.as_u16(),
        error = %message,
        "Directory rejected request"
    );
    Err(ShareError::Directory {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl Directory for HttpDirectory {
    async fn public_key(&self, username: &UserId) -> ShareResult<PublicKey> {
        let record: UserRecord = self
            .send(self.get(&format!("user/{}", username)), &format!("user {}", username))
            .await?;

        // The directory answering for a different name is a lookup failure
        if record.username != *username {
            return Err(ShareError::NotFound(format!("user {}", username)));
        }
        Ok(record.public_key)
    }

    async fn register(&self, request: RegisterRequest) -> ShareResult<u64> {
        let what = format!("register {}", request.username);
        let created: CreatedId = self.send(self.post("register").json(&request), &what).await?;
        Ok(created.id)
    }

    async fn login(&self, request: LoginRequest) -> ShareResult<AccountRecord> {
        let what = format!("user {}", request.username);
        let account: AccountRecord = self.send(self.post("login").json(&request), &what).await?;

        if account.username != request.username {
            return Err(ShareError::NotFound(what));
        }
        Ok(account)
    }

    async fn upload(&self, request: UploadRequest) -> ShareResult<FileId> {
        let what = format!("user {}", request.to_username);
        let created: CreatedId = self.send(self.post("upload").json(&request), &what).await?;
        Ok(FileId(created.id))
    }

    async fn download(&self, id: FileId) -> ShareResult<FileEnvelope> {
        let envelope: FileEnvelope = self
            .send(self.get(&format!("download/{}", id)), &format!("file {}", id))
            .await?;
        envelope.validate()?;
        Ok(envelope)
    }

    async fn shared_with(&self, username: &UserId) -> ShareResult<Vec<SharedFileSummary>> {
        self.send(
            self.get(&format!("files/shared/{}", username)),
            &format!("user {}", username),
        )
        .await
    }

    async fn users(&self) -> ShareResult<Vec<UserRecord>> {
        self.send(self.get("users"), "users").await
    }
}
