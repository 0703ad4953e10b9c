use async_trait::async_trait;
use model::{CreateLink, Link, LinkPatch, ReorderRequest, OWNER_HEADER};

use crate::error::ClientError;

/// Network surface the editing session talks through. The session only
/// sees this trait, so tests drive it with scripted fakes.
#[async_trait]
pub trait LinkApi: Send + Sync {
    async fn list(&self) -> Result<Vec<Link>, ClientError>;

    async fn create(&self, req: &CreateLink) -> Result<Link, ClientError>;

    async fn patch_link(&self, id: &str, patch: &LinkPatch) -> Result<Link, ClientError>;

    async fn delete_link(&self, id: &str) -> Result<(), ClientError>;

    async fn reorder(&self, ordered_ids: &[String]) -> Result<(), ClientError>;
}

/// HTTP implementation against the backend's `/api/links` routes.
pub struct HttpApi {
    http: reqwest::Client,
    base_url: String,
    owner_id: String,
}

impl HttpApi {
    pub fn new(base_url: impl Into<String>, owner_id: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        let base_url = base_url.trim_end_matches('/').to_string();
        Self {
            http: reqwest::Client::new(),
            base_url,
            owner_id: owner_id.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(ClientError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl LinkApi for HttpApi {
    async fn list(&self) -> Result<Vec<Link>, ClientError> {
        let response = self
            .http
            .get(self.url("/api/links"))
            .header(OWNER_HEADER, &self.owner_id)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn create(&self, req: &CreateLink) -> Result<Link, ClientError> {
        let response = self
            .http
            .post(self.url("/api/links"))
            .header(OWNER_HEADER, &self.owner_id)
            .json(req)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn patch_link(&self, id: &str, patch: &LinkPatch) -> Result<Link, ClientError> {
        let response = self
            .http
            .patch(self.url(&format!("/api/links/{id}")))
            .header(OWNER_HEADER, &self.owner_id)
            .json(patch)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn delete_link(&self, id: &str) -> Result<(), ClientError> {
        let response = self
            .http
            .delete(self.url(&format!("/api/links/{id}")))
            .header(OWNER_HEADER, &self.owner_id)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn reorder(&self, ordered_ids: &[String]) -> Result<(), ClientError> {
        let response = self
            .http
            .post(self.url("/api/links/reorder"))
            .header(OWNER_HEADER, &self.owner_id)
            .json(&ReorderRequest {
                link_ids: ordered_ids.to_vec(),
            })
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}
