//! REST implementation of [`TaskApi`] over reqwest.

use super::{AssignRequest, CommentBody, CreateTaskRequest, StatusUpdate, TaskApi, TaskQuery, TaskUpdate};
use crate::config::ApiConfig;
use crate::error::{WorkflowError, WorkflowResult};
use crate::types::{
    Attachment, AttachmentId, Comment, CommentId, Department, Employee, Page, StagedFile, Task,
    TaskId,
};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, multipart};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Sub-resource lists come back either bare or wrapped in a page.
#[derive(Deserialize)]
#[serde(untagged)]
enum ListBody<T> {
    Paged(Page<T>),
    Bare(Vec<T>),
}

impl<T> ListBody<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            ListBody::Paged(page) => page.results,
            ListBody::Bare(items) => items,
        }
    }
}

pub struct HttpTaskApi {
    base_url: String,
    token: Option<String>,
    trailing_slash: bool,
    page_size: u32,
    client: Client,
}

impl HttpTaskApi {
    pub fn new(config: &ApiConfig) -> WorkflowResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone().filter(|t| !t.is_empty()),
            trailing_slash: config.trailing_slash,
            page_size: config.page_size,
            client,
        })
    }

    /// Absolute URL for an API path such as `tasks/12/comments`.
    pub fn url(&self, path: &str) -> String {
        let path = path.trim_matches('/');
        if self.trailing_slash {
            format!("{}/{}/", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = self.url(path);
        debug!(%method, %url, "task api request");
        let req = self.client.request(method, url);
        match self.token {
            Some(ref token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> WorkflowResult<T> {
        let response = check(req.send().await?).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn send_empty(&self, req: RequestBuilder) -> WorkflowResult<()> {
        check(req.send().await?).await?;
        Ok(())
    }

    fn page_query(&self, page: u32) -> Vec<(&'static str, String)> {
        vec![
            ("page", page.max(1).to_string()),
            ("page_size", self.page_size.to_string()),
        ]
    }
}

/// Turn a non-2xx response into a `RemoteRejected` error carrying its body.
async fn check(response: reqwest::Response) -> WorkflowResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let text = response.text().await.unwrap_or_default();
    let body = serde_json::from_str::<Value>(&text).unwrap_or(Value::String(text));
    debug!(status = status.as_u16(), "task api rejected request");
    Err(WorkflowError::remote_rejected(status.as_u16(), &body))
}

fn file_part(file: &StagedFile) -> WorkflowResult<multipart::Part> {
    multipart::Part::bytes(file.content.clone())
        .file_name(file.file_name.clone())
        .mime_str(&file.mime_type)
        .map_err(|e| WorkflowError::internal(format!("invalid MIME type: {}", e)))
}

#[async_trait]
impl TaskApi for HttpTaskApi {
    async fn list_tasks(&self, query: &TaskQuery) -> WorkflowResult<Page<Task>> {
        self.send(self.request(Method::GET, "tasks").query(&query.to_pairs()))
            .await
    }

    async fn my_tasks(&self, query: &TaskQuery) -> WorkflowResult<Page<Task>> {
        self.send(self.request(Method::GET, "tasks/my").query(&query.to_pairs()))
            .await
    }

    async fn get_task(&self, task_id: TaskId) -> WorkflowResult<Task> {
        self.send(self.request(Method::GET, &format!("tasks/{}", task_id)))
            .await
    }

    async fn create_task(
        &self,
        request: &CreateTaskRequest,
        files: &[StagedFile],
    ) -> WorkflowResult<Task> {
        let req = self.request(Method::POST, "tasks");
        if files.is_empty() {
            return self.send(req.json(request)).await;
        }
        let mut form = multipart::Form::new();
        for (key, value) in request.form_fields() {
            form = form.text(key, value);
        }
        for file in files {
            form = form.part("files", file_part(file)?);
        }
        self.send(req.multipart(form)).await
    }

    async fn update_task(&self, task_id: TaskId, update: &TaskUpdate) -> WorkflowResult<Task> {
        self.send(
            self.request(Method::PUT, &format!("tasks/{}", task_id))
                .json(update),
        )
        .await
    }

    async fn update_status(
        &self,
        task_id: TaskId,
        update: &StatusUpdate,
    ) -> WorkflowResult<Task> {
        self.send(
            self.request(Method::PATCH, &format!("tasks/{}/status", task_id))
                .json(update),
        )
        .await
    }

    async fn delete_task(&self, task_id: TaskId) -> WorkflowResult<()> {
        self.send_empty(self.request(Method::DELETE, &format!("tasks/{}", task_id)))
            .await
    }

    async fn assign_task(
        &self,
        task_id: TaskId,
        request: &AssignRequest,
    ) -> WorkflowResult<Task> {
        self.send(
            self.request(Method::POST, &format!("tasks/{}/assign_task", task_id))
                .json(request),
        )
        .await
    }

    async fn list_comments(&self, task_id: TaskId) -> WorkflowResult<Vec<Comment>> {
        let body: ListBody<Comment> = self
            .send(self.request(Method::GET, &format!("tasks/{}/comments", task_id)))
            .await?;
        Ok(body.into_vec())
    }

    async fn add_comment(&self, task_id: TaskId, body: &CommentBody) -> WorkflowResult<Comment> {
        self.send(
            self.request(Method::POST, &format!("tasks/{}/comments", task_id))
                .json(body),
        )
        .await
    }

    async fn update_comment(
        &self,
        task_id: TaskId,
        comment_id: CommentId,
        body: &CommentBody,
    ) -> WorkflowResult<Comment> {
        self.send(
            self.request(
                Method::PUT,
                &format!("tasks/{}/comments/{}", task_id, comment_id),
            )
            .json(body),
        )
        .await
    }

    async fn delete_comment(&self, task_id: TaskId, comment_id: CommentId) -> WorkflowResult<()> {
        self.send_empty(self.request(
            Method::DELETE,
            &format!("tasks/{}/comments/{}", task_id, comment_id),
        ))
        .await
    }

    async fn list_attachments(&self, task_id: TaskId) -> WorkflowResult<Vec<Attachment>> {
        let body: ListBody<Attachment> = self
            .send(self.request(Method::GET, &format!("tasks/{}/attachments", task_id)))
            .await?;
        Ok(body.into_vec())
    }

    async fn upload_attachment(
        &self,
        task_id: TaskId,
        file: &StagedFile,
    ) -> WorkflowResult<Attachment> {
        let form = multipart::Form::new()
            .text("original_filename", file.file_name.clone())
            .part("file", file_part(file)?);
        self.send(
            self.request(Method::POST, &format!("tasks/{}/attachments", task_id))
                .multipart(form),
        )
        .await
    }

    async fn delete_attachment(
        &self,
        task_id: TaskId,
        attachment_id: AttachmentId,
    ) -> WorkflowResult<()> {
        self.send_empty(self.request(
            Method::DELETE,
            &format!("tasks/{}/attachments/{}", task_id, attachment_id),
        ))
        .await
    }

    async fn list_employees(&self, page: u32) -> WorkflowResult<Page<Employee>> {
        self.send(
            self.request(Method::GET, "employees")
                .query(&self.page_query(page)),
        )
        .await
    }

    async fn list_departments(&self, page: u32) -> WorkflowResult<Page<Department>> {
        self.send(
            self.request(Method::GET, "departments")
                .query(&self.page_query(page)),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(trailing_slash: bool) -> HttpTaskApi {
        let config = ApiConfig {
            base_url: "https://hr.example.com/api/".into(),
            trailing_slash,
            ..Default::default()
        };
        HttpTaskApi::new(&config).unwrap()
    }

    #[test]
    fn test_url_joining() {
        assert_eq!(
            api(false).url("/tasks/4/status"),
            "https://hr.example.com/api/tasks/4/status"
        );
        assert_eq!(
            api(true).url("tasks/4/comments/9"),
            "https://hr.example.com/api/tasks/4/comments/9/"
        );
    }

    #[test]
    fn test_list_body_accepts_both_shapes() {
        let bare: ListBody<Department> =
            serde_json::from_str(r#"[{"id": 1, "name": "Finance"}]"#).unwrap();
        assert_eq!(bare.into_vec().len(), 1);

        let paged: ListBody<Department> = serde_json::from_str(
            r#"{"results": [{"id": 1, "name": "Finance"}, {"id": 2, "name": "Legal"}], "count": 2, "next": null}"#,
        )
        .unwrap();
        assert_eq!(paged.into_vec().len(), 2);
    }
}
