//! Basecamp 3 API client.
//!
//! One method per endpoint on top of a small request core: authenticated
//! requests against `https://3.basecampapi.com/{account_id}`, status-code
//! mapping into the shared error taxonomy, and link-header pagination
//! aggregation for the collection endpoints Basecamp pages.

use basecamp_core::{Error, Result};
use reqwest::header::{self, HeaderMap};
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};
use tracing::debug;

pub mod search;
pub mod update;

pub use search::BasecampSearch;
pub use update::{
    CardCreate, CardUpdate, DocumentUpdate, StepCreate, StepUpdate, TodoCreate, TodoUpdate,
};

/// How the client authenticates each request. OAuth bearer tokens are the
/// normal mode; basic credentials remain supported for legacy setups.
#[derive(Debug, Clone)]
pub enum AuthMode {
    Bearer(String),
    Basic { username: String, password: String },
}

/// One page of comments plus the pagination metadata Basecamp returns in
/// headers. Comments keep the per-page contract (the caller drives paging)
/// unlike the fully aggregated list endpoints.
#[derive(Debug)]
pub struct CommentsPage {
    pub comments: Value,
    pub total_count: Option<u64>,
    pub next_page: Option<u32>,
}

/// Filters for the cross-project recordings feed.
#[derive(Debug, Clone)]
pub struct RecordingsQuery {
    /// Recording type, e.g. `Todo`, `Message`, `Kanban::Card`.
    pub kind: String,
    /// Comma-separated project ids; all visible projects when unset.
    pub bucket: Option<String>,
    pub status: String,
    pub sort: String,
    pub direction: String,
    pub page: u32,
}

impl RecordingsQuery {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            bucket: None,
            status: "active".to_string(),
            sort: "created_at".to_string(),
            direction: "desc".to_string(),
            page: 1,
        }
    }
}

pub struct BasecampClient {
    http: reqwest::Client,
    base_url: String,
    user_agent: String,
    auth: AuthMode,
}

impl BasecampClient {
    pub fn new(account_id: &str, user_agent: &str, auth: AuthMode) -> Self {
        Self::with_base_url(
            format!("https://3.basecampapi.com/{account_id}"),
            user_agent,
            auth,
        )
    }

    /// Point the client at an alternate base URL (tests, proxies).
    pub fn with_base_url(base_url: impl Into<String>, user_agent: &str, auth: AuthMode) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            user_agent: user_agent.to_string(),
            auth,
        }
    }

    // ----- request core -----

    async fn send(
        &self,
        method: Method,
        endpoint: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<reqwest::Response> {
        let url = format!("{}/{}", self.base_url, endpoint);
        debug!(%method, endpoint, "basecamp api request");

        let mut request = self
            .http
            .request(method, &url)
            .header(header::USER_AGENT, &self.user_agent);
        request = match &self.auth {
            AuthMode::Bearer(token) => request.bearer_auth(token),
            AuthMode::Basic { username, password } => request.basic_auth(username, Some(password)),
        };
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        Ok(request.send().await?)
    }

    async fn api_failure(response: reqwest::Response) -> Error {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Error::api(status, body)
    }

    async fn expect_json(
        &self,
        method: Method,
        endpoint: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
        expected: StatusCode,
    ) -> Result<Value> {
        let response = self.send(method, endpoint, query, body).await?;
        if response.status() != expected {
            return Err(Self::api_failure(response).await);
        }
        Ok(response.json().await?)
    }

    async fn expect_no_content(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&Value>,
    ) -> Result<()> {
        let response = self.send(method, endpoint, &[], body).await?;
        if response.status() != StatusCode::NO_CONTENT {
            return Err(Self::api_failure(response).await);
        }
        Ok(())
    }

    async fn get_json(&self, endpoint: &str, query: &[(&str, String)]) -> Result<Value> {
        self.expect_json(Method::GET, endpoint, query, None, StatusCode::OK)
            .await
    }

    async fn post_created(&self, endpoint: &str, body: Option<&Value>) -> Result<Value> {
        self.expect_json(Method::POST, endpoint, &[], body, StatusCode::CREATED)
            .await
    }

    async fn put_json(&self, endpoint: &str, body: &Value) -> Result<Value> {
        self.expect_json(Method::PUT, endpoint, &[], Some(body), StatusCode::OK)
            .await
    }

    /// Aggregate every page of a collection endpoint into one buffer.
    ///
    /// Basecamp uses geared pagination (later pages return progressively more
    /// items), so the `Link: rel="next"` header is the authoritative
    /// continuation signal; an empty page stops the loop as a safety net
    /// against a missing or malformed header. Any non-success page aborts the
    /// whole aggregation; partial buffers are never returned.
    pub async fn get_paginated(
        &self,
        endpoint: &str,
        extra_query: &[(&str, String)],
    ) -> Result<Vec<Value>> {
        let mut items = Vec::new();
        let mut page: u32 = 1;

        loop {
            let mut query: Vec<(&str, String)> = extra_query.to_vec();
            query.push(("page", page.to_string()));

            let response = self.send(Method::GET, endpoint, &query, None).await?;
            if !response.status().is_success() {
                return Err(Self::api_failure(response).await);
            }

            let has_next = has_next_link(response.headers());
            let body: Value = response.json().await?;
            let page_items = body.as_array().cloned().unwrap_or_default();
            let page_was_empty = page_items.is_empty();
            items.extend(page_items);

            if page_was_empty || !has_next {
                return Ok(items);
            }
            page += 1;
        }
    }

    // ----- dock discovery -----

    /// Find the dock entry named `tool` on a project, fetching the project
    /// first. A missing entry is a [`Error::Discovery`], never an empty
    /// result: "this project has no message board" must not read like a 404.
    async fn dock_entry(&self, project_id: u64, tool: &str) -> Result<Value> {
        let project = self.get_project(project_id).await?;
        dock_lookup(&project, project_id, tool)
    }

    async fn dock_entry_id(&self, project_id: u64, tool: &str) -> Result<u64> {
        let entry = self.dock_entry(project_id, tool).await?;
        entry
            .get("id")
            .and_then(Value::as_u64)
            .ok_or_else(|| Error::Discovery {
                project_id,
                tool: tool.to_string(),
            })
    }

    // ----- projects -----

    pub async fn get_projects(&self) -> Result<Vec<Value>> {
        self.get_paginated("projects.json", &[]).await
    }

    pub async fn get_project(&self, project_id: u64) -> Result<Value> {
        self.get_json(&format!("projects/{project_id}.json"), &[])
            .await
    }

    // ----- todosets, todolists, todos -----

    pub async fn get_todoset(&self, project_id: u64) -> Result<Value> {
        self.dock_entry(project_id, "todoset").await
    }

    pub async fn get_todolists(&self, project_id: u64) -> Result<Vec<Value>> {
        let todoset_id = self.dock_entry_id(project_id, "todoset").await?;
        self.get_paginated(
            &format!("buckets/{project_id}/todosets/{todoset_id}/todolists.json"),
            &[],
        )
        .await
    }

    pub async fn get_todolist(&self, project_id: u64, todolist_id: u64) -> Result<Value> {
        self.get_json(&format!("buckets/{project_id}/todolists/{todolist_id}.json"), &[])
            .await
    }

    pub async fn get_todos(&self, project_id: u64, todolist_id: u64) -> Result<Vec<Value>> {
        self.get_paginated(
            &format!("buckets/{project_id}/todolists/{todolist_id}/todos.json"),
            &[],
        )
        .await
    }

    pub async fn get_todo(&self, project_id: u64, todo_id: u64) -> Result<Value> {
        self.get_json(&format!("buckets/{project_id}/todos/{todo_id}.json"), &[])
            .await
    }

    pub async fn create_todo(
        &self,
        project_id: u64,
        todolist_id: u64,
        todo: &TodoCreate,
    ) -> Result<Value> {
        let body = serde_json::to_value(todo)?;
        self.post_created(
            &format!("buckets/{project_id}/todolists/{todolist_id}/todos.json"),
            Some(&body),
        )
        .await
    }

    pub async fn update_todo(
        &self,
        project_id: u64,
        todo_id: u64,
        update: &TodoUpdate,
    ) -> Result<Value> {
        if update.is_empty() {
            return Err(Error::Validation(
                "no fields provided to update".to_string(),
            ));
        }
        let body = serde_json::to_value(update)?;
        self.put_json(&format!("buckets/{project_id}/todos/{todo_id}.json"), &body)
            .await
    }

    pub async fn delete_todo(&self, project_id: u64, todo_id: u64) -> Result<()> {
        self.expect_no_content(
            Method::DELETE,
            &format!("buckets/{project_id}/todos/{todo_id}.json"),
            None,
        )
        .await
    }

    pub async fn complete_todo(&self, project_id: u64, todo_id: u64) -> Result<Value> {
        self.post_created(
            &format!("buckets/{project_id}/todos/{todo_id}/completion.json"),
            None,
        )
        .await
    }

    pub async fn uncomplete_todo(&self, project_id: u64, todo_id: u64) -> Result<()> {
        self.expect_no_content(
            Method::DELETE,
            &format!("buckets/{project_id}/todos/{todo_id}/completion.json"),
            None,
        )
        .await
    }

    // ----- people -----

    pub async fn get_people(&self) -> Result<Vec<Value>> {
        self.get_paginated("people.json", &[]).await
    }

    // ----- campfires -----

    pub async fn get_campfires(&self, project_id: u64) -> Result<Value> {
        self.get_json(&format!("buckets/{project_id}/chats.json"), &[])
            .await
    }

    pub async fn get_campfire_lines(&self, project_id: u64, campfire_id: u64) -> Result<Value> {
        self.get_json(
            &format!("buckets/{project_id}/chats/{campfire_id}/lines.json"),
            &[],
        )
        .await
    }

    pub async fn create_campfire_line(
        &self,
        project_id: u64,
        campfire_id: u64,
        content: &str,
    ) -> Result<Value> {
        self.post_created(
            &format!("buckets/{project_id}/chats/{campfire_id}/lines.json"),
            Some(&json!({ "content": content })),
        )
        .await
    }

    // ----- message boards and messages -----

    pub async fn get_message_board(&self, project_id: u64) -> Result<Value> {
        let board_id = self.dock_entry_id(project_id, "message_board").await?;
        self.get_json(
            &format!("buckets/{project_id}/message_boards/{board_id}.json"),
            &[],
        )
        .await
    }

    pub async fn get_messages(
        &self,
        project_id: u64,
        message_board_id: Option<u64>,
    ) -> Result<Vec<Value>> {
        let board_id = match message_board_id {
            Some(id) => id,
            None => self.dock_entry_id(project_id, "message_board").await?,
        };
        self.get_paginated(
            &format!("buckets/{project_id}/message_boards/{board_id}/messages.json"),
            &[],
        )
        .await
    }

    pub async fn get_message(&self, project_id: u64, message_id: u64) -> Result<Value> {
        self.get_json(&format!("buckets/{project_id}/messages/{message_id}.json"), &[])
            .await
    }

    pub async fn create_message(
        &self,
        project_id: u64,
        message_board_id: Option<u64>,
        subject: &str,
        content: &str,
    ) -> Result<Value> {
        let board_id = match message_board_id {
            Some(id) => id,
            None => self.dock_entry_id(project_id, "message_board").await?,
        };
        self.post_created(
            &format!("buckets/{project_id}/message_boards/{board_id}/messages.json"),
            Some(&json!({
                "subject": subject,
                "content": content,
                "status": "active"
            })),
        )
        .await
    }

    // ----- inbox (email forwards) -----

    pub async fn get_inbox(&self, project_id: u64) -> Result<Value> {
        let inbox_id = self.dock_entry_id(project_id, "inbox").await?;
        self.get_json(&format!("buckets/{project_id}/inboxes/{inbox_id}.json"), &[])
            .await
    }

    pub async fn get_forwards(&self, project_id: u64, inbox_id: Option<u64>) -> Result<Vec<Value>> {
        let inbox_id = match inbox_id {
            Some(id) => id,
            None => self.dock_entry_id(project_id, "inbox").await?,
        };
        self.get_paginated(
            &format!("buckets/{project_id}/inboxes/{inbox_id}/forwards.json"),
            &[],
        )
        .await
    }

    pub async fn get_forward(&self, project_id: u64, forward_id: u64) -> Result<Value> {
        self.get_json(
            &format!("buckets/{project_id}/inbox_forwards/{forward_id}.json"),
            &[],
        )
        .await
    }

    pub async fn get_inbox_replies(&self, project_id: u64, forward_id: u64) -> Result<Vec<Value>> {
        self.get_paginated(
            &format!("buckets/{project_id}/inbox_forwards/{forward_id}/replies.json"),
            &[],
        )
        .await
    }

    pub async fn get_inbox_reply(
        &self,
        project_id: u64,
        forward_id: u64,
        reply_id: u64,
    ) -> Result<Value> {
        self.get_json(
            &format!("buckets/{project_id}/inbox_forwards/{forward_id}/replies/{reply_id}.json"),
            &[],
        )
        .await
    }

    pub async fn trash_forward(&self, project_id: u64, forward_id: u64) -> Result<()> {
        self.expect_no_content(
            Method::PUT,
            &format!("buckets/{project_id}/recordings/{forward_id}/status/trashed.json"),
            None,
        )
        .await
    }

    // ----- schedules -----

    pub async fn get_schedule(&self, project_id: u64) -> Result<Value> {
        let schedule_id = self.dock_entry_id(project_id, "schedule").await?;
        self.get_json(
            &format!("buckets/{project_id}/schedules/{schedule_id}.json"),
            &[],
        )
        .await
    }

    pub async fn get_schedule_entries(&self, project_id: u64) -> Result<Vec<Value>> {
        let schedule_id = self.dock_entry_id(project_id, "schedule").await?;
        self.get_paginated(
            &format!("buckets/{project_id}/schedules/{schedule_id}/entries.json"),
            &[],
        )
        .await
    }

    pub async fn get_upcoming_schedule(
        &self,
        window_starts_on: &str,
        window_ends_on: &str,
    ) -> Result<Value> {
        self.get_json(
            "reports/schedules/upcoming.json",
            &[
                ("window_starts_on", window_starts_on.to_string()),
                ("window_ends_on", window_ends_on.to_string()),
            ],
        )
        .await
    }

    // ----- comments -----

    pub async fn get_comments(
        &self,
        project_id: u64,
        recording_id: u64,
        page: u32,
    ) -> Result<CommentsPage> {
        if page < 1 {
            return Err(Error::Validation("page must be >= 1".to_string()));
        }
        let endpoint = format!("buckets/{project_id}/recordings/{recording_id}/comments.json");
        let response = self
            .send(Method::GET, &endpoint, &[("page", page.to_string())], None)
            .await?;
        if response.status() != StatusCode::OK {
            return Err(Self::api_failure(response).await);
        }

        let total_count = response
            .headers()
            .get("X-Total-Count")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse().ok());
        let next_page = response
            .headers()
            .get(header::LINK)
            .and_then(|value| value.to_str().ok())
            .and_then(next_page_number);

        Ok(CommentsPage {
            comments: response.json().await?,
            total_count,
            next_page,
        })
    }

    pub async fn create_comment(
        &self,
        project_id: u64,
        recording_id: u64,
        content: &str,
    ) -> Result<Value> {
        self.post_created(
            &format!("buckets/{project_id}/recordings/{recording_id}/comments.json"),
            Some(&json!({ "content": content })),
        )
        .await
    }

    pub async fn get_comment(&self, project_id: u64, comment_id: u64) -> Result<Value> {
        self.get_json(&format!("buckets/{project_id}/comments/{comment_id}.json"), &[])
            .await
    }

    pub async fn update_comment(
        &self,
        project_id: u64,
        comment_id: u64,
        content: &str,
    ) -> Result<Value> {
        self.put_json(
            &format!("buckets/{project_id}/comments/{comment_id}.json"),
            &json!({ "content": content }),
        )
        .await
    }

    pub async fn delete_comment(&self, project_id: u64, comment_id: u64) -> Result<()> {
        self.expect_no_content(
            Method::DELETE,
            &format!("buckets/{project_id}/comments/{comment_id}.json"),
            None,
        )
        .await
    }

    // ----- daily check-ins -----

    pub async fn get_daily_check_ins(&self, project_id: u64, page: u32) -> Result<Value> {
        let questionnaire_id = self.dock_entry_id(project_id, "questionnaire").await?;
        self.get_json(
            &format!("buckets/{project_id}/questionnaires/{questionnaire_id}/questions.json"),
            &[("page", page.to_string())],
        )
        .await
    }

    pub async fn get_question_answers(
        &self,
        project_id: u64,
        question_id: u64,
        page: u32,
    ) -> Result<Value> {
        self.get_json(
            &format!("buckets/{project_id}/questions/{question_id}/answers.json"),
            &[("page", page.to_string())],
        )
        .await
    }

    // ----- card tables -----

    /// Card tables live in the dock under either of two historical names.
    pub async fn get_card_tables(&self, project_id: u64) -> Result<Vec<Value>> {
        let project = self.get_project(project_id).await?;
        let dock = project
            .get("dock")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        Ok(dock
            .into_iter()
            .filter(|item| {
                matches!(
                    item.get("name").and_then(Value::as_str),
                    Some("kanban_board") | Some("card_table")
                )
            })
            .collect())
    }

    pub async fn get_card_table(&self, project_id: u64) -> Result<Value> {
        self.get_card_tables(project_id)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::Discovery {
                project_id,
                tool: "card_table".to_string(),
            })
    }

    /// A 204 here means an empty card table, not an error.
    pub async fn get_card_table_details(
        &self,
        project_id: u64,
        card_table_id: u64,
    ) -> Result<Value> {
        let response = self
            .send(
                Method::GET,
                &format!("buckets/{project_id}/card_tables/{card_table_id}.json"),
                &[],
                None,
            )
            .await?;
        match response.status() {
            StatusCode::OK => Ok(response.json().await?),
            StatusCode::NO_CONTENT => Ok(json!({
                "lists": [],
                "id": card_table_id,
                "status": "empty"
            })),
            _ => Err(Self::api_failure(response).await),
        }
    }

    pub async fn get_columns(&self, project_id: u64, card_table_id: u64) -> Result<Value> {
        let details = self.get_card_table_details(project_id, card_table_id).await?;
        Ok(details.get("lists").cloned().unwrap_or_else(|| json!([])))
    }

    pub async fn get_column(&self, project_id: u64, column_id: u64) -> Result<Value> {
        self.get_json(
            &format!("buckets/{project_id}/card_tables/columns/{column_id}.json"),
            &[],
        )
        .await
    }

    pub async fn create_column(
        &self,
        project_id: u64,
        card_table_id: u64,
        title: &str,
    ) -> Result<Value> {
        self.post_created(
            &format!("buckets/{project_id}/card_tables/{card_table_id}/columns.json"),
            Some(&json!({ "title": title })),
        )
        .await
    }

    pub async fn update_column(
        &self,
        project_id: u64,
        column_id: u64,
        title: &str,
    ) -> Result<Value> {
        self.put_json(
            &format!("buckets/{project_id}/card_tables/columns/{column_id}.json"),
            &json!({ "title": title }),
        )
        .await
    }

    pub async fn move_column(
        &self,
        project_id: u64,
        card_table_id: u64,
        column_id: u64,
        position: u32,
    ) -> Result<()> {
        self.expect_no_content(
            Method::POST,
            &format!("buckets/{project_id}/card_tables/{card_table_id}/moves.json"),
            Some(&json!({
                "source_id": column_id,
                "target_id": card_table_id,
                "position": position
            })),
        )
        .await
    }

    pub async fn update_column_color(
        &self,
        project_id: u64,
        column_id: u64,
        color: &str,
    ) -> Result<Value> {
        self.expect_json(
            Method::PATCH,
            &format!("buckets/{project_id}/card_tables/columns/{column_id}/color.json"),
            &[],
            Some(&json!({ "color": color })),
            StatusCode::OK,
        )
        .await
    }

    pub async fn put_column_on_hold(&self, project_id: u64, column_id: u64) -> Result<()> {
        self.expect_no_content(
            Method::POST,
            &format!("buckets/{project_id}/card_tables/columns/{column_id}/on_hold.json"),
            None,
        )
        .await
    }

    pub async fn remove_column_hold(&self, project_id: u64, column_id: u64) -> Result<()> {
        self.expect_no_content(
            Method::DELETE,
            &format!("buckets/{project_id}/card_tables/columns/{column_id}/on_hold.json"),
            None,
        )
        .await
    }

    pub async fn watch_column(&self, project_id: u64, column_id: u64) -> Result<()> {
        self.expect_no_content(
            Method::POST,
            &format!("buckets/{project_id}/card_tables/lists/{column_id}/subscription.json"),
            None,
        )
        .await
    }

    pub async fn unwatch_column(&self, project_id: u64, column_id: u64) -> Result<()> {
        self.expect_no_content(
            Method::DELETE,
            &format!("buckets/{project_id}/card_tables/lists/{column_id}/subscription.json"),
            None,
        )
        .await
    }

    pub async fn get_cards(&self, project_id: u64, column_id: u64) -> Result<Value> {
        self.get_json(
            &format!("buckets/{project_id}/card_tables/lists/{column_id}/cards.json"),
            &[],
        )
        .await
    }

    pub async fn get_card(&self, project_id: u64, card_id: u64) -> Result<Value> {
        self.get_json(
            &format!("buckets/{project_id}/card_tables/cards/{card_id}.json"),
            &[],
        )
        .await
    }

    pub async fn create_card(
        &self,
        project_id: u64,
        column_id: u64,
        card: &CardCreate,
    ) -> Result<Value> {
        let body = serde_json::to_value(card)?;
        self.post_created(
            &format!("buckets/{project_id}/card_tables/lists/{column_id}/cards.json"),
            Some(&body),
        )
        .await
    }

    pub async fn update_card(
        &self,
        project_id: u64,
        card_id: u64,
        update: &CardUpdate,
    ) -> Result<Value> {
        if update.is_empty() {
            return Err(Error::Validation(
                "no fields provided to update".to_string(),
            ));
        }
        let body = serde_json::to_value(update)?;
        self.put_json(
            &format!("buckets/{project_id}/card_tables/cards/{card_id}.json"),
            &body,
        )
        .await
    }

    pub async fn move_card(&self, project_id: u64, card_id: u64, column_id: u64) -> Result<()> {
        self.expect_no_content(
            Method::POST,
            &format!("buckets/{project_id}/card_tables/cards/{card_id}/moves.json"),
            Some(&json!({ "column_id": column_id })),
        )
        .await
    }

    pub async fn complete_card(&self, project_id: u64, card_id: u64) -> Result<Value> {
        self.post_created(
            &format!("buckets/{project_id}/todos/{card_id}/completion.json"),
            None,
        )
        .await
    }

    pub async fn uncomplete_card(&self, project_id: u64, card_id: u64) -> Result<()> {
        self.expect_no_content(
            Method::DELETE,
            &format!("buckets/{project_id}/todos/{card_id}/completion.json"),
            None,
        )
        .await
    }

    // ----- card steps -----

    pub async fn get_card_steps(&self, project_id: u64, card_id: u64) -> Result<Value> {
        let card = self.get_card(project_id, card_id).await?;
        Ok(card.get("steps").cloned().unwrap_or_else(|| json!([])))
    }

    pub async fn create_card_step(
        &self,
        project_id: u64,
        card_id: u64,
        step: &StepCreate,
    ) -> Result<Value> {
        let body = serde_json::to_value(step)?;
        self.post_created(
            &format!("buckets/{project_id}/card_tables/cards/{card_id}/steps.json"),
            Some(&body),
        )
        .await
    }

    pub async fn get_card_step(&self, project_id: u64, step_id: u64) -> Result<Value> {
        self.get_json(
            &format!("buckets/{project_id}/card_tables/steps/{step_id}.json"),
            &[],
        )
        .await
    }

    pub async fn update_card_step(
        &self,
        project_id: u64,
        step_id: u64,
        update: &StepUpdate,
    ) -> Result<Value> {
        if update.is_empty() {
            return Err(Error::Validation(
                "no fields provided to update".to_string(),
            ));
        }
        let body = serde_json::to_value(update)?;
        self.put_json(
            &format!("buckets/{project_id}/card_tables/steps/{step_id}.json"),
            &body,
        )
        .await
    }

    pub async fn delete_card_step(&self, project_id: u64, step_id: u64) -> Result<()> {
        self.expect_no_content(
            Method::DELETE,
            &format!("buckets/{project_id}/card_tables/steps/{step_id}.json"),
            None,
        )
        .await
    }

    pub async fn complete_card_step(&self, project_id: u64, step_id: u64) -> Result<Value> {
        self.post_created(
            &format!("buckets/{project_id}/todos/{step_id}/completion.json"),
            None,
        )
        .await
    }

    pub async fn uncomplete_card_step(&self, project_id: u64, step_id: u64) -> Result<()> {
        self.expect_no_content(
            Method::DELETE,
            &format!("buckets/{project_id}/todos/{step_id}/completion.json"),
            None,
        )
        .await
    }

    // ----- documents and vaults -----

    pub async fn get_documents(&self, project_id: u64, vault_id: u64) -> Result<Value> {
        self.get_json(
            &format!("buckets/{project_id}/vaults/{vault_id}/documents.json"),
            &[],
        )
        .await
    }

    pub async fn get_document(&self, project_id: u64, document_id: u64) -> Result<Value> {
        self.get_json(&format!("buckets/{project_id}/documents/{document_id}.json"), &[])
            .await
    }

    pub async fn create_document(
        &self,
        project_id: u64,
        vault_id: u64,
        title: &str,
        content: &str,
    ) -> Result<Value> {
        self.post_created(
            &format!("buckets/{project_id}/vaults/{vault_id}/documents.json"),
            Some(&json!({
                "title": title,
                "content": content,
                "status": "active"
            })),
        )
        .await
    }

    pub async fn update_document(
        &self,
        project_id: u64,
        document_id: u64,
        update: &DocumentUpdate,
    ) -> Result<Value> {
        if update.is_empty() {
            return Err(Error::Validation(
                "no fields provided to update".to_string(),
            ));
        }
        let body = serde_json::to_value(update)?;
        self.put_json(
            &format!("buckets/{project_id}/documents/{document_id}.json"),
            &body,
        )
        .await
    }

    pub async fn trash_document(&self, project_id: u64, document_id: u64) -> Result<()> {
        self.expect_no_content(
            Method::PUT,
            &format!("buckets/{project_id}/recordings/{document_id}/status/trashed.json"),
            None,
        )
        .await
    }

    // ----- uploads -----

    pub async fn get_uploads(&self, project_id: u64, vault_id: Option<u64>) -> Result<Value> {
        let endpoint = match vault_id {
            Some(vault_id) => format!("buckets/{project_id}/vaults/{vault_id}/uploads.json"),
            None => format!("buckets/{project_id}/uploads.json"),
        };
        self.get_json(&endpoint, &[]).await
    }

    pub async fn get_upload(&self, project_id: u64, upload_id: u64) -> Result<Value> {
        self.get_json(&format!("buckets/{project_id}/uploads/{upload_id}.json"), &[])
            .await
    }

    /// Upload raw bytes and return the attachable sgid Basecamp hands back.
    pub async fn create_attachment(
        &self,
        data: Vec<u8>,
        name: &str,
        content_type: &str,
    ) -> Result<Value> {
        let url = format!("{}/attachments.json", self.base_url);
        let mut request = self
            .http
            .post(&url)
            .query(&[("name", name)])
            .header(header::USER_AGENT, &self.user_agent)
            .header(header::CONTENT_TYPE, content_type)
            .header(header::CONTENT_LENGTH, data.len());
        request = match &self.auth {
            AuthMode::Bearer(token) => request.bearer_auth(token),
            AuthMode::Basic { username, password } => request.basic_auth(username, Some(password)),
        };

        let response = request.body(data).send().await?;
        if response.status() != StatusCode::CREATED {
            return Err(Self::api_failure(response).await);
        }
        Ok(response.json().await?)
    }

    // ----- events, recordings, webhooks -----

    pub async fn get_events(
        &self,
        project_id: u64,
        recording_id: u64,
        page: u32,
    ) -> Result<Value> {
        self.get_json(
            &format!("buckets/{project_id}/recordings/{recording_id}/events.json"),
            &[("page", page.to_string())],
        )
        .await
    }

    pub async fn get_recordings(&self, query: &RecordingsQuery) -> Result<Value> {
        let mut params = vec![
            ("type", query.kind.clone()),
            ("status", query.status.clone()),
            ("sort", query.sort.clone()),
            ("direction", query.direction.clone()),
            ("page", query.page.to_string()),
        ];
        if let Some(bucket) = &query.bucket {
            params.push(("bucket", bucket.clone()));
        }
        self.get_json("projects/recordings.json", &params).await
    }

    pub async fn get_webhooks(&self, project_id: u64) -> Result<Value> {
        self.get_json(&format!("buckets/{project_id}/webhooks.json"), &[])
            .await
    }

    pub async fn create_webhook(
        &self,
        project_id: u64,
        payload_url: &str,
        types: Option<Vec<String>>,
    ) -> Result<Value> {
        let mut body = json!({ "payload_url": payload_url });
        if let Some(types) = types {
            body["types"] = json!(types);
        }
        self.post_created(&format!("buckets/{project_id}/webhooks.json"), Some(&body))
            .await
    }

    pub async fn delete_webhook(&self, project_id: u64, webhook_id: u64) -> Result<()> {
        self.expect_no_content(
            Method::DELETE,
            &format!("buckets/{project_id}/webhooks/{webhook_id}.json"),
            None,
        )
        .await
    }

    // ----- timelines and reports -----

    pub async fn get_timeline(&self, page: u32) -> Result<Value> {
        self.get_json("reports/progress.json", &[("page", page.to_string())])
            .await
    }

    pub async fn get_project_timeline(&self, project_id: u64, page: u32) -> Result<Value> {
        self.get_json(
            &format!("projects/{project_id}/timeline.json"),
            &[("page", page.to_string())],
        )
        .await
    }

    pub async fn get_person_timeline(&self, person_id: u64, page: u32) -> Result<Value> {
        self.get_json(
            &format!("reports/users/progress/{person_id}.json"),
            &[("page", page.to_string())],
        )
        .await
    }

    pub async fn get_todo_assignees(&self) -> Result<Value> {
        self.get_json("reports/todos/assigned.json", &[]).await
    }

    pub async fn get_person_todos(&self, person_id: u64, group_by: &str) -> Result<Value> {
        self.get_json(
            &format!("reports/todos/assigned/{person_id}.json"),
            &[("group_by", group_by.to_string())],
        )
        .await
    }

    pub async fn get_overdue_todos(&self) -> Result<Value> {
        self.get_json("reports/todos/overdue.json", &[]).await
    }
}

/// Continuation is signalled by a `rel="next"` link relation; page-size
/// heuristics are useless under geared pagination.
fn has_next_link(headers: &HeaderMap) -> bool {
    headers
        .get(header::LINK)
        .and_then(|value| value.to_str().ok())
        .map(|link| link.split(',').any(|part| part.contains(r#"rel="next""#)))
        .unwrap_or(false)
}

/// Page number of the `rel="next"` link, for endpoints that report paging
/// metadata to the caller instead of aggregating.
fn next_page_number(link: &str) -> Option<u32> {
    let next = link.split(',').find(|part| part.contains(r#"rel="next""#))?;
    // Anchor on the delimiter so `per_page=` never matches.
    let start = next
        .find("?page=")
        .or_else(|| next.find("&page="))?
        + "?page=".len();
    let digits: String = next[start..].chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok()
}

/// Scan a project's dock for the entry named `tool`.
pub fn dock_lookup(project: &Value, project_id: u64, tool: &str) -> Result<Value> {
    project
        .get("dock")
        .and_then(Value::as_array)
        .and_then(|dock| {
            dock.iter()
                .find(|item| item.get("name").and_then(Value::as_str) == Some(tool))
        })
        .cloned()
        .ok_or_else(|| Error::Discovery {
            project_id,
            tool: tool.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use basecamp_core::Error;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::{
        dock_lookup, has_next_link, next_page_number, AuthMode, BasecampClient, TodoUpdate,
    };

    fn client(server: &MockServer) -> BasecampClient {
        BasecampClient::with_base_url(
            server.uri(),
            "Basecamp MCP tests (dev@example.com)",
            AuthMode::Bearer("test-token".to_string()),
        )
    }

    fn page_of(size: usize, offset: u64) -> serde_json::Value {
        let items: Vec<serde_json::Value> = (0..size)
            .map(|i| json!({ "id": offset + i as u64, "title": format!("todo {}", offset + i as u64) }))
            .collect();
        json!(items)
    }

    #[tokio::test]
    async fn pagination_follows_next_links_in_page_order() {
        let server = MockServer::start().await;
        let endpoint = "/buckets/1/todolists/2/todos.json";
        let next = format!(r#"<{}{}?page=2>; rel="next""#, server.uri(), endpoint);

        Mock::given(method("GET"))
            .and(path(endpoint))
            .and(query_param("page", "1"))
            .and(header("Authorization", "Bearer test-token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(page_of(15, 0))
                    .insert_header("Link", next.as_str()),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(endpoint))
            .and(query_param("page", "2"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(page_of(30, 15))
                    .insert_header("Link", r#"<https://example.test?page=3>; rel="next""#),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(endpoint))
            .and(query_param("page", "3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page_of(5, 45)))
            .expect(1)
            .mount(&server)
            .await;

        let todos = client(&server).get_todos(1, 2).await.unwrap();
        assert_eq!(todos.len(), 50);
        // Server-returned order is preserved across page boundaries.
        for (index, todo) in todos.iter().enumerate() {
            assert_eq!(todo["id"], index as u64);
        }
    }

    #[tokio::test]
    async fn empty_first_page_stops_even_with_spurious_next_link() {
        let server = MockServer::start().await;
        let endpoint = "/buckets/1/todolists/2/todos.json";

        Mock::given(method("GET"))
            .and(path(endpoint))
            .and(query_param("page", "1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([]))
                    .insert_header("Link", r#"<https://example.test?page=2>; rel="next""#),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(endpoint))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(0)
            .mount(&server)
            .await;

        let todos = client(&server).get_todos(1, 2).await.unwrap();
        assert!(todos.is_empty());
    }

    #[tokio::test]
    async fn mid_aggregation_failure_discards_partial_results() {
        let server = MockServer::start().await;
        let endpoint = "/buckets/1/todolists/2/todos.json";
        let next = format!(r#"<{}{}?page=2>; rel="next""#, server.uri(), endpoint);

        Mock::given(method("GET"))
            .and(path(endpoint))
            .and(query_param("page", "1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(page_of(15, 0))
                    .insert_header("Link", next.as_str()),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(endpoint))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
            .mount(&server)
            .await;

        let err = client(&server).get_todos(1, 2).await.unwrap_err();
        match err {
            Error::Api { status, .. } => assert_eq!(status, 500),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn update_body_contains_exactly_the_set_fields() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/buckets/1/todos/9.json"))
            .and(body_json(json!({ "content": "reworded" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 9 })))
            .expect(1)
            .mount(&server)
            .await;

        let update = TodoUpdate {
            content: Some("reworded".to_string()),
            ..TodoUpdate::default()
        };
        client(&server).update_todo(1, 9, &update).await.unwrap();
    }

    #[tokio::test]
    async fn empty_update_fails_before_any_network_call() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = client(&server)
            .update_todo(1, 9, &TodoUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn comments_page_below_one_is_rejected_without_network() {
        let server = MockServer::start().await;
        let err = client(&server).get_comments(1, 2, 0).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn comments_carry_pagination_metadata() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/buckets/1/recordings/2/comments.json"))
            .and(query_param("page", "1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([{ "id": 1, "content": "hi" }]))
                    .insert_header("X-Total-Count", "45")
                    .insert_header(
                        "Link",
                        r#"<https://example.test/comments.json?page=2>; rel="next""#,
                    ),
            )
            .mount(&server)
            .await;

        let page = client(&server).get_comments(1, 2, 1).await.unwrap();
        assert_eq!(page.total_count, Some(45));
        assert_eq!(page.next_page, Some(2));
        assert_eq!(page.comments[0]["id"], 1);
    }

    #[tokio::test]
    async fn dock_miss_is_discovery_failure_not_a_404() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/projects/7.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 7,
                "dock": [
                    { "id": 100, "name": "todoset" },
                    { "id": 101, "name": "chat" }
                ]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/buckets/7/todos/999.json"))
            .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
            .mount(&server)
            .await;

        let c = client(&server);
        let discovery = c.get_message_board(7).await.unwrap_err();
        match discovery {
            Error::Discovery { project_id, tool } => {
                assert_eq!(project_id, 7);
                assert_eq!(tool, "message_board");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let not_found = c.get_todo(7, 999).await.unwrap_err();
        assert!(matches!(not_found, Error::Api { status: 404, .. }));
    }

    #[tokio::test]
    async fn expired_token_mid_call_maps_to_typed_flag() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/projects/1.json"))
            .respond_with(
                ResponseTemplate::new(401).set_body_string(r#"{"error":"OAuth token expired"}"#),
            )
            .mount(&server)
            .await;

        let err = client(&server).get_project(1).await.unwrap_err();
        match err {
            Error::Api {
                status,
                token_expired,
                ..
            } => {
                assert_eq!(status, 401);
                assert!(token_expired);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_card_table_reads_as_empty_structure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/buckets/1/card_tables/5.json"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let details = client(&server).get_card_table_details(1, 5).await.unwrap();
        assert_eq!(details["status"], "empty");
        assert_eq!(details["lists"], json!([]));
    }

    #[test]
    fn link_header_parsing_handles_multiple_relations() {
        let link = r#"<https://x.test/a.json?page=1>; rel="prev", <https://x.test/a.json?page=3>; rel="next""#;
        assert_eq!(next_page_number(link), Some(3));
        assert_eq!(next_page_number(r#"<https://x.test?page=1>; rel="prev""#), None);
    }

    #[test]
    fn link_header_page_param_is_not_confused_with_per_page() {
        let link = r#"<https://x.test/a.json?per_page=50&page=2>; rel="next""#;
        assert_eq!(next_page_number(link), Some(2));
        assert_eq!(
            next_page_number(r#"<https://x.test/a.json?per_page=50>; rel="next""#),
            None
        );
    }

    #[test]
    fn has_next_link_requires_the_next_relation() {
        let mut headers = reqwest::header::HeaderMap::new();
        assert!(!has_next_link(&headers));

        headers.insert(
            reqwest::header::LINK,
            r#"<https://x.test?page=2>; rel="prev""#.parse().unwrap(),
        );
        assert!(!has_next_link(&headers));

        headers.insert(
            reqwest::header::LINK,
            r#"<https://x.test?page=2>; rel="next""#.parse().unwrap(),
        );
        assert!(has_next_link(&headers));
    }

    #[test]
    fn dock_lookup_finds_entries_by_name() {
        let project = json!({
            "id": 3,
            "dock": [
                { "id": 10, "name": "todoset" },
                { "id": 11, "name": "message_board" }
            ]
        });
        let entry = dock_lookup(&project, 3, "message_board").unwrap();
        assert_eq!(entry["id"], 11);

        let missing = dock_lookup(&project, 3, "schedule").unwrap_err();
        assert!(matches!(missing, Error::Discovery { .. }));
    }
}
