//! MCP runtime for Basecamp: JSON-RPC over stdio, the tool catalog, and the
//! dispatch path from tool arguments down to the API client.
//!
//! One JSON-RPC message per line on stdin, one response per line on stdout.
//! Stdout is reserved for the protocol; all logging goes to stderr via
//! `tracing`. Every tool result is a JSON envelope with a `status`
//! discriminator so callers never have to sniff payload shapes.

use basecamp_client::{
    AuthMode, BasecampClient, BasecampSearch, CardCreate, CardUpdate, DocumentUpdate,
    RecordingsQuery, StepCreate, StepUpdate, TodoCreate, TodoUpdate,
};
use basecamp_core::{compact, AuthManager, Error, OAuthConfig, TokenStore};
use serde_json::{json, Map, Value};
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, error, info, warn};

const MCP_PROTOCOL_VERSION: &str = "2024-11-05";
const MCP_SERVER_NAME: &str = "basecamp-mcp";

/// Runtime settings resolved by the binary before the server starts.
#[derive(Clone, Debug)]
pub struct McpRuntimeConfig {
    /// Basecamp requires an identifying User-Agent on every request.
    pub user_agent: String,
    /// Fallback account id when the stored credential does not carry one.
    pub account_id: Option<String>,
    /// Explicit access token; skips the credential store entirely (for
    /// setups where an outer process manages the OAuth lifecycle).
    pub access_token: Option<String>,
    pub oauth: OAuthConfig,
    /// Default for the per-tool `compact` argument on list-shaped tools.
    pub compact_default: bool,
    /// Alternate API base (tests, proxies); `https://3.basecampapi.com`
    /// when unset.
    pub api_base_url: Option<String>,
}

/// Serve MCP over stdio until stdin closes. Returns a process exit code.
pub async fn run(config: McpRuntimeConfig, store: TokenStore) -> i32 {
    let server = McpServer::new(config, store);
    info!(server = MCP_SERVER_NAME, "serving MCP over stdio");
    match server.serve_stdio().await {
        Ok(()) => 0,
        Err(err) => {
            error!(error = %err, "stdio transport failed");
            1
        }
    }
}

pub struct McpServer {
    config: McpRuntimeConfig,
    auth: AuthManager,
}

impl McpServer {
    pub fn new(config: McpRuntimeConfig, store: TokenStore) -> Self {
        let auth = AuthManager::new(store, config.oauth.clone());
        Self { config, auth }
    }

    pub async fn serve_stdio(&self) -> Result<(), std::io::Error> {
        let stdin = io::stdin();
        let mut lines = BufReader::new(stdin).lines();
        let mut stdout = io::stdout();

        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let response = match serde_json::from_str::<Value>(line) {
                Ok(incoming) => self.handle_message(incoming).await,
                Err(err) => Some(error_response(
                    Value::Null,
                    RpcError::parse_error(format!("Invalid JSON: {err}")),
                )),
            };

            if let Some(response) = response {
                let body = serde_json::to_string(&response)?;
                stdout.write_all(body.as_bytes()).await?;
                stdout.write_all(b"\n").await?;
                stdout.flush().await?;
            }
        }

        Ok(())
    }

    async fn handle_message(&self, incoming: Value) -> Option<Value> {
        let Some(message) = incoming.as_object() else {
            return Some(error_response(
                Value::Null,
                RpcError::invalid_request("Request must be a JSON object"),
            ));
        };

        if message.get("jsonrpc").and_then(Value::as_str) != Some("2.0") {
            let id = message.get("id").cloned().unwrap_or(Value::Null);
            return Some(error_response(
                id,
                RpcError::invalid_request("jsonrpc must be '2.0'"),
            ));
        }

        let Some(method) = message.get("method").and_then(Value::as_str) else {
            // A client response; this server issues no outbound requests.
            return None;
        };

        let params = message.get("params").cloned().unwrap_or(Value::Null);
        if let Some(id) = message.get("id").cloned() {
            debug!(method, "handling request");
            Some(match self.handle_request(method, params).await {
                Ok(payload) => success_response(id, payload),
                Err(err) => error_response(id, err),
            })
        } else {
            self.handle_notification(method);
            None
        }
    }

    fn handle_notification(&self, method: &str) {
        if !matches!(
            method,
            "notifications/initialized" | "notifications/cancelled"
        ) {
            debug!(method, "ignoring unknown notification");
        }
    }

    async fn handle_request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        match method {
            "initialize" => Ok(self.initialize_payload()),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(tools_list_payload()),
            "tools/call" => self.handle_tools_call(params).await,
            "prompts/list" => Ok(json!({ "prompts": [] })),
            _ => Err(RpcError::method_not_found(method)),
        }
    }

    fn initialize_payload(&self) -> Value {
        json!({
            "protocolVersion": MCP_PROTOCOL_VERSION,
            "capabilities": {
                "tools": {
                    "listChanged": false
                }
            },
            "serverInfo": {
                "name": MCP_SERVER_NAME,
                "version": env!("CARGO_PKG_VERSION")
            },
            "instructions": "Tools talk to the Basecamp 3 API with the locally stored OAuth credential. If calls fail with auth_required, connect an account with `bcq auth login`. List-shaped tools accept a `compact` boolean to trim items down to their essential fields."
        })
    }

    async fn handle_tools_call(&self, params: Value) -> Result<Value, RpcError> {
        let params = params
            .as_object()
            .ok_or_else(|| RpcError::invalid_params("tools/call params must be an object"))?;

        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| RpcError::invalid_params("tools/call requires string field 'name'"))?;

        let args = match params.get("arguments") {
            Some(Value::Object(map)) => map.clone(),
            Some(Value::Null) | None => Map::new(),
            Some(_) => {
                return Err(RpcError::invalid_params(
                    "tools/call 'arguments' must be an object",
                ));
            }
        };

        Ok(match self.execute_tool(name, &args).await {
            Ok(envelope) => tool_call_response(envelope, false),
            Err(err) => {
                warn!(tool = name, code = %err.code, "tool call failed");
                tool_call_response(err.to_envelope(name), true)
            }
        })
    }

    /// Build an API client backed by a usable credential, refreshing first
    /// when needed. Tool calls that arrive unauthenticated fail here, before
    /// any endpoint logic runs.
    async fn authenticated_client(&self) -> Result<BasecampClient, ToolError> {
        if let Some(token) = &self.config.access_token {
            let account_id = self.config.account_id.clone().ok_or_else(|| {
                ToolError::new(
                    "validation_failed",
                    "An explicit access token also requires an explicit account id.",
                )
                .with_field("account_id")
            })?;
            return Ok(self.client_for(&account_id, token));
        }

        if !self.auth.ensure_authenticated().await? {
            return Err(Error::AuthUnavailable.into());
        }
        let credential = self.auth.current()?.ok_or(Error::AuthUnavailable)?;

        let account_id = if credential.account_id.is_empty() {
            self.config.account_id.clone().ok_or_else(|| {
                ToolError::new(
                    "validation_failed",
                    "The stored credential has no account id; pass --account-id or re-run `bcq auth login`.",
                )
                .with_field("account_id")
            })?
        } else {
            credential.account_id.clone()
        };
        Ok(self.client_for(&account_id, &credential.access_token))
    }

    fn client_for(&self, account_id: &str, token: &str) -> BasecampClient {
        let auth = AuthMode::Bearer(token.to_string());
        match &self.config.api_base_url {
            Some(base) => BasecampClient::with_base_url(
                format!("{}/{}", base.trim_end_matches('/'), account_id),
                &self.config.user_agent,
                auth,
            ),
            None => BasecampClient::new(account_id, &self.config.user_agent, auth),
        }
    }

    fn compact_flag(&self, args: &Map<String, Value>) -> Result<bool, ToolError> {
        arg_bool(args, "compact", self.config.compact_default)
    }

    async fn execute_tool(
        &self,
        tool_name: &str,
        args: &Map<String, Value>,
    ) -> Result<Value, ToolError> {
        match tool_name {
            "get_projects" => self.tool_get_projects(args).await,
            "get_project" => self.tool_get_project(args).await,
            "get_todolists" => self.tool_get_todolists(args).await,
            "get_todos" => self.tool_get_todos(args).await,
            "create_todo" => self.tool_create_todo(args).await,
            "update_todo" => self.tool_update_todo(args).await,
            "delete_todo" => self.tool_delete_todo(args).await,
            "complete_todo" => self.tool_complete_todo(args).await,
            "uncomplete_todo" => self.tool_uncomplete_todo(args).await,
            "get_people" => self.tool_get_people(args).await,
            "get_campfires" => self.tool_get_campfires(args).await,
            "get_campfire_lines" => self.tool_get_campfire_lines(args).await,
            "create_campfire_line" => self.tool_create_campfire_line(args).await,
            "get_message_board" => self.tool_get_message_board(args).await,
            "get_messages" => self.tool_get_messages(args).await,
            "get_message" => self.tool_get_message(args).await,
            "create_message" => self.tool_create_message(args).await,
            "search_basecamp" => self.tool_search_basecamp(args).await,
            "global_search" => self.tool_global_search(args).await,
            "get_comments" => self.tool_get_comments(args).await,
            "create_comment" => self.tool_create_comment(args).await,
            "get_daily_check_ins" => self.tool_get_daily_check_ins(args).await,
            "get_question_answers" => self.tool_get_question_answers(args).await,
            "get_card_tables" => self.tool_get_card_tables(args).await,
            "get_card_table" => self.tool_get_card_table(args).await,
            "get_columns" => self.tool_get_columns(args).await,
            "get_column" => self.tool_get_column(args).await,
            "create_column" => self.tool_create_column(args).await,
            "update_column" => self.tool_update_column(args).await,
            "move_column" => self.tool_move_column(args).await,
            "update_column_color" => self.tool_update_column_color(args).await,
            "put_column_on_hold" => self.tool_put_column_on_hold(args).await,
            "remove_column_hold" => self.tool_remove_column_hold(args).await,
            "watch_column" => self.tool_watch_column(args).await,
            "unwatch_column" => self.tool_unwatch_column(args).await,
            "get_cards" => self.tool_get_cards(args).await,
            "get_card" => self.tool_get_card(args).await,
            "create_card" => self.tool_create_card(args).await,
            "update_card" => self.tool_update_card(args).await,
            "move_card" => self.tool_move_card(args).await,
            "complete_card" => self.tool_complete_card(args).await,
            "uncomplete_card" => self.tool_uncomplete_card(args).await,
            "get_card_steps" => self.tool_get_card_steps(args).await,
            "create_card_step" => self.tool_create_card_step(args).await,
            "get_card_step" => self.tool_get_card_step(args).await,
            "update_card_step" => self.tool_update_card_step(args).await,
            "delete_card_step" => self.tool_delete_card_step(args).await,
            "complete_card_step" => self.tool_complete_card_step(args).await,
            "uncomplete_card_step" => self.tool_uncomplete_card_step(args).await,
            "get_documents" => self.tool_get_documents(args).await,
            "get_document" => self.tool_get_document(args).await,
            "create_document" => self.tool_create_document(args).await,
            "update_document" => self.tool_update_document(args).await,
            "trash_document" => self.tool_trash_document(args).await,
            "get_uploads" => self.tool_get_uploads(args).await,
            "get_upload" => self.tool_get_upload(args).await,
            "create_attachment" => self.tool_create_attachment(args).await,
            "get_forwards" => self.tool_get_forwards(args).await,
            "get_forward" => self.tool_get_forward(args).await,
            "get_schedule" => self.tool_get_schedule(args).await,
            "get_schedule_entries" => self.tool_get_schedule_entries(args).await,
            "get_upcoming_schedule" => self.tool_get_upcoming_schedule(args).await,
            "get_events" => self.tool_get_events(args).await,
            "get_recordings" => self.tool_get_recordings(args).await,
            "get_webhooks" => self.tool_get_webhooks(args).await,
            "create_webhook" => self.tool_create_webhook(args).await,
            "delete_webhook" => self.tool_delete_webhook(args).await,
            "get_timeline" => self.tool_get_timeline(args).await,
            "get_project_timeline" => self.tool_get_project_timeline(args).await,
            "get_person_timeline" => self.tool_get_person_timeline(args).await,
            "get_todo_assignees" => self.tool_get_todo_assignees(args).await,
            "get_person_todos" => self.tool_get_person_todos(args).await,
            "get_overdue_todos" => self.tool_get_overdue_todos(args).await,
            _ => Err(ToolError::new(
                "unknown_tool",
                format!("Unknown tool '{tool_name}'"),
            )),
        }
    }

    // ----- projects -----

    async fn tool_get_projects(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let compact = self.compact_flag(args)?;
        let client = self.authenticated_client().await?;
        let projects = client.get_projects().await?;
        let count = projects.len();
        let projects = maybe_compact_items(projects, "project", compact);
        Ok(json!({ "status": "success", "projects": projects, "count": count }))
    }

    async fn tool_get_project(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let project_id = required_id(args, "project_id")?;
        let compact = arg_bool(args, "compact", false)?;
        let client = self.authenticated_client().await?;
        let mut project = client.get_project(project_id).await?;
        if compact {
            project = compact::compact_item(&project, "project");
        }
        Ok(json!({ "status": "success", "project": project }))
    }

    // ----- todos -----

    async fn tool_get_todolists(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let project_id = required_id(args, "project_id")?;
        let compact = self.compact_flag(args)?;
        let client = self.authenticated_client().await?;
        let todolists = client.get_todolists(project_id).await?;
        let count = todolists.len();
        let todolists = maybe_compact_items(todolists, "todolist", compact);
        Ok(json!({ "status": "success", "todolists": todolists, "count": count }))
    }

    async fn tool_get_todos(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let project_id = required_id(args, "project_id")?;
        let todolist_id = required_id(args, "todolist_id")?;
        let compact = self.compact_flag(args)?;
        let client = self.authenticated_client().await?;
        let todos = client.get_todos(project_id, todolist_id).await?;
        let count = todos.len();
        let todos = maybe_compact_items(todos, "todo", compact);
        Ok(json!({ "status": "success", "todos": todos, "count": count }))
    }

    async fn tool_create_todo(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let project_id = required_id(args, "project_id")?;
        let todolist_id = required_id(args, "todolist_id")?;
        let mut todo = TodoCreate::new(required_string(args, "content")?);
        todo.description = arg_optional_string(args, "description")?;
        todo.assignee_ids = arg_optional_id_array(args, "assignee_ids")?;
        todo.completion_subscriber_ids = arg_optional_id_array(args, "completion_subscriber_ids")?;
        todo.notify = arg_optional_bool(args, "notify")?;
        todo.due_on = arg_optional_string(args, "due_on")?;
        todo.starts_on = arg_optional_string(args, "starts_on")?;

        let client = self.authenticated_client().await?;
        let created = client.create_todo(project_id, todolist_id, &todo).await?;
        Ok(json!({
            "status": "success",
            "todo": created,
            "message": format!("Todo '{}' created successfully", todo.content)
        }))
    }

    async fn tool_update_todo(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let project_id = required_id(args, "project_id")?;
        let todo_id = required_id(args, "todo_id")?;
        let update = TodoUpdate {
            content: arg_optional_string(args, "content")?,
            description: arg_optional_string(args, "description")?,
            assignee_ids: arg_optional_id_array(args, "assignee_ids")?,
            completion_subscriber_ids: arg_optional_id_array(args, "completion_subscriber_ids")?,
            notify: arg_optional_bool(args, "notify")?,
            due_on: arg_optional_string(args, "due_on")?,
            starts_on: arg_optional_string(args, "starts_on")?,
        };

        let client = self.authenticated_client().await?;
        let todo = client.update_todo(project_id, todo_id, &update).await?;
        Ok(json!({
            "status": "success",
            "todo": todo,
            "message": "Todo updated successfully"
        }))
    }

    async fn tool_delete_todo(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let project_id = required_id(args, "project_id")?;
        let todo_id = required_id(args, "todo_id")?;
        let client = self.authenticated_client().await?;
        client.delete_todo(project_id, todo_id).await?;
        Ok(json!({ "status": "success", "message": "Todo deleted successfully" }))
    }

    async fn tool_complete_todo(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let project_id = required_id(args, "project_id")?;
        let todo_id = required_id(args, "todo_id")?;
        let client = self.authenticated_client().await?;
        let completion = client.complete_todo(project_id, todo_id).await?;
        Ok(json!({
            "status": "success",
            "completion": completion,
            "message": "Todo marked as complete"
        }))
    }

    async fn tool_uncomplete_todo(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let project_id = required_id(args, "project_id")?;
        let todo_id = required_id(args, "todo_id")?;
        let client = self.authenticated_client().await?;
        client.uncomplete_todo(project_id, todo_id).await?;
        Ok(json!({ "status": "success", "message": "Todo marked as incomplete" }))
    }

    // ----- people, campfires, messages -----

    async fn tool_get_people(&self, _args: &Map<String, Value>) -> Result<Value, ToolError> {
        let client = self.authenticated_client().await?;
        let people = client.get_people().await?;
        let count = people.len();
        Ok(json!({ "status": "success", "people": people, "count": count }))
    }

    async fn tool_get_campfires(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let project_id = required_id(args, "project_id")?;
        let client = self.authenticated_client().await?;
        let campfires = client.get_campfires(project_id).await?;
        Ok(json!({ "status": "success", "campfires": campfires }))
    }

    async fn tool_get_campfire_lines(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let project_id = required_id(args, "project_id")?;
        let campfire_id = required_id(args, "campfire_id")?;
        let compact = self.compact_flag(args)?;
        let client = self.authenticated_client().await?;
        let lines = client.get_campfire_lines(project_id, campfire_id).await?;
        let count = value_len(&lines);
        let lines = maybe_compact_value(lines, "campfire_line", compact);
        Ok(json!({ "status": "success", "lines": lines, "count": count }))
    }

    async fn tool_create_campfire_line(
        &self,
        args: &Map<String, Value>,
    ) -> Result<Value, ToolError> {
        let project_id = required_id(args, "project_id")?;
        let campfire_id = required_id(args, "campfire_id")?;
        let content = required_string(args, "content")?;
        let client = self.authenticated_client().await?;
        let line = client
            .create_campfire_line(project_id, campfire_id, &content)
            .await?;
        Ok(json!({
            "status": "success",
            "line": line,
            "message": "Campfire line posted"
        }))
    }

    async fn tool_get_message_board(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let project_id = required_id(args, "project_id")?;
        let client = self.authenticated_client().await?;
        let message_board = client.get_message_board(project_id).await?;
        Ok(json!({ "status": "success", "message_board": message_board }))
    }

    async fn tool_get_messages(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let project_id = required_id(args, "project_id")?;
        let message_board_id = optional_id(args, "message_board_id")?;
        let compact = self.compact_flag(args)?;
        let client = self.authenticated_client().await?;
        let messages = client.get_messages(project_id, message_board_id).await?;
        let count = messages.len();
        let messages = maybe_compact_items(messages, "message", compact);
        Ok(json!({ "status": "success", "messages": messages, "count": count }))
    }

    async fn tool_get_message(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let project_id = required_id(args, "project_id")?;
        let message_id = required_id(args, "message_id")?;
        let client = self.authenticated_client().await?;
        let message = client.get_message(project_id, message_id).await?;
        Ok(json!({ "status": "success", "message": message }))
    }

    async fn tool_create_message(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let project_id = required_id(args, "project_id")?;
        let message_board_id = optional_id(args, "message_board_id")?;
        let subject = required_string(args, "subject")?;
        let content = required_string(args, "content")?;
        let client = self.authenticated_client().await?;
        let message = client
            .create_message(project_id, message_board_id, &subject, &content)
            .await?;
        Ok(json!({
            "status": "success",
            "message_posted": message,
            "message": format!("Message '{subject}' posted successfully")
        }))
    }

    // ----- search -----

    async fn tool_search_basecamp(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let query = required_string(args, "query")?;
        let project_id = optional_id(args, "project_id")?;
        let compact = self.compact_flag(args)?;
        let client = self.authenticated_client().await?;
        let search = BasecampSearch::new(&client);

        let mut results = match project_id {
            Some(pid) => json!({
                "todolists": search.search_todolists(&query, pid).await?,
                "todos": search.search_todos(&query, Some(pid)).await?,
            }),
            None => json!({
                "projects": search.search_projects(&query).await?,
                "todos": search.search_todos(&query, None).await?,
                "messages": search.search_messages(&query).await?,
            }),
        };
        if compact {
            compact_search_results(&mut results);
        }
        Ok(json!({ "status": "success", "query": query, "results": results }))
    }

    async fn tool_global_search(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let query = required_string(args, "query")?;
        let compact = self.compact_flag(args)?;
        let client = self.authenticated_client().await?;
        let mut results = BasecampSearch::new(&client).global_search(&query).await?;
        if compact {
            compact_search_results(&mut results);
        }
        Ok(json!({ "status": "success", "query": query, "results": results }))
    }

    // ----- comments -----

    async fn tool_get_comments(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let project_id = required_id(args, "project_id")?;
        let recording_id = required_id(args, "recording_id")?;
        let page = arg_page(args)?;
        let compact = self.compact_flag(args)?;
        let client = self.authenticated_client().await?;
        let result = client.get_comments(project_id, recording_id, page).await?;
        let count = value_len(&result.comments);
        let comments = maybe_compact_value(result.comments, "comment", compact);
        Ok(json!({
            "status": "success",
            "comments": comments,
            "count": count,
            "page": page,
            "total_count": result.total_count,
            "next_page": result.next_page
        }))
    }

    async fn tool_create_comment(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let project_id = required_id(args, "project_id")?;
        let recording_id = required_id(args, "recording_id")?;
        let content = required_string(args, "content")?;
        let client = self.authenticated_client().await?;
        let comment = client
            .create_comment(project_id, recording_id, &content)
            .await?;
        Ok(json!({
            "status": "success",
            "comment": comment,
            "message": "Comment created successfully"
        }))
    }

    // ----- daily check-ins -----

    async fn tool_get_daily_check_ins(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let project_id = required_id(args, "project_id")?;
        let page = arg_page(args)?;
        let client = self.authenticated_client().await?;
        let questions = client.get_daily_check_ins(project_id, page).await?;
        Ok(json!({ "status": "success", "questions": questions, "page": page }))
    }

    async fn tool_get_question_answers(
        &self,
        args: &Map<String, Value>,
    ) -> Result<Value, ToolError> {
        let project_id = required_id(args, "project_id")?;
        let question_id = required_id(args, "question_id")?;
        let page = arg_page(args)?;
        let client = self.authenticated_client().await?;
        let answers = client
            .get_question_answers(project_id, question_id, page)
            .await?;
        Ok(json!({ "status": "success", "answers": answers, "page": page }))
    }

    // ----- card tables -----

    async fn tool_get_card_tables(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let project_id = required_id(args, "project_id")?;
        let compact = self.compact_flag(args)?;
        let client = self.authenticated_client().await?;
        let card_tables = client.get_card_tables(project_id).await?;
        let count = card_tables.len();
        let card_tables = maybe_compact_items(card_tables, "card_table", compact);
        Ok(json!({ "status": "success", "card_tables": card_tables, "count": count }))
    }

    async fn tool_get_card_table(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let project_id = required_id(args, "project_id")?;
        let client = self.authenticated_client().await?;
        let card_table = client.get_card_table(project_id).await?;
        Ok(json!({ "status": "success", "card_table": card_table }))
    }

    async fn tool_get_columns(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let project_id = required_id(args, "project_id")?;
        let card_table_id = required_id(args, "card_table_id")?;
        let compact = self.compact_flag(args)?;
        let client = self.authenticated_client().await?;
        let columns = client.get_columns(project_id, card_table_id).await?;
        let count = value_len(&columns);
        let columns = maybe_compact_value(columns, "column", compact);
        Ok(json!({ "status": "success", "columns": columns, "count": count }))
    }

    async fn tool_get_column(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let project_id = required_id(args, "project_id")?;
        let column_id = required_id(args, "column_id")?;
        let client = self.authenticated_client().await?;
        let column = client.get_column(project_id, column_id).await?;
        Ok(json!({ "status": "success", "column": column }))
    }

    async fn tool_create_column(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let project_id = required_id(args, "project_id")?;
        let card_table_id = required_id(args, "card_table_id")?;
        let title = required_string(args, "title")?;
        let client = self.authenticated_client().await?;
        let column = client
            .create_column(project_id, card_table_id, &title)
            .await?;
        Ok(json!({
            "status": "success",
            "column": column,
            "message": format!("Column '{title}' created successfully")
        }))
    }

    async fn tool_update_column(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let project_id = required_id(args, "project_id")?;
        let column_id = required_id(args, "column_id")?;
        let title = required_string(args, "title")?;
        let client = self.authenticated_client().await?;
        let column = client.update_column(project_id, column_id, &title).await?;
        Ok(json!({
            "status": "success",
            "column": column,
            "message": "Column updated successfully"
        }))
    }

    async fn tool_move_column(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let project_id = required_id(args, "project_id")?;
        let card_table_id = required_id(args, "card_table_id")?;
        let column_id = required_id(args, "column_id")?;
        let position = required_position(args)?;
        let client = self.authenticated_client().await?;
        client
            .move_column(project_id, card_table_id, column_id, position)
            .await?;
        Ok(json!({
            "status": "success",
            "message": format!("Column moved to position {position}")
        }))
    }

    async fn tool_update_column_color(
        &self,
        args: &Map<String, Value>,
    ) -> Result<Value, ToolError> {
        let project_id = required_id(args, "project_id")?;
        let column_id = required_id(args, "column_id")?;
        let color = required_string(args, "color")?;
        let client = self.authenticated_client().await?;
        let column = client
            .update_column_color(project_id, column_id, &color)
            .await?;
        Ok(json!({
            "status": "success",
            "column": column,
            "message": "Column color updated"
        }))
    }

    async fn tool_put_column_on_hold(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let project_id = required_id(args, "project_id")?;
        let column_id = required_id(args, "column_id")?;
        let client = self.authenticated_client().await?;
        client.put_column_on_hold(project_id, column_id).await?;
        Ok(json!({ "status": "success", "message": "Column put on hold" }))
    }

    async fn tool_remove_column_hold(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let project_id = required_id(args, "project_id")?;
        let column_id = required_id(args, "column_id")?;
        let client = self.authenticated_client().await?;
        client.remove_column_hold(project_id, column_id).await?;
        Ok(json!({ "status": "success", "message": "Column hold removed" }))
    }

    async fn tool_watch_column(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let project_id = required_id(args, "project_id")?;
        let column_id = required_id(args, "column_id")?;
        let client = self.authenticated_client().await?;
        client.watch_column(project_id, column_id).await?;
        Ok(json!({ "status": "success", "message": "Subscribed to column notifications" }))
    }

    async fn tool_unwatch_column(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let project_id = required_id(args, "project_id")?;
        let column_id = required_id(args, "column_id")?;
        let client = self.authenticated_client().await?;
        client.unwatch_column(project_id, column_id).await?;
        Ok(json!({ "status": "success", "message": "Unsubscribed from column notifications" }))
    }

    async fn tool_get_cards(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let project_id = required_id(args, "project_id")?;
        let column_id = required_id(args, "column_id")?;
        let compact = self.compact_flag(args)?;
        let client = self.authenticated_client().await?;
        let cards = client.get_cards(project_id, column_id).await?;
        let count = value_len(&cards);
        let cards = maybe_compact_value(cards, "card", compact);
        Ok(json!({ "status": "success", "cards": cards, "count": count }))
    }

    async fn tool_get_card(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let project_id = required_id(args, "project_id")?;
        let card_id = required_id(args, "card_id")?;
        let compact = arg_bool(args, "compact", false)?;
        let client = self.authenticated_client().await?;
        let mut card = client.get_card(project_id, card_id).await?;
        if compact {
            card = compact::compact_item(&card, "card");
        }
        Ok(json!({ "status": "success", "card": card }))
    }

    async fn tool_create_card(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let project_id = required_id(args, "project_id")?;
        let column_id = required_id(args, "column_id")?;
        let mut card = CardCreate::new(required_string(args, "title")?);
        card.content = arg_optional_string(args, "content")?;
        card.due_on = arg_optional_string(args, "due_on")?;
        card.notify = arg_optional_bool(args, "notify")?;

        let client = self.authenticated_client().await?;
        let created = client.create_card(project_id, column_id, &card).await?;
        Ok(json!({
            "status": "success",
            "card": created,
            "message": format!("Card '{}' created successfully", card.title)
        }))
    }

    async fn tool_update_card(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let project_id = required_id(args, "project_id")?;
        let card_id = required_id(args, "card_id")?;
        let update = CardUpdate {
            title: arg_optional_string(args, "title")?,
            content: arg_optional_string(args, "content")?,
            due_on: arg_optional_string(args, "due_on")?,
            assignee_ids: arg_optional_id_array(args, "assignee_ids")?,
        };

        let client = self.authenticated_client().await?;
        let card = client.update_card(project_id, card_id, &update).await?;
        Ok(json!({
            "status": "success",
            "card": card,
            "message": "Card updated successfully"
        }))
    }

    async fn tool_move_card(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let project_id = required_id(args, "project_id")?;
        let card_id = required_id(args, "card_id")?;
        let column_id = required_id(args, "column_id")?;
        let client = self.authenticated_client().await?;
        client.move_card(project_id, card_id, column_id).await?;
        Ok(json!({ "status": "success", "message": "Card moved successfully" }))
    }

    async fn tool_complete_card(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let project_id = required_id(args, "project_id")?;
        let card_id = required_id(args, "card_id")?;
        let client = self.authenticated_client().await?;
        let completion = client.complete_card(project_id, card_id).await?;
        Ok(json!({
            "status": "success",
            "completion": completion,
            "message": "Card marked as complete"
        }))
    }

    async fn tool_uncomplete_card(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let project_id = required_id(args, "project_id")?;
        let card_id = required_id(args, "card_id")?;
        let client = self.authenticated_client().await?;
        client.uncomplete_card(project_id, card_id).await?;
        Ok(json!({ "status": "success", "message": "Card marked as incomplete" }))
    }

    async fn tool_get_card_steps(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let project_id = required_id(args, "project_id")?;
        let card_id = required_id(args, "card_id")?;
        let compact = self.compact_flag(args)?;
        let client = self.authenticated_client().await?;
        let steps = client.get_card_steps(project_id, card_id).await?;
        let count = value_len(&steps);
        let steps = maybe_compact_value(steps, "step", compact);
        Ok(json!({ "status": "success", "steps": steps, "count": count }))
    }

    async fn tool_create_card_step(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let project_id = required_id(args, "project_id")?;
        let card_id = required_id(args, "card_id")?;
        let mut step = StepCreate::new(required_string(args, "title")?);
        step.due_on = arg_optional_string(args, "due_on")?;
        step.assignee_ids = arg_optional_id_array(args, "assignee_ids")?;

        let client = self.authenticated_client().await?;
        let created = client.create_card_step(project_id, card_id, &step).await?;
        Ok(json!({
            "status": "success",
            "step": created,
            "message": format!("Step '{}' created successfully", step.title)
        }))
    }

    async fn tool_get_card_step(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let project_id = required_id(args, "project_id")?;
        let step_id = required_id(args, "step_id")?;
        let client = self.authenticated_client().await?;
        let step = client.get_card_step(project_id, step_id).await?;
        Ok(json!({ "status": "success", "step": step }))
    }

    async fn tool_update_card_step(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let project_id = required_id(args, "project_id")?;
        let step_id = required_id(args, "step_id")?;
        let update = StepUpdate {
            title: arg_optional_string(args, "title")?,
            due_on: arg_optional_string(args, "due_on")?,
            assignee_ids: arg_optional_id_array(args, "assignee_ids")?,
        };

        let client = self.authenticated_client().await?;
        let step = client.update_card_step(project_id, step_id, &update).await?;
        Ok(json!({
            "status": "success",
            "step": step,
            "message": "Step updated successfully"
        }))
    }

    async fn tool_delete_card_step(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let project_id = required_id(args, "project_id")?;
        let step_id = required_id(args, "step_id")?;
        let client = self.authenticated_client().await?;
        client.delete_card_step(project_id, step_id).await?;
        Ok(json!({ "status": "success", "message": "Step deleted successfully" }))
    }

    async fn tool_complete_card_step(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let project_id = required_id(args, "project_id")?;
        let step_id = required_id(args, "step_id")?;
        let client = self.authenticated_client().await?;
        let completion = client.complete_card_step(project_id, step_id).await?;
        Ok(json!({
            "status": "success",
            "completion": completion,
            "message": "Step marked as complete"
        }))
    }

    async fn tool_uncomplete_card_step(
        &self,
        args: &Map<String, Value>,
    ) -> Result<Value, ToolError> {
        let project_id = required_id(args, "project_id")?;
        let step_id = required_id(args, "step_id")?;
        let client = self.authenticated_client().await?;
        client.uncomplete_card_step(project_id, step_id).await?;
        Ok(json!({ "status": "success", "message": "Step marked as incomplete" }))
    }

    // ----- documents and uploads -----

    async fn tool_get_documents(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let project_id = required_id(args, "project_id")?;
        let vault_id = required_id(args, "vault_id")?;
        let compact = self.compact_flag(args)?;
        let client = self.authenticated_client().await?;
        let documents = client.get_documents(project_id, vault_id).await?;
        let count = value_len(&documents);
        let documents = maybe_compact_value(documents, "document", compact);
        Ok(json!({ "status": "success", "documents": documents, "count": count }))
    }

    async fn tool_get_document(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let project_id = required_id(args, "project_id")?;
        let document_id = required_id(args, "document_id")?;
        let client = self.authenticated_client().await?;
        let document = client.get_document(project_id, document_id).await?;
        Ok(json!({ "status": "success", "document": document }))
    }

    async fn tool_create_document(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let project_id = required_id(args, "project_id")?;
        let vault_id = required_id(args, "vault_id")?;
        let title = required_string(args, "title")?;
        let content = required_string(args, "content")?;
        let client = self.authenticated_client().await?;
        let document = client
            .create_document(project_id, vault_id, &title, &content)
            .await?;
        Ok(json!({
            "status": "success",
            "document": document,
            "message": format!("Document '{title}' created successfully")
        }))
    }

    async fn tool_update_document(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let project_id = required_id(args, "project_id")?;
        let document_id = required_id(args, "document_id")?;
        let update = DocumentUpdate {
            title: arg_optional_string(args, "title")?,
            content: arg_optional_string(args, "content")?,
        };

        let client = self.authenticated_client().await?;
        let document = client
            .update_document(project_id, document_id, &update)
            .await?;
        Ok(json!({
            "status": "success",
            "document": document,
            "message": "Document updated successfully"
        }))
    }

    async fn tool_trash_document(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let project_id = required_id(args, "project_id")?;
        let document_id = required_id(args, "document_id")?;
        let client = self.authenticated_client().await?;
        client.trash_document(project_id, document_id).await?;
        Ok(json!({ "status": "success", "message": "Document moved to trash" }))
    }

    async fn tool_get_uploads(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let project_id = required_id(args, "project_id")?;
        let vault_id = optional_id(args, "vault_id")?;
        let compact = self.compact_flag(args)?;
        let client = self.authenticated_client().await?;
        let uploads = client.get_uploads(project_id, vault_id).await?;
        let count = value_len(&uploads);
        let uploads = maybe_compact_value(uploads, "upload", compact);
        Ok(json!({ "status": "success", "uploads": uploads, "count": count }))
    }

    async fn tool_get_upload(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let project_id = required_id(args, "project_id")?;
        let upload_id = required_id(args, "upload_id")?;
        let client = self.authenticated_client().await?;
        let upload = client.get_upload(project_id, upload_id).await?;
        Ok(json!({ "status": "success", "upload": upload }))
    }

    async fn tool_create_attachment(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let file_path = required_string(args, "file_path")?;
        let name = required_string(args, "name")?;
        let content_type =
            arg_string(args, "content_type", "application/octet-stream")?;

        let data = tokio::fs::read(&file_path).await.map_err(|err| {
            ToolError::new(
                "validation_failed",
                format!("Could not read file '{file_path}': {err}"),
            )
            .with_field("file_path")
        })?;

        let client = self.authenticated_client().await?;
        let attachment = client.create_attachment(data, &name, &content_type).await?;
        Ok(json!({
            "status": "success",
            "attachment": attachment,
            "message": "Attachment uploaded; use attachable_sgid to reference it"
        }))
    }

    // ----- inbox -----

    async fn tool_get_forwards(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let project_id = required_id(args, "project_id")?;
        let inbox_id = optional_id(args, "inbox_id")?;
        let compact = self.compact_flag(args)?;
        let client = self.authenticated_client().await?;
        let forwards = client.get_forwards(project_id, inbox_id).await?;
        let count = forwards.len();
        let forwards = maybe_compact_items(forwards, "forward", compact);
        Ok(json!({ "status": "success", "forwards": forwards, "count": count }))
    }

    async fn tool_get_forward(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let project_id = required_id(args, "project_id")?;
        let forward_id = required_id(args, "forward_id")?;
        let client = self.authenticated_client().await?;
        let forward = client.get_forward(project_id, forward_id).await?;
        Ok(json!({ "status": "success", "forward": forward }))
    }

    // ----- schedules -----

    async fn tool_get_schedule(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let project_id = required_id(args, "project_id")?;
        let client = self.authenticated_client().await?;
        let schedule = client.get_schedule(project_id).await?;
        Ok(json!({ "status": "success", "schedule": schedule }))
    }

    async fn tool_get_schedule_entries(
        &self,
        args: &Map<String, Value>,
    ) -> Result<Value, ToolError> {
        let project_id = required_id(args, "project_id")?;
        let compact = self.compact_flag(args)?;
        let client = self.authenticated_client().await?;
        let entries = client.get_schedule_entries(project_id).await?;
        let count = entries.len();
        let entries = maybe_compact_items(entries, "recording", compact);
        Ok(json!({ "status": "success", "entries": entries, "count": count }))
    }

    async fn tool_get_upcoming_schedule(
        &self,
        args: &Map<String, Value>,
    ) -> Result<Value, ToolError> {
        let window_starts_on = required_string(args, "window_starts_on")?;
        let window_ends_on = required_string(args, "window_ends_on")?;
        let compact = self.compact_flag(args)?;
        let client = self.authenticated_client().await?;
        let result = client
            .get_upcoming_schedule(&window_starts_on, &window_ends_on)
            .await?;

        let entries = result
            .get("schedule_entries")
            .cloned()
            .unwrap_or_else(|| json!([]));
        let recurring = result
            .get("recurring_schedule_entry_occurrences")
            .cloned()
            .unwrap_or_else(|| json!([]));
        let assignables = result
            .get("assignables")
            .cloned()
            .unwrap_or_else(|| json!([]));
        Ok(json!({
            "status": "success",
            "schedule_entries": maybe_compact_value(entries, "recording", compact),
            "recurring_schedule_entry_occurrences": maybe_compact_value(recurring, "recording", compact),
            "assignables": maybe_compact_value(assignables, "recording", compact)
        }))
    }

    // ----- events, recordings, webhooks -----

    async fn tool_get_events(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let project_id = required_id(args, "project_id")?;
        let recording_id = required_id(args, "recording_id")?;
        let page = arg_page(args)?;
        let compact = self.compact_flag(args)?;
        let client = self.authenticated_client().await?;
        let events = client.get_events(project_id, recording_id, page).await?;
        let count = value_len(&events);
        let events = maybe_compact_value(events, "event", compact);
        Ok(json!({ "status": "success", "events": events, "count": count, "page": page }))
    }

    async fn tool_get_recordings(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let mut query = RecordingsQuery::new(required_string(args, "type")?);
        query.bucket = arg_optional_string(args, "bucket")?;
        if let Some(status) = arg_optional_string(args, "status")? {
            query.status = status;
        }
        if let Some(sort) = arg_optional_string(args, "sort")? {
            query.sort = sort;
        }
        if let Some(direction) = arg_optional_string(args, "direction")? {
            query.direction = direction;
        }
        query.page = arg_page(args)?;
        let compact = self.compact_flag(args)?;

        let client = self.authenticated_client().await?;
        let recordings = client.get_recordings(&query).await?;
        let count = value_len(&recordings);
        let recordings = maybe_compact_value(recordings, "recording", compact);
        Ok(json!({
            "status": "success",
            "recordings": recordings,
            "count": count,
            "page": query.page
        }))
    }

    async fn tool_get_webhooks(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let project_id = required_id(args, "project_id")?;
        let compact = self.compact_flag(args)?;
        let client = self.authenticated_client().await?;
        let webhooks = client.get_webhooks(project_id).await?;
        let count = value_len(&webhooks);
        let webhooks = maybe_compact_value(webhooks, "webhook", compact);
        Ok(json!({ "status": "success", "webhooks": webhooks, "count": count }))
    }

    async fn tool_create_webhook(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let project_id = required_id(args, "project_id")?;
        let payload_url = required_string(args, "payload_url")?;
        let types = arg_optional_string_array(args, "types")?;
        let client = self.authenticated_client().await?;
        let webhook = client
            .create_webhook(project_id, &payload_url, types)
            .await?;
        Ok(json!({
            "status": "success",
            "webhook": webhook,
            "message": "Webhook created successfully"
        }))
    }

    async fn tool_delete_webhook(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let project_id = required_id(args, "project_id")?;
        let webhook_id = required_id(args, "webhook_id")?;
        let client = self.authenticated_client().await?;
        client.delete_webhook(project_id, webhook_id).await?;
        Ok(json!({ "status": "success", "message": "Webhook deleted successfully" }))
    }

    // ----- timelines and reports -----

    async fn tool_get_timeline(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let page = arg_page(args)?;
        let compact = self.compact_flag(args)?;
        let client = self.authenticated_client().await?;
        let events = client.get_timeline(page).await?;
        let count = value_len(&events);
        let events = maybe_compact_value(events, "event", compact);
        Ok(json!({ "status": "success", "events": events, "count": count, "page": page }))
    }

    async fn tool_get_project_timeline(
        &self,
        args: &Map<String, Value>,
    ) -> Result<Value, ToolError> {
        let project_id = required_id(args, "project_id")?;
        let page = arg_page(args)?;
        let compact = self.compact_flag(args)?;
        let client = self.authenticated_client().await?;
        let events = client.get_project_timeline(project_id, page).await?;
        let count = value_len(&events);
        let events = maybe_compact_value(events, "event", compact);
        Ok(json!({ "status": "success", "events": events, "count": count, "page": page }))
    }

    async fn tool_get_person_timeline(
        &self,
        args: &Map<String, Value>,
    ) -> Result<Value, ToolError> {
        let person_id = required_id(args, "person_id")?;
        let page = arg_page(args)?;
        let compact = self.compact_flag(args)?;
        let client = self.authenticated_client().await?;
        let events = client.get_person_timeline(person_id, page).await?;
        let count = value_len(&events);
        let events = maybe_compact_value(events, "event", compact);
        Ok(json!({ "status": "success", "events": events, "count": count, "page": page }))
    }

    async fn tool_get_todo_assignees(&self, _args: &Map<String, Value>) -> Result<Value, ToolError> {
        let client = self.authenticated_client().await?;
        let assignees = client.get_todo_assignees().await?;
        let count = value_len(&assignees);
        Ok(json!({ "status": "success", "assignees": assignees, "count": count }))
    }

    async fn tool_get_person_todos(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let person_id = required_id(args, "person_id")?;
        let group_by = arg_string(args, "group_by", "bucket")?;
        let compact = self.compact_flag(args)?;
        let client = self.authenticated_client().await?;
        let result = client.get_person_todos(person_id, &group_by).await?;

        let person = result.get("person").cloned().unwrap_or(Value::Null);
        let grouped_by = result.get("grouped_by").cloned().unwrap_or(Value::Null);
        let todos = result.get("todos").cloned().unwrap_or_else(|| json!([]));
        let count = value_len(&todos);
        let todos = maybe_compact_value(todos, "todo", compact);
        Ok(json!({
            "status": "success",
            "person": person,
            "grouped_by": grouped_by,
            "todos": todos,
            "count": count
        }))
    }

    async fn tool_get_overdue_todos(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let compact = self.compact_flag(args)?;
        let client = self.authenticated_client().await?;
        let mut result = client.get_overdue_todos().await?;
        // Groups arrive keyed by lateness bucket; compact each group's list.
        if compact {
            if let Some(groups) = result.as_object_mut() {
                for group in groups.values_mut() {
                    if group.is_array() {
                        *group = compact::compact_list(group, "todo");
                    }
                }
            }
        }
        Ok(json!({ "status": "success", "overdue_todos": result }))
    }
}

// ----- envelopes and errors -----

/// Structured tool failure. `code` values are stable and machine-readable;
/// `message` carries remediation phrasing for the human or agent reading it.
#[derive(Debug, Clone)]
struct ToolError {
    code: String,
    message: String,
    field: Option<String>,
    docs_hint: Option<String>,
    details: Option<Value>,
}

impl ToolError {
    fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            field: None,
            docs_hint: None,
            details: None,
        }
    }

    fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    fn with_docs_hint(mut self, docs_hint: impl Into<String>) -> Self {
        self.docs_hint = Some(docs_hint.into());
        self
    }

    fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    fn to_envelope(&self, tool: &str) -> Value {
        let mut envelope = json!({
            "status": "error",
            "tool": tool,
            "error": self.code,
            "message": self.message
        });
        if let Some(field) = &self.field {
            envelope["field"] = Value::String(field.clone());
        }
        if let Some(docs_hint) = &self.docs_hint {
            envelope["docs_hint"] = Value::String(docs_hint.clone());
        }
        if let Some(details) = &self.details {
            envelope["details"] = details.clone();
        }
        envelope
    }
}

impl From<Error> for ToolError {
    fn from(err: Error) -> Self {
        let code = err.code();
        match err {
            Error::AuthUnavailable => ToolError::new(code, "Not authenticated with Basecamp.")
                .with_docs_hint(
                    "Run `bcq auth login` to connect an account; the credential persists for future sessions.",
                ),
            Error::Api {
                status,
                body,
                token_expired,
            } => {
                let message = if token_expired {
                    "The OAuth token expired during the API call and was not refreshed mid-request."
                        .to_string()
                } else {
                    format!("Basecamp API returned status {status}.")
                };
                let tool_error = ToolError::new(code, message)
                    .with_details(json!({ "status": status, "body": body }));
                if token_expired {
                    tool_error.with_docs_hint("Run `bcq auth refresh`, then retry the call.")
                } else {
                    tool_error
                }
            }
            Error::Discovery { project_id, tool } => ToolError::new(
                code,
                format!("Project {project_id} has no {tool} in its dock."),
            )
            .with_details(json!({ "project_id": project_id, "tool": tool })),
            Error::Validation(message) => ToolError::new(code, message),
            Error::Http(err) => {
                ToolError::new(code, format!("Could not reach the Basecamp API: {err}"))
            }
            other => ToolError::new(code, other.to_string()),
        }
    }
}

#[derive(Debug)]
struct RpcError {
    code: i64,
    message: String,
}

impl RpcError {
    fn parse_error(message: impl Into<String>) -> Self {
        Self {
            code: -32700,
            message: message.into(),
        }
    }

    fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            code: -32600,
            message: message.into(),
        }
    }

    fn method_not_found(method: &str) -> Self {
        Self {
            code: -32601,
            message: format!("Method not found: {method}"),
        }
    }

    fn invalid_params(message: impl Into<String>) -> Self {
        Self {
            code: -32602,
            message: message.into(),
        }
    }
}

fn success_response(id: Value, result: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": result
    })
}

fn error_response(id: Value, error: RpcError) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": {
            "code": error.code,
            "message": error.message
        }
    })
}

fn tool_call_response(envelope: Value, is_error: bool) -> Value {
    let text = serde_json::to_string_pretty(&envelope).unwrap_or_else(|_| "{}".to_string());
    json!({
        "content": [
            {
                "type": "text",
                "text": text
            }
        ],
        "isError": is_error
    })
}

fn value_len(value: &Value) -> usize {
    value.as_array().map_or(0, Vec::len)
}

fn maybe_compact_items(items: Vec<Value>, resource_type: &str, compact_requested: bool) -> Value {
    maybe_compact_value(Value::Array(items), resource_type, compact_requested)
}

fn maybe_compact_value(value: Value, resource_type: &str, compact_requested: bool) -> Value {
    if compact_requested {
        compact::compact_list(&value, resource_type)
    } else {
        value
    }
}

/// Search results are bucketed by kind; compact each bucket with its tag.
fn compact_search_results(results: &mut Value) {
    const BUCKET_TAGS: [(&str, &str); 5] = [
        ("projects", "project"),
        ("todos", "todo"),
        ("todolists", "todolist"),
        ("messages", "message"),
        ("campfire_lines", "campfire_line"),
    ];
    if let Some(map) = results.as_object_mut() {
        for (key, tag) in BUCKET_TAGS {
            if let Some(bucket) = map.get_mut(key) {
                *bucket = compact::compact_list(bucket, tag);
            }
        }
    }
}

// ----- argument extraction -----

fn validation(message: impl Into<String>) -> ToolError {
    ToolError::new("validation_failed", message)
}

/// Resource ids arrive as JSON numbers or as numeric strings; MCP clients
/// are inconsistent about which they send.
fn required_id(args: &Map<String, Value>, key: &str) -> Result<u64, ToolError> {
    let value = args
        .get(key)
        .ok_or_else(|| validation(format!("Missing required field '{key}'")).with_field(key))?;
    parse_id(value)
        .ok_or_else(|| validation(format!("'{key}' must be a positive integer id")).with_field(key))
}

fn optional_id(args: &Map<String, Value>, key: &str) -> Result<Option<u64>, ToolError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => parse_id(value).map(Some).ok_or_else(|| {
            validation(format!("'{key}' must be a positive integer id")).with_field(key)
        }),
    }
}

fn parse_id(value: &Value) -> Option<u64> {
    let id = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }?;
    (id != 0).then_some(id)
}

fn required_string(args: &Map<String, Value>, key: &str) -> Result<String, ToolError> {
    let value = args
        .get(key)
        .ok_or_else(|| validation(format!("Missing required field '{key}'")).with_field(key))?;
    match value {
        Value::String(v) if !v.trim().is_empty() => Ok(v.clone()),
        Value::String(_) => Err(validation(format!("'{key}' must not be empty")).with_field(key)),
        _ => Err(validation(format!("'{key}' must be a string")).with_field(key)),
    }
}

fn arg_string(args: &Map<String, Value>, key: &str, default: &str) -> Result<String, ToolError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(default.to_string()),
        Some(Value::String(v)) => Ok(v.clone()),
        Some(_) => Err(validation(format!("'{key}' must be a string")).with_field(key)),
    }
}

fn arg_optional_string(args: &Map<String, Value>, key: &str) -> Result<Option<String>, ToolError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(v)) if v.trim().is_empty() => Ok(None),
        Some(Value::String(v)) => Ok(Some(v.clone())),
        Some(_) => Err(validation(format!("'{key}' must be a string")).with_field(key)),
    }
}

fn arg_bool(args: &Map<String, Value>, key: &str, default: bool) -> Result<bool, ToolError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(default),
        Some(Value::Bool(v)) => Ok(*v),
        Some(_) => Err(validation(format!("'{key}' must be a boolean")).with_field(key)),
    }
}

fn arg_optional_bool(args: &Map<String, Value>, key: &str) -> Result<Option<bool>, ToolError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(v)) => Ok(Some(*v)),
        Some(_) => Err(validation(format!("'{key}' must be a boolean")).with_field(key)),
    }
}

fn arg_optional_id_array(
    args: &Map<String, Value>,
    key: &str,
) -> Result<Option<Vec<u64>>, ToolError> {
    let Some(value) = args.get(key) else {
        return Ok(None);
    };
    if value.is_null() {
        return Ok(None);
    }
    let items = value
        .as_array()
        .ok_or_else(|| validation(format!("'{key}' must be an array of ids")).with_field(key))?;
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        let id = parse_id(item).ok_or_else(|| {
            validation(format!("'{key}' items must be positive integer ids")).with_field(key)
        })?;
        out.push(id);
    }
    Ok(Some(out))
}

fn arg_optional_string_array(
    args: &Map<String, Value>,
    key: &str,
) -> Result<Option<Vec<String>>, ToolError> {
    let Some(value) = args.get(key) else {
        return Ok(None);
    };
    if value.is_null() {
        return Ok(None);
    }
    let items = value.as_array().ok_or_else(|| {
        validation(format!("'{key}' must be an array of strings")).with_field(key)
    })?;
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        let text = item
            .as_str()
            .ok_or_else(|| validation(format!("'{key}' items must be strings")).with_field(key))?;
        out.push(text.to_string());
    }
    Ok(Some(out))
}

fn arg_page(args: &Map<String, Value>) -> Result<u32, ToolError> {
    match args.get("page") {
        None | Some(Value::Null) => Ok(1),
        Some(value) => parse_id(value)
            .and_then(|p| u32::try_from(p).ok())
            .ok_or_else(|| validation("'page' must be a positive integer").with_field("page")),
    }
}

fn required_position(args: &Map<String, Value>) -> Result<u32, ToolError> {
    let value = args.get("position").ok_or_else(|| {
        validation("Missing required field 'position'").with_field("position")
    })?;
    parse_id(value)
        .and_then(|p| u32::try_from(p).ok())
        .ok_or_else(|| validation("'position' must be a positive integer").with_field("position"))
}

// ----- tool catalog -----

struct ToolDefinition {
    name: &'static str,
    description: &'static str,
    input_schema: Value,
}

fn tools_list_payload() -> Value {
    let tools: Vec<Value> = tool_definitions()
        .into_iter()
        .map(|tool| {
            json!({
                "name": tool.name,
                "description": tool.description,
                "inputSchema": tool.input_schema,
            })
        })
        .collect();
    json!({ "tools": tools })
}

fn id_prop(description: &str) -> Value {
    json!({ "type": "string", "description": description })
}

fn compact_prop(kept: &str) -> Value {
    json!({
        "type": "boolean",
        "description": format!("If true, return only essential fields ({kept})")
    })
}

fn page_prop() -> Value {
    json!({
        "type": "integer",
        "description": "Page number (default 1). Basecamp uses geared pagination: page 1 has 15 results, page 2 has 30, page 3 has 50, page 4+ has 100.",
        "default": 1
    })
}

fn schema(properties: Value, required: &[&str]) -> Value {
    json!({
        "type": "object",
        "properties": properties,
        "required": required
    })
}

fn tool_definitions() -> Vec<ToolDefinition> {
    let mut tools = Vec::new();
    tools.extend(project_tools());
    tools.extend(todo_tools());
    tools.extend(people_and_message_tools());
    tools.extend(search_tools());
    tools.extend(comment_and_checkin_tools());
    tools.extend(card_table_tools());
    tools.extend(document_tools());
    tools.extend(schedule_and_inbox_tools());
    tools.extend(activity_tools());
    tools.extend(report_tools());
    tools
}

fn project_tools() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "get_projects",
            description: "Get all Basecamp projects",
            input_schema: schema(
                json!({ "compact": compact_prop("id, name, description, url") }),
                &[],
            ),
        },
        ToolDefinition {
            name: "get_project",
            description: "Get details for a specific project, including its dock of enabled tools",
            input_schema: schema(
                json!({
                    "project_id": id_prop("The project ID"),
                    "compact": compact_prop("id, name, description, url")
                }),
                &["project_id"],
            ),
        },
    ]
}

fn todo_tools() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "get_todolists",
            description: "Get todo lists for a project",
            input_schema: schema(
                json!({
                    "project_id": id_prop("The project ID"),
                    "compact": compact_prop("id, title, completed, url")
                }),
                &["project_id"],
            ),
        },
        ToolDefinition {
            name: "get_todos",
            description: "Get all todos from a todo list (every page is aggregated)",
            input_schema: schema(
                json!({
                    "project_id": id_prop("The project ID"),
                    "todolist_id": id_prop("The todo list ID"),
                    "compact": compact_prop("id, title, completed, due_on, assignee names, url")
                }),
                &["project_id", "todolist_id"],
            ),
        },
        ToolDefinition {
            name: "create_todo",
            description: "Create a new todo item in a todo list",
            input_schema: schema(
                json!({
                    "project_id": id_prop("The project ID"),
                    "todolist_id": id_prop("The todo list ID"),
                    "content": { "type": "string", "description": "The todo item's text (required)" },
                    "description": { "type": "string", "description": "HTML description of the todo" },
                    "assignee_ids": { "type": "array", "items": { "type": "string" }, "description": "Person IDs to assign" },
                    "completion_subscriber_ids": { "type": "array", "items": { "type": "string" }, "description": "Person IDs to notify on completion" },
                    "notify": { "type": "boolean", "description": "Whether to notify assignees" },
                    "due_on": { "type": "string", "description": "Due date in YYYY-MM-DD format" },
                    "starts_on": { "type": "string", "description": "Start date in YYYY-MM-DD format" }
                }),
                &["project_id", "todolist_id", "content"],
            ),
        },
        ToolDefinition {
            name: "update_todo",
            description: "Update an existing todo item; only the provided fields change",
            input_schema: schema(
                json!({
                    "project_id": id_prop("The project ID"),
                    "todo_id": id_prop("The todo ID"),
                    "content": { "type": "string", "description": "The todo item's text" },
                    "description": { "type": "string", "description": "HTML description of the todo" },
                    "assignee_ids": { "type": "array", "items": { "type": "string" }, "description": "Person IDs to assign" },
                    "completion_subscriber_ids": { "type": "array", "items": { "type": "string" }, "description": "Person IDs to notify on completion" },
                    "notify": { "type": "boolean", "description": "Whether to notify assignees" },
                    "due_on": { "type": "string", "description": "Due date in YYYY-MM-DD format" },
                    "starts_on": { "type": "string", "description": "Start date in YYYY-MM-DD format" }
                }),
                &["project_id", "todo_id"],
            ),
        },
        ToolDefinition {
            name: "delete_todo",
            description: "Delete a todo item",
            input_schema: schema(
                json!({
                    "project_id": id_prop("The project ID"),
                    "todo_id": id_prop("The todo ID")
                }),
                &["project_id", "todo_id"],
            ),
        },
        ToolDefinition {
            name: "complete_todo",
            description: "Mark a todo item as complete",
            input_schema: schema(
                json!({
                    "project_id": id_prop("The project ID"),
                    "todo_id": id_prop("The todo ID")
                }),
                &["project_id", "todo_id"],
            ),
        },
        ToolDefinition {
            name: "uncomplete_todo",
            description: "Mark a todo item as incomplete",
            input_schema: schema(
                json!({
                    "project_id": id_prop("The project ID"),
                    "todo_id": id_prop("The todo ID")
                }),
                &["project_id", "todo_id"],
            ),
        },
    ]
}

fn people_and_message_tools() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "get_people",
            description: "Get all people visible to the authenticated account",
            input_schema: schema(json!({}), &[]),
        },
        ToolDefinition {
            name: "get_campfires",
            description: "Get the campfires (chat rooms) of a project",
            input_schema: schema(
                json!({ "project_id": id_prop("The project ID") }),
                &["project_id"],
            ),
        },
        ToolDefinition {
            name: "get_campfire_lines",
            description: "Get recent messages from a Basecamp campfire (chat room)",
            input_schema: schema(
                json!({
                    "project_id": id_prop("The project ID"),
                    "campfire_id": id_prop("The campfire/chat room ID"),
                    "compact": compact_prop("id, created_at, truncated content")
                }),
                &["project_id", "campfire_id"],
            ),
        },
        ToolDefinition {
            name: "create_campfire_line",
            description: "Post a message to a Basecamp campfire (chat room)",
            input_schema: schema(
                json!({
                    "project_id": id_prop("The project ID"),
                    "campfire_id": id_prop("The campfire/chat room ID"),
                    "content": { "type": "string", "description": "The message text" }
                }),
                &["project_id", "campfire_id", "content"],
            ),
        },
        ToolDefinition {
            name: "get_message_board",
            description: "Get the message board of a project (discovered via the project dock)",
            input_schema: schema(
                json!({ "project_id": id_prop("The project ID") }),
                &["project_id"],
            ),
        },
        ToolDefinition {
            name: "get_messages",
            description: "Get all messages on a project's message board",
            input_schema: schema(
                json!({
                    "project_id": id_prop("The project ID"),
                    "message_board_id": id_prop("Message board ID; discovered from the dock when omitted"),
                    "compact": compact_prop("id, subject, creator name, created_at, url")
                }),
                &["project_id"],
            ),
        },
        ToolDefinition {
            name: "get_message",
            description: "Get a single message with its full content",
            input_schema: schema(
                json!({
                    "project_id": id_prop("The project ID"),
                    "message_id": id_prop("The message ID")
                }),
                &["project_id", "message_id"],
            ),
        },
        ToolDefinition {
            name: "create_message",
            description: "Post a message to a project's message board",
            input_schema: schema(
                json!({
                    "project_id": id_prop("The project ID"),
                    "message_board_id": id_prop("Message board ID; discovered from the dock when omitted"),
                    "subject": { "type": "string", "description": "Message subject line" },
                    "content": { "type": "string", "description": "Message body in HTML format" }
                }),
                &["project_id", "subject", "content"],
            ),
        },
    ]
}

fn search_tools() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "search_basecamp",
            description: "Search across Basecamp projects, todos, and messages (client-side substring match)",
            input_schema: schema(
                json!({
                    "query": { "type": "string", "description": "Search query" },
                    "project_id": id_prop("Optional project ID to limit the search scope"),
                    "compact": compact_prop("essential fields per result type")
                }),
                &["query"],
            ),
        },
        ToolDefinition {
            name: "global_search",
            description: "Search projects, todos and campfire messages across all projects",
            input_schema: schema(
                json!({
                    "query": { "type": "string", "description": "Search query" },
                    "compact": compact_prop("essential fields per result type")
                }),
                &["query"],
            ),
        },
    ]
}

fn comment_and_checkin_tools() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "get_comments",
            description: "Get one page of comments for a Basecamp item",
            input_schema: schema(
                json!({
                    "project_id": id_prop("The project ID"),
                    "recording_id": id_prop("The item ID"),
                    "page": page_prop(),
                    "compact": compact_prop("id, creator name, created_at, url, truncated content")
                }),
                &["project_id", "recording_id"],
            ),
        },
        ToolDefinition {
            name: "create_comment",
            description: "Create a comment on a Basecamp item",
            input_schema: schema(
                json!({
                    "project_id": id_prop("The project ID"),
                    "recording_id": id_prop("The item ID"),
                    "content": { "type": "string", "description": "The comment content in HTML format" }
                }),
                &["project_id", "recording_id", "content"],
            ),
        },
        ToolDefinition {
            name: "get_daily_check_ins",
            description: "Get a project's daily check-in questionnaire",
            input_schema: schema(
                json!({
                    "project_id": id_prop("The project ID"),
                    "page": page_prop()
                }),
                &["project_id"],
            ),
        },
        ToolDefinition {
            name: "get_question_answers",
            description: "Get answers to a daily check-in question",
            input_schema: schema(
                json!({
                    "project_id": id_prop("The project ID"),
                    "question_id": id_prop("The question ID"),
                    "page": page_prop()
                }),
                &["project_id", "question_id"],
            ),
        },
    ]
}

fn card_table_tools() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "get_card_tables",
            description: "Get all card tables for a project",
            input_schema: schema(
                json!({
                    "project_id": id_prop("The project ID"),
                    "compact": compact_prop("id, title")
                }),
                &["project_id"],
            ),
        },
        ToolDefinition {
            name: "get_card_table",
            description: "Get the first card table of a project",
            input_schema: schema(
                json!({ "project_id": id_prop("The project ID") }),
                &["project_id"],
            ),
        },
        ToolDefinition {
            name: "get_columns",
            description: "Get all columns of a card table",
            input_schema: schema(
                json!({
                    "project_id": id_prop("The project ID"),
                    "card_table_id": id_prop("The card table ID"),
                    "compact": compact_prop("id, title, cards_count")
                }),
                &["project_id", "card_table_id"],
            ),
        },
        ToolDefinition {
            name: "get_column",
            description: "Get a specific card table column",
            input_schema: schema(
                json!({
                    "project_id": id_prop("The project ID"),
                    "column_id": id_prop("The column ID")
                }),
                &["project_id", "column_id"],
            ),
        },
        ToolDefinition {
            name: "create_column",
            description: "Create a new column in a card table",
            input_schema: schema(
                json!({
                    "project_id": id_prop("The project ID"),
                    "card_table_id": id_prop("The card table ID"),
                    "title": { "type": "string", "description": "The column title" }
                }),
                &["project_id", "card_table_id", "title"],
            ),
        },
        ToolDefinition {
            name: "update_column",
            description: "Rename a card table column",
            input_schema: schema(
                json!({
                    "project_id": id_prop("The project ID"),
                    "column_id": id_prop("The column ID"),
                    "title": { "type": "string", "description": "The new column title" }
                }),
                &["project_id", "column_id", "title"],
            ),
        },
        ToolDefinition {
            name: "move_column",
            description: "Move a column to a new position within its card table",
            input_schema: schema(
                json!({
                    "project_id": id_prop("The project ID"),
                    "card_table_id": id_prop("The card table ID"),
                    "column_id": id_prop("The column ID"),
                    "position": { "type": "integer", "description": "Target position, 1-based" }
                }),
                &["project_id", "card_table_id", "column_id", "position"],
            ),
        },
        ToolDefinition {
            name: "update_column_color",
            description: "Change the color of a card table column",
            input_schema: schema(
                json!({
                    "project_id": id_prop("The project ID"),
                    "column_id": id_prop("The column ID"),
                    "color": { "type": "string", "description": "Color name, e.g. white, red, yellow, green, blue, purple" }
                }),
                &["project_id", "column_id", "color"],
            ),
        },
        ToolDefinition {
            name: "put_column_on_hold",
            description: "Put a card table column on hold",
            input_schema: schema(
                json!({
                    "project_id": id_prop("The project ID"),
                    "column_id": id_prop("The column ID")
                }),
                &["project_id", "column_id"],
            ),
        },
        ToolDefinition {
            name: "remove_column_hold",
            description: "Remove the hold on a card table column",
            input_schema: schema(
                json!({
                    "project_id": id_prop("The project ID"),
                    "column_id": id_prop("The column ID")
                }),
                &["project_id", "column_id"],
            ),
        },
        ToolDefinition {
            name: "watch_column",
            description: "Subscribe to notifications for a card table column",
            input_schema: schema(
                json!({
                    "project_id": id_prop("The project ID"),
                    "column_id": id_prop("The column ID")
                }),
                &["project_id", "column_id"],
            ),
        },
        ToolDefinition {
            name: "unwatch_column",
            description: "Unsubscribe from notifications for a card table column",
            input_schema: schema(
                json!({
                    "project_id": id_prop("The project ID"),
                    "column_id": id_prop("The column ID")
                }),
                &["project_id", "column_id"],
            ),
        },
        ToolDefinition {
            name: "get_cards",
            description: "Get all cards in a card table column",
            input_schema: schema(
                json!({
                    "project_id": id_prop("The project ID"),
                    "column_id": id_prop("The column ID"),
                    "compact": compact_prop("id, title, completed, due_on, assignee names, url")
                }),
                &["project_id", "column_id"],
            ),
        },
        ToolDefinition {
            name: "get_card",
            description: "Get a specific card, including its steps",
            input_schema: schema(
                json!({
                    "project_id": id_prop("The project ID"),
                    "card_id": id_prop("The card ID"),
                    "compact": compact_prop("id, title, completed, due_on, assignee names, url")
                }),
                &["project_id", "card_id"],
            ),
        },
        ToolDefinition {
            name: "create_card",
            description: "Create a new card in a card table column",
            input_schema: schema(
                json!({
                    "project_id": id_prop("The project ID"),
                    "column_id": id_prop("The column ID"),
                    "title": { "type": "string", "description": "The card title (required)" },
                    "content": { "type": "string", "description": "HTML body of the card" },
                    "due_on": { "type": "string", "description": "Due date in YYYY-MM-DD format" },
                    "notify": { "type": "boolean", "description": "Whether to notify assignees" }
                }),
                &["project_id", "column_id", "title"],
            ),
        },
        ToolDefinition {
            name: "update_card",
            description: "Update an existing card; only the provided fields change",
            input_schema: schema(
                json!({
                    "project_id": id_prop("The project ID"),
                    "card_id": id_prop("The card ID"),
                    "title": { "type": "string", "description": "The card title" },
                    "content": { "type": "string", "description": "HTML body of the card" },
                    "due_on": { "type": "string", "description": "Due date in YYYY-MM-DD format" },
                    "assignee_ids": { "type": "array", "items": { "type": "string" }, "description": "Person IDs to assign" }
                }),
                &["project_id", "card_id"],
            ),
        },
        ToolDefinition {
            name: "move_card",
            description: "Move a card to a different column",
            input_schema: schema(
                json!({
                    "project_id": id_prop("The project ID"),
                    "card_id": id_prop("The card ID"),
                    "column_id": id_prop("The destination column ID")
                }),
                &["project_id", "card_id", "column_id"],
            ),
        },
        ToolDefinition {
            name: "complete_card",
            description: "Mark a card as complete",
            input_schema: schema(
                json!({
                    "project_id": id_prop("The project ID"),
                    "card_id": id_prop("The card ID")
                }),
                &["project_id", "card_id"],
            ),
        },
        ToolDefinition {
            name: "uncomplete_card",
            description: "Mark a card as incomplete",
            input_schema: schema(
                json!({
                    "project_id": id_prop("The project ID"),
                    "card_id": id_prop("The card ID")
                }),
                &["project_id", "card_id"],
            ),
        },
        ToolDefinition {
            name: "get_card_steps",
            description: "Get the steps (sub-tasks) of a card",
            input_schema: schema(
                json!({
                    "project_id": id_prop("The project ID"),
                    "card_id": id_prop("The card ID"),
                    "compact": compact_prop("id, title, completed, due_on, assignee names")
                }),
                &["project_id", "card_id"],
            ),
        },
        ToolDefinition {
            name: "create_card_step",
            description: "Add a step (sub-task) to a card",
            input_schema: schema(
                json!({
                    "project_id": id_prop("The project ID"),
                    "card_id": id_prop("The card ID"),
                    "title": { "type": "string", "description": "The step title (required)" },
                    "due_on": { "type": "string", "description": "Due date in YYYY-MM-DD format" },
                    "assignee_ids": { "type": "array", "items": { "type": "string" }, "description": "Person IDs to assign" }
                }),
                &["project_id", "card_id", "title"],
            ),
        },
        ToolDefinition {
            name: "get_card_step",
            description: "Get a specific card step",
            input_schema: schema(
                json!({
                    "project_id": id_prop("The project ID"),
                    "step_id": id_prop("The step ID")
                }),
                &["project_id", "step_id"],
            ),
        },
        ToolDefinition {
            name: "update_card_step",
            description: "Update a card step; only the provided fields change",
            input_schema: schema(
                json!({
                    "project_id": id_prop("The project ID"),
                    "step_id": id_prop("The step ID"),
                    "title": { "type": "string", "description": "The step title" },
                    "due_on": { "type": "string", "description": "Due date in YYYY-MM-DD format" },
                    "assignee_ids": { "type": "array", "items": { "type": "string" }, "description": "Person IDs to assign" }
                }),
                &["project_id", "step_id"],
            ),
        },
        ToolDefinition {
            name: "delete_card_step",
            description: "Delete a card step",
            input_schema: schema(
                json!({
                    "project_id": id_prop("The project ID"),
                    "step_id": id_prop("The step ID")
                }),
                &["project_id", "step_id"],
            ),
        },
        ToolDefinition {
            name: "complete_card_step",
            description: "Mark a card step as complete",
            input_schema: schema(
                json!({
                    "project_id": id_prop("The project ID"),
                    "step_id": id_prop("The step ID")
                }),
                &["project_id", "step_id"],
            ),
        },
        ToolDefinition {
            name: "uncomplete_card_step",
            description: "Mark a card step as incomplete",
            input_schema: schema(
                json!({
                    "project_id": id_prop("The project ID"),
                    "step_id": id_prop("The step ID")
                }),
                &["project_id", "step_id"],
            ),
        },
    ]
}

fn document_tools() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "get_documents",
            description: "Get documents in a project vault",
            input_schema: schema(
                json!({
                    "project_id": id_prop("The project ID"),
                    "vault_id": id_prop("The vault ID"),
                    "compact": compact_prop("id, title, creator name, created_at, url")
                }),
                &["project_id", "vault_id"],
            ),
        },
        ToolDefinition {
            name: "get_document",
            description: "Get a document with its full content",
            input_schema: schema(
                json!({
                    "project_id": id_prop("The project ID"),
                    "document_id": id_prop("The document ID")
                }),
                &["project_id", "document_id"],
            ),
        },
        ToolDefinition {
            name: "create_document",
            description: "Create a document in a project vault",
            input_schema: schema(
                json!({
                    "project_id": id_prop("The project ID"),
                    "vault_id": id_prop("The vault ID"),
                    "title": { "type": "string", "description": "Document title" },
                    "content": { "type": "string", "description": "Document body in HTML format" }
                }),
                &["project_id", "vault_id", "title", "content"],
            ),
        },
        ToolDefinition {
            name: "update_document",
            description: "Update a document's title and/or content",
            input_schema: schema(
                json!({
                    "project_id": id_prop("The project ID"),
                    "document_id": id_prop("The document ID"),
                    "title": { "type": "string", "description": "New document title" },
                    "content": { "type": "string", "description": "New document body in HTML format" }
                }),
                &["project_id", "document_id"],
            ),
        },
        ToolDefinition {
            name: "trash_document",
            description: "Move a document to the trash",
            input_schema: schema(
                json!({
                    "project_id": id_prop("The project ID"),
                    "document_id": id_prop("The document ID")
                }),
                &["project_id", "document_id"],
            ),
        },
        ToolDefinition {
            name: "get_uploads",
            description: "Get uploaded files in a project, optionally scoped to a vault",
            input_schema: schema(
                json!({
                    "project_id": id_prop("The project ID"),
                    "vault_id": id_prop("Optional vault ID to scope the listing"),
                    "compact": compact_prop("id, title, filename, creator name, created_at, url")
                }),
                &["project_id"],
            ),
        },
        ToolDefinition {
            name: "get_upload",
            description: "Get details for a specific uploaded file",
            input_schema: schema(
                json!({
                    "project_id": id_prop("The project ID"),
                    "upload_id": id_prop("The upload ID")
                }),
                &["project_id", "upload_id"],
            ),
        },
        ToolDefinition {
            name: "create_attachment",
            description: "Upload a local file as a Basecamp attachment and get its attachable_sgid",
            input_schema: schema(
                json!({
                    "file_path": { "type": "string", "description": "Path of the local file to upload" },
                    "name": { "type": "string", "description": "Filename for Basecamp" },
                    "content_type": { "type": "string", "description": "MIME type (default application/octet-stream)" }
                }),
                &["file_path", "name"],
            ),
        },
    ]
}

fn schedule_and_inbox_tools() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "get_schedule",
            description: "Get a project's schedule (discovered via the project dock)",
            input_schema: schema(
                json!({ "project_id": id_prop("The project ID") }),
                &["project_id"],
            ),
        },
        ToolDefinition {
            name: "get_schedule_entries",
            description: "Get all entries on a project's schedule",
            input_schema: schema(
                json!({
                    "project_id": id_prop("The project ID"),
                    "compact": compact_prop("id, title, type, created_at, url")
                }),
                &["project_id"],
            ),
        },
        ToolDefinition {
            name: "get_upcoming_schedule",
            description: "Get schedule entries and assignable items within a date window, across projects",
            input_schema: schema(
                json!({
                    "window_starts_on": { "type": "string", "description": "Start date in YYYY-MM-DD format" },
                    "window_ends_on": { "type": "string", "description": "End date in YYYY-MM-DD format" },
                    "compact": compact_prop("id, title, type, created_at, url")
                }),
                &["window_starts_on", "window_ends_on"],
            ),
        },
        ToolDefinition {
            name: "get_forwards",
            description: "Get email forwards in a project's inbox",
            input_schema: schema(
                json!({
                    "project_id": id_prop("The project ID"),
                    "inbox_id": id_prop("Inbox ID; discovered from the dock when omitted"),
                    "compact": compact_prop("id, subject, creator name, created_at, url")
                }),
                &["project_id"],
            ),
        },
        ToolDefinition {
            name: "get_forward",
            description: "Get a specific email forward with its full content",
            input_schema: schema(
                json!({
                    "project_id": id_prop("The project ID"),
                    "forward_id": id_prop("The forward ID")
                }),
                &["project_id", "forward_id"],
            ),
        },
    ]
}

fn activity_tools() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "get_events",
            description: "Get the change events of a Basecamp item",
            input_schema: schema(
                json!({
                    "project_id": id_prop("The project ID"),
                    "recording_id": id_prop("The item ID"),
                    "page": page_prop(),
                    "compact": compact_prop("id, action, created_at")
                }),
                &["project_id", "recording_id"],
            ),
        },
        ToolDefinition {
            name: "get_recordings",
            description: "Get recordings of a given type across projects (cross-project feed)",
            input_schema: schema(
                json!({
                    "type": { "type": "string", "description": "Recording type, e.g. Todo, Message, Comment, Document, Upload, Kanban::Card" },
                    "bucket": { "type": "string", "description": "Comma-separated project IDs; all visible projects when omitted" },
                    "status": { "type": "string", "description": "active, archived or trashed (default active)" },
                    "sort": { "type": "string", "description": "created_at or updated_at (default created_at)" },
                    "direction": { "type": "string", "description": "desc or asc (default desc)" },
                    "page": page_prop(),
                    "compact": compact_prop("id, title, type, created_at, url")
                }),
                &["type"],
            ),
        },
        ToolDefinition {
            name: "get_webhooks",
            description: "Get webhook registrations for a project",
            input_schema: schema(
                json!({
                    "project_id": id_prop("The project ID"),
                    "compact": compact_prop("id, payload_url, active")
                }),
                &["project_id"],
            ),
        },
        ToolDefinition {
            name: "create_webhook",
            description: "Register a webhook on a project",
            input_schema: schema(
                json!({
                    "project_id": id_prop("The project ID"),
                    "payload_url": { "type": "string", "description": "HTTPS URL that receives the payloads" },
                    "types": { "type": "array", "items": { "type": "string" }, "description": "Recording types to deliver; all types when omitted" }
                }),
                &["project_id", "payload_url"],
            ),
        },
        ToolDefinition {
            name: "delete_webhook",
            description: "Delete a webhook registration",
            input_schema: schema(
                json!({
                    "project_id": id_prop("The project ID"),
                    "webhook_id": id_prop("The webhook ID")
                }),
                &["project_id", "webhook_id"],
            ),
        },
    ]
}

fn report_tools() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "get_timeline",
            description: "Get timeline events across all projects (global activity feed)",
            input_schema: schema(
                json!({
                    "page": page_prop(),
                    "compact": compact_prop("id, action, created_at")
                }),
                &[],
            ),
        },
        ToolDefinition {
            name: "get_project_timeline",
            description: "Get timeline events for a specific project",
            input_schema: schema(
                json!({
                    "project_id": id_prop("The project ID"),
                    "page": page_prop(),
                    "compact": compact_prop("id, action, created_at")
                }),
                &["project_id"],
            ),
        },
        ToolDefinition {
            name: "get_person_timeline",
            description: "Get timeline events for a specific person",
            input_schema: schema(
                json!({
                    "person_id": id_prop("The person ID"),
                    "page": page_prop(),
                    "compact": compact_prop("id, action, created_at")
                }),
                &["person_id"],
            ),
        },
        ToolDefinition {
            name: "get_todo_assignees",
            description: "Get all people with assigned to-dos and their open counts",
            input_schema: schema(json!({}), &[]),
        },
        ToolDefinition {
            name: "get_person_todos",
            description: "Get all active, pending to-dos assigned to a person",
            input_schema: schema(
                json!({
                    "person_id": id_prop("The person ID"),
                    "group_by": { "type": "string", "description": "Group by 'bucket' (project) or 'date' (due date). Default: bucket." },
                    "compact": compact_prop("id, title, completed, due_on, assignee names, url")
                }),
                &["person_id"],
            ),
        },
        ToolDefinition {
            name: "get_overdue_todos",
            description: "Get all overdue to-dos across projects, grouped by how late they are",
            input_schema: schema(
                json!({ "compact": compact_prop("id, title, completed, due_on, assignee names, url") }),
                &[],
            ),
        },
    ]
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use basecamp_core::{Credential, OAuthConfig, TokenStore};
    use chrono::{Duration, Utc};
    use serde_json::{json, Value};
    use uuid::Uuid;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::{tool_definitions, McpRuntimeConfig, McpServer};

    fn temp_store() -> TokenStore {
        let path = std::env::temp_dir()
            .join(format!("basecamp-runtime-test-{}", Uuid::now_v7().simple()))
            .join("credentials.json");
        TokenStore::at_path(path)
    }

    fn store_with_credential() -> TokenStore {
        let store = temp_store();
        store
            .write(&Credential {
                access_token: "test-token".to_string(),
                refresh_token: Some("refresh-1".to_string()),
                expires_at: Utc::now() + Duration::hours(2),
                account_id: "123".to_string(),
            })
            .unwrap();
        store
    }

    fn server(store: TokenStore, api_base_url: Option<String>) -> McpServer {
        McpServer::new(
            McpRuntimeConfig {
                user_agent: "Basecamp MCP tests (dev@example.com)".to_string(),
                account_id: None,
                access_token: None,
                oauth: OAuthConfig::new("client-id", "client-secret"),
                compact_default: true,
                api_base_url,
            },
            store,
        )
    }

    fn request(method: &str, params: Value) -> Value {
        json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params
        })
    }

    /// Tool envelopes travel as serialized JSON inside the MCP text content.
    fn tool_envelope(response: &Value) -> Value {
        let text = response["result"]["content"][0]["text"].as_str().unwrap();
        serde_json::from_str(text).unwrap()
    }

    #[test]
    fn catalog_names_are_unique_and_schemas_are_objects() {
        let tools = tool_definitions();
        let mut seen = HashSet::new();
        for tool in &tools {
            assert!(seen.insert(tool.name), "duplicate tool name {}", tool.name);
            assert_eq!(tool.input_schema["type"], "object");
            assert!(tool.input_schema["properties"].is_object());
            assert!(tool.input_schema["required"].is_array());
            assert!(!tool.description.is_empty());
        }
        for expected in [
            "get_projects",
            "create_todo",
            "search_basecamp",
            "global_search",
            "get_comments",
            "move_card",
            "create_attachment",
            "get_overdue_todos",
        ] {
            assert!(seen.contains(expected), "missing tool {expected}");
        }
    }

    #[tokio::test]
    async fn initialize_reports_server_identity() {
        let srv = server(temp_store(), None);
        let response = srv
            .handle_message(request("initialize", json!({})))
            .await
            .unwrap();
        assert_eq!(response["result"]["protocolVersion"], "2024-11-05");
        assert_eq!(response["result"]["serverInfo"]["name"], "basecamp-mcp");
    }

    #[tokio::test]
    async fn unknown_method_maps_to_rpc_error() {
        let srv = server(temp_store(), None);
        let response = srv
            .handle_message(request("resources/subscribe", json!({})))
            .await
            .unwrap();
        assert_eq!(response["error"]["code"], -32601);
    }

    #[tokio::test]
    async fn wrong_jsonrpc_version_is_rejected() {
        let srv = server(temp_store(), None);
        let response = srv
            .handle_message(json!({ "jsonrpc": "1.0", "id": 1, "method": "ping" }))
            .await
            .unwrap();
        assert_eq!(response["error"]["code"], -32600);
    }

    #[tokio::test]
    async fn notifications_produce_no_response() {
        let srv = server(temp_store(), None);
        let response = srv
            .handle_message(json!({
                "jsonrpc": "2.0",
                "method": "notifications/initialized"
            }))
            .await;
        assert!(response.is_none());
    }

    #[tokio::test]
    async fn tools_call_without_credential_reports_auth_required() {
        let srv = server(temp_store(), None);
        let response = srv
            .handle_message(request(
                "tools/call",
                json!({ "name": "get_projects", "arguments": {} }),
            ))
            .await
            .unwrap();

        assert_eq!(response["result"]["isError"], true);
        let envelope = tool_envelope(&response);
        assert_eq!(envelope["status"], "error");
        assert_eq!(envelope["error"], "auth_required");
    }

    #[tokio::test]
    async fn tools_call_dispatches_and_compacts_by_default() {
        let api = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/123/projects.json"))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {
                    "id": 1,
                    "name": "Launch",
                    "description": "Q4 launch planning",
                    "app_url": "https://3.basecamp.com/123/projects/1",
                    "dock": [{ "id": 10, "name": "todoset" }]
                }
            ])))
            .expect(1)
            .mount(&api)
            .await;

        let srv = server(store_with_credential(), Some(api.uri()));
        let response = srv
            .handle_message(request(
                "tools/call",
                json!({ "name": "get_projects", "arguments": {} }),
            ))
            .await
            .unwrap();

        assert_eq!(response["result"]["isError"], false);
        let envelope = tool_envelope(&response);
        assert_eq!(envelope["status"], "success");
        assert_eq!(envelope["count"], 1);
        let project = envelope["projects"][0].as_object().unwrap();
        assert_eq!(project["name"], "Launch");
        // Compact projection drops everything outside the canonical set.
        assert!(!project.contains_key("dock"));
    }

    #[tokio::test]
    async fn empty_sparse_update_fails_validation_without_network() {
        let srv = server(store_with_credential(), Some("http://127.0.0.1:9".to_string()));
        let response = srv
            .handle_message(request(
                "tools/call",
                json!({
                    "name": "update_todo",
                    "arguments": { "project_id": "1", "todo_id": "2" }
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response["result"]["isError"], true);
        let envelope = tool_envelope(&response);
        assert_eq!(envelope["error"], "validation_failed");
    }

    #[tokio::test]
    async fn missing_required_argument_names_the_field() {
        let srv = server(store_with_credential(), None);
        let response = srv
            .handle_message(request(
                "tools/call",
                json!({ "name": "get_project", "arguments": {} }),
            ))
            .await
            .unwrap();

        let envelope = tool_envelope(&response);
        assert_eq!(envelope["error"], "validation_failed");
        assert_eq!(envelope["field"], "project_id");
    }

    #[tokio::test]
    async fn zero_is_not_a_valid_id() {
        let srv = server(store_with_credential(), None);
        for project_id in [json!("0"), json!(0)] {
            let response = srv
                .handle_message(request(
                    "tools/call",
                    json!({ "name": "get_project", "arguments": { "project_id": project_id } }),
                ))
                .await
                .unwrap();
            let envelope = tool_envelope(&response);
            assert_eq!(envelope["error"], "validation_failed");
            assert_eq!(envelope["field"], "project_id");
        }
    }

    #[tokio::test]
    async fn scoped_search_reports_todolist_and_todo_buckets() {
        let api = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/123/projects/1.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 1,
                "dock": [{ "id": 99, "name": "todoset" }]
            })))
            .mount(&api)
            .await;
        Mock::given(method("GET"))
            .and(path("/123/buckets/1/todosets/99/todolists.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "id": 5, "title": "Release checklist" }
            ])))
            .mount(&api)
            .await;
        Mock::given(method("GET"))
            .and(path("/123/buckets/1/todolists/5/todos.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "id": 50, "title": "ship release notes", "content": "ship release notes" },
                { "id": 51, "title": "water the plants", "content": "water the plants" }
            ])))
            .mount(&api)
            .await;

        let srv = server(store_with_credential(), Some(api.uri()));
        let response = srv
            .handle_message(request(
                "tools/call",
                json!({
                    "name": "search_basecamp",
                    "arguments": { "query": "release", "project_id": "1" }
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response["result"]["isError"], false);
        let envelope = tool_envelope(&response);
        assert_eq!(envelope["status"], "success");
        assert_eq!(envelope["query"], "release");
        let results = &envelope["results"];
        assert_eq!(results["todolists"].as_array().unwrap().len(), 1);
        let todos = results["todos"].as_array().unwrap();
        assert_eq!(todos.len(), 1);
        assert_eq!(todos[0]["id"], 50);
        // Scoped search never reports a cross-project bucket.
        assert!(results.get("projects").is_none());
    }

    #[tokio::test]
    async fn string_and_numeric_ids_are_both_accepted() {
        let api = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/123/projects/7.json"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "id": 7, "name": "Ops" })),
            )
            .expect(2)
            .mount(&api)
            .await;

        let srv = server(store_with_credential(), Some(api.uri()));
        for project_id in [json!("7"), json!(7)] {
            let response = srv
                .handle_message(request(
                    "tools/call",
                    json!({ "name": "get_project", "arguments": { "project_id": project_id } }),
                ))
                .await
                .unwrap();
            assert_eq!(response["result"]["isError"], false);
        }
    }

    #[tokio::test]
    async fn expired_token_mid_call_yields_token_expired_envelope() {
        let api = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/123/projects/7.json"))
            .respond_with(
                ResponseTemplate::new(401).set_body_string(r#"{"error":"OAuth token expired"}"#),
            )
            .mount(&api)
            .await;

        let srv = server(store_with_credential(), Some(api.uri()));
        let response = srv
            .handle_message(request(
                "tools/call",
                json!({ "name": "get_project", "arguments": { "project_id": "7" } }),
            ))
            .await
            .unwrap();

        let envelope = tool_envelope(&response);
        assert_eq!(envelope["error"], "token_expired");
        assert_eq!(envelope["details"]["status"], 401);
    }

    #[tokio::test]
    async fn dock_miss_yields_discovery_envelope() {
        let api = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/123/projects/7.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 7,
                "dock": [{ "id": 10, "name": "todoset" }]
            })))
            .mount(&api)
            .await;

        let srv = server(store_with_credential(), Some(api.uri()));
        let response = srv
            .handle_message(request(
                "tools/call",
                json!({ "name": "get_schedule", "arguments": { "project_id": "7" } }),
            ))
            .await
            .unwrap();

        let envelope = tool_envelope(&response);
        assert_eq!(envelope["error"], "dock_entry_missing");
        assert_eq!(envelope["details"]["tool"], "schedule");
    }

    #[tokio::test]
    async fn unknown_tool_reports_its_name() {
        let srv = server(temp_store(), None);
        let response = srv
            .handle_message(request(
                "tools/call",
                json!({ "name": "no_such_tool", "arguments": {} }),
            ))
            .await
            .unwrap();

        let envelope = tool_envelope(&response);
        assert_eq!(envelope["error"], "unknown_tool");
        assert!(envelope["message"].as_str().unwrap().contains("no_such_tool"));
    }

    #[tokio::test]
    async fn tools_list_matches_the_catalog() {
        let srv = server(temp_store(), None);
        let response = srv
            .handle_message(request("tools/list", json!({})))
            .await
            .unwrap();
        let listed = response["result"]["tools"].as_array().unwrap();
        assert_eq!(listed.len(), tool_definitions().len());
        assert!(listed.iter().all(|tool| tool["inputSchema"].is_object()));
    }
}
