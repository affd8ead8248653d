//! Client-side search over the Basecamp API.
//!
//! Basecamp exposes no server-side search endpoint, so these helpers pull the
//! relevant collections through the client and filter them locally with a
//! case-insensitive substring match on the fields users actually read. A
//! project whose dock lacks the scanned tool is skipped, not an error; the
//! search should report what it could see, and a dock miss only means that
//! project never had anything to match.

use serde_json::{json, Value};

use basecamp_core::{Error, Result};

use crate::BasecampClient;

pub struct BasecampSearch<'a> {
    client: &'a BasecampClient,
}

impl<'a> BasecampSearch<'a> {
    pub fn new(client: &'a BasecampClient) -> Self {
        Self { client }
    }

    pub async fn search_projects(&self, query: &str) -> Result<Vec<Value>> {
        let projects = self.client.get_projects().await?;
        Ok(filter_matching(projects, query, &["name", "description"]))
    }

    pub async fn search_todolists(&self, query: &str, project_id: u64) -> Result<Vec<Value>> {
        let todolists = self.client.get_todolists(project_id).await?;
        Ok(filter_matching(todolists, query, &["title", "name", "description"]))
    }

    /// Scan every todo the caller can see, or just one project's when scoped.
    pub async fn search_todos(&self, query: &str, project_id: Option<u64>) -> Result<Vec<Value>> {
        let project_ids = match project_id {
            Some(id) => vec![id],
            None => self.project_ids().await?,
        };

        let mut matches = Vec::new();
        for pid in project_ids {
            let todolists = match self.client.get_todolists(pid).await {
                Ok(todolists) => todolists,
                Err(Error::Discovery { .. }) => continue,
                Err(err) => return Err(err),
            };
            for todolist in &todolists {
                let Some(todolist_id) = todolist.get("id").and_then(Value::as_u64) else {
                    continue;
                };
                let todos = self.client.get_todos(pid, todolist_id).await?;
                matches.extend(filter_matching(todos, query, &["content", "title", "description"]));
            }
        }
        Ok(matches)
    }

    pub async fn search_messages(&self, query: &str) -> Result<Vec<Value>> {
        let mut matches = Vec::new();
        for pid in self.project_ids().await? {
            let messages = match self.client.get_messages(pid, None).await {
                Ok(messages) => messages,
                Err(Error::Discovery { .. }) => continue,
                Err(err) => return Err(err),
            };
            matches.extend(filter_matching(messages, query, &["subject", "content"]));
        }
        Ok(matches)
    }

    pub async fn search_campfire_lines(&self, query: &str) -> Result<Vec<Value>> {
        let mut matches = Vec::new();
        for pid in self.project_ids().await? {
            let campfires = match self.client.get_campfires(pid).await {
                Ok(campfires) => campfires,
                Err(Error::Api { status: 404, .. }) => continue,
                Err(err) => return Err(err),
            };
            let Some(campfires) = campfires.as_array() else {
                continue;
            };
            for campfire in campfires {
                let Some(campfire_id) = campfire.get("id").and_then(Value::as_u64) else {
                    continue;
                };
                let lines = self.client.get_campfire_lines(pid, campfire_id).await?;
                if let Some(lines) = lines.as_array() {
                    matches.extend(filter_matching(lines.clone(), query, &["content"]));
                }
            }
        }
        Ok(matches)
    }

    /// Cross-project search over projects, todos, and campfire chatter.
    pub async fn global_search(&self, query: &str) -> Result<Value> {
        Ok(json!({
            "projects": self.search_projects(query).await?,
            "todos": self.search_todos(query, None).await?,
            "campfire_lines": self.search_campfire_lines(query).await?,
        }))
    }

    async fn project_ids(&self) -> Result<Vec<u64>> {
        Ok(self
            .client
            .get_projects()
            .await?
            .iter()
            .filter_map(|project| project.get("id").and_then(Value::as_u64))
            .collect())
    }
}

fn matches_query(item: &Value, query: &str, fields: &[&str]) -> bool {
    let needle = query.to_lowercase();
    fields.iter().any(|field| {
        item.get(field)
            .and_then(Value::as_str)
            .is_some_and(|text| text.to_lowercase().contains(&needle))
    })
}

fn filter_matching(items: Vec<Value>, query: &str, fields: &[&str]) -> Vec<Value> {
    items
        .into_iter()
        .filter(|item| matches_query(item, query, fields))
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::{matches_query, BasecampSearch};
    use crate::{AuthMode, BasecampClient};

    fn client(server: &MockServer) -> BasecampClient {
        BasecampClient::with_base_url(
            server.uri(),
            "Basecamp MCP tests (dev@example.com)",
            AuthMode::Bearer("test-token".to_string()),
        )
    }

    #[test]
    fn matching_is_case_insensitive_and_tolerates_missing_fields() {
        let item = json!({ "name": "Launch Plan" });
        assert!(matches_query(&item, "launch", &["name", "description"]));
        assert!(matches_query(&item, "PLAN", &["name"]));
        assert!(!matches_query(&item, "budget", &["name", "description"]));
        assert!(!matches_query(&json!({}), "anything", &["name"]));
    }

    #[tokio::test]
    async fn project_search_filters_on_name_and_description() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/projects.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "id": 1, "name": "Launch Plan", "description": "Q4 rollout" },
                { "id": 2, "name": "Ops", "description": "keep the launch running" },
                { "id": 3, "name": "Hiring", "description": "recruiting pipeline" }
            ])))
            .mount(&server)
            .await;

        let client = client(&server);
        let results = BasecampSearch::new(&client)
            .search_projects("launch")
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0]["id"], 1);
        assert_eq!(results[1]["id"], 2);
    }

    #[tokio::test]
    async fn scoped_todo_search_walks_every_todolist() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/projects/1.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 1,
                "dock": [{ "id": 99, "name": "todoset" }]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/buckets/1/todosets/99/todolists.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "id": 5, "title": "Release" },
                { "id": 6, "title": "Backlog" }
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/buckets/1/todolists/5/todos.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "id": 50, "content": "ship the release notes" },
                { "id": 51, "content": "update changelog" }
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/buckets/1/todolists/6/todos.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "id": 60, "content": "draft release retro" }
            ])))
            .mount(&server)
            .await;

        let client = client(&server);
        let results = BasecampSearch::new(&client)
            .search_todos("release", Some(1))
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0]["id"], 50);
        assert_eq!(results[1]["id"], 60);
    }

    #[tokio::test]
    async fn cross_project_todo_search_skips_projects_without_a_todoset() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/projects.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "id": 1, "name": "Docs", "dock": [] },
                { "id": 2, "name": "Build", "dock": [{ "id": 99, "name": "todoset" }] }
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/projects/1.json"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "id": 1, "dock": [] })),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/projects/2.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 2,
                "dock": [{ "id": 99, "name": "todoset" }]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/buckets/2/todosets/99/todolists.json"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([{ "id": 5, "title": "Tasks" }])),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/buckets/2/todolists/5/todos.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "id": 50, "content": "wire up the deploy job" }
            ])))
            .mount(&server)
            .await;

        let client = client(&server);
        let results = BasecampSearch::new(&client)
            .search_todos("deploy", None)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0]["id"], 50);
    }

    #[tokio::test]
    async fn global_search_buckets_results_by_kind() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/projects.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "id": 1, "name": "Standup notes", "dock": [] }
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/projects/1.json"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "id": 1, "dock": [] })),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/buckets/1/chats.json"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([{ "id": 7, "title": "Campfire" }])),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/buckets/1/chats/7/lines.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "id": 70, "content": "standup is moving to 9:30" },
                { "id": 71, "content": "lunch?" }
            ])))
            .mount(&server)
            .await;

        let client = client(&server);
        let results = BasecampSearch::new(&client)
            .global_search("standup")
            .await
            .unwrap();
        assert_eq!(results["projects"].as_array().unwrap().len(), 1);
        assert!(results["todos"].as_array().unwrap().is_empty());
        let lines = results["campfire_lines"].as_array().unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["id"], 70);
    }
}
