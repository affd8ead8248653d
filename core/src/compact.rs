//! Compact projection of Basecamp API payloads.
//!
//! Full resource objects are large; agents mostly need ids, titles, and a few
//! status fields. The projection is pure: the same item and resource-type tag
//! always yield the same output, unknown tags produce an empty object, and
//! non-object input passes through unchanged.

use std::collections::HashMap;
use std::sync::LazyLock;

use serde_json::{Map, Value};

/// Fields kept per resource type in compact mode.
static COMPACT_FIELDS: LazyLock<HashMap<&'static str, &'static [&'static str]>> =
    LazyLock::new(|| {
        let mut fields: HashMap<&'static str, &'static [&'static str]> = HashMap::new();
        fields.insert("project", &["id", "name", "description", "app_url"]);
        fields.insert("todo", &["id", "title", "completed", "due_on", "app_url"]);
        fields.insert("todolist", &["id", "title", "completed", "app_url"]);
        fields.insert("card", &["id", "title", "completed", "due_on", "app_url"]);
        fields.insert("column", &["id", "title", "cards_count"]);
        fields.insert("step", &["id", "title", "completed", "due_on"]);
        fields.insert("message", &["id", "subject", "created_at", "app_url"]);
        fields.insert("comment", &["id", "created_at", "app_url"]);
        fields.insert("forward", &["id", "subject", "created_at", "app_url"]);
        fields.insert("reply", &["id", "created_at", "app_url"]);
        fields.insert("document", &["id", "title", "created_at", "app_url"]);
        fields.insert("upload", &["id", "title", "filename", "created_at", "app_url"]);
        fields.insert("campfire_line", &["id", "created_at"]);
        fields.insert("event", &["id", "action", "created_at"]);
        fields.insert("recording", &["id", "title", "type", "created_at", "app_url"]);
        fields.insert("webhook", &["id", "payload_url", "active"]);
        fields.insert("card_table", &["id", "title"]);
        fields
    });

/// Resource types that carry an `assignees` list worth surfacing by name.
const ASSIGNEE_TYPES: [&str; 3] = ["todo", "card", "step"];

/// Resource types whose `creator` name matters more than the full person blob.
const CREATOR_TYPES: [&str; 6] = ["message", "comment", "forward", "reply", "document", "upload"];

/// Resource types where a content excerpt is kept.
const CONTENT_TYPES: [&str; 2] = ["comment", "campfire_line"];

pub const CONTENT_MAX_LENGTH: usize = 200;

fn assignee_names(item: &Map<String, Value>) -> Vec<Value> {
    let Some(assignees) = item.get("assignees").and_then(Value::as_array) else {
        return Vec::new();
    };
    assignees
        .iter()
        .filter_map(|assignee| assignee.get("name"))
        .filter(|name| name.is_string())
        .cloned()
        .collect()
}

fn creator_name(item: &Map<String, Value>) -> Option<Value> {
    item.get("creator")
        .and_then(Value::as_object)
        .and_then(|creator| creator.get("name"))
        .cloned()
}

fn truncated_content(item: &Map<String, Value>) -> Option<Value> {
    let content = item.get("content").and_then(Value::as_str)?;
    if content.chars().count() > CONTENT_MAX_LENGTH {
        let mut excerpt: String = content.chars().take(CONTENT_MAX_LENGTH).collect();
        excerpt.push_str("...");
        Some(Value::String(excerpt))
    } else {
        Some(Value::String(content.to_string()))
    }
}

/// Project one item down to the canonical field set for `resource_type`.
///
/// Fields absent from the source are omitted, never null-filled, and the
/// values that are kept are copied verbatim.
pub fn compact_item(item: &Value, resource_type: &str) -> Value {
    let Some(source) = item.as_object() else {
        return item.clone();
    };

    let fields = COMPACT_FIELDS
        .get(resource_type)
        .copied()
        .unwrap_or_default();
    let mut result = Map::new();
    for field in fields {
        if let Some(value) = source.get(*field) {
            result.insert((*field).to_string(), value.clone());
        }
    }

    if ASSIGNEE_TYPES.contains(&resource_type) {
        let names = assignee_names(source);
        if !names.is_empty() {
            result.insert("assignee_names".to_string(), Value::Array(names));
        }
    }

    if CREATOR_TYPES.contains(&resource_type) {
        if let Some(name) = creator_name(source) {
            result.insert("creator_name".to_string(), name);
        }
    }

    if CONTENT_TYPES.contains(&resource_type) {
        if let Some(content) = truncated_content(source) {
            result.insert("content".to_string(), content);
        }
    }

    Value::Object(result)
}

/// Project every element of a list, preserving order. Non-array input is
/// returned unchanged so the compaction path stays total.
pub fn compact_list(items: &Value, resource_type: &str) -> Value {
    let Some(list) = items.as_array() else {
        return items.clone();
    };
    Value::Array(
        list.iter()
            .map(|item| compact_item(item, resource_type))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::{compact_item, compact_list, CONTENT_MAX_LENGTH};

    fn sample_card() -> Value {
        json!({
            "id": 123,
            "title": "Ship the release",
            "completed": false,
            "due_on": "2026-09-15",
            "app_url": "https://3.basecamp.com/999/cards/123",
            "description": "<p>long html body that compact mode drops</p>",
            "assignees": [
                { "id": 1, "name": "Ada" },
                { "id": 2, "email_address": "no-name@example.com" },
                { "id": 3, "name": "Grace" }
            ],
            "bucket": { "id": 999, "name": "Internal" }
        })
    }

    #[test]
    fn keeps_only_canonical_fields() {
        let compact = compact_item(&sample_card(), "card");
        let keys: Vec<&str> = compact.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, ["id", "title", "completed", "due_on", "app_url", "assignee_names"]);
        assert_eq!(compact["id"], 123);
        assert_eq!(compact["title"], "Ship the release");
    }

    #[test]
    fn projection_is_deterministic() {
        let item = sample_card();
        assert_eq!(compact_item(&item, "card"), compact_item(&item, "card"));
    }

    #[test]
    fn missing_source_fields_are_omitted_not_nulled() {
        let compact = compact_item(&json!({ "id": 7 }), "todo");
        let obj = compact.as_object().unwrap();
        assert_eq!(obj.len(), 1);
        assert!(!obj.contains_key("title"));
        assert!(!obj.contains_key("due_on"));
    }

    #[test]
    fn assignee_names_skip_entries_without_a_name() {
        let compact = compact_item(&sample_card(), "card");
        assert_eq!(compact["assignee_names"], json!(["Ada", "Grace"]));
    }

    #[test]
    fn empty_assignee_list_omits_the_derived_field() {
        let compact = compact_item(&json!({ "id": 1, "assignees": [] }), "todo");
        assert!(compact.get("assignee_names").is_none());
    }

    #[test]
    fn creator_name_comes_from_nested_object() {
        let message = json!({
            "id": 5,
            "subject": "Kickoff notes",
            "creator": { "id": 9, "name": "Lin" }
        });
        let compact = compact_item(&message, "message");
        assert_eq!(compact["creator_name"], "Lin");

        let anonymous = json!({ "id": 5, "subject": "x", "creator": "not-an-object" });
        assert!(compact_item(&anonymous, "message").get("creator_name").is_none());
    }

    #[test]
    fn content_at_limit_is_verbatim_one_over_is_truncated() {
        let exact: String = "x".repeat(CONTENT_MAX_LENGTH);
        let compact = compact_item(&json!({ "id": 1, "content": exact }), "comment");
        assert_eq!(compact["content"].as_str().unwrap().len(), CONTENT_MAX_LENGTH);
        assert!(!compact["content"].as_str().unwrap().ends_with("..."));

        let over: String = "x".repeat(CONTENT_MAX_LENGTH + 1);
        let compact = compact_item(&json!({ "id": 1, "content": over }), "comment");
        let content = compact["content"].as_str().unwrap();
        assert_eq!(content.chars().count(), CONTENT_MAX_LENGTH + 3);
        assert!(content.ends_with("..."));
    }

    #[test]
    fn unknown_tag_yields_empty_object() {
        assert_eq!(compact_item(&sample_card(), "no_such_tag"), json!({}));
    }

    #[test]
    fn non_object_item_passes_through() {
        assert_eq!(compact_item(&json!(42), "card"), json!(42));
        assert_eq!(compact_item(&json!("plain"), "card"), json!("plain"));
    }

    #[test]
    fn list_projection_preserves_order_and_tolerates_non_lists() {
        let items = json!([
            { "id": 2, "title": "b" },
            { "id": 1, "title": "a" }
        ]);
        let compact = compact_list(&items, "todo");
        assert_eq!(compact[0]["id"], 2);
        assert_eq!(compact[1]["id"], 1);

        let not_a_list = json!({ "id": 3 });
        assert_eq!(compact_list(&not_a_list, "todo"), not_a_list);
    }
}
