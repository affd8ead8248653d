//! Request bodies for create and sparse-update endpoints.
//!
//! Every optional field is represented as present-or-absent, not nullable:
//! unset fields are omitted from the serialized body entirely, so the remote
//! service never sees a spurious null. Update bodies expose `is_empty()` so
//! the client can refuse a no-op update before touching the network.

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct TodoCreate {
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee_ids: Option<Vec<u64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_subscriber_ids: Option<Vec<u64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notify: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_on: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub starts_on: Option<String>,
}

impl TodoCreate {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            description: None,
            assignee_ids: None,
            completion_subscriber_ids: None,
            notify: None,
            due_on: None,
            starts_on: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TodoUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee_ids: Option<Vec<u64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_subscriber_ids: Option<Vec<u64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notify: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_on: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub starts_on: Option<String>,
}

impl TodoUpdate {
    pub fn is_empty(&self) -> bool {
        self.content.is_none()
            && self.description.is_none()
            && self.assignee_ids.is_none()
            && self.completion_subscriber_ids.is_none()
            && self.notify.is_none()
            && self.due_on.is_none()
            && self.starts_on.is_none()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CardCreate {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_on: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notify: Option<bool>,
}

impl CardCreate {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: None,
            due_on: None,
            notify: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CardUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_on: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee_ids: Option<Vec<u64>>,
}

impl CardUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.content.is_none()
            && self.due_on.is_none()
            && self.assignee_ids.is_none()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StepCreate {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_on: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee_ids: Option<Vec<u64>>,
}

impl StepCreate {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            due_on: None,
            assignee_ids: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct StepUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_on: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee_ids: Option<Vec<u64>>,
}

impl StepUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.due_on.is_none() && self.assignee_ids.is_none()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DocumentUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl DocumentUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, to_value};

    use super::{CardUpdate, TodoCreate, TodoUpdate};

    #[test]
    fn unset_optional_fields_never_serialize() {
        let update = TodoUpdate {
            content: Some("new text".to_string()),
            ..TodoUpdate::default()
        };
        assert_eq!(to_value(&update).unwrap(), json!({ "content": "new text" }));
    }

    #[test]
    fn create_body_carries_required_field_plus_set_options() {
        let mut create = TodoCreate::new("write the report");
        create.due_on = Some("2026-09-01".to_string());
        assert_eq!(
            to_value(&create).unwrap(),
            json!({ "content": "write the report", "due_on": "2026-09-01" })
        );
    }

    #[test]
    fn emptiness_tracks_every_field() {
        assert!(TodoUpdate::default().is_empty());
        assert!(CardUpdate::default().is_empty());

        let update = TodoUpdate {
            notify: Some(false),
            ..TodoUpdate::default()
        };
        assert!(!update.is_empty());
    }
}
