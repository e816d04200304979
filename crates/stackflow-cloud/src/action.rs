//! Change plans between two synthesized templates

use crate::template::{Template, TemplateResource};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Represents a planned change for one logical id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    /// Logical id of the resource
    pub id: String,

    /// Type of action to perform
    pub action_type: ActionType,

    /// Resource type (e.g., "AWS::ECS::Service")
    pub resource_type: String,

    /// Description of the action
    pub description: String,

    /// Additional details about the action
    pub details: HashMap<String, serde_json::Value>,
}

impl Action {
    fn new(id: &str, action_type: ActionType, resource_type: &str, description: String) -> Self {
        Self {
            id: id.to_string(),
            action_type,
            resource_type: resource_type.to_string(),
            description,
            details: HashMap::new(),
        }
    }

    /// Property keys that differ (update actions only)
    pub fn changed_properties(&self) -> Vec<String> {
        self.details
            .get("changed_properties")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default()
    }
}

/// Type of action to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Create a new resource
    Create,
    /// Update an existing resource
    Update,
    /// Delete a resource
    Delete,
    /// No changes needed
    NoOp,
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionType::Create => write!(f, "create"),
            ActionType::Update => write!(f, "update"),
            ActionType::Delete => write!(f, "delete"),
            ActionType::NoOp => write!(f, "no-op"),
        }
    }
}

/// Plan containing all actions, ordered by logical id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    /// List of actions to perform
    pub actions: Vec<Action>,

    /// Whether the plan has any changes
    pub has_changes: bool,
}

impl Plan {
    pub fn new(actions: Vec<Action>) -> Self {
        let has_changes = actions.iter().any(|a| a.action_type != ActionType::NoOp);
        Self {
            actions,
            has_changes,
        }
    }

    /// Compare the Resources sections of two templates
    ///
    /// Without a previous template every resource is a create. A type
    /// change is reported as an update with `replacement` set.
    pub fn between(previous: Option<&Template>, next: &Template) -> Self {
        let Some(previous) = previous else {
            return Self::new(
                next.resources
                    .iter()
                    .map(|(id, r)| {
                        Action::new(id, ActionType::Create, &r.resource_type, format!("create {}", id))
                    })
                    .collect(),
            );
        };

        let ids: BTreeSet<&String> = previous
            .resources
            .keys()
            .chain(next.resources.keys())
            .collect();

        let actions = ids
            .into_iter()
            .filter_map(|id| match (previous.resources.get(id), next.resources.get(id)) {
                (None, Some(new)) => Some(Action::new(
                    id,
                    ActionType::Create,
                    &new.resource_type,
                    format!("create {}", id),
                )),
                (Some(old), None) => Some(Action::new(
                    id,
                    ActionType::Delete,
                    &old.resource_type,
                    format!("delete {}", id),
                )),
                (Some(old), Some(new)) => Some(compare(id, old, new)),
                (None, None) => None,
            })
            .collect();

        Self::new(actions)
    }

    /// Get actions by type
    pub fn actions_by_type(&self, action_type: ActionType) -> Vec<&Action> {
        self.actions
            .iter()
            .filter(|a| a.action_type == action_type)
            .collect()
    }

    pub fn action(&self, id: &str) -> Option<&Action> {
        self.actions.iter().find(|a| a.id == id)
    }

    /// Summary of the plan
    pub fn summary(&self) -> PlanSummary {
        PlanSummary {
            create: self.actions_by_type(ActionType::Create).len(),
            update: self.actions_by_type(ActionType::Update).len(),
            delete: self.actions_by_type(ActionType::Delete).len(),
            no_change: self.actions_by_type(ActionType::NoOp).len(),
        }
    }
}

fn compare(id: &str, old: &TemplateResource, new: &TemplateResource) -> Action {
    if old.resource_type != new.resource_type {
        let mut action = Action::new(
            id,
            ActionType::Update,
            &new.resource_type,
            format!("replace {} ({} -> {})", id, old.resource_type, new.resource_type),
        );
        action
            .details
            .insert("replacement".to_string(), serde_json::Value::Bool(true));
        return action;
    }

    let keys: BTreeSet<&String> = old.properties.keys().chain(new.properties.keys()).collect();
    let mut changed: Vec<String> = keys
        .into_iter()
        .filter(|k| old.properties.get(*k) != new.properties.get(*k))
        .cloned()
        .collect();
    if old.depends_on != new.depends_on {
        changed.push("DependsOn".to_string());
    }

    if changed.is_empty() {
        return Action::new(id, ActionType::NoOp, &new.resource_type, format!("{} unchanged", id));
    }

    let mut action = Action::new(
        id,
        ActionType::Update,
        &new.resource_type,
        format!("update {} ({})", id, changed.join(", ")),
    );
    action.details.insert(
        "changed_properties".to_string(),
        serde_json::Value::from(changed),
    );
    action
}

/// Summary of planned actions
#[derive(Debug, Clone)]
pub struct PlanSummary {
    pub create: usize,
    pub update: usize,
    pub delete: usize,
    pub no_change: usize,
}

impl std::fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} to create, {} to update, {} to delete, {} unchanged",
            self.create, self.update, self.delete, self.no_change
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn resource(resource_type: &str, properties: serde_json::Value) -> TemplateResource {
        let properties: BTreeMap<String, serde_json::Value> =
            serde_json::from_value(properties).unwrap();
        TemplateResource {
            resource_type: resource_type.to_string(),
            properties,
            depends_on: vec![],
        }
    }

    fn template(resources: Vec<(&str, TemplateResource)>) -> Template {
        let mut template = Template::empty();
        for (id, r) in resources {
            template.resources.insert(id.to_string(), r);
        }
        template
    }

    #[test]
    fn test_first_synthesis_creates_everything() {
        let next = template(vec![
            ("Cluster", resource("AWS::ECS::Cluster", json!({}))),
            ("Service", resource("AWS::ECS::Service", json!({}))),
        ]);

        let plan = Plan::between(None, &next);
        assert!(plan.has_changes);
        assert_eq!(plan.summary().create, 2);
    }

    #[test]
    fn test_update_lists_changed_properties() {
        let previous = template(vec![(
            "TaskDefinition",
            resource("AWS::ECS::TaskDefinition", json!({ "Family": "sample-api", "Image": "repo:41" })),
        )]);
        let next = template(vec![(
            "TaskDefinition",
            resource("AWS::ECS::TaskDefinition", json!({ "Family": "sample-api", "Image": "repo:42" })),
        )]);

        let plan = Plan::between(Some(&previous), &next);
        let action = plan.action("TaskDefinition").unwrap();
        assert_eq!(action.action_type, ActionType::Update);
        assert_eq!(action.changed_properties(), vec!["Image"]);
    }

    #[test]
    fn test_create_delete_and_noop() {
        let previous = template(vec![
            ("Cluster", resource("AWS::ECS::Cluster", json!({ "ClusterName": "a" }))),
            ("Old", resource("AWS::IAM::Role", json!({}))),
        ]);
        let next = template(vec![
            ("Cluster", resource("AWS::ECS::Cluster", json!({ "ClusterName": "a" }))),
            ("New", resource("AWS::IAM::Role", json!({}))),
        ]);

        let plan = Plan::between(Some(&previous), &next);
        let summary = plan.summary();
        assert_eq!(summary.create, 1);
        assert_eq!(summary.delete, 1);
        assert_eq!(summary.no_change, 1);
        assert_eq!(plan.action("Old").unwrap().action_type, ActionType::Delete);
        // 論理IDの順
        let ids: Vec<&str> = plan.actions.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["Cluster", "New", "Old"]);
    }

    #[test]
    fn test_depends_on_change_is_update() {
        let previous = template(vec![("Service", resource("AWS::ECS::Service", json!({})))]);
        let mut changed = resource("AWS::ECS::Service", json!({}));
        changed.depends_on = vec!["Rule".to_string()];
        let next = template(vec![("Service", changed)]);

        let plan = Plan::between(Some(&previous), &next);
        assert_eq!(
            plan.action("Service").unwrap().changed_properties(),
            vec!["DependsOn"]
        );
    }

    #[test]
    fn test_type_change_is_replacement() {
        let previous = template(vec![("Thing", resource("AWS::IAM::Role", json!({})))]);
        let next = template(vec![("Thing", resource("AWS::IAM::Policy", json!({})))]);

        let plan = Plan::between(Some(&previous), &next);
        let action = plan.action("Thing").unwrap();
        assert_eq!(action.action_type, ActionType::Update);
        assert_eq!(action.details["replacement"], json!(true));
    }

    #[test]
    fn test_identical_templates_have_no_changes() {
        let t = template(vec![("Cluster", resource("AWS::ECS::Cluster", json!({})))]);
        let plan = Plan::between(Some(&t), &t);
        assert!(!plan.has_changes);
        assert_eq!(plan.summary().to_string(), "0 to create, 0 to update, 0 to delete, 1 unchanged");
    }
}
