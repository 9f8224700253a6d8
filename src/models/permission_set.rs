//! Typed permission sets.
//!
//! A [`PermissionSet`] is the resolved collection of CRUD grants for one role.
//! Its JSON shape is shared with the legacy per-role document stored in
//! `roles.permissions`, so field names and omission rules must not change:
//! well-known resources are named fields, everything else lives under
//! `custom`, and unset flags are omitted rather than written as `false`.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

/// Action token that expands to all four CRUD actions.
pub const WILDCARD_ACTION: &str = "*";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
}

impl Action {
    pub const ALL: [Action; 4] = [Action::Create, Action::Read, Action::Update, Action::Delete];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Read => "read",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "create" => Ok(Action::Create),
            "read" => Ok(Action::Read),
            "update" => Ok(Action::Update),
            "delete" => Ok(Action::Delete),
            other => Err(format!("unknown action: {other}")),
        }
    }
}

/// An action as stored on a grant row: one concrete action or the wildcard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionPattern {
    One(Action),
    All,
}

impl ActionPattern {
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.trim() == WILDCARD_ACTION {
            return Some(ActionPattern::All);
        }
        raw.parse::<Action>().ok().map(ActionPattern::One)
    }

    pub fn actions(&self) -> &'static [Action] {
        match self {
            ActionPattern::One(Action::Create) => &[Action::Create],
            ActionPattern::One(Action::Read) => &[Action::Read],
            ActionPattern::One(Action::Update) => &[Action::Update],
            ActionPattern::One(Action::Delete) => &[Action::Delete],
            ActionPattern::All => &Action::ALL,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionPattern::One(action) => action.as_str(),
            ActionPattern::All => WILDCARD_ACTION,
        }
    }
}

/// Returns true when a stored action token covers the requested one.
pub fn action_matches(stored: &str, requested: &str) -> bool {
    let stored = stored.trim();
    stored == WILDCARD_ACTION || stored.eq_ignore_ascii_case(requested.trim())
}

/// Resources with a dedicated field in [`PermissionSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WellKnownResource {
    Users,
    Companies,
    Branches,
    Departments,
    Roles,
    Reports,
    Settings,
}

impl WellKnownResource {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "users" => Some(Self::Users),
            "companies" => Some(Self::Companies),
            "branches" => Some(Self::Branches),
            "departments" => Some(Self::Departments),
            "roles" => Some(Self::Roles),
            "reports" => Some(Self::Reports),
            "settings" => Some(Self::Settings),
            _ => None,
        }
    }
}

/// CRUD flags for one resource. `None` means "not granted".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PermissionDetail {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete: Option<bool>,
}

impl PermissionDetail {
    pub fn full() -> Self {
        Self {
            create: Some(true),
            read: Some(true),
            update: Some(true),
            delete: Some(true),
        }
    }

    pub fn read_only() -> Self {
        Self {
            read: Some(true),
            ..Self::default()
        }
    }

    fn flag(&self, action: Action) -> Option<bool> {
        match action {
            Action::Create => self.create,
            Action::Read => self.read,
            Action::Update => self.update,
            Action::Delete => self.delete,
        }
    }

    pub fn allows(&self, action: Action) -> bool {
        self.flag(action) == Some(true)
    }

    pub fn grant(&mut self, action: Action) {
        let slot = match action {
            Action::Create => &mut self.create,
            Action::Read => &mut self.read,
            Action::Update => &mut self.update,
            Action::Delete => &mut self.delete,
        };
        *slot = Some(true);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PermissionSet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub users: Option<PermissionDetail>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub companies: Option<PermissionDetail>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branches: Option<PermissionDetail>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub departments: Option<PermissionDetail>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roles: Option<PermissionDetail>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reports: Option<PermissionDetail>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<PermissionDetail>,
    #[serde(
        default,
        skip_serializing_if = "BTreeMap::is_empty",
        deserialize_with = "null_as_empty_map"
    )]
    pub custom: BTreeMap<String, PermissionDetail>,
}

fn null_as_empty_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, PermissionDetail>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<BTreeMap<String, PermissionDetail>> = Option::deserialize(deserializer)?;
    Ok(value.unwrap_or_default())
}

impl PermissionSet {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    fn named(&self, resource: WellKnownResource) -> Option<&PermissionDetail> {
        match resource {
            WellKnownResource::Users => self.users.as_ref(),
            WellKnownResource::Companies => self.companies.as_ref(),
            WellKnownResource::Branches => self.branches.as_ref(),
            WellKnownResource::Departments => self.departments.as_ref(),
            WellKnownResource::Roles => self.roles.as_ref(),
            WellKnownResource::Reports => self.reports.as_ref(),
            WellKnownResource::Settings => self.settings.as_ref(),
        }
    }

    fn named_mut(&mut self, resource: WellKnownResource) -> &mut Option<PermissionDetail> {
        match resource {
            WellKnownResource::Users => &mut self.users,
            WellKnownResource::Companies => &mut self.companies,
            WellKnownResource::Branches => &mut self.branches,
            WellKnownResource::Departments => &mut self.departments,
            WellKnownResource::Roles => &mut self.roles,
            WellKnownResource::Reports => &mut self.reports,
            WellKnownResource::Settings => &mut self.settings,
        }
    }

    /// Detail record for a resource, well-known fields first, then `custom`.
    pub fn detail(&self, resource: &str) -> Option<&PermissionDetail> {
        match WellKnownResource::from_name(resource) {
            Some(known) => self.named(known),
            None => self.custom.get(&resource.trim().to_lowercase()),
        }
    }

    pub fn detail_mut(&mut self, resource: &str) -> &mut PermissionDetail {
        match WellKnownResource::from_name(resource) {
            Some(known) => self.named_mut(known).get_or_insert_with(PermissionDetail::default),
            None => self
                .custom
                .entry(resource.trim().to_lowercase())
                .or_default(),
        }
    }

    pub fn grant(&mut self, resource: &str, pattern: ActionPattern) {
        let detail = self.detail_mut(resource);
        for action in pattern.actions() {
            detail.grant(*action);
        }
    }

    /// True only when the flag for `action` on `resource` is explicitly set.
    pub fn is_granted(&self, resource: &str, action: &str) -> bool {
        let Ok(action) = action.parse::<Action>() else {
            return false;
        };
        self.detail(resource)
            .map(|detail| detail.allows(action))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_known_resources_match_case_insensitively() {
        let mut set = PermissionSet::default();
        set.grant("Reports", ActionPattern::One(Action::Read));

        assert!(set.is_granted("reports", "read"));
        assert!(set.is_granted("REPORTS", "Read"));
        assert!(!set.is_granted("reports", "update"));
        assert!(set.custom.is_empty());
    }

    #[test]
    fn custom_resources_land_in_custom_bucket() {
        let mut set = PermissionSet::default();
        set.grant("Invoice", ActionPattern::All);

        assert!(set.custom.contains_key("invoice"));
        for action in ["create", "read", "update", "delete"] {
            assert!(set.is_granted("invoice", action));
        }
    }

    #[test]
    fn unset_and_false_flags_deny() {
        let set: PermissionSet = serde_json::from_str(
            r#"{"users":{"read":true,"create":false},"custom":{"invoice":{"update":null}}}"#,
        )
        .unwrap();

        assert!(set.is_granted("users", "read"));
        assert!(!set.is_granted("users", "create"));
        assert!(!set.is_granted("users", "delete"));
        assert!(!set.is_granted("invoice", "update"));
        assert!(!set.is_granted("users", "approve"));
    }

    #[test]
    fn serialization_omits_unset_fields() {
        let mut set = PermissionSet::default();
        set.grant("users", ActionPattern::One(Action::Read));
        set.grant("invoice", ActionPattern::One(Action::Update));

        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, r#"{"users":{"read":true},"custom":{"invoice":{"update":true}}}"#);
    }

    #[test]
    fn null_custom_bucket_is_accepted() {
        let set: PermissionSet = serde_json::from_str(r#"{"custom":null}"#).unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn action_patterns() {
        assert_eq!(ActionPattern::parse("*"), Some(ActionPattern::All));
        assert_eq!(ActionPattern::parse("UPDATE"), Some(ActionPattern::One(Action::Update)));
        assert_eq!(ActionPattern::parse("approve"), None);

        assert!(action_matches("*", "delete"));
        assert!(action_matches("Read", "read"));
        assert!(!action_matches("read", "update"));
    }
}
