//! Per-operation authorization rules, checked by every root field before it
//! runs.

use std::collections::BTreeMap;

use phrasebook_common_types::Role;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::auth::Viewer;
use crate::config::PermissionsConfig;

/// The error message of denied operations.
pub const NOT_AUTHORISED: &str = "Not Authorised!";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum Rule {
    /// Anyone, including anonymous viewers.
    Allow,
    /// No one.
    Deny,
    /// Viewers with a valid access token.
    Authenticated,
    /// Viewers whose access token carries the `admin` role.
    Admin,
}

impl Rule {
    pub fn allows(self, viewer: &Viewer) -> bool {
        match self {
            Rule::Allow => true,
            Rule::Deny => false,
            Rule::Authenticated => viewer.is_authenticated(),
            Rule::Admin => viewer.role() == Some(Role::Admin),
        }
    }
}

const ENTITIES: [&str; 2] = ["Comment", "Phrase"];

/// The rules that apply unless the configuration overrides them.
pub fn default_rules() -> BTreeMap<String, Rule> {
    let mut rules = BTreeMap::new();
    for entity in ENTITIES {
        for query in ["findUnique", "findFirst", "findMany", "aggregate"] {
            rules.insert(format!("{query}{entity}"), Rule::Allow);
        }
        rules.insert(format!("findMany{entity}Count"), Rule::Allow);
        rules.insert(format!("{}Events", entity.to_lowercase()), Rule::Allow);

        for mutation in ["createOne", "updateOne", "upsertOne", "deleteOne"] {
            rules.insert(format!("{mutation}{entity}"), Rule::Authenticated);
        }
        for mutation in ["updateMany", "deleteMany"] {
            rules.insert(format!("{mutation}{entity}"), Rule::Admin);
        }
    }
    rules.insert("importPhrases".to_string(), Rule::Admin);
    rules
}

#[derive(Debug, Clone)]
pub struct Permissions {
    rules: BTreeMap<String, Rule>,
    fallback: Rule,
}

impl Default for Permissions {
    fn default() -> Self {
        Self::new(&PermissionsConfig::default())
    }
}

impl Permissions {
    /// The default rules, with the configured ones taking precedence.
    pub fn new(config: &PermissionsConfig) -> Self {
        let mut rules = default_rules();
        rules.extend(config.rules.iter().map(|(op, rule)| (op.clone(), *rule)));

        Self {
            rules,
            fallback: config.fallback_rule,
        }
    }

    pub fn rule(&self, operation: &str) -> Rule {
        self.rules.get(operation).copied().unwrap_or(self.fallback)
    }

    pub fn allows(&self, operation: &str, viewer: &Viewer) -> bool {
        self.rule(operation).allows(viewer)
    }
}
