// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rules and the context they run against
//!
//! A [`Rule`] is one unit of business logic. Scheduling binds a list of rules
//! to a single [`RuleContext`] describing the entity change that triggered
//! them; each binding is a [`RuleTask`].

use crate::error::RuleError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::{Arc, RwLock};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                $name(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                $name(s.to_string())
            }
        }
    };
}

string_id!(
    /// Identity of the entity a batch of rules runs for
    EntityKey
);
string_id!(
    /// Identifier of a rule
    RuleId
);
string_id!(
    /// Operation that triggered rule selection (e.g. `create`, `approve`)
    OperationId
);

/// Shared state for one batch of rules on one entity
///
/// Snapshots are read-only. The processing state is a small key/value map
/// rules may use to hand values to rules later in the same batch.
#[derive(Debug)]
pub struct RuleContext {
    entity: EntityKey,
    operation: OperationId,
    before: Option<Value>,
    after: Option<Value>,
    state: RwLock<Map<String, Value>>,
}

impl RuleContext {
    pub fn new(entity: impl Into<EntityKey>, operation: impl Into<OperationId>) -> Self {
        Self {
            entity: entity.into(),
            operation: operation.into(),
            before: None,
            after: None,
            state: RwLock::new(Map::new()),
        }
    }

    pub fn with_before(mut self, before: Value) -> Self {
        self.before = Some(before);
        self
    }

    pub fn with_after(mut self, after: Value) -> Self {
        self.after = Some(after);
        self
    }

    pub fn entity(&self) -> &EntityKey {
        &self.entity
    }

    pub fn operation(&self) -> &OperationId {
        &self.operation
    }

    /// Entity state before the triggering operation, if any
    pub fn before(&self) -> Option<&Value> {
        self.before.as_ref()
    }

    /// Entity state after the triggering operation, if any
    pub fn after(&self) -> Option<&Value> {
        self.after.as_ref()
    }

    pub fn state(&self, key: &str) -> Option<Value> {
        self.state
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    pub fn set_state(&self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.state
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.into(), value)
    }
}

/// A unit of business logic run against a [`RuleContext`]
pub trait Rule: Send + Sync {
    fn id(&self) -> &RuleId;

    fn execute(&self, context: &RuleContext) -> Result<(), RuleError>;
}

/// Rule backed by a closure
pub struct FnRule<F> {
    id: RuleId,
    body: F,
}

impl<F> FnRule<F>
where
    F: Fn(&RuleContext) -> Result<(), RuleError> + Send + Sync + 'static,
{
    pub fn new(id: impl Into<RuleId>, body: F) -> Self {
        Self {
            id: id.into(),
            body,
        }
    }

    /// Wrap into the shared form scheduling expects
    pub fn shared(id: impl Into<RuleId>, body: F) -> Arc<dyn Rule> {
        Arc::new(Self::new(id, body))
    }
}

impl<F> Rule for FnRule<F>
where
    F: Fn(&RuleContext) -> Result<(), RuleError> + Send + Sync + 'static,
{
    fn id(&self) -> &RuleId {
        &self.id
    }

    fn execute(&self, context: &RuleContext) -> Result<(), RuleError> {
        (self.body)(context)
    }
}

impl fmt::Debug for dyn Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule").field("id", self.id()).finish()
    }
}

/// A rule bound to the context of the batch it belongs to
#[derive(Clone, Debug)]
pub struct RuleTask {
    rule: Arc<dyn Rule>,
    context: Arc<RuleContext>,
}

impl RuleTask {
    pub fn new(rule: Arc<dyn Rule>, context: Arc<RuleContext>) -> Self {
        Self { rule, context }
    }

    /// Bind every rule to the same shared context, preserving order
    pub fn batch(rules: Vec<Arc<dyn Rule>>, context: &Arc<RuleContext>) -> Vec<RuleTask> {
        rules
            .into_iter()
            .map(|rule| RuleTask::new(rule, Arc::clone(context)))
            .collect()
    }

    pub fn id(&self) -> &RuleId {
        self.rule.id()
    }

    pub fn context(&self) -> &Arc<RuleContext> {
        &self.context
    }

    pub fn execute(&self) -> Result<(), RuleError> {
        self.rule.execute(&self.context)
    }
}

#[cfg(test)]
#[path = "rule_tests.rs"]
mod tests;
