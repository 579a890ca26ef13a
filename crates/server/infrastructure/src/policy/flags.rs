//! Static feature flag client
//!
//! Values come from configuration as raw strings. A value keyed
//! `<flag>@<kind>:<key>` applies only when the scope carries that context;
//! the first matching context in scope order wins over the plain key.

use launcher_server_domain::launcher::{
    BoolFlag, FeatureFlagClient, FlagContext, FlagScope, IntFlag, StringFlag,
};
use launcher_shared::config::{FeatureFlagConfig, FlagContextDto};
use std::collections::BTreeMap;
use tracing::warn;
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
pub struct StaticFeatureFlagClient {
    values: BTreeMap<String, String>,
}

impl StaticFeatureFlagClient {
    pub fn new(values: BTreeMap<String, String>) -> Self {
        Self { values }
    }

    pub fn from_config(config: &FeatureFlagConfig) -> Self {
        Self::new(config.values.clone())
    }

    fn raw(&self, key: &str, scope: &FlagScope) -> Option<&str> {
        scope
            .contexts
            .iter()
            .find_map(|ctx| self.values.get(&format!("{}@{}", key, ctx)))
            .or_else(|| self.values.get(key))
            .map(String::as_str)
    }
}

impl FeatureFlagClient for StaticFeatureFlagClient {
    fn bool_variation(&self, flag: &BoolFlag, scope: &FlagScope) -> bool {
        match self.raw(flag.key, scope) {
            None => flag.default,
            Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => true,
                "false" | "0" | "no" | "off" => false,
                _ => {
                    warn!("Flag {} has non-boolean value '{}', using default", flag.key, raw);
                    flag.default
                }
            },
        }
    }

    fn int_variation(&self, flag: &IntFlag, scope: &FlagScope) -> i64 {
        match self.raw(flag.key, scope) {
            None => flag.default,
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                warn!("Flag {} has non-integer value '{}', using default", flag.key, raw);
                flag.default
            }),
        }
    }

    fn string_variation(&self, flag: &StringFlag, scope: &FlagScope) -> String {
        self.raw(flag.key, scope)
            .unwrap_or(flag.default)
            .to_string()
    }
}

/// Ambient contexts from configuration; `workspace`/`connection` kinds with
/// a UUID key become typed contexts
pub fn flag_contexts(dtos: &[FlagContextDto]) -> Vec<FlagContext> {
    dtos.iter()
        .map(|dto| match (dto.kind.as_str(), Uuid::parse_str(&dto.key)) {
            ("workspace", Ok(id)) => FlagContext::Workspace(id),
            ("connection", Ok(id)) => FlagContext::Connection(id),
            _ => FlagContext::Other {
                kind: dto.kind.clone(),
                key: dto.key.clone(),
            },
        })
        .collect()
}
