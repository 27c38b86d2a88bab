//! Per-event correlation cache.
//!
//! Rules that draw correlated values (user/email pairs, host/fqdn rows,
//! lookup-file rows) must stay consistent within one event: once a row has
//! been chosen for a field, a later rule referencing the paired field reuses
//! the same row instead of re-randomizing. The original implementation
//! threaded this state through an implicit attribute; here it is an explicit
//! struct carried by every [`crate::SampleEvent`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// One synthetic identity row shared by the user and email rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRow {
    pub name: String,
    pub email: String,
    pub domain_user: String,
    pub distinguished_name: String,
}

impl UserRow {
    /// Synthesize row `n` of the sequence, e.g. `user3` / `user3@email.com`.
    pub fn synthesize(n: u64) -> Self {
        UserRow {
            name: format!("user{n}"),
            email: format!("user{n}@email.com"),
            domain_user: format!(r"sample_domain.com\user{n}"),
            distinguished_name: format!("CN=user{n}"),
        }
    }

    /// Field access by the names used in `user[...]` replacement specs.
    pub fn get(&self, field: &str) -> Option<&str> {
        match field {
            "name" => Some(&self.name),
            "email" => Some(&self.email),
            "domain_user" => Some(&self.domain_user),
            "distinguished_name" => Some(&self.distinguished_name),
            _ => None,
        }
    }
}

/// The row selected from one lookup/sample file for this event. Indexed
/// file rules referencing the same file share the row, keeping columns of
/// one record correlated across tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSelection {
    /// Fields of the selected row.
    pub row: Vec<String>,
    /// Column names for CSV lookups with a header record.
    pub header: Vec<String>,
}

/// Correlated choices made so far while tokenizing one event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMap {
    /// Identity rows chosen by user/email rules, in occurrence order.
    pub user_rows: Vec<UserRow>,
    /// Synthesized host-family values, keyed by rule name then field
    /// (`host`, `ipv4`, `ipv6`, `fqdn`).
    pub host_rows: BTreeMap<String, BTreeMap<String, String>>,
    /// Selected rows per lookup file.
    pub file_rows: BTreeMap<PathBuf, FileSelection>,
}

impl CorrelationMap {
    /// The cached value of `field` for `rule`, if one was already chosen,
    /// otherwise the value produced by `make`, cached for later rules.
    pub fn host_value_or_insert(
        &mut self,
        rule: &str,
        field: &str,
        make: impl FnOnce() -> String,
    ) -> String {
        self.host_rows
            .entry(rule.to_string())
            .or_default()
            .entry(field.to_string())
            .or_insert_with(make)
            .clone()
    }
}
