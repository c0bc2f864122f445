use toml::Value;

use crate::registry::AliasRecord;

pub type Table = toml::value::Table;

/// Which end of the transfer an alias is being injected for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Source,
    Target,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Source => "source",
            Side::Target => "target",
        }
    }
}

/// Recursively merge `overlay` onto `base`, returning a new table.
///
/// Tables merge key-by-key; everything else (scalars, arrays) is replaced
/// wholesale by the overlay value. Keys present on only one side are kept.
/// Neither input is mutated.
pub fn deep_merge(base: &Table, overlay: &Table) -> Table {
    let mut out = base.clone();
    for (key, value) in overlay {
        let merged = match (out.get(key), value) {
            (Some(Value::Table(b)), Value::Table(o)) => Value::Table(deep_merge(b, o)),
            _ => value.clone(),
        };
        out.insert(key.clone(), merged);
    }
    out
}

/// Merge newly injected alias data *under* the existing context: for any
/// overlapping leaf, the value already in the context wins; alias-only keys
/// are added. The parameter order encodes the precedence — do not swap it.
pub fn merge_under_existing(new: &Table, existing: &Table) -> Table {
    deep_merge(new, existing)
}

/// Layered key-value store carrying merged alias options across one
/// command invocation. Mutated only by [`ConfigContext::inject`], once per
/// side; read when the invocation is assembled.
#[derive(Debug, Clone, Default)]
pub struct ConfigContext {
    alias: Table,
}

impl ConfigContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one alias record's options into the context. No-op for a
    /// plain local endpoint with no alias. A side sub-record matching
    /// `side` overrides the alias's general options; values the context
    /// already holds win over everything newly injected.
    pub fn inject(&mut self, record: Option<&AliasRecord>, side: Side) {
        let Some(record) = record else { return };
        let mut candidate = record.export();
        if let Some(overrides) = record.side(side) {
            candidate = deep_merge(&candidate, &overrides.export());
        }
        self.alias = merge_under_existing(&candidate, &self.alias);
        tracing::trace!(side = side.as_str(), "alias options injected");
    }

    /// Look up `section.key` in the alias layer.
    pub fn option(&self, section: &str, key: &str) -> Option<&Value> {
        self.alias.get(section)?.as_table()?.get(key)
    }

    /// SSH configuration string handed to rsync's `-e` transport flag.
    pub fn ssh_config(&self) -> &str {
        self.option("options", "ssh")
            .and_then(Value::as_str)
            .unwrap_or("")
    }

    /// Mode letters declared by an alias, used when the command line does
    /// not set `--mode` itself.
    pub fn mode(&self) -> Option<&str> {
        self.option("options", "mode").and_then(Value::as_str)
    }

    pub fn alias_layer(&self) -> &Table {
        &self.alias
    }
}
