use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use toml::Value;

use crate::context::{Side, Table};
use crate::error::{RelayError, Result};

/// Lookup capability handed to the resolver. Implemented by [`Registry`];
/// tests substitute in-memory maps.
pub trait AliasSource {
    fn lookup(&self, name: &str) -> Option<&AliasRecord>;
}

/// Side-specific overrides nested under an alias (`[aliases.<name>.source]`
/// or `[aliases.<name>.target]`).
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct SideRecord {
    #[serde(default, skip_serializing_if = "Table::is_empty")]
    pub options: Table,
    #[serde(default, skip_serializing_if = "Table::is_empty")]
    pub command: Table,
}

impl SideRecord {
    pub fn export(&self) -> Table {
        let mut out = Table::new();
        out.insert("options".into(), Value::Table(self.options.clone()));
        out.insert("command".into(), Value::Table(self.command.clone()));
        out
    }
}

/// One registered alias: where it points and what options it declares.
///
/// `host` absent means the alias names a local tree. `user` absent means
/// the current login user is assumed at resolution time.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AliasRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    pub root: String,
    #[serde(default, skip_serializing_if = "Table::is_empty")]
    pub options: Table,
    #[serde(default, skip_serializing_if = "Table::is_empty")]
    pub command: Table,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<SideRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<SideRecord>,
}

impl AliasRecord {
    /// The `{options, command}` candidate table injected into the
    /// configuration context.
    pub fn export(&self) -> Table {
        let mut out = Table::new();
        out.insert("options".into(), Value::Table(self.options.clone()));
        out.insert("command".into(), Value::Table(self.command.clone()));
        out
    }

    pub fn side(&self, side: Side) -> Option<&SideRecord> {
        match side {
            Side::Source => self.source.as_ref(),
            Side::Target => self.target.as_ref(),
        }
    }

    /// Alias root with a leading `~` expanded against the home directory.
    pub fn expanded_root(&self) -> String {
        if let Some(rest) = self.root.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return format!("{}/{}", home.display(), rest);
            }
        } else if self.root == "~" {
            if let Some(home) = dirs::home_dir() {
                return home.display().to_string();
            }
        }
        self.root.clone()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Registry {
    #[serde(default)]
    aliases: BTreeMap<String, AliasRecord>,
}

impl Registry {
    /// Load the registry from `path`, or from the default config location.
    /// A missing file yields an empty registry; a malformed one is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = fs::read_to_string(&path)?;
        toml::from_str(&text)
            .map_err(|e| RelayError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn config_path() -> Result<PathBuf> {
        let base = dirs::config_dir()
            .ok_or_else(|| RelayError::Config("could not determine config directory".into()))?;
        Ok(base.join("relay").join("config.toml"))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.aliases.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }

    /// Render one alias back as TOML for `--show-alias`.
    pub fn show(&self, name: &str) -> Option<String> {
        #[derive(Serialize)]
        struct Doc<'a> {
            aliases: BTreeMap<&'a str, &'a AliasRecord>,
        }

        let record = self.aliases.get(name)?;
        let doc = Doc {
            aliases: BTreeMap::from([(name, record)]),
        };
        toml::to_string_pretty(&doc).ok()
    }
}

impl AliasSource for Registry {
    fn lookup(&self, name: &str) -> Option<&AliasRecord> {
        self.aliases.get(name)
    }
}
