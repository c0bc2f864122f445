use std::fmt;
use std::str::FromStr;

use crate::error::{RelayError, Result};
use crate::registry::{AliasRecord, AliasSource};

/// Placeholder inside an alias path component that expands to the alias's
/// declared root, e.g. `@dev:{root}/shared/files`.
pub const ROOT_PLACEHOLDER: &str = "{root}";

/// Raw user-supplied location reference, parsed once.
///
/// Supported forms:
/// - Local: `/path/to/dir`, `./relative`, `relative/path`
/// - Alias: `@name` (path defaults to the alias root)
/// - Alias with path: `@name:sub/dir`, `@name:/absolute`, `@name:{root}/sub`
#[derive(Debug, Clone, PartialEq)]
pub struct LocationExpression {
    raw: String,
    alias: Option<String>,
    path: String,
}

impl LocationExpression {
    pub fn parse(s: &str) -> std::result::Result<Self, String> {
        if let Some(rest) = s.strip_prefix('@') {
            let (name, path) = match rest.split_once(':') {
                Some((name, path)) => (name, path),
                None => (rest, ""),
            };
            if name.is_empty() {
                return Err(format!("'{}': empty alias name", s));
            }
            Ok(Self {
                raw: s.to_string(),
                alias: Some(name.to_string()),
                path: path.to_string(),
            })
        } else {
            Ok(Self {
                raw: s.to_string(),
                alias: None,
                path: s.to_string(),
            })
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    pub fn path_part(&self) -> &str {
        &self.path
    }
}

impl FromStr for LocationExpression {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for LocationExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

/// Where a resolved endpoint lives. `host`/`user` exist iff remote.
#[derive(Debug, Clone, PartialEq)]
pub enum EndpointKind {
    Local,
    Remote { host: String, user: String },
}

/// One fully-resolved side of a transfer.
///
/// Both path renditions are kept: `path` has any trailing separator
/// trimmed, `path_verbatim` preserves it. The distinction carries rsync
/// semantics — a trailing slash means "the directory's contents" rather
/// than the directory itself.
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub kind: EndpointKind,
    path: String,
    path_verbatim: String,
    pub alias: Option<AliasRecord>,
}

impl Endpoint {
    /// Resolve an expression into an endpoint using the given alias
    /// lookup. No I/O beyond the lookup and the working directory.
    pub fn resolve(expr: &LocationExpression, aliases: &dyn AliasSource) -> Result<Self> {
        match expr.alias() {
            None => {
                let verbatim = resolve_local(expr.path_part())?;
                Ok(Self {
                    kind: EndpointKind::Local,
                    path: trim_trailing_slash(&verbatim),
                    path_verbatim: verbatim,
                    alias: None,
                })
            }
            Some(name) => {
                let record = aliases
                    .lookup(name)
                    .ok_or_else(|| RelayError::UnknownAlias {
                        name: name.to_string(),
                    })?
                    .clone();
                let verbatim = join_root(&record.expanded_root(), expr.path_part());
                let kind = match &record.host {
                    Some(host) => EndpointKind::Remote {
                        host: host.clone(),
                        user: record.user.clone().unwrap_or_else(whoami::username),
                    },
                    None => EndpointKind::Local,
                };
                Ok(Self {
                    kind,
                    path: trim_trailing_slash(&verbatim),
                    path_verbatim: verbatim,
                    alias: Some(record),
                })
            }
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self.kind, EndpointKind::Remote { .. })
    }

    /// Fully-qualified path, trailing slash trimmed.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Fully-qualified path, trailing slash preserved as typed.
    pub fn path_verbatim(&self) -> &str {
        &self.path_verbatim
    }

    /// Transfer spec as rsync sees it: `user@host:path` for remote
    /// endpoints, the bare path otherwise. Trailing slash trimmed.
    pub fn spec(&self) -> String {
        self.render(&self.path)
    }

    /// Same as [`Endpoint::spec`] but preserving a trailing slash.
    pub fn spec_verbatim(&self) -> String {
        self.render(&self.path_verbatim)
    }

    fn render(&self, path: &str) -> String {
        match &self.kind {
            EndpointKind::Local => path.to_string(),
            EndpointKind::Remote { host, user } => format!("{}@{}:{}", user, host, path),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.spec())
    }
}

/// Reject endpoint pairs the transfer mechanism cannot express. Must run
/// after resolution and before any prompt or invocation.
pub fn validate_pair(source: &Endpoint, dest: &Endpoint) -> Result<()> {
    if source.is_remote() && dest.is_remote() {
        return Err(RelayError::RemoteToRemote {
            source: source.spec(),
            dest: dest.spec(),
        });
    }
    Ok(())
}

fn trim_trailing_slash(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() && path.starts_with('/') {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

fn resolve_local(part: &str) -> Result<String> {
    if part.starts_with('/') {
        return Ok(part.to_string());
    }
    let cwd = std::env::current_dir()?;
    let rel = part.strip_prefix("./").unwrap_or(part);
    let mut out = if rel.is_empty() || rel == "." {
        cwd.display().to_string()
    } else {
        format!("{}/{}", cwd.display(), rel)
    };
    if part.ends_with('/') && !out.ends_with('/') {
        out.push('/');
    }
    Ok(out)
}

fn join_root(root: &str, part: &str) -> String {
    if part.is_empty() {
        return root.to_string();
    }
    let root = root.trim_end_matches('/');
    if part.contains(ROOT_PLACEHOLDER) {
        return part.replace(ROOT_PLACEHOLDER, root);
    }
    if part.starts_with('/') {
        return part.to_string();
    }
    format!("{}/{}", root, part)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Table;
    use std::collections::BTreeMap;

    struct StubAliases(BTreeMap<String, AliasRecord>);

    impl AliasSource for StubAliases {
        fn lookup(&self, name: &str) -> Option<&AliasRecord> {
            self.0.get(name)
        }
    }

    fn record(host: Option<&str>, user: Option<&str>, root: &str) -> AliasRecord {
        AliasRecord {
            host: host.map(String::from),
            user: user.map(String::from),
            root: root.to_string(),
            options: Table::new(),
            command: Table::new(),
            source: None,
            target: None,
        }
    }

    fn aliases() -> StubAliases {
        let mut map = BTreeMap::new();
        map.insert(
            "dev".to_string(),
            record(Some("example.com"), Some("me"), "/var/www"),
        );
        map.insert("mirror".to_string(), record(None, None, "/srv/mirror"));
        StubAliases(map)
    }

    #[test]
    fn test_parse_bare_path() {
        let expr = LocationExpression::parse("./src").unwrap();
        assert_eq!(expr.alias(), None);
        assert_eq!(expr.path_part(), "./src");
        assert_eq!(expr.to_string(), "./src");
    }

    #[test]
    fn test_parse_alias_token() {
        let expr = LocationExpression::parse("@dev").unwrap();
        assert_eq!(expr.alias(), Some("dev"));
        assert_eq!(expr.path_part(), "");
    }

    #[test]
    fn test_parse_alias_with_path() {
        let expr = LocationExpression::parse("@dev:sub/dir/").unwrap();
        assert_eq!(expr.alias(), Some("dev"));
        assert_eq!(expr.path_part(), "sub/dir/");
    }

    #[test]
    fn test_parse_empty_alias_name_rejected() {
        assert!(LocationExpression::parse("@").is_err());
        assert!(LocationExpression::parse("@:path").is_err());
    }

    #[test]
    fn test_resolve_local_relative() {
        let expr = LocationExpression::parse("./src").unwrap();
        let endpoint = Endpoint::resolve(&expr, &aliases()).unwrap();
        assert!(!endpoint.is_remote());
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(endpoint.path(), format!("{}/src", cwd.display()));
        assert!(endpoint.alias.is_none());
    }

    #[test]
    fn test_resolve_local_absolute() {
        let expr = LocationExpression::parse("/var/tmp").unwrap();
        let endpoint = Endpoint::resolve(&expr, &aliases()).unwrap();
        assert!(!endpoint.is_remote());
        assert_eq!(endpoint.path(), "/var/tmp");
        assert_eq!(endpoint.spec(), "/var/tmp");
    }

    #[test]
    fn test_trailing_slash_preserved_and_trimmed() {
        let slashed = Endpoint::resolve(
            &LocationExpression::parse("./src/").unwrap(),
            &aliases(),
        )
        .unwrap();
        assert!(slashed.path_verbatim().ends_with('/'));
        assert!(!slashed.path().ends_with('/'));

        let plain = Endpoint::resolve(
            &LocationExpression::parse("./src").unwrap(),
            &aliases(),
        )
        .unwrap();
        assert!(!plain.path_verbatim().ends_with('/'));
        assert!(!plain.path().ends_with('/'));
    }

    #[test]
    fn test_resolve_remote_alias() {
        let expr = LocationExpression::parse("@dev").unwrap();
        let endpoint = Endpoint::resolve(&expr, &aliases()).unwrap();
        assert!(endpoint.is_remote());
        assert_eq!(
            endpoint.kind,
            EndpointKind::Remote {
                host: "example.com".into(),
                user: "me".into()
            }
        );
        assert_eq!(endpoint.spec(), "me@example.com:/var/www");
        assert!(endpoint.alias.is_some());
    }

    #[test]
    fn test_resolve_alias_with_relative_path() {
        let expr = LocationExpression::parse("@dev:shared/files/").unwrap();
        let endpoint = Endpoint::resolve(&expr, &aliases()).unwrap();
        assert_eq!(endpoint.spec_verbatim(), "me@example.com:/var/www/shared/files/");
        assert_eq!(endpoint.spec(), "me@example.com:/var/www/shared/files");
    }

    #[test]
    fn test_resolve_alias_with_absolute_path() {
        let expr = LocationExpression::parse("@dev:/etc/nginx").unwrap();
        let endpoint = Endpoint::resolve(&expr, &aliases()).unwrap();
        assert_eq!(endpoint.spec(), "me@example.com:/etc/nginx");
    }

    #[test]
    fn test_resolve_alias_root_placeholder() {
        let expr = LocationExpression::parse("@dev:{root}/shared").unwrap();
        let endpoint = Endpoint::resolve(&expr, &aliases()).unwrap();
        assert_eq!(endpoint.spec(), "me@example.com:/var/www/shared");
    }

    #[test]
    fn test_resolve_alias_without_host_is_local() {
        let expr = LocationExpression::parse("@mirror:docs").unwrap();
        let endpoint = Endpoint::resolve(&expr, &aliases()).unwrap();
        assert!(!endpoint.is_remote());
        assert_eq!(endpoint.spec(), "/srv/mirror/docs");
        // Alias record still travels with the endpoint for injection.
        assert!(endpoint.alias.is_some());
    }

    #[test]
    fn test_resolve_remote_default_user() {
        let mut map = BTreeMap::new();
        map.insert("bare".to_string(), record(Some("example.com"), None, "/srv"));
        let expr = LocationExpression::parse("@bare").unwrap();
        let endpoint = Endpoint::resolve(&expr, &StubAliases(map)).unwrap();
        match &endpoint.kind {
            EndpointKind::Remote { user, .. } => assert_eq!(user, &whoami::username()),
            _ => panic!("expected remote endpoint"),
        }
    }

    #[test]
    fn test_resolve_unknown_alias() {
        let expr = LocationExpression::parse("@staging").unwrap();
        let err = Endpoint::resolve(&expr, &aliases()).unwrap_err();
        match err {
            RelayError::UnknownAlias { name } => assert_eq!(name, "staging"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_validate_pair_combinations() {
        let local = Endpoint::resolve(
            &LocationExpression::parse("/tmp/a").unwrap(),
            &aliases(),
        )
        .unwrap();
        let remote = Endpoint::resolve(
            &LocationExpression::parse("@dev").unwrap(),
            &aliases(),
        )
        .unwrap();

        assert!(validate_pair(&local, &local).is_ok());
        assert!(validate_pair(&local, &remote).is_ok());
        assert!(validate_pair(&remote, &local).is_ok());

        let err = validate_pair(&remote, &remote).unwrap_err();
        match err {
            RelayError::RemoteToRemote { source, dest } => {
                assert_eq!(source, "me@example.com:/var/www");
                assert_eq!(dest, "me@example.com:/var/www");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_trim_trailing_slash_root() {
        assert_eq!(trim_trailing_slash("/"), "/");
        assert_eq!(trim_trailing_slash("/var/www/"), "/var/www");
        assert_eq!(trim_trailing_slash("/var/www"), "/var/www");
    }
}
