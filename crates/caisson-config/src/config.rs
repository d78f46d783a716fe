//! Typed configuration model built from a loaded document.

use std::collections::{BTreeMap, HashMap};
use std::env;
use std::fmt;

use serde_yaml::{Mapping, Value};

use crate::constants::DEFAULT_SHELL;
use crate::error::{Error, Result};
use crate::script::normalize_script;

/// Environment map with deterministic iteration order.
pub type EnvMap = BTreeMap<String, String>;

/// Top-level keys a document may carry; anything else is rejected.
const RECOGNIZED_KEYS: [&str; 6] = [
    "image",
    "aliases",
    "hooks",
    "entrypoint",
    "environment",
    "shell",
];

/// Tri-state entrypoint setting.
///
/// A document distinguishes the key being *absent* (`Unset`), *present but
/// empty* — a null or empty-string value, meaning "suppress any image
/// entrypoint" (`Cleared`) — and *present with a program* (`Set`). The
/// distinction must survive every merge step: an alias that says nothing
/// about the entrypoint must not disturb the global setting, while an alias
/// that clears it must win over a global program.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Entrypoint {
    /// Key not present in the source.
    #[default]
    Unset,
    /// Key present with a null or empty value: clear any entrypoint.
    Cleared,
    /// Key present with a program to use. Never empty.
    Set(String),
}

impl Entrypoint {
    /// Whether this setting says anything at all.
    pub fn is_unset(&self) -> bool {
        matches!(self, Entrypoint::Unset)
    }

    /// The configured value: `None` when unset, `Some("")` when cleared.
    pub fn value(&self) -> Option<&str> {
        match self {
            Entrypoint::Unset => None,
            Entrypoint::Cleared => Some(""),
            Entrypoint::Set(program) => Some(program),
        }
    }

    /// The program to inject, if one was configured.
    pub fn as_command(&self) -> Option<&str> {
        match self {
            Entrypoint::Set(program) => Some(program),
            _ => None,
        }
    }
}

/// Lifecycle phase a hook runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookPhase {
    /// Runs with root privileges, before identity is dropped.
    Root,
    /// Runs as the invoking user, before the command script.
    User,
}

impl HookPhase {
    /// All phases, in execution order.
    pub const ALL: [HookPhase; 2] = [HookPhase::Root, HookPhase::User];

    /// The document key and script-name for this phase.
    pub fn name(self) -> &'static str {
        match self {
            HookPhase::Root => "root",
            HookPhase::User => "user",
        }
    }
}

impl fmt::Display for HookPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Lifecycle scripts run inside the container before the user command.
///
/// Only the phase names "root" and "user" are meaningful; an absent phase is
/// an empty script list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Hooks {
    pub root: Vec<String>,
    pub user: Vec<String>,
}

impl Hooks {
    /// Command lines for one phase; empty when no hook is configured.
    pub fn get(&self, phase: HookPhase) -> &[String] {
        match phase {
            HookPhase::Root => &self.root,
            HookPhase::User => &self.user,
        }
    }
}

/// A named, reusable command template with optional per-alias overrides.
#[derive(Debug, Clone, PartialEq)]
pub struct Alias {
    pub name: String,
    /// Command lines; never empty.
    pub script: Vec<String>,
    pub image: Option<String>,
    pub entrypoint: Entrypoint,
    pub environment: EnvMap,
    pub shell: Option<String>,
    pub as_root: bool,
}

impl Alias {
    /// Build an alias from a scalar (plain script) or rich mapping node.
    fn from_node(name: &str, node: &Value) -> Result<Self> {
        let script = normalize_script(node, name)?;
        let mut alias = Alias {
            name: name.to_string(),
            script,
            image: None,
            entrypoint: Entrypoint::Unset,
            environment: EnvMap::new(),
            shell: None,
            as_root: false,
        };

        if let Value::Mapping(map) = node {
            alias.image = get_string(map, "image", name)?;
            alias.entrypoint = parse_entrypoint(map)?;
            alias.environment =
                parse_environment(map.get("environment"), &format!("{name}.environment"))?;
            alias.shell = get_string(map, "shell", name)?;
            alias.as_root = get_bool(map, "root", name)?.unwrap_or(false);
        }
        Ok(alias)
    }
}

/// One validated `.caisson.yml`.
///
/// Environment values are canonicalized during construction: YAML booleans
/// render as lowercase `"true"`/`"false"` in both the mapping form and the
/// `KEY=VALUE` list form, and numbers render in their YAML display form.
#[derive(Debug, Clone)]
pub struct Config {
    image: Option<String>,
    shell: String,
    entrypoint: Entrypoint,
    environment: EnvMap,
    aliases: HashMap<String, Alias>,
    hooks: Hooks,
}

impl Default for Config {
    /// The configuration equivalent of an empty document.
    fn default() -> Self {
        Self {
            image: None,
            shell: DEFAULT_SHELL.to_string(),
            entrypoint: Entrypoint::Unset,
            environment: EnvMap::new(),
            aliases: HashMap::new(),
            hooks: Hooks::default(),
        }
    }
}

impl Config {
    /// Build a config from a loaded document.
    ///
    /// A missing `image` is not an error here: a call-site override may
    /// still supply one. [`Config::image`] performs the deferred check.
    pub fn from_value(doc: &Value) -> Result<Self> {
        let map = match doc {
            // An empty file parses as null and means "all defaults".
            Value::Null => return Ok(Self::default()),
            Value::Mapping(map) => map,
            other => {
                return Err(Error::TopLevelShape {
                    actual: type_name(other),
                });
            }
        };

        let unrecognized: Vec<String> = map
            .keys()
            .filter_map(|key| match key {
                Value::String(name) if RECOGNIZED_KEYS.contains(&name.as_str()) => None,
                Value::String(name) => Some(name.clone()),
                other => Some(format!("<{}>", type_name(other))),
            })
            .collect();
        if !unrecognized.is_empty() {
            return Err(Error::UnrecognizedKeys { keys: unrecognized });
        }

        Ok(Self {
            image: get_string(map, "image", "")?,
            shell: get_string(map, "shell", "")?.unwrap_or_else(|| DEFAULT_SHELL.to_string()),
            entrypoint: parse_entrypoint(map)?,
            environment: parse_environment(map.get("environment"), "environment")?,
            aliases: parse_aliases(map.get("aliases"))?,
            hooks: parse_hooks(map.get("hooks"))?,
        })
    }

    /// Top-level image.
    ///
    /// Deferred validation: erroring here rather than at build time lets a
    /// call-site `--image` override stand in for a missing value.
    pub fn image(&self) -> Result<&str> {
        self.image.as_deref().ok_or(Error::ImageNotSet)
    }

    /// Top-level image without the deferred check.
    pub fn image_opt(&self) -> Option<&str> {
        self.image.as_deref()
    }

    pub fn shell(&self) -> &str {
        &self.shell
    }

    pub fn entrypoint(&self) -> &Entrypoint {
        &self.entrypoint
    }

    pub fn environment(&self) -> &EnvMap {
        &self.environment
    }

    pub fn alias(&self, name: &str) -> Option<&Alias> {
        self.aliases.get(name)
    }

    pub fn aliases(&self) -> &HashMap<String, Alias> {
        &self.aliases
    }

    pub fn hooks(&self) -> &Hooks {
        &self.hooks
    }
}

/// Parse a `KEY=VALUE` environment specification.
///
/// A bare `KEY` pulls the value from the process environment, defaulting to
/// empty. Used for list-form `environment` entries and shared with the CLI's
/// `--env` option.
pub fn env_var_spec(entry: &str) -> Option<(String, String)> {
    let (key, value) = match entry.split_once('=') {
        Some((key, value)) => (key, value.to_string()),
        None => (entry, env::var(entry).unwrap_or_default()),
    };
    if key.is_empty() {
        return None;
    }
    Some((key.to_string(), value))
}

/// Human name for a YAML node type, for error messages.
pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "list",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}

fn scoped(scope: &str, key: &str) -> String {
    if scope.is_empty() {
        key.to_string()
    } else {
        format!("{scope}.{key}")
    }
}

fn get_string(map: &Mapping, key: &str, scope: &str) -> Result<Option<String>> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) => Ok(Some(value.clone())),
        Some(other) => Err(Error::StringExpected {
            name: scoped(scope, key),
            actual: type_name(other),
        }),
    }
}

fn get_bool(map: &Mapping, key: &str, scope: &str) -> Result<Option<bool>> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(value)) => Ok(Some(*value)),
        Some(other) => Err(Error::BoolExpected {
            name: scoped(scope, key),
            actual: type_name(other),
        }),
    }
}

/// Tri-state entrypoint parse.
///
/// A mapping entry with a null value is valid and distinct from the key
/// being absent, so a plain `get`-with-default cannot tell them apart.
fn parse_entrypoint(map: &Mapping) -> Result<Entrypoint> {
    match map.get("entrypoint") {
        None => Ok(Entrypoint::Unset),
        Some(Value::Null) => Ok(Entrypoint::Cleared),
        Some(Value::String(program)) if program.is_empty() => Ok(Entrypoint::Cleared),
        Some(Value::String(program)) => Ok(Entrypoint::Set(program.clone())),
        Some(other) => Err(Error::StringExpected {
            name: "entrypoint".to_string(),
            actual: type_name(other),
        }),
    }
}

/// Environment node parse: a mapping, or a list of `KEY=VALUE` / bare `KEY`
/// strings. Keys and values always come out as strings.
fn parse_environment(node: Option<&Value>, name: &str) -> Result<EnvMap> {
    let mut environment = EnvMap::new();
    match node {
        None | Some(Value::Null) => {}
        Some(Value::Mapping(map)) => {
            for (key, value) in map {
                let Value::String(key) = key else {
                    return Err(Error::EnvironmentEntry {
                        name: name.to_string(),
                        entry: format!("<{} key>", type_name(key)),
                    });
                };
                let rendered = match value {
                    // A null value pulls the variable from the process
                    // environment, defaulting to empty.
                    Value::Null => env::var(key).unwrap_or_default(),
                    Value::String(value) => value.clone(),
                    Value::Bool(value) => value.to_string(),
                    Value::Number(value) => value.to_string(),
                    other => {
                        return Err(Error::EnvironmentEntry {
                            name: name.to_string(),
                            entry: format!("{key} (<{}>)", type_name(other)),
                        });
                    }
                };
                environment.insert(key.clone(), rendered);
            }
        }
        Some(Value::Sequence(seq)) => {
            for entry in seq {
                let Value::String(entry) = entry else {
                    return Err(Error::EnvironmentEntry {
                        name: name.to_string(),
                        entry: format!("<{}>", type_name(entry)),
                    });
                };
                let Some((key, value)) = env_var_spec(entry) else {
                    return Err(Error::EnvironmentEntry {
                        name: name.to_string(),
                        entry: entry.clone(),
                    });
                };
                environment.insert(key, value);
            }
        }
        Some(other) => {
            return Err(Error::EnvironmentShape {
                name: name.to_string(),
                actual: type_name(other),
            });
        }
    }
    Ok(environment)
}

fn parse_aliases(node: Option<&Value>) -> Result<HashMap<String, Alias>> {
    let mut aliases = HashMap::new();
    match node {
        None | Some(Value::Null) => {}
        Some(Value::Mapping(map)) => {
            for (key, value) in map {
                let Value::String(name) = key else {
                    return Err(Error::AliasNameType {
                        actual: type_name(key),
                    });
                };
                if name.contains(char::is_whitespace) {
                    return Err(Error::AliasNameWhitespace { name: name.clone() });
                }
                aliases.insert(name.clone(), Alias::from_node(name, value)?);
            }
        }
        Some(other) => {
            return Err(Error::MappingExpected {
                name: "aliases".to_string(),
                actual: type_name(other),
            });
        }
    }
    Ok(aliases)
}

fn parse_hooks(node: Option<&Value>) -> Result<Hooks> {
    let mut hooks = Hooks::default();
    match node {
        None | Some(Value::Null) => {}
        Some(Value::Mapping(map)) => {
            // Names outside the fixed phase set carry no meaning and are
            // ignored.
            for phase in HookPhase::ALL {
                match map.get(phase.name()) {
                    None | Some(Value::Null) => {}
                    Some(entry) => {
                        let script = normalize_script(entry, &format!("hooks.{phase}"))?;
                        match phase {
                            HookPhase::Root => hooks.root = script,
                            HookPhase::User => hooks.user = script,
                        }
                    }
                }
            }
        }
        Some(other) => {
            return Err(Error::MappingExpected {
                name: "hooks".to_string(),
                actual: type_name(other),
            });
        }
    }
    Ok(hooks)
}
