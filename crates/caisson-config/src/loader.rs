//! YAML loading with cross-document value inclusion.
//!
//! Documents may embed `!from_yaml <file> <dotted.key>` scalar nodes. The
//! loader parses with `serde_yaml`, then walks the tree replacing each
//! directive with the referenced value before anything downstream sees the
//! document. Configuration files are untrusted input: any other tag is
//! refused outright rather than constructed.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde_yaml::Value;

use crate::constants::INCLUDE_TAG;
use crate::error::{Error, Result};

/// Load and fully resolve one configuration document.
///
/// The inclusion cache is scoped to this call: independent loads share no
/// state, and a target referenced twice within one resolution is read and
/// parsed once.
pub fn load_document(path: &Path) -> Result<Value> {
    Loader::new().load(path)
}

struct Loader {
    /// Parsed-and-resolved documents keyed by canonical target path.
    cache: HashMap<PathBuf, Value>,
    /// Documents currently being resolved, for cycle detection.
    in_flight: Vec<PathBuf>,
}

impl Loader {
    fn new() -> Self {
        Self {
            cache: HashMap::new(),
            in_flight: Vec::new(),
        }
    }

    fn load(&mut self, path: &Path) -> Result<Value> {
        let text = fs::read_to_string(path).map_err(|e| Error::Open {
            path: path.to_path_buf(),
            source: e,
        })?;
        let doc: Value = serde_yaml::from_str(&text).map_err(|e| Error::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let dir = path.parent().unwrap_or(Path::new(".")).to_path_buf();
        self.resolve(doc, &dir, path)
    }

    /// Depth-first substitution of inclusion directives.
    fn resolve(&mut self, value: Value, dir: &Path, doc: &Path) -> Result<Value> {
        match value {
            Value::Mapping(map) => {
                let mut resolved = serde_yaml::Mapping::with_capacity(map.len());
                for (key, entry) in map {
                    resolved.insert(key, self.resolve(entry, dir, doc)?);
                }
                Ok(Value::Mapping(resolved))
            }
            Value::Sequence(seq) => {
                let resolved = seq
                    .into_iter()
                    .map(|entry| self.resolve(entry, dir, doc))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Value::Sequence(resolved))
            }
            Value::Tagged(tagged) => {
                let tag = tagged.tag.to_string();
                if tag.trim_start_matches('!') == INCLUDE_TAG.trim_start_matches('!') {
                    self.include(&tagged.value, dir, doc)
                } else {
                    Err(Error::ForbiddenTag {
                        path: doc.to_path_buf(),
                        tag,
                    })
                }
            }
            scalar => Ok(scalar),
        }
    }

    /// Resolve one `!from_yaml targetFile key.path` directive.
    fn include(&mut self, node: &Value, dir: &Path, doc: &Path) -> Result<Value> {
        let Value::String(content) = node else {
            return Err(Error::IncludeScalar {
                path: doc.to_path_buf(),
            });
        };
        let parts = shlex::split(content).unwrap_or_default();
        let [target, key] = parts.as_slice() else {
            return Err(Error::IncludeArity {
                path: doc.to_path_buf(),
                found: parts.len(),
            });
        };

        let external = self.load_target(&dir.join(target), target, doc)?;
        lookup_key(&external, key, target)
    }

    fn load_target(&mut self, path: &Path, spelled: &str, doc: &Path) -> Result<Value> {
        // Canonical key: the same file reached via two relative spellings is
        // still parsed once per top-level load.
        let canonical = path.canonicalize().map_err(|e| Error::IncludeTarget {
            path: doc.to_path_buf(),
            target: spelled.to_string(),
            source: e,
        })?;

        if let Some(cached) = self.cache.get(&canonical) {
            tracing::debug!(target = %canonical.display(), "include cache hit");
            return Ok(cached.clone());
        }
        if self.in_flight.contains(&canonical) {
            return Err(Error::IncludeCycle { path: canonical });
        }

        self.in_flight.push(canonical.clone());
        let resolved = self.load(&canonical);
        self.in_flight.pop();

        let resolved = resolved?;
        self.cache.insert(canonical, resolved.clone());
        Ok(resolved)
    }
}

/// Descend `doc` along a dotted key path.
fn lookup_key(doc: &Value, key: &str, target: &str) -> Result<Value> {
    let missing = || Error::IncludeKey {
        key: key.to_string(),
        target: target.to_string(),
    };

    let mut current = doc;
    for segment in split_key_path(key) {
        let Value::Mapping(map) = current else {
            return Err(missing());
        };
        current = map.get(segment.as_str()).ok_or_else(missing)?;
    }
    Ok(current.clone())
}

/// Split a dotted key path on unescaped `.` characters.
///
/// `\.` denotes a literal dot inside one segment; the escape backslash is
/// stripped. A backslash not followed by a dot stays literal.
fn split_key_path(key: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = key.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'.') => {
                chars.next();
                current.push('.');
            }
            '.' => segments.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    segments.push(current);
    segments
}
