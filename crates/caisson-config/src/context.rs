//! Resolution of a command line against a loaded configuration.

use crate::config::{Alias, Config, Entrypoint, EnvMap};
use crate::error::{Error, Result};

/// Call-site overrides, applied after any alias match and therefore with the
/// highest precedence.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub image: Option<String>,
    pub shell: Option<String>,
}

/// Fully resolved parameters for one container invocation.
///
/// A value object: built in one resolution pass and handed to the launcher
/// unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionContext {
    pub image: String,
    /// Command lines to run. Empty when the invocation supplied no command;
    /// the launcher then substitutes the image's default command.
    pub script: Vec<String>,
    pub entrypoint: Entrypoint,
    pub environment: EnvMap,
    pub shell: String,
    pub as_root: bool,
}

/// Resolve `command` against `config` into an [`ExecutionContext`].
///
/// Three strictly ordered phases: seed from the global config, apply at most
/// one matching alias, then apply the call-site overrides. Each phase wins
/// over the previous for the fields it touches. The deferred image check
/// runs last: only a context that still has no image after all three phases
/// is an error.
pub fn resolve_context(
    config: &Config,
    command: &[String],
    overrides: &Overrides,
) -> Result<ExecutionContext> {
    // Phase 1: seed from the global config.
    let mut image: Option<String> = None;
    let mut script: Vec<String> = Vec::new();
    let mut entrypoint = config.entrypoint().clone();
    let mut environment = config.environment().clone();
    let mut shell = config.shell().to_string();
    let mut as_root = false;

    // Phase 2: at most one alias application.
    if let Some((first, rest)) = command.split_first() {
        match config.alias(first) {
            Some(alias) => {
                tracing::debug!(alias = %alias.name, "command word matched an alias");
                if let Some(alias_image) = &alias.image {
                    image = Some(alias_image.clone());
                }
                if !alias.entrypoint.is_unset() {
                    entrypoint = alias.entrypoint.clone();
                }
                if let Some(alias_shell) = &alias.shell {
                    shell = alias_shell.clone();
                }
                as_root = as_root || alias.as_root;
                // Merge by key; the alias wins on conflict.
                environment.extend(
                    alias
                        .environment
                        .iter()
                        .map(|(key, value)| (key.clone(), value.clone())),
                );
                script = alias_script(alias, rest)?;
            }
            None => {
                tracing::debug!(command = %first, "no alias match, treating command literally");
                script = vec![quote_join(command)?];
            }
        }
    }

    // Phase 3: call-site overrides, then the deferred image fallback.
    if let Some(shell_override) = &overrides.shell {
        shell = shell_override.clone();
    }
    if let Some(image_override) = &overrides.image {
        image = Some(image_override.clone());
    }
    let image = match image {
        Some(image) => image,
        None => config.image()?.to_string(),
    };

    Ok(ExecutionContext {
        image,
        script,
        entrypoint,
        environment,
        shell,
        as_root,
    })
}

/// Substitute extra command tokens into an alias body.
///
/// A multi-line body is fixed: extra tokens are an error. A single-line body
/// takes the remaining tokens appended, shell-quoted, so they reach the
/// script as the arguments the caller typed.
fn alias_script(alias: &Alias, rest: &[String]) -> Result<Vec<String>> {
    match alias.script.as_slice() {
        [line] => {
            let mut line = line.clone();
            if !rest.is_empty() {
                line.push(' ');
                line.push_str(&quote_join(rest)?);
            }
            Ok(vec![line])
        }
        body => {
            if !rest.is_empty() {
                return Err(Error::MultilineAliasArgs);
            }
            Ok(body.to_vec())
        }
    }
}

/// Join tokens into one shell line, quoting each as needed.
///
/// The quoted form round-trips through `shlex::split` unchanged.
fn quote_join(tokens: &[String]) -> Result<String> {
    shlex::try_join(tokens.iter().map(String::as_str)).map_err(|_| Error::Quote)
}
