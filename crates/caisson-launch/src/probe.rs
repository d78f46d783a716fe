//! Image metadata lookup via `docker inspect`.
//!
//! Because caisson always injects its own entrypoint, the image's built-in
//! default command and entrypoint have to be recovered explicitly when the
//! invocation relies on them.

use std::process::Command;

use serde::Deserialize;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Default, Deserialize)]
struct ImageConfig {
    #[serde(rename = "Cmd", default)]
    cmd: Option<Vec<String>>,
    #[serde(rename = "Entrypoint", default)]
    entrypoint: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct ImageInspect {
    #[serde(rename = "Config", default)]
    config: ImageConfig,
}

/// Default command baked into an image, if any.
pub fn image_command(image: &str) -> Result<Option<Vec<String>>> {
    Ok(inspect(image)?.cmd.filter(|cmd| !cmd.is_empty()))
}

/// Entrypoint baked into an image, if any.
pub fn image_entrypoint(image: &str) -> Result<Option<Vec<String>>> {
    Ok(inspect(image)?.entrypoint.filter(|ep| !ep.is_empty()))
}

fn inspect(image: &str) -> Result<ImageConfig> {
    let output = Command::new("docker")
        .args(["inspect", "--type", "image", image])
        .output()
        .map_err(|e| Error::DockerSpawn { source: e })?;

    if !output.status.success() {
        return Err(Error::Inspect {
            image: image.to_string(),
            message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    parse_inspect_output(&output.stdout, image)
}

/// Decode `docker inspect` output; split from [`inspect`] so decoding is
/// testable without a docker daemon.
fn parse_inspect_output(raw: &[u8], image: &str) -> Result<ImageConfig> {
    let mut entries: Vec<ImageInspect> = serde_json::from_slice(raw)?;
    match entries.pop() {
        Some(entry) => Ok(entry.config),
        None => Err(Error::Inspect {
            image: image.to_string(),
            message: "no such image".to_string(),
        }),
    }
}
