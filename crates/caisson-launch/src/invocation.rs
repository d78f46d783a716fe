//! Assembly of one `docker run` invocation.

use std::path::{Path, PathBuf};

use caisson_config::EnvMap;

use crate::error::{Error, Result};

/// Option appended to every bind mount so Docker relabels the directory for
/// SELinux compatibility.
const MOUNT_RELABEL: &str = "z";

/// One bind mount of the invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindMount {
    pub host: PathBuf,
    pub container: PathBuf,
    pub options: Vec<String>,
}

impl BindMount {
    fn render(&self) -> String {
        let mut options = self.options.clone();
        options.push(MOUNT_RELABEL.to_string());
        format!(
            "--volume={}:{}:{}",
            self.host.display(),
            self.container.display(),
            options.join(",")
        )
    }
}

/// Accumulates the pieces of a `docker run` command line.
///
/// Rendering is side-effect free: nothing here talks to Docker.
#[derive(Debug, Default)]
pub struct ContainerInvocation {
    env: Vec<(String, String)>,
    mounts: Vec<BindMount>,
    options: Vec<String>,
    workdir: Option<PathBuf>,
}

impl ContainerInvocation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an environment variable.
    ///
    /// Each launcher-owned variable is registered exactly once; a duplicate
    /// registration is a caller bug and reported as such.
    pub fn add_env(&mut self, name: impl Into<String>, value: impl Into<String>) -> Result<()> {
        let name = name.into();
        if self.env.iter().any(|(existing, _)| *existing == name) {
            return Err(Error::DuplicateEnv { name });
        }
        self.env.push((name, value.into()));
        Ok(())
    }

    /// Merge resolved environment variables, overriding earlier
    /// registrations of the same name.
    pub fn extend_env(&mut self, vars: &EnvMap) {
        for (name, value) in vars {
            match self.env.iter_mut().find(|(existing, _)| existing == name) {
                Some(slot) => slot.1 = value.clone(),
                None => self.env.push((name.clone(), value.clone())),
            }
        }
    }

    /// Add a bind mount.
    pub fn add_mount(&mut self, host: impl Into<PathBuf>, container: impl Into<PathBuf>) {
        self.mounts.push(BindMount {
            host: host.into(),
            container: container.into(),
            options: Vec::new(),
        });
    }

    /// Add a raw `docker run` option.
    pub fn add_option(&mut self, option: impl Into<String>) {
        self.options.push(option.into());
    }

    /// Set the container working directory.
    pub fn set_workdir(&mut self, workdir: impl Into<PathBuf>) {
        self.workdir = Some(workdir.into());
    }

    pub fn workdir(&self) -> Option<&Path> {
        self.workdir.as_deref()
    }

    /// Render the full argv: `docker run -i --rm <env> <mounts> <workdir>
    /// <options> <image> <command...>`.
    pub fn docker_run_args(&self, image: &str, command: &[String]) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "docker".into(),
            "run".into(),
            // interactive: keep STDIN open
            "-i".into(),
            // remove container after exit
            "--rm".into(),
        ];

        for (name, value) in &self.env {
            args.push(format!("--env={name}={value}"));
        }
        for mount in &self.mounts {
            args.push(mount.render());
        }
        if let Some(workdir) = &self.workdir {
            args.push("-w".into());
            args.push(workdir.display().to_string());
        }
        args.extend(self.options.iter().cloned());
        args.push(image.to_string());
        args.extend(command.iter().cloned());

        tracing::debug!(args = ?args, "rendered docker run argv");
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn renders_argv_in_stable_order() {
        let mut invocation = ContainerInvocation::new();
        invocation.add_env("ONE", "1").unwrap();
        invocation.add_env("TWO", "2").unwrap();
        invocation.add_mount("/host/project", "/host/project");
        invocation.set_workdir("/host/project/sub");
        invocation.add_option("--tty");

        let args = invocation.docker_run_args(
            "busybox",
            &["sh".to_string(), "/.caisson/command.sh".to_string()],
        );
        assert_eq!(
            args,
            [
                "docker",
                "run",
                "-i",
                "--rm",
                "--env=ONE=1",
                "--env=TWO=2",
                "--volume=/host/project:/host/project:z",
                "-w",
                "/host/project/sub",
                "--tty",
                "busybox",
                "sh",
                "/.caisson/command.sh",
            ]
        );
    }

    #[test]
    fn duplicate_env_registration_is_an_error() {
        let mut invocation = ContainerInvocation::new();
        invocation.add_env("NAME", "a").unwrap();
        let err = invocation.add_env("NAME", "b").unwrap_err();
        assert!(matches!(err, Error::DuplicateEnv { .. }));
    }

    #[test]
    fn extend_env_overrides_and_appends() {
        let mut invocation = ContainerInvocation::new();
        invocation.add_env("KEEP", "launcher").unwrap();
        invocation.add_env("CLOBBER", "launcher").unwrap();

        let mut resolved = EnvMap::new();
        resolved.insert("CLOBBER".to_string(), "config".to_string());
        resolved.insert("EXTRA".to_string(), "config".to_string());
        invocation.extend_env(&resolved);

        let args = invocation.docker_run_args("busybox", &[]);
        assert!(args.contains(&"--env=KEEP=launcher".to_string()));
        assert!(args.contains(&"--env=CLOBBER=config".to_string()));
        assert!(args.contains(&"--env=EXTRA=config".to_string()));
    }

    #[test]
    fn mount_options_join_with_the_relabel_flag() {
        let mount = BindMount {
            host: PathBuf::from("/tmp/stage"),
            container: PathBuf::from("/.caisson"),
            options: vec!["ro".to_string()],
        };
        assert_eq!(mount.render(), "--volume=/tmp/stage:/.caisson:ro,z");
    }
}
