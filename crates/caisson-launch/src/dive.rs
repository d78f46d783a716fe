//! One prepared container run.
//!
//! A [`Dive`] ties the configuration engine to the invocation assembly:
//! discover the anchor, load and validate the config, resolve the execution
//! context, stage the generated scripts, and render the `docker run` argv.

use std::env;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::Command;

use caisson_config::constants::ANCHOR_FILE;
use caisson_config::{
    AnchorLocator, Config, Discovery, Entrypoint, EnvMap, ExecutionContext, HookPhase, Overrides,
    load_document, resolve_context,
};

use crate::error::{Error, Result};
use crate::ids;
use crate::invocation::ContainerInvocation;
use crate::staging::{STAGING_CONTAINER_DIR, StagingDir};

/// Environment variable naming the project root inside the container.
pub const ROOT_VAR: &str = "CAISSON_ROOT";
/// Explicit path of the caisson-init helper, overriding the default lookup.
pub const INIT_BINARY_VAR: &str = "CAISSON_INIT_BINARY";
/// Helper binary expected next to the caisson executable.
pub const INIT_BINARY_NAME: &str = "caisson-init";

/// Variables consumed by caisson-init inside the container.
pub const INIT_UMASK_VAR: &str = "CAISSON_INIT_UMASK";
pub const INIT_UID_VAR: &str = "CAISSON_INIT_UID";
pub const INIT_GID_VAR: &str = "CAISSON_INIT_GID";
pub const INIT_USER_VAR: &str = "CAISSON_INIT_USER";
pub const INIT_GROUP_VAR: &str = "CAISSON_INIT_GROUP";
pub const INIT_VERBOSE_VAR: &str = "CAISSON_INIT_VERBOSE";

/// Invocation-time inputs gathered by the CLI.
#[derive(Debug, Default)]
pub struct DiveOptions {
    /// Raw command tokens after the program name; may name an alias.
    pub command: Vec<String>,
    pub image_override: Option<String>,
    pub shell_override: Option<String>,
    /// CLI entrypoint override; `Cleared` suppresses the image entrypoint.
    pub entrypoint_override: Option<Entrypoint>,
    /// Run as root, regardless of what the alias says.
    pub as_root: bool,
    pub verbose: bool,
    /// Extra environment from the command line; wins over the config.
    pub env: EnvMap,
    /// Extra arguments appended to `docker run`.
    pub docker_args: Vec<String>,
    /// Explicit caisson-init path. When unset, `CAISSON_INIT_BINARY` is
    /// consulted, then the file next to the caisson executable.
    pub init_binary: Option<PathBuf>,
}

/// A fully assembled container run, ready to render or execute.
///
/// Holds the staging directory alive; dropping the `Dive` removes the
/// staged files.
#[derive(Debug)]
pub struct Dive {
    invocation: ContainerInvocation,
    #[allow(dead_code)]
    staging: StagingDir,
    context: ExecutionContext,
    discovery: Discovery,
    /// Command tail placed after the image: entrypoint program (if any),
    /// then the shell and the staged command script.
    docker_cmd: Vec<String>,
}

impl Dive {
    /// Prepare a run starting discovery from the current working directory.
    pub fn prepare(options: DiveOptions) -> Result<Self> {
        let start = env::current_dir().map_err(|e| Error::io(".", e))?;
        Self::prepare_from(options, start)
    }

    /// Prepare a run starting discovery from an explicit directory.
    pub fn prepare_from(options: DiveOptions, start: PathBuf) -> Result<Self> {
        let (discovery, config) = load_project(&options, start)?;

        let overrides = Overrides {
            image: options.image_override.clone(),
            shell: options.shell_override.clone(),
        };
        let mut context = resolve_context(&config, &options.command, &overrides)?;

        let mut invocation = ContainerInvocation::new();

        // The project root is mounted at the same path inside the container,
        // with the working directory set back down to where caisson ran.
        invocation.add_mount(discovery.root.clone(), discovery.root.clone());
        invocation.set_workdir(discovery.root.join(&discovery.rel));
        invocation.add_env(ROOT_VAR, discovery.root.display().to_string())?;

        let staging = StagingDir::create()?;
        invocation.add_mount(staging.host_path().to_path_buf(), STAGING_CONTAINER_DIR);

        let init_path = locate_init_binary(&options)?;
        let init_container_path = staging.stage_file(INIT_BINARY_NAME, &init_path)?;
        invocation.add_option(format!("--entrypoint={}", init_container_path.display()));

        invocation.add_env(INIT_UMASK_VAR, format!("{:04o}", ids::current_umask()))?;
        if !options.as_root && !context.as_root {
            let identity = ids::current_identity()?;
            invocation.add_env(INIT_UID_VAR, identity.uid.to_string())?;
            invocation.add_env(INIT_GID_VAR, identity.gid.to_string())?;
            invocation.add_env(INIT_USER_VAR, identity.user)?;
            invocation.add_env(INIT_GROUP_VAR, identity.group)?;
        }
        if options.verbose {
            invocation.add_env(INIT_VERBOSE_VAR, "1")?;
        }

        for phase in HookPhase::ALL {
            let lines = config.hooks().get(phase);
            if lines.is_empty() {
                continue;
            }
            let container_path = staging.write_hook_script(phase, &context.shell, lines)?;
            invocation.add_env(
                format!("CAISSON_INIT_HOOK_{}", phase.name().to_uppercase()),
                container_path.display().to_string(),
            )?;
        }

        // Resolved config environment, then command-line extras on top.
        invocation.extend_env(&context.environment);
        invocation.extend_env(&options.env);

        // Allocate a TTY only when both ends are terminals, so piped runs
        // stay clean.
        if std::io::stdout().is_terminal() && std::io::stdin().is_terminal() {
            invocation.add_option("--tty");
        }
        for arg in &options.docker_args {
            invocation.add_option(arg.clone());
        }

        // Caisson always injects its own entrypoint, so an empty script must
        // re-create what the runtime would have done: run the image default.
        if context.script.is_empty() {
            let default_cmd = crate::probe::image_command(&context.image)?.ok_or_else(|| {
                Error::NoCommand {
                    image: context.image.clone(),
                }
            })?;
            let joined = shlex::try_join(default_cmd.iter().map(String::as_str))
                .map_err(|_| Error::NoCommand {
                    image: context.image.clone(),
                })?;
            context.script = vec![joined];
        }

        let mut docker_cmd = entrypoint_program(&options, &context)?;
        let command_script = staging.write_command_script(&context.script)?;
        docker_cmd.push(context.shell.clone());
        docker_cmd.push(command_script.display().to_string());

        Ok(Self {
            invocation,
            staging,
            context,
            discovery,
            docker_cmd,
        })
    }

    /// The resolved execution context backing this run.
    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    /// Where the anchor file was found.
    pub fn discovery(&self) -> &Discovery {
        &self.discovery
    }

    /// The complete `docker run` argv.
    pub fn docker_args(&self) -> Vec<String> {
        self.invocation
            .docker_run_args(&self.context.image, &self.docker_cmd)
    }

    /// The argv as one shell-quoted line, for display.
    pub fn command_line(&self) -> String {
        let args = self.docker_args();
        shlex::try_join(args.iter().map(String::as_str)).unwrap_or_else(|_| args.join(" "))
    }

    /// Run the container, returning its exit status.
    pub fn run(self) -> Result<i32> {
        let args = self.docker_args();
        let status = Command::new("docker")
            // Skip the rendered program name; argv[0] is implicit here.
            .args(args.iter().skip(1))
            .status()
            .map_err(|e| Error::DockerSpawn { source: e })?;
        Ok(status.code().unwrap_or(1))
    }
}

/// Discover and load the project configuration.
///
/// A missing anchor is forgiven when `--image` was given: the current
/// directory becomes the mount root and an empty config is assumed.
fn load_project(options: &DiveOptions, start: PathBuf) -> Result<(Discovery, Config)> {
    match AnchorLocator::from_env().locate_from(&start) {
        Ok(discovery) => {
            let doc = load_document(&discovery.anchor_path())?;
            let config = Config::from_value(&doc)?;
            Ok((discovery, config))
        }
        Err(
            caisson_config::Error::ConfigNotFound
            | caisson_config::Error::FilesystemBoundary { .. },
        ) if options.image_override.is_some() => {
            tracing::debug!("no {ANCHOR_FILE}; continuing on the image override alone");
            Ok((Discovery::at(start), Config::default()))
        }
        Err(e) => Err(e.into()),
    }
}

fn locate_init_binary(options: &DiveOptions) -> Result<PathBuf> {
    let path = match &options.init_binary {
        Some(path) => path.clone(),
        None => match env::var_os(INIT_BINARY_VAR) {
            Some(path) => PathBuf::from(path),
            None => {
                let exe = env::current_exe().map_err(|e| Error::io("caisson", e))?;
                exe.with_file_name(INIT_BINARY_NAME)
            }
        },
    };
    if !path.is_file() {
        return Err(Error::InitNotFound { path });
    }
    Ok(path)
}

/// The program run in front of the shell, per the entrypoint precedence:
/// CLI override, then the resolved context, then the image default.
fn entrypoint_program(options: &DiveOptions, context: &ExecutionContext) -> Result<Vec<String>> {
    if let Some(override_ep) = &options.entrypoint_override {
        return Ok(override_ep
            .as_command()
            .map(|program| vec![program.to_string()])
            .unwrap_or_default());
    }
    match &context.entrypoint {
        Entrypoint::Set(program) => Ok(vec![program.clone()]),
        Entrypoint::Cleared => Ok(Vec::new()),
        Entrypoint::Unset => Ok(crate::probe::image_entrypoint(&context.image)?.unwrap_or_default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caisson_test_utils::TestProject;
    use std::fs;

    fn dummy_init(project: &TestProject) -> PathBuf {
        project.write_file("fake-caisson-init", "#!/bin/sh\n");
        project.root().join("fake-caisson-init")
    }

    fn options(project: &TestProject, command: &[&str]) -> DiveOptions {
        DiveOptions {
            command: command.iter().map(ToString::to_string).collect(),
            init_binary: Some(dummy_init(project)),
            ..DiveOptions::default()
        }
    }

    #[test]
    fn prepares_a_basic_run() {
        let project = TestProject::new();
        // Null entrypoint keeps preparation off the docker daemon.
        project.write_anchor("image: busybox\nentrypoint:\n");

        let dive = Dive::prepare_from(options(&project, &["echo", "hi"]), project.root().into())
            .unwrap();

        let args = dive.docker_args();
        assert_eq!(&args[..4], ["docker", "run", "-i", "--rm"]);
        assert!(args.contains(&"busybox".to_string()));
        assert!(args.iter().any(|a| a.starts_with("--env=CAISSON_ROOT=")));
        assert!(args.iter().any(|a| a.starts_with("--env=CAISSON_INIT_UMASK=")));
        assert!(args.contains(&"--entrypoint=/.caisson/caisson-init".to_string()));

        // The tail runs the staged script under the default shell.
        assert_eq!(
            &args[args.len() - 2..],
            ["/bin/sh", "/.caisson/command.sh"]
        );
        assert_eq!(dive.context().script, [r#"echo hi"#]);
    }

    #[test]
    fn workdir_follows_the_relative_path() {
        let project = TestProject::new();
        project.write_anchor("image: busybox\nentrypoint:\n");
        let deep = project.mkdirs("src/deep");

        let dive = Dive::prepare_from(options(&project, &["pwd"]), deep.clone()).unwrap();
        let args = dive.docker_args();
        let workdir_pos = args.iter().position(|a| a == "-w").unwrap();
        assert_eq!(args[workdir_pos + 1], deep.display().to_string());
    }

    #[test]
    fn identity_is_skipped_for_root_runs() {
        let project = TestProject::new();
        project.write_anchor("image: busybox\nentrypoint:\n");

        let mut opts = options(&project, &["id"]);
        opts.as_root = true;
        let dive = Dive::prepare_from(opts, project.root().into()).unwrap();
        assert!(
            !dive
                .docker_args()
                .iter()
                .any(|a| a.starts_with("--env=CAISSON_INIT_UID="))
        );
    }

    #[test]
    fn hooks_are_staged_and_announced() {
        let project = TestProject::new();
        project.write_anchor(
            "image: busybox\nentrypoint:\nhooks:\n  root: apk add build-base\n  user: id\n",
        );

        let dive = Dive::prepare_from(options(&project, &["make"]), project.root().into()).unwrap();
        let args = dive.docker_args();
        assert!(
            args.contains(&"--env=CAISSON_INIT_HOOK_ROOT=/.caisson/hooks/root.sh".to_string())
        );
        assert!(
            args.contains(&"--env=CAISSON_INIT_HOOK_USER=/.caisson/hooks/user.sh".to_string())
        );
    }

    #[test]
    fn cli_environment_wins_over_config() {
        let project = TestProject::new();
        project.write_anchor("image: busybox\nentrypoint:\nenvironment:\n  LEVEL: config\n");

        let mut opts = options(&project, &["env"]);
        opts.env.insert("LEVEL".to_string(), "cli".to_string());
        let dive = Dive::prepare_from(opts, project.root().into()).unwrap();
        let args = dive.docker_args();
        assert!(args.contains(&"--env=LEVEL=cli".to_string()));
        assert!(!args.contains(&"--env=LEVEL=config".to_string()));
    }

    #[test]
    fn entrypoint_override_beats_the_context() {
        let project = TestProject::new();
        project.write_anchor("image: busybox\nentrypoint: /bin/from-config\n");

        let mut opts = options(&project, &["run"]);
        opts.entrypoint_override = Some(Entrypoint::Set("/bin/from-cli".to_string()));
        let dive = Dive::prepare_from(opts, project.root().into()).unwrap();
        let args = dive.docker_args();
        let image_pos = args.iter().position(|a| a == "busybox").unwrap();
        assert_eq!(args[image_pos + 1], "/bin/from-cli");

        let mut opts = options(&project, &["run"]);
        opts.entrypoint_override = Some(Entrypoint::Cleared);
        let dive = Dive::prepare_from(opts, project.root().into()).unwrap();
        let args = dive.docker_args();
        let image_pos = args.iter().position(|a| a == "busybox").unwrap();
        assert_eq!(args[image_pos + 1], "/bin/sh");
    }

    #[test]
    fn missing_anchor_is_forgiven_with_an_image_override() {
        let project = TestProject::new();

        let mut opts = options(&project, &["true"]);
        opts.image_override = Some("standin".to_string());
        opts.entrypoint_override = Some(Entrypoint::Cleared);
        let dive = Dive::prepare_from(opts, project.root().into()).unwrap();
        assert_eq!(dive.context().image, "standin");
        assert_eq!(dive.discovery().root, project.root());
    }

    #[test]
    fn missing_anchor_without_an_image_is_fatal() {
        let project = TestProject::new();

        let err = Dive::prepare_from(options(&project, &["true"]), project.root().into())
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Config(caisson_config::Error::ConfigNotFound)
                | Error::Config(caisson_config::Error::FilesystemBoundary { .. })
        ));
    }

    #[test]
    fn missing_init_binary_is_reported() {
        let project = TestProject::new();
        project.write_anchor("image: busybox\nentrypoint:\n");

        let opts = DiveOptions {
            command: vec!["true".to_string()],
            init_binary: Some(project.root().join("nope")),
            ..DiveOptions::default()
        };
        let err = Dive::prepare_from(opts, project.root().into()).unwrap_err();
        assert!(matches!(err, Error::InitNotFound { .. }));
    }

    #[test]
    fn command_line_round_trips() {
        let project = TestProject::new();
        project.write_anchor("image: busybox\nentrypoint:\n");

        let dive = Dive::prepare_from(
            options(&project, &["echo", "two words"]),
            project.root().into(),
        )
        .unwrap();
        let line = dive.command_line();
        assert_eq!(shlex::split(&line).unwrap(), dive.docker_args());
        fs::metadata(dive.staging.host_path().join("command.sh")).unwrap();
    }
}
