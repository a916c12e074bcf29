use tracing::debug;

use super::command;
use crate::ExternalError;
use crate::traits::{ContainerConfig, ContainerEngine, ContainerHandle, ExternalResult};

/// Container engine driven through the `docker` command line.
#[derive(Debug, Clone)]
pub struct DockerCli {
    binary: String,
}

impl DockerCli {
    #[must_use]
    pub fn new() -> Self {
        Self {
            binary: "docker".to_string(),
        }
    }

    #[must_use]
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }
}

impl Default for DockerCli {
    fn default() -> Self {
        Self::new()
    }
}

fn run_args(config: &ContainerConfig) -> Vec<String> {
    vec![
        "run".to_string(),
        "--detach".to_string(),
        "--name".to_string(),
        config.name.clone(),
        "--hostname".to_string(),
        config.name.clone(),
        "--network".to_string(),
        config.network.clone(),
        "--ip".to_string(),
        config.ip.to_string(),
        config.image.clone(),
    ]
}

impl ContainerEngine for DockerCli {
    fn pull_image(&self, image: &str, progress: &mut dyn FnMut(&str)) -> ExternalResult<()> {
        let output = command::run(&self.binary, &["pull", image], None)?;
        for line in output.stdout.lines().filter(|l| !l.trim().is_empty()) {
            progress(line);
        }
        Ok(())
    }

    fn create_container(&self, config: &ContainerConfig) -> ExternalResult<ContainerHandle> {
        let args = run_args(config);
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        let output = command::run(&self.binary, &args, None)?;

        let id = output.stdout.trim();
        if id.is_empty() {
            return Err(ExternalError::new(format!(
                "{} run returned no container id for {}",
                self.binary, config.name
            )));
        }
        debug!(container = %config.name, id, "container started");
        Ok(ContainerHandle { id: id.to_string() })
    }

    fn remove_container(&self, id: &str) -> ExternalResult<()> {
        command::run(&self.binary, &["rm", "--force", id], None)?;
        Ok(())
    }

    fn exec(
        &self,
        id: &str,
        command: &[&str],
        stdin: &str,
        output: &mut dyn FnMut(&str),
    ) -> ExternalResult<String> {
        let mut args = vec!["exec", "--interactive", id];
        args.extend_from_slice(command);

        let result = command::run(&self.binary, &args, Some(stdin))?;
        for line in result.stderr.lines() {
            output(line);
        }
        Ok(result.stdout)
    }
}
