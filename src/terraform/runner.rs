use std::path::Path;

use async_trait::async_trait;

use super::options::Options;
use super::plan::PlanStruct;
use crate::error::{Result, TfGateError};

/// `terraform fmt -check` exits with this code when files need formatting.
const FMT_UNFORMATTED_EXIT: i32 = 3;
const PLAN_FILE_NAME: &str = "tfplan";

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CommandOutput {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

/// Executes one CLI invocation. `TerraformCli` is the real one; tests script
/// their own.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, options: &Options, args: &[String]) -> Result<CommandOutput>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TerraformCli;

#[async_trait]
impl CommandRunner for TerraformCli {
    async fn run(&self, options: &Options, args: &[String]) -> Result<CommandOutput> {
        if options.binary.trim().is_empty() {
            return Err(TfGateError::Config("terraform binary is empty".to_string()));
        }

        let output = tokio::process::Command::new(&options.binary)
            .args(args)
            .current_dir(options.dir())
            .envs(options.command_env())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| TfGateError::Spawn {
                command: render_command(options, args),
                source,
            })?;

        Ok(CommandOutput {
            // NOTE: killed by signal has no code
            code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Result of `fmt -check -recursive`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FormatReport {
    pub output: String,
    pub unformatted: Vec<String>,
}

impl FormatReport {
    pub fn is_formatted(&self) -> bool {
        self.output.trim().is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Terraform<R = TerraformCli> {
    runner: R,
}

impl Terraform<TerraformCli> {
    pub fn cli() -> Self {
        Self::new(TerraformCli)
    }
}

impl<R: CommandRunner> Terraform<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub async fn init(&self, options: &Options) -> Result<String> {
        self.run_command(options, ["init", "-input=false", "-upgrade=false"])
            .await
    }

    pub async fn validate(&self, options: &Options) -> Result<String> {
        self.run_command(options, ["validate"]).await
    }

    /// Runs arbitrary arguments and returns stdout; a non-zero exit is an error.
    pub async fn run_command<I, S>(&self, options: &Options, args: I) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args = common_args(options, args);
        let output = self.exec(options, &args).await?;

        if !output.success() {
            return Err(failure(options, &args, &output));
        }

        Ok(output.stdout)
    }

    pub async fn format_check(&self, options: &Options) -> Result<FormatReport> {
        let args = common_args(options, ["fmt", "-check", "-recursive"]);
        let output = self.exec(options, &args).await?;

        match output.code {
            0 | FMT_UNFORMATTED_EXIT => {
                let unformatted = output
                    .stdout
                    .lines()
                    .map(str::trim)
                    .filter(|l| !l.is_empty())
                    .map(str::to_string)
                    .collect();
                Ok(FormatReport {
                    output: output.stdout,
                    unformatted,
                })
            }
            _ => Err(failure(options, &args, &output)),
        }
    }

    pub async fn plan(&self, options: &Options, plan_file: &Path) -> Result<String> {
        let mut args = vec![
            "plan".to_string(),
            "-input=false".to_string(),
            "-lock=false".to_string(),
            format!("-out={}", plan_file.display()),
        ];
        args.extend(options.var_args());
        self.run_command(options, args).await
    }

    pub async fn show(&self, options: &Options, plan_file: &Path) -> Result<PlanStruct> {
        let json = self
            .run_command(
                options,
                ["show".to_string(), "-json".to_string(), plan_file.display().to_string()],
            )
            .await?;
        PlanStruct::parse(&json)
    }

    /// Plans into `options.plan_file`, or a throwaway file per call, and
    /// returns the parsed plan.
    pub async fn plan_and_show(&self, options: &Options) -> Result<PlanStruct> {
        if let Some(plan_file) = &options.plan_file {
            self.plan(options, plan_file).await?;
            return self.show(options, plan_file).await;
        }

        let scratch = tempfile::tempdir()?;
        let plan_file = scratch.path().join(PLAN_FILE_NAME);
        self.plan(options, &plan_file).await?;
        let plan = self.show(options, &plan_file).await?;

        tracing::info!(resources = plan.resource_changes_map.len(), "plan parsed");

        Ok(plan)
    }

    pub async fn init_and_plan_and_show(&self, options: &Options) -> Result<PlanStruct> {
        self.init(options).await?;
        self.plan_and_show(options).await
    }

    async fn exec(&self, options: &Options, args: &[String]) -> Result<CommandOutput> {
        tracing::debug!(
            dir = %options.dir().display(),
            command = %render_command(options, args),
            "running terraform"
        );

        let output = self.runner.run(options, args).await?;

        tracing::info!(
            subcommand = args.first().map(String::as_str).unwrap_or_default(),
            code = output.code,
            "terraform finished"
        );

        Ok(output)
    }
}

fn common_args<I, S>(options: &Options, args: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut args: Vec<String> = args.into_iter().map(Into::into).collect();
    if options.no_color && !args.iter().any(|a| a == "-no-color") {
        args.push("-no-color".to_string());
    }
    args
}

fn render_command(options: &Options, args: &[String]) -> String {
    std::iter::once(options.binary.as_str())
        .chain(args.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}

fn failure(options: &Options, args: &[String], output: &CommandOutput) -> TfGateError {
    let stderr = if output.stderr.trim().is_empty() {
        output.stdout.trim().to_string()
    } else {
        output.stderr.trim().to_string()
    };

    TfGateError::CommandFailed {
        command: render_command(options, args),
        code: output.code,
        stderr,
    }
}
