use std::path::PathBuf;

use clap::{Parser, Subcommand};

use tfgate::layout::TERRAFORM_DIR_ENV;
use tfgate::terraform::{BINARY_ENV, DEFAULT_BINARY};

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run every configuration check and print a summary.
    Check(TargetArgs),
    /// Plan the configuration and list the resource changes.
    Plan(PlanArgs),
}

#[derive(clap::Args, Debug)]
pub struct TargetArgs {
    /// Terraform configuration directory (defaults to ../../terraform).
    #[arg(long, env = TERRAFORM_DIR_ENV)]
    pub dir: Option<PathBuf>,

    #[arg(long, env = BINARY_ENV, default_value = DEFAULT_BINARY)]
    pub binary: String,

    /// Keep ANSI colors in Terraform output.
    #[arg(long)]
    pub color: bool,
}

#[derive(clap::Args, Debug)]
pub struct PlanArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    #[arg(long, default_value = "test-app-terraform")]
    pub app_name: String,

    /// Print the raw `terraform show -json` document instead of a table.
    #[arg(long)]
    pub json: bool,
}
