//! Terraform CLI wrapper: builds arguments, spawns the binary and parses
//! `show -json` plans.

mod options;
mod plan;
mod runner;

pub use options::{BINARY_ENV, DEFAULT_BINARY, Options};
pub use plan::{
    Attributes, Change, Module, PlanJson, PlanStruct, PlannedResource, PlannedValues,
    ResourceChange, attr_path,
};
pub use runner::{CommandOutput, CommandRunner, FormatReport, Terraform, TerraformCli};
