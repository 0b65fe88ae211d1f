use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_json::Value;

pub const DEFAULT_BINARY: &str = "terraform";
pub const BINARY_ENV: &str = "TFGATE_TERRAFORM_BINARY";

/// Per-invocation context handed to every Terraform command.
#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    pub terraform_dir: PathBuf,
    pub binary: String,
    pub no_color: bool,
    pub vars: BTreeMap<String, Value>,
    pub env_vars: BTreeMap<String, String>,
    pub plan_file: Option<PathBuf>,
}

impl Options {
    pub fn new(terraform_dir: impl Into<PathBuf>) -> Self {
        let binary = std::env::var(BINARY_ENV)
            .ok()
            .filter(|b| !b.is_empty())
            .unwrap_or_else(|| DEFAULT_BINARY.to_string());

        Self {
            terraform_dir: terraform_dir.into(),
            binary,
            no_color: false,
            vars: BTreeMap::new(),
            env_vars: BTreeMap::new(),
            plan_file: None,
        }
    }

    pub fn no_color(mut self, no_color: bool) -> Self {
        self.no_color = no_color;
        self
    }

    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.insert(key.into(), value.into());
        self
    }

    pub fn with_plan_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.plan_file = Some(path.into());
        self
    }

    pub fn dir(&self) -> &Path {
        &self.terraform_dir
    }

    /// `-var key=value` pairs in key order.
    pub fn var_args(&self) -> Vec<String> {
        self.vars
            .iter()
            .flat_map(|(key, value)| ["-var".to_string(), format!("{}={}", key, render_var(value))])
            .collect()
    }

    /// Environment passed to the child process on top of the inherited one.
    pub fn command_env(&self) -> Vec<(String, String)> {
        let mut env = vec![
            ("TF_IN_AUTOMATION".to_string(), "1".to_string()),
            ("TF_INPUT".to_string(), "0".to_string()),
        ];
        env.extend(self.env_vars.iter().map(|(k, v)| (k.clone(), v.clone())));
        env
    }
}

// NOTE: strings go through raw; Terraform parses anything else as an HCL expression
fn render_var(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_var_args_string_is_raw() {
        let opts = Options::new("/tf").with_var("app_name", "test-app-terraform");
        assert_eq!(opts.var_args(), vec!["-var", "app_name=test-app-terraform"]);
    }

    #[test]
    fn test_var_args_sorted_and_typed() {
        let opts = Options::new("/tf")
            .with_var("zones", json!(["1", "2"]))
            .with_var("app_name", "web")
            .with_var("instances", 2);
        assert_eq!(
            opts.var_args(),
            vec![
                "-var",
                "app_name=web",
                "-var",
                "instances=2",
                "-var",
                "zones=[\"1\",\"2\"]",
            ]
        );
    }

    #[test]
    fn test_command_env_includes_automation_flags() {
        let opts = Options::new("/tf").with_env("ARM_SUBSCRIPTION_ID", "sub");
        let env = opts.command_env();
        assert!(env.contains(&("TF_IN_AUTOMATION".to_string(), "1".to_string())));
        assert!(env.contains(&("TF_INPUT".to_string(), "0".to_string())));
        assert!(env.contains(&("ARM_SUBSCRIPTION_ID".to_string(), "sub".to_string())));
    }

    #[test]
    fn test_builder_defaults() {
        let opts = Options::new("/tf").with_binary("tofu");
        assert_eq!(opts.dir(), Path::new("/tf"));
        assert_eq!(opts.binary, "tofu");
        assert!(!opts.no_color);
        assert!(opts.plan_file.is_none());
    }
}
