//! Assertions over the App Service configuration.
//!
//! Each check is independent: it takes the output of one or two Terraform
//! calls and either passes or explains what it found instead.

mod error;

use std::sync::Arc;

use serde_json::Value;
use tokio::task::JoinSet;

pub use error::CheckError;

use crate::terraform::{
    CommandRunner, FormatReport, Options, PlanStruct, ResourceChange, Terraform, attr_path,
};

pub const SERVICE_PLAN_TYPE: &str = "azurerm_service_plan";
pub const WEB_APP_TYPE: &str = "azurerm_linux_web_app";

pub const EXPECTED_SKU: &str = "F1";
pub const EXPECTED_OS: &str = "Linux";
pub const ALLOWED_PHP_VERSIONS: &[&str] = &["8.0", "8.1", "8.2", "8.3"];

const PHP_VERSION_PATH: &[&str] = &[
    "site_config",
    "0",
    "application_stack",
    "0",
    "php_version",
];

pub fn check_formatted(report: &FormatReport) -> Result<(), CheckError> {
    if report.is_formatted() {
        return Ok(());
    }
    Err(CheckError::Unformatted {
        files: report.unformatted.clone(),
    })
}

pub fn check_service_plan(plan: &PlanStruct, sku: &str, os: &str) -> Result<(), CheckError> {
    let service_plan = single_of_type(plan, SERVICE_PLAN_TYPE)?;
    expect_attr(service_plan, &["sku_name"], &Value::from(sku))?;
    expect_attr(service_plan, &["os_type"], &Value::from(os))
}

pub fn check_php_version(plan: &PlanStruct, allowed: &[&str]) -> Result<(), CheckError> {
    let web_app = single_of_type(plan, WEB_APP_TYPE)?;
    let attribute = PHP_VERSION_PATH.join(".");

    let version = web_app
        .after()
        .and_then(|bag| attr_path(bag, PHP_VERSION_PATH))
        .and_then(Value::as_str)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| CheckError::AttributeMissing {
            address: web_app.address.clone(),
            attribute: attribute.clone(),
        })?;

    if allowed.contains(&version) {
        return Ok(());
    }

    Err(CheckError::NotAllowed {
        address: web_app.address.clone(),
        attribute,
        actual: Value::from(version).to_string(),
        allowed: allowed.iter().map(|v| v.to_string()).collect(),
    })
}

pub fn check_https_only(plan: &PlanStruct) -> Result<(), CheckError> {
    let web_app = single_of_type(plan, WEB_APP_TYPE)?;
    expect_attr(web_app, &["https_only"], &Value::Bool(true))
}

fn single_of_type<'a>(
    plan: &'a PlanStruct,
    resource_type: &str,
) -> Result<&'a ResourceChange, CheckError> {
    let mut matches = plan.resources_of_type(resource_type);
    let first = matches.next().ok_or_else(|| CheckError::ResourceMissing {
        resource_type: resource_type.to_string(),
    })?;

    let extra = matches.count();
    if extra > 0 {
        return Err(CheckError::DuplicateResource {
            resource_type: resource_type.to_string(),
            count: extra + 1,
        });
    }

    Ok(first)
}

fn expect_attr(
    resource: &ResourceChange,
    path: &[&str],
    expected: &Value,
) -> Result<(), CheckError> {
    let attribute = path.join(".");
    let actual = resource
        .after()
        .and_then(|bag| attr_path(bag, path))
        .filter(|v| !v.is_null())
        .ok_or_else(|| CheckError::AttributeMissing {
            address: resource.address.clone(),
            attribute: attribute.clone(),
        })?;

    if actual == expected {
        return Ok(());
    }

    Err(CheckError::AttributeMismatch {
        address: resource.address.clone(),
        attribute,
        expected: expected.to_string(),
        actual: actual.to_string(),
    })
}

/// The five cases run against the configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Case {
    Format,
    Validate,
    ServicePlanSku,
    PhpVersion,
    HttpsOnly,
}

impl Case {
    pub const ALL: [Case; 5] = [
        Case::Format,
        Case::Validate,
        Case::ServicePlanSku,
        Case::PhpVersion,
        Case::HttpsOnly,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Case::Format => "terraform_format",
            Case::Validate => "terraform_validate",
            Case::ServicePlanSku => "app_service_plan_sku",
            Case::PhpVersion => "app_service_php_version",
            Case::HttpsOnly => "https_enforced",
        }
    }

    /// `app_name` fed to plan-based cases; each gets its own.
    pub fn app_name(&self) -> Option<&'static str> {
        match self {
            Case::Format | Case::Validate => None,
            Case::ServicePlanSku => Some("test-app-terraform"),
            Case::PhpVersion => Some("test-app-php-version"),
            Case::HttpsOnly => Some("test-app-https"),
        }
    }

    /// Everything but the format check needs an initialized working dir.
    pub fn needs_init(&self) -> bool {
        !matches!(self, Case::Format)
    }

    pub fn options(&self, base: &Options) -> Options {
        match self.app_name() {
            Some(app_name) => base.clone().with_var("app_name", app_name),
            None => base.clone(),
        }
    }
}

#[derive(Debug)]
pub struct CheckOutcome {
    pub case: Case,
    pub result: Result<(), CheckError>,
}

impl CheckOutcome {
    pub fn passed(&self) -> bool {
        self.result.is_ok()
    }
}

/// Runs one case on its own, including the `init` it depends on.
pub async fn run_case<R: CommandRunner>(
    terraform: &Terraform<R>,
    base: &Options,
    case: Case,
) -> Result<(), CheckError> {
    if case.needs_init() {
        terraform.init(base).await?;
    }
    run_initialized(terraform, base, case).await
}

async fn run_initialized<R: CommandRunner>(
    terraform: &Terraform<R>,
    base: &Options,
    case: Case,
) -> Result<(), CheckError> {
    let options = case.options(base);

    match case {
        Case::Format => check_formatted(&terraform.format_check(&options).await?),
        Case::Validate => {
            terraform.validate(&options).await?;
            Ok(())
        }
        Case::ServicePlanSku => {
            let plan = terraform.plan_and_show(&options).await?;
            check_service_plan(&plan, EXPECTED_SKU, EXPECTED_OS)
        }
        Case::PhpVersion => {
            let plan = terraform.plan_and_show(&options).await?;
            check_php_version(&plan, ALLOWED_PHP_VERSIONS)
        }
        Case::HttpsOnly => {
            let plan = terraform.plan_and_show(&options).await?;
            check_https_only(&plan)
        }
    }
}

/// Runs every case concurrently. `init` runs once up front so the cases never
/// race on `.terraform/`. A failing case never cancels its siblings; outcomes
/// come back in `Case::ALL` order.
pub async fn run_all<R>(terraform: Arc<Terraform<R>>, base: &Options) -> Vec<CheckOutcome>
where
    R: CommandRunner + 'static,
{
    let init_error = match terraform.init(base).await {
        Ok(_) => None,
        Err(e) => {
            tracing::warn!(error = %e, "terraform init failed");
            Some(e.to_string())
        }
    };

    let mut set = JoinSet::new();

    for case in Case::ALL {
        let terraform = Arc::clone(&terraform);
        let base = base.clone();
        let init_error = init_error.clone().filter(|_| case.needs_init());
        set.spawn(async move {
            let result = match init_error {
                Some(message) => Err(CheckError::InitFailed(message)),
                None => run_initialized(&terraform, &base, case).await,
            };
            match &result {
                Ok(()) => tracing::info!(case = case.name(), "check passed"),
                Err(e) => tracing::warn!(case = case.name(), error = %e, "check failed"),
            }
            CheckOutcome { case, result }
        });
    }

    let mut outcomes = Vec::with_capacity(Case::ALL.len());
    let mut finished = Vec::new();
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(outcome) => {
                finished.push(outcome.case);
                outcomes.push(outcome);
            }
            Err(e) => tracing::error!(error = %e, "check task aborted"),
        }
    }

    for case in Case::ALL {
        if !finished.contains(&case) {
            outcomes.push(CheckOutcome {
                case,
                result: Err(CheckError::Aborted(format!("{} did not complete", case.name()))),
            });
        }
    }

    outcomes.sort_by_key(|o| o.case);
    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn plan_with(resources: Value) -> PlanStruct {
        let json = json!({ "format_version": "1.2", "resource_changes": resources });
        PlanStruct::parse(&json.to_string()).unwrap()
    }

    fn service_plan(address: &str, sku: &str, os: &str) -> Value {
        json!({
            "address": address,
            "type": "azurerm_service_plan",
            "name": "main",
            "change": {"actions": ["create"], "after": {"sku_name": sku, "os_type": os}}
        })
    }

    fn web_app(after: Value) -> Value {
        json!({
            "address": "azurerm_linux_web_app.main",
            "type": "azurerm_linux_web_app",
            "name": "main",
            "change": {"actions": ["create"], "after": after}
        })
    }

    #[test]
    fn test_service_plan_passes() {
        let plan = plan_with(json!([service_plan("azurerm_service_plan.main", "F1", "Linux")]));
        assert!(check_service_plan(&plan, EXPECTED_SKU, EXPECTED_OS).is_ok());
    }

    #[test]
    fn test_service_plan_wrong_sku() {
        let plan = plan_with(json!([service_plan("azurerm_service_plan.main", "B1", "Linux")]));
        let err = check_service_plan(&plan, EXPECTED_SKU, EXPECTED_OS).unwrap_err();
        match err {
            CheckError::AttributeMismatch {
                attribute,
                expected,
                actual,
                ..
            } => {
                assert_eq!(attribute, "sku_name");
                assert_eq!(expected, "\"F1\"");
                assert_eq!(actual, "\"B1\"");
            }
            other => panic!("expected AttributeMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_service_plan_wrong_os() {
        let plan = plan_with(json!([service_plan("azurerm_service_plan.main", "F1", "Windows")]));
        let err = check_service_plan(&plan, EXPECTED_SKU, EXPECTED_OS).unwrap_err();
        assert!(err.to_string().contains("os_type"));
    }

    #[test]
    fn test_service_plan_missing() {
        let plan = plan_with(json!([]));
        assert!(matches!(
            check_service_plan(&plan, EXPECTED_SKU, EXPECTED_OS),
            Err(CheckError::ResourceMissing { .. })
        ));
    }

    #[test]
    fn test_service_plan_must_be_unique() {
        let plan = plan_with(json!([
            service_plan("azurerm_service_plan.a", "F1", "Linux"),
            service_plan("azurerm_service_plan.b", "F1", "Linux"),
        ]));
        assert!(matches!(
            check_service_plan(&plan, EXPECTED_SKU, EXPECTED_OS),
            Err(CheckError::DuplicateResource { count: 2, .. })
        ));
    }

    #[test]
    fn test_php_version_allowed() {
        for version in ALLOWED_PHP_VERSIONS {
            let plan = plan_with(json!([web_app(json!({
                "site_config": [{"application_stack": [{"php_version": version}]}]
            }))]));
            assert!(check_php_version(&plan, ALLOWED_PHP_VERSIONS).is_ok());
        }
    }

    #[test]
    fn test_php_version_too_old() {
        let plan = plan_with(json!([web_app(json!({
            "site_config": [{"application_stack": [{"php_version": "7.4"}]}]
        }))]));
        let err = check_php_version(&plan, ALLOWED_PHP_VERSIONS).unwrap_err();
        assert!(matches!(err, CheckError::NotAllowed { .. }));
        assert!(err.to_string().contains("\"7.4\""));
    }

    #[test]
    fn test_php_version_empty_or_absent() {
        let empty = plan_with(json!([web_app(json!({
            "site_config": [{"application_stack": [{"php_version": ""}]}]
        }))]));
        assert!(matches!(
            check_php_version(&empty, ALLOWED_PHP_VERSIONS),
            Err(CheckError::AttributeMissing { .. })
        ));

        let no_stack = plan_with(json!([web_app(json!({"site_config": [{}]}))]));
        let err = check_php_version(&no_stack, ALLOWED_PHP_VERSIONS).unwrap_err();
        assert!(
            err.to_string()
                .contains("site_config.0.application_stack.0.php_version")
        );
    }

    #[test]
    fn test_https_only() {
        let on = plan_with(json!([web_app(json!({"https_only": true}))]));
        assert!(check_https_only(&on).is_ok());

        let off = plan_with(json!([web_app(json!({"https_only": false}))]));
        assert!(matches!(
            check_https_only(&off),
            Err(CheckError::AttributeMismatch { .. })
        ));

        let unset = plan_with(json!([web_app(json!({"https_only": null}))]));
        assert!(matches!(
            check_https_only(&unset),
            Err(CheckError::AttributeMissing { .. })
        ));
    }

    #[test]
    fn test_formatted_report() {
        assert!(check_formatted(&FormatReport::default()).is_ok());

        let report = FormatReport {
            output: "main.tf\n".to_string(),
            unformatted: vec!["main.tf".to_string()],
        };
        assert!(matches!(
            check_formatted(&report),
            Err(CheckError::Unformatted { .. })
        ));
    }

    #[test]
    fn test_only_format_skips_init() {
        let needing: Vec<_> = Case::ALL.into_iter().filter(Case::needs_init).collect();
        assert_eq!(
            needing,
            vec![
                Case::Validate,
                Case::ServicePlanSku,
                Case::PhpVersion,
                Case::HttpsOnly
            ]
        );
    }

    #[test]
    fn test_case_options_set_app_name() {
        let base = Options::new("/tf");
        assert!(Case::Format.options(&base).vars.is_empty());
        assert_eq!(
            Case::ServicePlanSku.options(&base).vars["app_name"],
            json!("test-app-terraform")
        );
        assert_eq!(
            Case::HttpsOnly.options(&base).vars["app_name"],
            json!("test-app-https")
        );
    }
}
