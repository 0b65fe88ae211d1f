use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::Result;

/// Attribute bag of a planned resource.
pub type Attributes = Map<String, Value>;

/// Raw shape of `terraform show -json <planfile>`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlanJson {
    #[serde(default)]
    pub format_version: String,
    #[serde(default)]
    pub terraform_version: String,
    #[serde(default)]
    pub resource_changes: Vec<ResourceChange>,
    #[serde(default)]
    pub planned_values: Option<PlannedValues>,
    #[serde(default)]
    pub output_changes: BTreeMap<String, Change>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ResourceChange {
    pub address: String,
    #[serde(default)]
    pub mode: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    pub name: String,
    #[serde(default)]
    pub provider_name: String,
    pub change: Change,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct Change {
    #[serde(default)]
    pub actions: Vec<String>,
    #[serde(default)]
    pub before: Value,
    #[serde(default)]
    pub after: Value,
    #[serde(default)]
    pub after_unknown: Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlannedValues {
    #[serde(default)]
    pub root_module: Module,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Module {
    #[serde(default)]
    pub resources: Vec<PlannedResource>,
    #[serde(default)]
    pub child_modules: Vec<Module>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PlannedResource {
    pub address: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    pub name: String,
    #[serde(default)]
    pub values: Value,
}

/// Parsed plan indexed by resource address.
#[derive(Debug, Clone, Default)]
pub struct PlanStruct {
    pub raw_json: String,
    pub format_version: String,
    pub terraform_version: String,
    pub resource_changes_map: BTreeMap<String, ResourceChange>,
    pub resource_planned_values_map: BTreeMap<String, PlannedResource>,
    pub output_changes: BTreeMap<String, Change>,
}

impl PlanStruct {
    pub fn parse(json: &str) -> Result<Self> {
        let plan: PlanJson = serde_json::from_str(json)?;

        let resource_changes_map = plan
            .resource_changes
            .into_iter()
            .map(|rc| (rc.address.clone(), rc))
            .collect();

        let mut resource_planned_values_map = BTreeMap::new();
        if let Some(planned) = plan.planned_values {
            collect_planned(planned.root_module, &mut resource_planned_values_map);
        }

        Ok(Self {
            raw_json: json.to_string(),
            format_version: plan.format_version,
            terraform_version: plan.terraform_version,
            resource_changes_map,
            resource_planned_values_map,
            output_changes: plan.output_changes,
        })
    }

    pub fn resources_of_type<'a>(
        &'a self,
        resource_type: &str,
    ) -> impl Iterator<Item = &'a ResourceChange> {
        self.resource_changes_map
            .values()
            .filter(move |rc| rc.resource_type == resource_type)
    }

    pub fn first_of_type(&self, resource_type: &str) -> Option<&ResourceChange> {
        self.resources_of_type(resource_type).next()
    }
}

fn collect_planned(module: Module, into: &mut BTreeMap<String, PlannedResource>) {
    for resource in module.resources {
        into.insert(resource.address.clone(), resource);
    }
    for child in module.child_modules {
        collect_planned(child, into);
    }
}

impl ResourceChange {
    /// The planned `after` state, when it is an object.
    pub fn after(&self) -> Option<&Attributes> {
        self.change.after.as_object()
    }
}

/// Walks nested attributes. Numeric segments index into block lists, so
/// `["site_config", "0", "application_stack", "0", "php_version"]` reaches a
/// nested block attribute.
pub fn attr_path<'a>(bag: &'a Attributes, path: &[&str]) -> Option<&'a Value> {
    let (first, rest) = path.split_first()?;
    let mut current = bag.get(*first)?;

    for segment in rest {
        current = match current {
            Value::Object(map) => map.get(*segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }

    Some(current)
}
