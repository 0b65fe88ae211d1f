use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::checks::CheckOutcome;
use crate::terraform::PlanStruct;

#[derive(Tabled)]
struct OutcomeRow {
    #[tabled(rename = "CHECK")]
    check: &'static str,
    #[tabled(rename = "RESULT")]
    result: &'static str,
    #[tabled(rename = "DETAIL")]
    detail: String,
}

#[derive(Tabled)]
struct ChangeRow {
    #[tabled(rename = "ADDRESS")]
    address: String,
    #[tabled(rename = "TYPE")]
    resource_type: String,
    #[tabled(rename = "ACTIONS")]
    actions: String,
}

pub fn outcomes_table(outcomes: &[CheckOutcome]) -> String {
    let rows = outcomes.iter().map(|o| OutcomeRow {
        check: o.case.name(),
        result: if o.passed() { "PASS" } else { "FAIL" },
        detail: match &o.result {
            Ok(()) => String::new(),
            Err(e) => e.to_string(),
        },
    });
    Table::new(rows).with(Style::sharp()).to_string()
}

pub fn changes_table(plan: &PlanStruct) -> String {
    let rows = plan.resource_changes_map.values().map(|rc| ChangeRow {
        address: rc.address.clone(),
        resource_type: rc.resource_type.clone(),
        actions: rc.change.actions.join(","),
    });
    Table::new(rows).with(Style::sharp()).to_string()
}
