use crate::config::GateRule;
use crate::workflow::job::JobKind;
use std::collections::BTreeMap;

/// Pure gate predicate: a job kind requires human approval when any rule's
/// constraint is declared `true` on the task and lists that kind. No side
/// effects, no clock, no stored state.
pub fn gate_requires_approval(
    rules: &[GateRule],
    constraints: &BTreeMap<String, bool>,
    kind: JobKind,
) -> bool {
    rules.iter().any(|rule| {
        constraints.get(&rule.constraint).copied().unwrap_or(false)
            && rule.gated_kinds.contains(&kind)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_gate_rules;

    #[test]
    fn no_auto_merge_gates_propose_and_publish() {
        let rules = default_gate_rules();
        let constraints = BTreeMap::from([("no_auto_merge".to_string(), true)]);
        assert!(gate_requires_approval(&rules, &constraints, JobKind::Propose));
        assert!(gate_requires_approval(&rules, &constraints, JobKind::Publish));
        assert!(!gate_requires_approval(&rules, &constraints, JobKind::Implement));
    }

    #[test]
    fn false_constraint_never_gates() {
        let rules = default_gate_rules();
        let constraints = BTreeMap::from([("no_auto_merge".to_string(), false)]);
        assert!(!gate_requires_approval(&rules, &constraints, JobKind::Propose));
    }

    #[test]
    fn undeclared_constraint_never_gates() {
        let rules = default_gate_rules();
        assert!(!gate_requires_approval(&rules, &BTreeMap::new(), JobKind::Publish));
    }

    #[test]
    fn plan_review_gates_only_plan() {
        let rules = default_gate_rules();
        let constraints = BTreeMap::from([("require_plan_review".to_string(), true)]);
        assert!(gate_requires_approval(&rules, &constraints, JobKind::Plan));
        assert!(!gate_requires_approval(&rules, &constraints, JobKind::Validate));
    }
}
