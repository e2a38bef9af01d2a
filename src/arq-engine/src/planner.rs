//! Physical planning of translation plans.

use std::sync::Arc;

use arq_core::{DefaultComparer, ValueComparer};
use arq_logical::ProviderQuery;
use arq_optimizer::{ClientJoin, ClientPlan, TranslationPlan};
use common_error::{ArqError, ArqResult};

use crate::operators::{
    FilterExec, FragmentScanExec, GroupByExec, GroupJoinExec, JoinExec, JoinSpec,
    PhysicalOperator, ProjectExec, TakeExec,
};
use crate::physical::PhysicalPlan;

/// Converts translation plans to operator trees.
pub trait PhysicalPlanner: Send + Sync {
    /// Build a fresh operator tree for `plan`.
    fn plan(&self, plan: &TranslationPlan) -> ArqResult<PhysicalPlan>;
}

/// Planner for in-process execution.
///
/// Every `Fragment(i)` leaf becomes a [`FragmentScanExec`]; each fragment must
/// be referenced exactly once.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalPhysicalPlanner;

struct Planning<'a> {
    fragments: &'a [ProviderQuery],
    used: Vec<bool>,
    next_id: usize,
}

impl Planning<'_> {
    fn id(&mut self, name: &str) -> String {
        let id = format!("{name}#{}", self.next_id);
        self.next_id += 1;
        id
    }

    fn operator(&mut self, node: &ClientPlan) -> ArqResult<Arc<dyn PhysicalOperator>> {
        let op: Arc<dyn PhysicalOperator> = match node {
            ClientPlan::Fragment(index) => {
                let fragment = self.fragments.get(*index).ok_or_else(|| {
                    ArqError::internal(format!("fragment #{index} does not exist"))
                })?;
                if std::mem::replace(&mut self.used[*index], true) {
                    return Err(ArqError::internal(format!(
                        "fragment #{index} referenced twice"
                    )));
                }
                Arc::new(FragmentScanExec::new(
                    self.id("FragmentScanExec"),
                    *index,
                    fragment.clone(),
                ))
            }
            ClientPlan::Filter { input, predicate } => {
                let input = self.operator(input)?;
                Arc::new(FilterExec::new(self.id("FilterExec"), input, predicate.clone()))
            }
            ClientPlan::Project {
                input,
                selector,
                role,
            } => {
                let input = self.operator(input)?;
                Arc::new(ProjectExec::new(
                    self.id("ProjectExec"),
                    input,
                    selector.clone(),
                    *role,
                ))
            }
            ClientPlan::GroupJoin(join) => {
                let spec = self.join_spec(join)?;
                Arc::new(GroupJoinExec::new(self.id("GroupJoinExec"), spec))
            }
            ClientPlan::Join(join) => {
                let spec = self.join_spec(join)?;
                Arc::new(JoinExec::new(self.id("JoinExec"), spec))
            }
            ClientPlan::GroupBy {
                input,
                key,
                comparer,
            } => {
                let input = self.operator(input)?;
                Arc::new(GroupByExec::new(
                    self.id("GroupByExec"),
                    input,
                    key.clone(),
                    comparer_or_default(comparer.as_ref()),
                ))
            }
            ClientPlan::Take { input, count } => {
                let input = self.operator(input)?;
                Arc::new(TakeExec::new(self.id("TakeExec"), input, *count))
            }
        };
        Ok(op)
    }

    fn join_spec(&mut self, join: &ClientJoin) -> ArqResult<JoinSpec> {
        Ok(JoinSpec {
            outer: self.operator(&join.outer)?,
            inner: self.operator(&join.inner)?,
            outer_key: join.outer_key.clone(),
            inner_key: join.inner_key.clone(),
            result: join.result.clone(),
            comparer: comparer_or_default(join.comparer.as_ref()),
        })
    }
}

fn comparer_or_default(comparer: Option<&Arc<dyn ValueComparer>>) -> Arc<dyn ValueComparer> {
    comparer.map_or_else(|| Arc::new(DefaultComparer) as Arc<dyn ValueComparer>, Arc::clone)
}

impl PhysicalPlanner for LocalPhysicalPlanner {
    fn plan(&self, plan: &TranslationPlan) -> ArqResult<PhysicalPlan> {
        let mut planning = Planning {
            fragments: &plan.fragments,
            used: vec![false; plan.fragments.len()],
            next_id: 0,
        };
        let root = planning.operator(&plan.client)?;
        if let Some(index) = planning.used.iter().position(|used| !used) {
            return Err(ArqError::internal(format!(
                "fragment #{index} is never scanned"
            )));
        }
        Ok(PhysicalPlan::new(root, plan.fragments.len()))
    }
}

#[cfg(test)]
mod tests {
    use arq_logical::{QueryBuilder, Selector, arg, elem};
    use arq_optimizer::CapabilityClassifier;
    use common_config::{CapabilityDescriptor, PushdownMode};
    use common_error::GenericError;

    use super::*;

    fn translate(caps: CapabilityDescriptor, result: Selector) -> TranslationPlan {
        let inner = QueryBuilder::source("inner").unwrap().build();
        let node = QueryBuilder::source("outer")
            .unwrap()
            .group_join(
                inner,
                Selector::expr(elem()),
                Selector::expr(elem()),
                result,
                None,
            )
            .take(3)
            .build();
        CapabilityClassifier::new(caps, PushdownMode::Enabled)
            .classify(&node)
            .unwrap()
    }

    #[test]
    fn test_fully_pushed_is_single_scan() {
        let plan = translate(CapabilityDescriptor::full(), Selector::expr(arg(1).count()));
        let physical = LocalPhysicalPlanner.plan(&plan).unwrap();

        assert_eq!(physical.operator_count(), 1);
        assert_eq!(physical.root().name(), "FragmentScanExec");
    }

    #[test]
    fn test_scan_only_builds_client_join() {
        let plan = translate(CapabilityDescriptor::scan_only(), Selector::expr(arg(1).count()));
        let physical = LocalPhysicalPlanner.plan(&plan).unwrap();

        assert_eq!(physical.fragment_count(), 2);
        let explain = physical.explain();
        let lines: Vec<&str> = explain.lines().collect();
        assert_eq!(lines[0], "Physical Plan:");
        assert!(lines[1].trim_start().starts_with("TakeExec(3)"));
        assert!(lines[2].trim_start().starts_with("GroupJoinExec("));
        assert!(lines[3].trim_start().starts_with("FragmentScanExec(#0: Scan)"));
        assert!(lines[4].trim_start().starts_with("FragmentScanExec(#1: Scan)"));
    }

    #[test]
    fn test_host_result_selector_projects_over_pushed_match() {
        let host = Selector::sync(|v| Ok::<_, GenericError>(v));
        let plan = translate(CapabilityDescriptor::full(), host);
        let physical = LocalPhysicalPlanner.plan(&plan).unwrap();

        assert_eq!(physical.root().name(), "TakeExec");
        let project = physical.root().children()[0];
        assert_eq!(project.display(), "ProjectExec(result_selector=<sync fn>)");
        assert_eq!(project.children()[0].display(), "FragmentScanExec(#0: GroupJoin)");
    }

    #[test]
    fn test_dangling_fragment_is_internal_error() {
        let plan = TranslationPlan {
            fragments: vec![ProviderQuery::scan("a")],
            client: ClientPlan::Fragment(1),
        };
        assert!(LocalPhysicalPlanner.plan(&plan).is_err());
    }
}
