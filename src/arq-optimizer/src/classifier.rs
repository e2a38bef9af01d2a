//! Capability classification: splitting a chain into provider fragments and
//! an in-process suffix.

use std::fmt;
use std::sync::Arc;

use arq_core::ValueComparer;
use arq_logical::{JoinOp, ProviderQuery, QueryNode, Selector};
use common_config::{CapabilityDescriptor, PushdownMode, PushdownOperator};
use common_display::{DisplayTree, TreeNode, indent};
use common_error::ArqResult;
use log::debug;

/// Join evaluated in-process.
#[derive(Debug, Clone)]
pub struct ClientJoin {
    /// Outer input.
    pub outer: Box<ClientPlan>,
    /// Inner input.
    pub inner: Box<ClientPlan>,
    /// Key of an outer element.
    pub outer_key: Selector,
    /// Key of an inner element.
    pub inner_key: Selector,
    /// Result projection.
    pub result: Selector,
    /// Explicit key comparer.
    pub comparer: Option<Arc<dyn ValueComparer>>,
}

/// The in-process part of a translation plan.
#[derive(Debug, Clone)]
pub enum ClientPlan {
    /// Rows of the provider fragment at this index.
    Fragment(usize),
    /// Filter by a predicate selector.
    Filter {
        input: Box<ClientPlan>,
        predicate: Selector,
    },
    /// Apply a selector to each element. `role` names the selector in faults.
    Project {
        input: Box<ClientPlan>,
        selector: Selector,
        role: &'static str,
    },
    /// Group join.
    GroupJoin(ClientJoin),
    /// Inner join.
    Join(ClientJoin),
    /// Grouping by key.
    GroupBy {
        input: Box<ClientPlan>,
        key: Selector,
        comparer: Option<Arc<dyn ValueComparer>>,
    },
    /// Limit.
    Take { input: Box<ClientPlan>, count: usize },
}

impl ClientPlan {
    /// Name of the root operator.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Fragment(_) => "Fragment",
            Self::Filter { .. } => "Filter",
            Self::Project { .. } => "Project",
            Self::GroupJoin(_) => "GroupJoin",
            Self::Join(_) => "Join",
            Self::GroupBy { .. } => "GroupBy",
            Self::Take { .. } => "Take",
        }
    }

    /// Input plans, outer first.
    pub fn inputs(&self) -> Vec<&Self> {
        match self {
            Self::Fragment(_) => vec![],
            Self::Filter { input, .. }
            | Self::Project { input, .. }
            | Self::GroupBy { input, .. }
            | Self::Take { input, .. } => vec![&**input],
            Self::GroupJoin(join) | Self::Join(join) => vec![&*join.outer, &*join.inner],
        }
    }
}

impl TreeNode for ClientPlan {
    fn label(&self) -> String {
        match self {
            Self::Fragment(index) => format!("Fragment #{index}"),
            Self::Take { count, .. } => format!("Take({count})"),
            other => other.name().to_string(),
        }
    }

    fn children(&self) -> Vec<&dyn TreeNode> {
        self.inputs()
            .into_iter()
            .map(|input| input as &dyn TreeNode)
            .collect()
    }

    fn details(&self) -> Option<String> {
        match self {
            Self::Filter { predicate, .. } => Some(format!("predicate={predicate}")),
            Self::Project { selector, role, .. } => Some(format!("{role}={selector}")),
            Self::GroupJoin(join) | Self::Join(join) => {
                let mut details = format!(
                    "outer_key_selector={}, inner_key_selector={}, result_selector={}",
                    join.outer_key, join.inner_key, join.result
                );
                if let Some(comparer) = &join.comparer {
                    details.push_str(&format!(", comparer={}", comparer.name()));
                }
                Some(details)
            }
            Self::GroupBy { key, comparer, .. } => Some(match comparer {
                Some(comparer) => format!("key_selector={key}, comparer={}", comparer.name()),
                None => format!("key_selector={key}"),
            }),
            Self::Fragment(_) | Self::Take { .. } => None,
        }
    }
}

/// Provider fragments plus the in-process suffix over them.
///
/// Built fresh for each enumeration.
#[derive(Debug, Clone)]
pub struct TranslationPlan {
    /// Queries submitted to the provider, once each.
    pub fragments: Vec<ProviderQuery>,
    /// In-process operators; leaves reference `fragments` by index.
    pub client: ClientPlan,
}

impl TranslationPlan {
    /// Whether the provider executes the whole query.
    pub fn is_fully_pushed(&self) -> bool {
        matches!(self.client, ClientPlan::Fragment(0)) && self.fragments.len() == 1
    }

    /// Render fragments and client plan.
    pub fn explain(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for TranslationPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Client:")?;
        writeln!(f, "{}", indent(&DisplayTree::new(&self.client).to_string(), "  "))?;
        for (i, fragment) in self.fragments.iter().enumerate() {
            writeln!(f, "Fragment #{i}:")?;
            writeln!(f, "{}", indent(&fragment.explain(), "  "))?;
        }
        Ok(())
    }
}

/// Outcome of classifying one node.
enum Piece {
    /// The provider can still execute everything up to here.
    Pushed(ProviderQuery),
    /// In-process evaluation has started.
    Client(ClientPlan),
}

/// Decides, node by node, what the provider executes.
///
/// A node is pushed when all its inputs are pushed, the provider supports the
/// operator, every selector is synchronous and declarative with supported
/// expression features, and no explicit comparer is attached. Once a node
/// runs in-process, everything above it does too.
#[derive(Debug, Clone)]
pub struct CapabilityClassifier {
    capabilities: CapabilityDescriptor,
    mode: PushdownMode,
}

impl CapabilityClassifier {
    /// Create a classifier for a provider's capabilities.
    pub fn new(capabilities: CapabilityDescriptor, mode: PushdownMode) -> Self {
        Self { capabilities, mode }
    }

    /// Split `node` into provider fragments and a client plan.
    pub fn classify(&self, node: &QueryNode) -> ArqResult<TranslationPlan> {
        let mut fragments = Vec::new();
        let piece = self.classify_node(node, &mut fragments)?;
        let client = Self::into_client(piece, &mut fragments);
        debug!(
            "Classified {} into {} fragment(s), client root {}",
            node.name(),
            fragments.len(),
            client.name()
        );
        Ok(TranslationPlan { fragments, client })
    }

    fn into_client(piece: Piece, fragments: &mut Vec<ProviderQuery>) -> ClientPlan {
        match piece {
            Piece::Client(plan) => plan,
            Piece::Pushed(query) => {
                fragments.push(query);
                ClientPlan::Fragment(fragments.len() - 1)
            }
        }
    }

    fn supports(&self, op: PushdownOperator) -> bool {
        self.mode == PushdownMode::Enabled && self.capabilities.supports_operator(op)
    }

    fn pushable(&self, role: &str, selector: &Selector) -> bool {
        match selector.declarative() {
            Some(expr) if selector.is_pushable() => {
                let supported = self.capabilities.supports_features(&expr.features());
                if !supported {
                    debug!("{role}={expr} uses expression features the provider lacks");
                }
                supported
            }
            _ => false,
        }
    }

    fn classify_node(
        &self,
        node: &QueryNode,
        fragments: &mut Vec<ProviderQuery>,
    ) -> ArqResult<Piece> {
        let piece = match node {
            QueryNode::Source(op) => Piece::Pushed(ProviderQuery::scan(op.collection.clone())),

            QueryNode::Where(op) => match self.classify_node(&op.input, fragments)? {
                Piece::Pushed(input)
                    if self.supports(PushdownOperator::Where)
                        && self.pushable("predicate", &op.predicate) =>
                {
                    Piece::Pushed(ProviderQuery::Filter {
                        input: Box::new(input),
                        predicate: declarative(&op.predicate),
                    })
                }
                input => Piece::Client(ClientPlan::Filter {
                    input: Box::new(Self::into_client(input, fragments)),
                    predicate: op.predicate.clone(),
                }),
            },

            QueryNode::Select(op) => match self.classify_node(&op.input, fragments)? {
                Piece::Pushed(input)
                    if self.supports(PushdownOperator::Select)
                        && self.pushable("selector", &op.selector) =>
                {
                    Piece::Pushed(ProviderQuery::Map {
                        input: Box::new(input),
                        projection: declarative(&op.selector),
                    })
                }
                input => Piece::Client(ClientPlan::Project {
                    input: Box::new(Self::into_client(input, fragments)),
                    selector: op.selector.clone(),
                    role: "selector",
                }),
            },

            QueryNode::GroupJoin(op) => {
                self.classify_join(op, PushdownOperator::GroupJoin, fragments)?
            }
            QueryNode::Join(op) => self.classify_join(op, PushdownOperator::Join, fragments)?,

            QueryNode::GroupBy(op) => match self.classify_node(&op.input, fragments)? {
                Piece::Pushed(input)
                    if op.comparer.is_none()
                        && self.supports(PushdownOperator::GroupBy)
                        && self.pushable("key_selector", &op.key) =>
                {
                    Piece::Pushed(ProviderQuery::GroupBy {
                        input: Box::new(input),
                        key: declarative(&op.key),
                    })
                }
                input => Piece::Client(ClientPlan::GroupBy {
                    input: Box::new(Self::into_client(input, fragments)),
                    key: op.key.clone(),
                    comparer: op.comparer.clone(),
                }),
            },

            QueryNode::Take(op) => match self.classify_node(&op.input, fragments)? {
                Piece::Pushed(input) if self.supports(PushdownOperator::Take) => {
                    Piece::Pushed(ProviderQuery::Take {
                        input: Box::new(input),
                        count: op.count,
                    })
                }
                input => Piece::Client(ClientPlan::Take {
                    input: Box::new(Self::into_client(input, fragments)),
                    count: op.count,
                }),
            },
        };

        if let Piece::Client(plan) = &piece {
            debug!("{} runs in-process as {}", node.name(), plan.name());
        }
        Ok(piece)
    }

    fn classify_join(
        &self,
        op: &JoinOp,
        kind: PushdownOperator,
        fragments: &mut Vec<ProviderQuery>,
    ) -> ArqResult<Piece> {
        let outer = self.classify_node(&op.outer, fragments)?;
        let inner = self.classify_node(&op.inner, fragments)?;

        let keys_pushable = op.comparer.is_none()
            && self.supports(kind)
            && self.pushable("outer_key_selector", &op.outer_key)
            && self.pushable("inner_key_selector", &op.inner_key);

        match (outer, inner) {
            (Piece::Pushed(outer), Piece::Pushed(inner)) if keys_pushable => {
                let outer = Box::new(outer);
                let inner = Box::new(inner);
                let outer_key = declarative(&op.outer_key);
                let inner_key = declarative(&op.inner_key);
                let matched = if kind == PushdownOperator::GroupJoin {
                    ProviderQuery::GroupJoin {
                        outer,
                        inner,
                        outer_key,
                        inner_key,
                    }
                } else {
                    ProviderQuery::Join {
                        outer,
                        inner,
                        outer_key,
                        inner_key,
                    }
                };

                if self.pushable("result_selector", &op.result) {
                    Ok(Piece::Pushed(ProviderQuery::Map {
                        input: Box::new(matched),
                        projection: declarative(&op.result),
                    }))
                } else {
                    // Matching is pushed; only the result projection runs here.
                    fragments.push(matched);
                    Ok(Piece::Client(ClientPlan::Project {
                        input: Box::new(ClientPlan::Fragment(fragments.len() - 1)),
                        selector: op.result.clone(),
                        role: "result_selector",
                    }))
                }
            }
            (outer, inner) => {
                let join = ClientJoin {
                    outer: Box::new(Self::into_client(outer, fragments)),
                    inner: Box::new(Self::into_client(inner, fragments)),
                    outer_key: op.outer_key.clone(),
                    inner_key: op.inner_key.clone(),
                    result: op.result.clone(),
                    comparer: op.comparer.clone(),
                };
                Ok(Piece::Client(if kind == PushdownOperator::GroupJoin {
                    ClientPlan::GroupJoin(join)
                } else {
                    ClientPlan::Join(join)
                }))
            }
        }
    }
}

fn declarative(selector: &Selector) -> arq_logical::Expr {
    selector.declarative().cloned().unwrap_or(arq_logical::Expr::Element)
}
