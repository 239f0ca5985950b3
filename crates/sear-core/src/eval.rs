//! Query tree evaluation.
//!
//! The evaluator walks a [`QueryNode`] tree and delegates every leaf to a
//! handler closure, which is where the database performs index lookups. The
//! walk itself owns the boolean combination rules:
//!
//! - `And` evaluates its right side with the left side's results as a
//!   narrowing set, so conjunction cost tracks the left side's selectivity.
//!   An empty left side still narrows: the right side then matches nothing.
//! - `Or` evaluates both sides against the same incoming narrowing set and
//!   merges them, keeping the better (lower) score for documents on both
//!   sides.
//! - `Not` subtracts its operand from the narrowing set when one exists;
//!   at the top of a branch it instead asks the handler for the complement
//!   by setting the `exclude` flag, which propagates down to the leaves.
//!
//! Result lists are always sorted by document id, which keeps the merge and
//! difference passes linear.

use crate::error::QueryError;
use crate::parser::{PropertyOp, QueryNode};
use crate::types::SearchResult;

/// What kind of leaf the handler is being asked to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeafKind {
    Word,
    Property,
    Function,
}

/// The comparison a leaf requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalOp {
    Contains,
    NotEqual,
    GreaterEq,
    LessEq,
    Equal,
    Less,
    Greater,
    /// Function invocation
    Eval,
}

impl From<PropertyOp> for EvalOp {
    fn from(op: PropertyOp) -> Self {
        match op {
            PropertyOp::Contains => EvalOp::Contains,
            PropertyOp::NotEqual => EvalOp::NotEqual,
            PropertyOp::GreaterEq => EvalOp::GreaterEq,
            PropertyOp::LessEq => EvalOp::LessEq,
            PropertyOp::Equal => EvalOp::Equal,
            PropertyOp::Less => EvalOp::Less,
            PropertyOp::Greater => EvalOp::Greater,
        }
    }
}

/// Per-leaf evaluation request passed to the handler.
#[derive(Debug, Clone, Copy)]
pub struct EvalFlags {
    pub leaf: LeafKind,
    pub op: EvalOp,
    /// Return the complement of the match over live documents
    pub exclude: bool,
}

/// The leaf resolver: `(name, value, flags, narrowing set)` to matches.
/// `name` is empty for word leaves. Returned lists must be sorted by id.
pub trait EvalHandler {
    fn resolve(
        &mut self,
        name: &str,
        value: &str,
        flags: EvalFlags,
        and_set: Option<&[SearchResult]>,
    ) -> Result<Vec<SearchResult>, QueryError>;
}

impl<F> EvalHandler for F
where
    F: FnMut(
        &str,
        &str,
        EvalFlags,
        Option<&[SearchResult]>,
    ) -> Result<Vec<SearchResult>, QueryError>,
{
    fn resolve(
        &mut self,
        name: &str,
        value: &str,
        flags: EvalFlags,
        and_set: Option<&[SearchResult]>,
    ) -> Result<Vec<SearchResult>, QueryError> {
        self(name, value, flags, and_set)
    }
}

/// Evaluate a parsed query tree against the given handler.
pub fn evaluate<H: EvalHandler>(
    node: &QueryNode,
    handler: &mut H,
) -> Result<Vec<SearchResult>, QueryError> {
    eval_node(node, handler, None, false)
}

fn eval_node<H: EvalHandler>(
    node: &QueryNode,
    handler: &mut H,
    and_set: Option<&[SearchResult]>,
    exclude: bool,
) -> Result<Vec<SearchResult>, QueryError> {
    match node {
        QueryNode::Root(None) => Ok(Vec::new()),
        QueryNode::Root(Some(child)) => eval_node(child, handler, None, false),
        QueryNode::Word { value, exact } => {
            let flags = EvalFlags {
                leaf: LeafKind::Word,
                op: if *exact { EvalOp::Equal } else { EvalOp::Contains },
                exclude,
            };
            handler.resolve("", value, flags, and_set)
        }
        QueryNode::Property { name, op, value } => {
            let flags = EvalFlags {
                leaf: LeafKind::Property,
                op: (*op).into(),
                exclude,
            };
            handler.resolve(name, value, flags, and_set)
        }
        QueryNode::Function { name, value } => {
            if value.is_empty() {
                return Ok(Vec::new());
            }
            let flags = EvalFlags {
                leaf: LeafKind::Function,
                op: EvalOp::Eval,
                exclude,
            };
            handler.resolve(name, value, flags, and_set)
        }
        QueryNode::And(left, right) => {
            let left_results = eval_node(left, handler, and_set, exclude)?;
            eval_node(right, handler, Some(&left_results), exclude)
        }
        QueryNode::Or(left, right) => {
            let left_results = eval_node(left, handler, and_set, exclude)?;
            let right_results = eval_node(right, handler, and_set, exclude)?;
            Ok(union_results(left_results, right_results))
        }
        QueryNode::Not(child) => match and_set {
            Some(set) => {
                let matches = eval_node(child, handler, None, false)?;
                Ok(difference(set, &matches))
            }
            None => eval_node(child, handler, None, true),
        },
    }
}

/// Insert into an id-sorted result list, keeping the better (lower) score
/// for an id already present.
pub(crate) fn insert_result(results: &mut Vec<SearchResult>, result: SearchResult) {
    match results.binary_search_by_key(&result.id, |r| r.id) {
        Ok(pos) => {
            if result.score < results[pos].score {
                results[pos].score = result.score;
            }
        }
        Err(pos) => results.insert(pos, result),
    }
}

/// Merge two id-sorted lists, keeping the better score for shared ids.
pub(crate) fn union_results(
    left: Vec<SearchResult>,
    right: Vec<SearchResult>,
) -> Vec<SearchResult> {
    let mut merged = Vec::with_capacity(left.len() + right.len());
    let mut li = 0;
    let mut ri = 0;
    while li < left.len() && ri < right.len() {
        let a = left[li];
        let b = right[ri];
        if a.id < b.id {
            merged.push(a);
            li += 1;
        } else if b.id < a.id {
            merged.push(b);
            ri += 1;
        } else {
            merged.push(SearchResult::new(a.id, a.score.min(b.score)));
            li += 1;
            ri += 1;
        }
    }
    merged.extend_from_slice(&left[li..]);
    merged.extend_from_slice(&right[ri..]);
    merged
}

/// Keep entries of `set` whose id does not appear in `removed`.
pub(crate) fn difference(set: &[SearchResult], removed: &[SearchResult]) -> Vec<SearchResult> {
    set.iter()
        .filter(|r| removed.binary_search_by_key(&r.id, |m| m.id).is_err())
        .copied()
        .collect()
}
