use crate::dom::{Dom, NodeId};
use crate::{Error, Result};

/// The ways a caller-supplied locator string can pick out a control, tried in
/// this fixed order. Each strategy is an exact comparison; a candidate stays
/// in the set when any strategy accepts it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MatchStrategy {
    ByName,
    ById,
    ByLabel,
}

pub(crate) const STRATEGIES: [MatchStrategy; 3] = [
    MatchStrategy::ByName,
    MatchStrategy::ById,
    MatchStrategy::ByLabel,
];

/// Finds the single `<select>` the locator refers to. With no locator every
/// select in the document is a candidate, so a document with exactly one
/// select needs no locator at all. Zero remaining candidates is a missing
/// control; more than one is ambiguous, and both are caller errors.
pub(crate) fn resolve_select(dom: &Dom, locator: Option<&str>) -> Result<NodeId> {
    let candidates = dom
        .all_element_nodes()
        .into_iter()
        .filter(|node| {
            dom.tag_name(*node)
                .map(|tag| tag.eq_ignore_ascii_case("select"))
                .unwrap_or(false)
        })
        .collect::<Vec<_>>();

    let matched = match locator {
        None => candidates,
        Some(locator) => candidates
            .into_iter()
            .filter(|node| {
                STRATEGIES
                    .iter()
                    .any(|strategy| strategy_matches(dom, *node, *strategy, locator))
            })
            .collect(),
    };

    match matched.as_slice() {
        [single] => Ok(*single),
        [] => Err(Error::ControlNotFound(
            locator.unwrap_or("<any select>").to_string(),
        )),
        many => Err(Error::AmbiguousControl {
            locator: locator.unwrap_or("<any select>").to_string(),
            count: many.len(),
        }),
    }
}

fn strategy_matches(dom: &Dom, node: NodeId, strategy: MatchStrategy, locator: &str) -> bool {
    match strategy {
        MatchStrategy::ByName => dom.attr(node, "name").as_deref() == Some(locator),
        MatchStrategy::ById => dom.attr(node, "id").as_deref() == Some(locator),
        MatchStrategy::ByLabel => {
            // Label association is a lookup join over the `for` attribute,
            // performed at query time; labels never own their controls.
            dom.all_element_nodes().into_iter().any(|label| {
                dom.tag_name(label)
                    .map(|tag| tag.eq_ignore_ascii_case("label"))
                    .unwrap_or(false)
                    && dom.normalized_text(label) == locator
                    && dom
                        .attr(label, "for")
                        .and_then(|id| dom.by_id(&id))
                        .map(|target| target == node)
                        .unwrap_or(false)
            })
        }
    }
}
