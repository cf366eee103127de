//! Conflict resolution between overlapping matches
//!
//! Matches are ordered by start offset, then by length (outer first), then
//! by catalog priority. A match survives only if none of its footprint
//! spans intersects a footprint span of an already accepted match.

use tracing::debug;

use crate::matcher::MatchInstance;

/// Deterministic greedy selection of non-overlapping matches
#[derive(Debug, Default, Clone, Copy)]
pub struct ConflictResolver;

impl ConflictResolver {
    pub fn new() -> Self {
        Self
    }

    /// Surviving matches, sorted by start offset
    pub fn resolve(&self, mut matches: Vec<MatchInstance>) -> Vec<MatchInstance> {
        matches.sort_by(|a, b| {
            a.span
                .start
                .cmp(&b.span.start)
                .then(b.span.len().cmp(&a.span.len()))
                .then(a.priority.cmp(&b.priority))
                .then(a.anchor.span.cmp(&b.anchor.span))
        });

        let mut accepted: Vec<MatchInstance> = Vec::with_capacity(matches.len());
        for candidate in matches {
            if let Some(winner) = accepted.iter().find(|a| a.overlaps(&candidate)) {
                debug!(
                    dropped = candidate.rule_id,
                    kept = winner.rule_id,
                    start = candidate.span.start,
                    "Dropping overlapping match"
                );
                continue;
            }
            accepted.push(candidate);
        }
        accepted
    }
}
