use serde::Serialize;

use super::config::ControlMatcher;
use crate::types::AdMetrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ControlSelection {
    /// The control ad matched the configured control matcher.
    Matched,
    /// Nothing matched; the ad with the most impressions was used.
    HighestImpressions,
}

#[derive(Debug, Clone)]
pub struct Assignment<'a> {
    pub control: &'a AdMetrics,
    pub tests: Vec<&'a AdMetrics>,
    pub selection: ControlSelection,
}

/// Picks the control ad for one ad group and returns the rest as test ads.
///
/// The first ad (in input order) matching `matcher` becomes control and the
/// test ads keep input order. Without a match, the ads are re-ordered by
/// impressions descending (stable, so ties keep input order), the first becomes
/// control and the test ads follow that ordering. The input slice is never
/// reordered.
///
/// Returns `None` when fewer than two ads are given.
pub fn assign_control<'a>(
    ads: &'a [AdMetrics],
    matcher: Option<&ControlMatcher>,
) -> Option<Assignment<'a>> {
    if ads.len() < 2 {
        return None;
    }

    if let Some(idx) = matcher.and_then(|m| ads.iter().position(|ad| m.matches(ad))) {
        let tests = ads
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != idx)
            .map(|(_, ad)| ad)
            .collect();
        return Some(Assignment {
            control: &ads[idx],
            tests,
            selection: ControlSelection::Matched,
        });
    }

    let mut ordered: Vec<&AdMetrics> = ads.iter().collect();
    ordered.sort_by(|a, b| b.impressions.cmp(&a.impressions));
    let control = ordered.remove(0);
    Some(Assignment {
        control,
        tests: ordered,
        selection: ControlSelection::HighestImpressions,
    })
}
