use crate::domain::date_range::EffectiveRange;
use std::collections::HashMap;

/// Lane index per event id for one participant's multi-day events.
///
/// Built first-fit in start order, which gives the minimum number of lanes for
/// interval overlaps. Only meaningful within the pass that built it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaneAssignment {
    lanes: HashMap<String, usize>,
    lane_count: usize,
}

impl LaneAssignment {
    pub fn assign<'a, I>(spans: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, EffectiveRange)>,
    {
        let mut ordered: Vec<(&str, EffectiveRange)> = spans.into_iter().collect();
        ordered.sort_by_key(|(_, range)| range.start);

        let mut occupants: Vec<Vec<EffectiveRange>> = Vec::new();
        let mut lanes = HashMap::with_capacity(ordered.len());

        for (id, range) in ordered {
            if lanes.contains_key(id) {
                continue;
            }
            let lane = occupants
                .iter()
                .position(|taken| taken.iter().all(|other| !other.overlaps(&range)))
                .unwrap_or(occupants.len());
            if lane == occupants.len() {
                occupants.push(Vec::new());
            }
            occupants[lane].push(range);
            lanes.insert(id.to_string(), lane);
        }

        Self {
            lanes,
            lane_count: occupants.len(),
        }
    }

    pub fn lane_of(&self, event_id: &str) -> Option<usize> {
        self.lanes.get(event_id).copied()
    }

    pub fn lane_or_default(&self, event_id: &str) -> usize {
        self.lane_of(event_id).unwrap_or(0)
    }

    pub fn lane_count(&self) -> usize {
        self.lane_count
    }

    pub fn len(&self) -> usize {
        self.lanes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lanes.is_empty()
    }
}
