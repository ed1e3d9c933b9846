use std::collections::{HashMap, HashSet, VecDeque};

use log::trace;

use crate::plugin_system::id::PluginId;
use crate::requirements::RunningRequirement;
use crate::resolver::graph::ServiceGraph;

/// Push demand along every resolved reference until nothing changes.
///
/// A plugin holding demand `d` that references a provider with strength `r`
/// gives the provider at least `min(d, r)`. A plugin is requeued only when its
/// demand strictly grows; demand is bounded by `MustExistAndRun`, so the walk
/// ends on cyclic graphs and no edge is counted twice at the same strength.
/// Plugins in `disabled` keep their own demand but pass nothing on.
pub fn propagate(
    graph: &ServiceGraph,
    seeds: &HashMap<PluginId, RunningRequirement>,
    disabled: &HashSet<PluginId>,
) -> HashMap<PluginId, RunningRequirement> {
    let mut demand = seeds.clone();
    let mut queue: VecDeque<PluginId> = graph
        .plugins()
        .iter()
        .filter(|id| demand.contains_key(id))
        .copied()
        .collect();

    while let Some(consumer) = queue.pop_front() {
        if disabled.contains(&consumer) {
            continue;
        }
        let Some(&current) = demand.get(&consumer) else {
            continue;
        };
        for (provider, strength) in graph.providers_of(consumer) {
            let propagated = current.capped_by(strength);
            let grows = demand.get(&provider).is_none_or(|existing| propagated > *existing);
            if grows {
                trace!("Propagating {} from {} to {}", propagated, consumer, provider);
                demand.insert(provider, propagated);
                queue.push_back(provider);
            }
        }
    }

    demand
}
