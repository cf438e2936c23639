// ── Filtering, grouping, search ──
//
// `prefs` persists what the user chose to see; `view` turns a catalog plus
// the link table into the grouped lists screens display. Everything here
// is synchronous.

mod prefs;
mod view;

pub use prefs::{
    FilterPreferenceStore, FilterPreferences, MemoryPreferences, PreferenceBackend,
    preference_key,
};
pub use view::{
    DomainGroups, EntityCounts, GatewayGroups, Partition, counts, group_by_domain, group_linked,
    linkable_view, linked_view, matches_search, partition,
};
