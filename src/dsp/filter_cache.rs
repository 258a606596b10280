use std::collections::{HashMap, HashSet, VecDeque};

use log::debug;

use crate::dsp::filter::BandPass;
use crate::error::ScopeError;

/// Bounded set of per-station band-pass filters, least recently used first out.
///
/// Each station owns its own filter history; an evicted station starts from
/// rest the next time it is seen.
pub struct FilterCache {
    filters: HashMap<u32, BandPass>,
    access_order: VecDeque<u32>, // oldest at the front
    capacity: usize,
}

impl FilterCache {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            filters: HashMap::with_capacity(capacity),
            access_order: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn contains(&self, station_id: u32) -> bool {
        self.filters.contains_key(&station_id)
    }

    pub fn get(&mut self, station_id: u32) -> Result<&mut BandPass, ScopeError> {
        if self.filters.contains_key(&station_id) {
            self.touch(station_id);
        } else {
            while self.filters.len() >= self.capacity {
                let Some(oldest) = self.access_order.pop_front() else {
                    break;
                };
                self.filters.remove(&oldest);
                debug!("filter cache full, evicted station {oldest}");
            }
            self.filters.insert(station_id, BandPass::seismic()?);
            self.access_order.push_back(station_id);
        }
        self.filters
            .get_mut(&station_id)
            .ok_or_else(|| ScopeError::Config(format!("filter for {station_id} vanished")))
    }

    /// Like [`get`](Self::get), but never evicts a station in `pinned`.
    /// `None` means the cache is full of pinned stations.
    pub fn get_sparing(
        &mut self,
        station_id: u32,
        pinned: &HashSet<u32>,
    ) -> Result<Option<&mut BandPass>, ScopeError> {
        if !self.filters.contains_key(&station_id) && self.filters.len() >= self.capacity {
            let Some(pos) = self.access_order.iter().position(|id| !pinned.contains(id)) else {
                return Ok(None);
            };
            if let Some(victim) = self.access_order.remove(pos) {
                self.filters.remove(&victim);
                debug!("filter cache full, evicted station {victim}");
            }
        }
        self.get(station_id).map(Some)
    }

    /// Drops every filter whose station is not in `active_ids`.
    pub fn evict_stale(&mut self, active_ids: &[u32]) -> usize {
        let active: HashSet<u32> = active_ids.iter().copied().collect();
        let before = self.filters.len();
        self.filters.retain(|id, _| active.contains(id));
        self.access_order.retain(|id| active.contains(id));
        let evicted = before - self.filters.len();
        if evicted > 0 {
            debug!("evicted {evicted} inactive station filters");
        }
        evicted
    }

    pub fn clear(&mut self) {
        self.filters.clear();
        self.access_order.clear();
    }

    fn touch(&mut self, station_id: u32) {
        if let Some(pos) = self.access_order.iter().position(|&id| id == station_id) {
            self.access_order.remove(pos);
        }
        self.access_order.push_back(station_id);
    }
}
