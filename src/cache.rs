use crate::address::AddressLayout;
use crate::cache_set::CacheSet;
use crate::victim::VictimBuffer;

/// Whether a fetch is a load or a store, governing whether a miss allocates
/// a line when `store_allocate` is off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessKind {
    Load,
    Store,
}

/// Per-kind hit/miss tallies, kept separately so a report can break misses
/// down by load vs. store.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessCounters {
    pub loads: u64,
    pub load_misses: u64,
    pub stores: u64,
    pub store_misses: u64,
}

impl AccessCounters {
    pub fn total_accesses(&self) -> u64 {
        self.loads + self.stores
    }

    pub fn total_misses(&self) -> u64 {
        self.load_misses + self.store_misses
    }

    fn record(&mut self, kind: AccessKind, hit: bool) {
        match kind {
            AccessKind::Load => {
                self.loads += 1;
                if !hit {
                    self.load_misses += 1;
                }
            }
            AccessKind::Store => {
                self.stores += 1;
                if !hit {
                    self.store_misses += 1;
                }
            }
        }
    }
}

/// Outcome of a use-aware, possibly multi-line, access.
pub struct AccessResult {
    pub overall_hit: bool,
    pub any_evicted_was_high_use: bool,
    pub evicted_high_use_block_addrs: Vec<u64>,
    /// Every block address evicted by this access, high-use or not. A
    /// cascade eviction replaces a low-use block that itself previously
    /// displaced a high-use one, so cascade tracking has to watch every
    /// eviction, not just the high-use ones.
    pub all_evicted_block_addrs: Vec<u64>,
    /// Way touched by the last line of the access; `None` if every touched
    /// line hit.
    pub chosen_way: Option<usize>,
}

/// A set-associative cache of one replacement-policy variant `S`, generic
/// over `CacheSet` and monomorphized rather than dispatched through a trait
/// object, since every access is on the simulator's hot path.
pub struct Cache<S: CacheSet> {
    layout: AddressLayout,
    sets: Vec<S>,
    store_allocate: bool,
    counters: AccessCounters,
}

impl<S: CacheSet> Cache<S> {
    pub fn new(layout: AddressLayout, num_sets: u32, associativity: usize, store_allocate: bool) -> Self {
        let sets = (0..num_sets).map(|_| S::new(associativity)).collect();
        Cache { layout, sets, store_allocate, counters: AccessCounters::default() }
    }

    pub fn counters(&self) -> &AccessCounters {
        &self.counters
    }

    /// Every cache-line-aligned address touched by `[addr, addr+size)`.
    /// `size <= line_size` is the common single-line case and this still
    /// yields exactly one address.
    fn touched_line_addrs(&self, addr: u64, size: u32) -> Vec<u64> {
        let line_size = self.layout.line_size() as u64;
        let start = addr - (addr % line_size);
        let end = addr + size as u64;
        let mut addrs = Vec::new();
        let mut a = start;
        while a < end {
            addrs.push(a);
            a += line_size;
        }
        addrs
    }

    /// Baseline access: decomposes a (possibly multi-line) fetch, hitting
    /// iff every touched line hits. Used for the comparison cache that runs
    /// alongside the use-aware one.
    pub fn access(&mut self, addr: u64, size: u32, kind: AccessKind, clock: u64) -> bool {
        let mut overall_hit = true;
        for line_addr in self.touched_line_addrs(addr, size) {
            let split = self.layout.split(line_addr);
            let set = &mut self.sets[split.set_index as usize];
            let hit = set.find(split.tag, clock);
            if !hit {
                overall_hit = false;
                if !(kind == AccessKind::Store && !self.store_allocate) {
                    set.replace(split.tag, clock);
                }
            }
        }
        self.counters.record(kind, overall_hit);
        overall_hit
    }

    /// Use-aware access: looks up with degree-of-use flags, and on a miss
    /// replaces with them attached, consulting/updating the shared victim
    /// buffer if provided.
    pub fn access_with_use(
        &mut self,
        addr: u64,
        size: u32,
        kind: AccessKind,
        degree_high: bool,
        degree_medium: bool,
        clock: u64,
        mut victim: Option<&mut VictimBuffer>,
    ) -> AccessResult {
        let layout = self.layout;
        let mut overall_hit = true;
        let mut evicted_high_use_block_addrs = Vec::new();
        let mut all_evicted_block_addrs = Vec::new();
        let mut chosen_way = None;

        for line_addr in self.touched_line_addrs(addr, size) {
            let split = layout.split(line_addr);
            let block_addr = layout.block_addr(line_addr);
            let set = &mut self.sets[split.set_index as usize];

            let hit = set.find_and_update_degree(
                line_addr,
                split.tag,
                degree_high,
                degree_medium,
                clock,
                |a| layout.block_addr(a),
                victim.as_deref_mut(),
            );

            if !hit {
                overall_hit = false;
                if kind == AccessKind::Store && !self.store_allocate {
                    continue;
                }
                let eviction = set.replace_with_degree(
                    split.tag,
                    degree_high,
                    degree_medium,
                    block_addr,
                    clock,
                    victim.as_deref_mut(),
                );
                chosen_way = Some(eviction.chosen_way);
                all_evicted_block_addrs.push(eviction.evicted_block_addr);
                if eviction.evicted_degree_high {
                    evicted_high_use_block_addrs.push(eviction.evicted_block_addr);
                }
            }
        }

        self.counters.record(kind, overall_hit);
        AccessResult {
            overall_hit,
            any_evicted_was_high_use: !evicted_high_use_block_addrs.is_empty(),
            evicted_high_use_block_addrs,
            all_evicted_block_addrs,
            chosen_way,
        }
    }
}
