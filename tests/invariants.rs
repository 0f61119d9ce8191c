use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use use_aware_icache_sim::address::AddressLayout;
use use_aware_icache_sim::cache::{AccessKind, Cache};
use use_aware_icache_sim::cache_set::{DirectMapped, Lru};

/// A reference LRU model, independent of `Cache`/`WayArray`, used only to
/// cross-check the baseline cache's miss count against a random trace.
struct ReferenceLru {
    sets: Vec<Vec<u64>>,
    set_mask: u64,
    line_shift: u32,
    associativity: usize,
}

impl ReferenceLru {
    fn new(num_sets: u32, associativity: usize, line_size: u32) -> Self {
        ReferenceLru {
            sets: vec![Vec::new(); num_sets as usize],
            set_mask: (num_sets - 1) as u64,
            line_shift: line_size.trailing_zeros(),
            associativity,
        }
    }

    fn access(&mut self, addr: u64) -> bool {
        let tag = addr >> self.line_shift;
        let set_index = (tag & self.set_mask) as usize;
        let set = &mut self.sets[set_index];
        if let Some(pos) = set.iter().position(|&t| *t == tag) {
            let entry = set.remove(pos);
            set.push(entry);
            true
        } else {
            if set.len() == self.associativity {
                set.remove(0);
            }
            set.push(tag);
            false
        }
    }
}

#[test]
fn baseline_cache_miss_count_matches_a_reference_lru_model() {
    let num_sets = 16;
    let associativity = 4;
    let line_size = 64;

    let layout = AddressLayout::new(line_size, num_sets);
    let mut cache: Cache<Lru> = Cache::new(layout, num_sets, associativity, true);
    let mut reference = ReferenceLru::new(num_sets, associativity, line_size);

    let mut rng = StdRng::seed_from_u64(0xC0FFEE);
    let mut clock = 0u64;
    let mut reference_misses = 0u64;

    for _ in 0..5000 {
        clock += 1;
        let addr: u64 = rng.gen_range(0..(num_sets as u64 * associativity as u64 * line_size as u64 * 4));
        let hit = cache.access(addr, 4, AccessKind::Load, clock);
        let reference_hit = reference.access(addr);
        if !reference_hit {
            reference_misses += 1;
        }
        assert_eq!(hit, reference_hit, "diverged at addr {addr:#x}, clock {clock}");
    }

    assert_eq!(cache.counters().total_misses(), reference_misses);
    assert_eq!(cache.counters().total_accesses(), 5000);
}

#[test]
fn associativity_one_direct_mapped_set_matches_the_direct_mapped_variant() {
    use use_aware_icache_sim::cache_set::CacheSet;

    let mut rng = StdRng::seed_from_u64(42);
    let mut direct = DirectMapped::new(1);
    let mut lru_one_way = Lru::new(1);

    for clock in 1..2000u64 {
        let tag: u64 = rng.gen_range(0..64);
        let hit_direct = direct.find(tag, clock);
        let hit_lru = lru_one_way.find(tag, clock);
        assert_eq!(hit_direct, hit_lru);
        if !hit_direct {
            direct.replace(tag, clock);
            lru_one_way.replace(tag, clock);
        }
    }
}

#[test]
fn hits_plus_misses_equals_accesses_under_a_random_trace() {
    let layout = AddressLayout::new(64, 8);
    let mut cache: Cache<Lru> = Cache::new(layout, 8, 2, true);
    let mut rng = StdRng::seed_from_u64(7);

    let mut accesses = 0u64;
    for clock in 1..3000u64 {
        let addr: u64 = rng.gen_range(0..0x10000);
        cache.access(addr, 4, AccessKind::Load, clock);
        accesses += 1;
    }

    let counters = cache.counters();
    assert_eq!(counters.total_accesses(), accesses);
    assert!(counters.total_misses() <= counters.total_accesses());
}
