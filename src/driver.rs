use std::collections::HashSet;

use crate::address::AddressLayout;
use crate::cache::{AccessKind, Cache};
use crate::cache_set::{Lru, UseAwareLru};
use crate::callstack::ShadowCallStack;
use crate::classifier::FunctionUseClassifier;
use crate::config::Config;
use crate::error::SimError;
use crate::event::{ControlFlow, FetchEvent, FetchSource};
use crate::victim::VictimBuffer;

/// What the previous processed event was, for the call/return bookkeeping of
/// the current fetch (everything else leaves the callee unchanged).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PrevEvent {
    None,
    Call,
    Return,
}

/// Categorized counters accumulated across the run, feeding the
/// differential block of the final report.
#[derive(Debug, Clone, Copy, Default)]
pub struct CategorizedCounters {
    pub misses_from_low_degree_modified: u64,
    pub misses_from_low_degree_normal: u64,
    pub misses_from_high_degree_modified: u64,
    pub misses_from_high_degree_normal: u64,
    pub displaced_by_high_use_by_high_use: u64,
    pub displaced_by_high_use_by_low_use: u64,
    pub displaced_by_high_use_by_low_use_cascade: u64,
    pub low_use_misses_after_call: u64,
    pub low_use_allocated_way0: u64,
}

/// Bundles all per-run state — logical clock, both caches, the shared
/// victim buffer, the function map, and the shadow call stack — so a
/// process can hold several independent simulators. Lifecycle: construct,
/// feed fetches one at a time, ask for a report, drop.
pub struct Simulator {
    config: Config,
    clock: u64,
    instructions_processed: u64,
    icache: Cache<Lru>,
    itlb: Cache<UseAwareLru>,
    victim: Option<VictimBuffer>,
    classifier: FunctionUseClassifier,
    call_stack: ShadowCallStack,
    current_callee: Option<u64>,
    prev_event: PrevEvent,
    cascade_pending_blocks: HashSet<u64>,
    counters: CategorizedCounters,
    done: bool,
}

impl Simulator {
    pub fn new(config: Config) -> Result<Self, SimError> {
        config.validate()?;

        let icache_geom = config.icache_geometry()?;
        let itlb_geom = config.itlb_geometry()?;

        let icache_layout = AddressLayout::new(icache_geom.line_size, icache_geom.num_sets);
        let itlb_layout = AddressLayout::new(itlb_geom.line_size, itlb_geom.num_sets);

        let icache = Cache::new(icache_layout, icache_geom.num_sets, icache_geom.associativity as usize, true);
        let itlb = Cache::new(
            itlb_layout,
            itlb_geom.num_sets,
            itlb_geom.associativity as usize,
            config.store_allocate,
        );
        let victim = config.victim_enabled.then(|| VictimBuffer::new(config.victim_entries));

        Ok(Simulator {
            classifier: FunctionUseClassifier::new(config.degree_high, config.degree_medium, config.miss_threshold),
            config,
            clock: 0,
            instructions_processed: 0,
            icache,
            itlb,
            victim,
            call_stack: ShadowCallStack::new(),
            current_callee: None,
            prev_event: PrevEvent::None,
            cascade_pending_blocks: HashSet::new(),
            counters: CategorizedCounters::default(),
            done: false,
        })
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Drains `source` until it is exhausted or the configured instruction
    /// threshold is reached.
    pub fn run(&mut self, source: &mut impl FetchSource) -> Result<(), SimError> {
        while !self.done {
            match source.next_fetch()? {
                Some(event) => self.process_fetch(event),
                None => break,
            }
        }
        Ok(())
    }

    /// Processes one fetch event, applying the per-fetch algorithm. Events
    /// on threads other than the configured one are discarded before
    /// touching any state. No-ops once the instruction threshold has been
    /// reached.
    pub fn process_fetch(&mut self, event: FetchEvent) {
        if self.done {
            return;
        }
        if event.thread_id != self.config.thread_id {
            return;
        }

        self.clock += 1;
        let clock = self.clock;

        // Step 1/2: apply the previous event's call/return effect, updating
        // the current callee before this fetch is attributed. The very
        // first attributed fetch (no callee established yet) is treated the
        // same as a freshly entered function.
        let had_callee = self.current_callee.is_some();
        match self.prev_event {
            PrevEvent::Call => {
                if let Some(old_callee) = self.current_callee {
                    self.call_stack.push(old_callee);
                }
                self.current_callee = Some(event.addr);
            }
            PrevEvent::Return => {
                if let Some(caller) = self.call_stack.pop() {
                    self.current_callee = Some(caller);
                }
            }
            PrevEvent::None => {}
        }
        if self.current_callee.is_none() {
            self.current_callee = Some(event.addr);
        }
        let is_post_call = self.prev_event == PrevEvent::Call || !had_callee;

        let callee = self.current_callee.unwrap();

        // Step 4: classify.
        let (degree_high, degree_medium) = self.classifier.classify(callee);

        // Step 5: drive both caches. Baseline always sees degree_high=true.
        let baseline_hit = self.icache.access(event.addr, event.size, AccessKind::Load, clock);
        let modified = self.itlb.access_with_use(
            event.addr,
            event.size,
            AccessKind::Load,
            degree_high,
            degree_medium,
            clock,
            self.victim.as_mut(),
        );

        self.classifier.note_unique_block(callee, self.itlb_block_addr(event.addr));

        // Step 6: update the function record's counters.
        self.classifier.record_fetch(callee, is_post_call, modified.overall_hit);

        // Step 7: categorized counters.
        let high_invocations = self
            .classifier
            .get(callee)
            .map(|r| r.invocations >= self.config.invocation_threshold)
            .unwrap_or(false);
        if !baseline_hit {
            let low_use = self.classifier.get(callee).map(|r| r.classified_low).unwrap_or(false);
            if low_use {
                self.counters.misses_from_low_degree_normal += 1;
            }
            if high_invocations {
                self.counters.misses_from_high_degree_normal += 1;
            }
        }
        if !modified.overall_hit {
            let low_use = self.classifier.get(callee).map(|r| r.classified_low).unwrap_or(false);
            if low_use {
                self.counters.misses_from_low_degree_modified += 1;
                if is_post_call {
                    self.counters.low_use_misses_after_call += 1;
                }
            }
            if high_invocations {
                self.counters.misses_from_high_degree_modified += 1;
            }
            if let Some(way) = modified.chosen_way {
                if !degree_high && way == 0 {
                    self.counters.low_use_allocated_way0 += 1;
                }
                let new_block_addr = self.itlb_block_addr(event.addr);
                if modified.any_evicted_was_high_use {
                    if degree_high {
                        self.counters.displaced_by_high_use_by_high_use += 1;
                    } else {
                        self.counters.displaced_by_high_use_by_low_use += 1;
                        self.cascade_pending_blocks.insert(new_block_addr);
                    }
                }
                for evicted in &modified.all_evicted_block_addrs {
                    if self.cascade_pending_blocks.remove(evicted) {
                        self.counters.displaced_by_high_use_by_low_use_cascade += 1;
                    }
                }
            }
        }

        // Step 8: set the control-flow flag for the next fetch.
        self.prev_event = match event.control_flow {
            ControlFlow::DirectCall | ControlFlow::IndirectCall => PrevEvent::Call,
            ControlFlow::Return => PrevEvent::Return,
            _ => PrevEvent::None,
        };
        self.instructions_processed += 1;
        if self.instructions_processed >= self.config.instruction_threshold {
            self.done = true;
        }
    }

    fn itlb_block_addr(&self, addr: u64) -> u64 {
        // Mirrors the modified cache's own line size; recomputed here
        // rather than threading a layout reference through, since it's a
        // cheap power-of-two shift.
        let line_bytes = self.config.itlb_line_bytes as u64;
        addr / line_bytes
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn icache(&self) -> &Cache<Lru> {
        &self.icache
    }

    pub fn itlb(&self) -> &Cache<UseAwareLru> {
        &self.itlb
    }

    pub fn classifier(&self) -> &FunctionUseClassifier {
        &self.classifier
    }

    pub fn categorized_counters(&self) -> &CategorizedCounters {
        &self.counters
    }

    pub fn instructions_processed(&self) -> u64 {
        self.instructions_processed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::FetchEvent;

    fn cfg() -> Config {
        let mut c = Config::default();
        c.thread_id = 0;
        c.icache_size_kb = 32;
        c.itlb_size_kb = 32;
        c.instruction_threshold = 1_000_000;
        c
    }

    fn ev(addr: u64, control_flow: ControlFlow) -> FetchEvent {
        FetchEvent { addr, size: 4, thread_id: 0, control_flow }
    }

    #[test]
    fn cold_miss_then_hit_records_single_invocation() {
        let mut sim = Simulator::new(cfg()).unwrap();
        sim.process_fetch(ev(0x1000, ControlFlow::DirectCall));
        sim.process_fetch(ev(0x1004, ControlFlow::None));
        let record = sim.classifier().get(0x1000).unwrap();
        assert_eq!(record.invocations, 1);
        assert_eq!(record.misses, 1);
        assert_eq!(record.total_misses, 1);
        assert!(!record.classified_low);
    }

    #[test]
    fn other_thread_events_are_discarded() {
        let mut sim = Simulator::new(cfg()).unwrap();
        sim.process_fetch(FetchEvent { addr: 0x1000, size: 4, thread_id: 99, control_flow: ControlFlow::None });
        assert_eq!(sim.instructions_processed(), 0);
    }

    #[test]
    fn repeated_call_return_past_fifty_misses_classifies_low() {
        // A single-set, single-way modified cache so that alternating
        // between the caller and the callee thrashes the one line, forcing
        // every call to genuinely miss.
        let mut c = cfg();
        c.itlb_line_bytes = 1024;
        c.itlb_assoc = 1;
        c.itlb_size_kb = 1;
        let mut sim = Simulator::new(c).unwrap();
        for _ in 0..60 {
            sim.process_fetch(ev(0x9000, ControlFlow::DirectCall));
            sim.process_fetch(ev(0x2000, ControlFlow::Return));
        }
        let record = sim.classifier().get(0x2000).unwrap();
        assert!(record.misses >= 50);
        assert!(record.classified_low);
        assert!(!record.classified_medium);
    }

    #[test]
    fn instruction_threshold_stops_processing() {
        let mut c = cfg();
        c.instruction_threshold = 2;
        let mut sim = Simulator::new(c).unwrap();
        sim.process_fetch(ev(0x10, ControlFlow::None));
        sim.process_fetch(ev(0x14, ControlFlow::None));
        assert!(sim.is_done());
        sim.process_fetch(ev(0x18, ControlFlow::None));
        assert_eq!(sim.instructions_processed(), 2);
    }
}
