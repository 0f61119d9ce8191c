use std::io::Write;

use serde::Serialize;

use crate::driver::Simulator;

/// One function's line in the per-function report block.
#[derive(Debug, Clone, Serialize)]
pub struct FunctionLine {
    pub callee_addr: u64,
    pub miss_count: u64,
    pub total_miss_count: u64,
    pub invocation_count: u64,
}

/// Final statistics produced after a run, matching the text report's
/// sections one field at a time.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub icache_accesses: u64,
    pub icache_misses: u64,
    pub itlb_accesses: u64,
    pub itlb_misses: u64,

    pub total_misses: u64,
    pub misses_from_low_degree_modified: u64,
    pub misses_from_low_degree_normal: u64,
    pub misses_from_high_degree_modified: u64,
    pub misses_from_high_degree_normal: u64,
    pub displaced_by_high_use_by_high_use: u64,
    pub displaced_by_high_use_by_low_use: u64,
    pub displaced_by_high_use_by_low_use_cascade: u64,
    pub total_low_degree_functions: u64,
    pub total_functions: u64,

    pub low_use_misses_after_call: u64,
    pub low_use_allocated_way0: u64,

    pub functions: Vec<FunctionLine>,
}

impl Report {
    pub fn from_simulator(sim: &Simulator) -> Self {
        let icache = sim.icache().counters();
        let itlb = sim.itlb().counters();
        let categorized = sim.categorized_counters();

        let mut functions: Vec<FunctionLine> = sim
            .classifier()
            .iter()
            .map(|(&callee_addr, record)| FunctionLine {
                callee_addr,
                miss_count: record.misses,
                total_miss_count: record.total_misses,
                invocation_count: record.invocations,
            })
            .collect();
        functions.sort_by_key(|f| f.callee_addr);

        let total_low_degree_functions =
            sim.classifier().iter().filter(|(_, record)| record.classified_low).count() as u64;

        Report {
            icache_accesses: icache.total_accesses(),
            icache_misses: icache.total_misses(),
            itlb_accesses: itlb.total_accesses(),
            itlb_misses: itlb.total_misses(),
            total_misses: icache.total_misses() + itlb.total_misses(),
            misses_from_low_degree_modified: categorized.misses_from_low_degree_modified,
            misses_from_low_degree_normal: categorized.misses_from_low_degree_normal,
            misses_from_high_degree_modified: categorized.misses_from_high_degree_modified,
            misses_from_high_degree_normal: categorized.misses_from_high_degree_normal,
            displaced_by_high_use_by_high_use: categorized.displaced_by_high_use_by_high_use,
            displaced_by_high_use_by_low_use: categorized.displaced_by_high_use_by_low_use,
            displaced_by_high_use_by_low_use_cascade: categorized.displaced_by_high_use_by_low_use_cascade,
            total_low_degree_functions,
            total_functions: functions.len() as u64,
            low_use_misses_after_call: categorized.low_use_misses_after_call,
            low_use_allocated_way0: categorized.low_use_allocated_way0,
            functions,
        }
    }

    pub fn write_text(&self, mut out: impl Write) -> std::io::Result<()> {
        writeln!(out, "ICACHE stats")?;
        writeln!(out, "  Accesses: {}", self.icache_accesses)?;
        writeln!(out, "  Misses: {}", self.icache_misses)?;
        writeln!(out)?;
        writeln!(out, "ITLB stats")?;
        writeln!(out, "  Accesses: {}", self.itlb_accesses)?;
        writeln!(out, "  Misses: {}", self.itlb_misses)?;
        writeln!(out)?;
        writeln!(out, "Total misses: {}", self.total_misses)?;
        writeln!(
            out,
            "Misses from low degree of use functions (modified cache): {}",
            self.misses_from_low_degree_modified
        )?;
        writeln!(
            out,
            "Misses from low degree of use functions (normal cache): {}",
            self.misses_from_low_degree_normal
        )?;
        writeln!(
            out,
            "Misses from high degree of use functions (modified cache): {}",
            self.misses_from_high_degree_modified
        )?;
        writeln!(
            out,
            "Misses from high degree of use functions (normal cache): {}",
            self.misses_from_high_degree_normal
        )?;
        writeln!(
            out,
            "Cache blocks replaced from high use functions by high use functions: {}",
            self.displaced_by_high_use_by_high_use
        )?;
        writeln!(
            out,
            "Cache blocks replaced from high use functions by low use (<=1) functions: {}",
            self.displaced_by_high_use_by_low_use
        )?;
        writeln!(
            out,
            "Cache blocks replaced from high use functions by low use (<=1) functions in cascade: {}",
            self.displaced_by_high_use_by_low_use_cascade
        )?;
        writeln!(out, "Total number of low degree of use functions: {}", self.total_low_degree_functions)?;
        writeln!(out, "Total number of functions: {}", self.total_functions)?;
        writeln!(out, "Low use misses immediately after call: {}", self.low_use_misses_after_call)?;
        writeln!(out, "Low use allocations into way 0: {}", self.low_use_allocated_way0)?;
        writeln!(out)?;
        for f in &self.functions {
            writeln!(
                out,
                "({:#x}): miss_count: {} total_miss_count: {} invocation_count: {}",
                f.callee_addr, f.miss_count, f.total_miss_count, f.invocation_count
            )?;
        }
        Ok(())
    }

    pub fn write_json(&self, out: impl Write) -> Result<(), serde_json::Error> {
        serde_json::to_writer_pretty(out, self)
    }
}
