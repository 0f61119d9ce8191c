use structopt::StructOpt;

use crate::error::ConfigError;

fn is_power_of_two(n: u64) -> bool {
    n != 0 && (n & (n - 1)) == 0
}

/// The original Pin tool sized each set's way array off a template
/// parameter (`MAX_ASSOCIATIVITY`, defaulting to 4); `WayArray` here grows
/// at runtime instead, but a run with an unreasonably wide set is almost
/// certainly a config typo, so the bound is kept as a validation check.
pub const MAX_ASSOCIATIVITY: u32 = 64;

/// Geometry and thresholds for one run of the simulator.
#[derive(Debug, Clone, StructOpt, serde::Serialize)]
#[structopt(
    name = "use-aware-icache-sim",
    about = "Instruction-cache / ITLB simulator comparing a baseline LRU cache against a use-aware replacement policy."
)]
pub struct Config {
    /// Path to the fetch trace (line-oriented text; see `event::TextTraceReader`).
    #[structopt(long, parse(from_os_str))]
    pub trace_path: std::path::PathBuf,

    /// Where to write the text report.
    #[structopt(long = "output", default_value = "icache_sim.out")]
    pub output_path: String,

    /// Optional path to additionally write a JSON report.
    #[structopt(long)]
    pub json: Option<std::path::PathBuf>,

    /// Baseline (ICACHE) cache size in kilobytes.
    #[structopt(long, default_value = "32")]
    pub icache_size_kb: u32,
    /// Baseline (ICACHE) cache line size in bytes.
    #[structopt(long, default_value = "64")]
    pub icache_line_bytes: u32,
    /// Baseline (ICACHE) associativity.
    #[structopt(long, default_value = "8")]
    pub icache_assoc: u32,

    /// Modified (ITLB-named) cache size in kilobytes.
    #[structopt(long, default_value = "32")]
    pub itlb_size_kb: u32,
    /// Modified cache line size in bytes.
    #[structopt(long, default_value = "64")]
    pub itlb_line_bytes: u32,
    /// Modified cache associativity.
    #[structopt(long, default_value = "8")]
    pub itlb_assoc: u32,

    /// Number of fetches to process before the report is emitted.
    #[structopt(long, default_value = "500000000")]
    pub instruction_threshold: u64,

    /// Only fetches from this thread id are simulated.
    #[structopt(long, default_value = "15")]
    pub thread_id: u32,

    /// Ratio above which a function is considered high-use.
    #[structopt(long, default_value = "1.5")]
    pub degree_high: f64,
    /// Ratio above which a (already low-use) function also gets the medium flag.
    #[structopt(long, default_value = "1.0")]
    pub degree_medium: f64,
    /// Minimum accumulated misses before a function may be classified low-use.
    #[structopt(long, default_value = "50")]
    pub miss_threshold: u64,
    /// Minimum invocation count for a function to count toward the
    /// high-use-miss reporting tallies (a reporting filter only; it never
    /// gates classification itself).
    #[structopt(long, default_value = "50")]
    pub invocation_threshold: u64,

    /// Number of entries in the shared victim buffer.
    #[structopt(long, default_value = "32")]
    pub victim_entries: usize,
    /// Whether medium-use evictions are buffered in the victim buffer.
    #[structopt(long)]
    pub victim_enabled: bool,

    /// Allocate modified-cache lines on store misses too (not just loads).
    #[structopt(long)]
    pub store_allocate: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            trace_path: std::path::PathBuf::new(),
            output_path: "icache_sim.out".to_string(),
            json: None,
            icache_size_kb: 32,
            icache_line_bytes: 64,
            icache_assoc: 8,
            itlb_size_kb: 32,
            itlb_line_bytes: 64,
            itlb_assoc: 8,
            instruction_threshold: 500_000_000,
            thread_id: 15,
            degree_high: 1.5,
            degree_medium: 1.0,
            miss_threshold: 50,
            invocation_threshold: 50,
            victim_entries: 32,
            victim_enabled: true,
            store_allocate: true,
        }
    }
}

pub struct CacheGeometry {
    pub cache_size_bytes: u32,
    pub line_size: u32,
    pub associativity: u32,
    pub num_sets: u32,
}

impl Config {
    /// Construction-time validation: non-power-of-two sizes, associativity
    /// exceeding the compile-time bound, and non-positive thresholds all
    /// fail here rather than partway through a run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.icache_geometry()?;
        self.itlb_geometry()?;

        if self.degree_high <= 0.0 {
            return Err(ConfigError::NotPositive {
                field: "degree_high",
                value: self.degree_high,
            });
        }
        if self.degree_medium <= 0.0 {
            return Err(ConfigError::NotPositive {
                field: "degree_medium",
                value: self.degree_medium,
            });
        }
        if self.miss_threshold == 0 {
            return Err(ConfigError::NotPositiveInt {
                field: "miss_threshold",
                value: self.miss_threshold,
            });
        }
        if self.victim_entries == 0 && self.victim_enabled {
            return Err(ConfigError::NotPositiveInt {
                field: "victim_entries",
                value: 0,
            });
        }
        Ok(())
    }

    pub fn icache_geometry(&self) -> Result<CacheGeometry, ConfigError> {
        Self::geometry("icache", self.icache_size_kb * 1024, self.icache_line_bytes, self.icache_assoc)
    }

    pub fn itlb_geometry(&self) -> Result<CacheGeometry, ConfigError> {
        Self::geometry("itlb", self.itlb_size_kb * 1024, self.itlb_line_bytes, self.itlb_assoc)
    }

    fn geometry(
        name: &'static str,
        cache_size_bytes: u32,
        line_size: u32,
        associativity: u32,
    ) -> Result<CacheGeometry, ConfigError> {
        if !is_power_of_two(line_size as u64) {
            return Err(ConfigError::NotPowerOfTwo {
                field: "line_size",
                value: line_size as u64,
            });
        }
        if associativity > MAX_ASSOCIATIVITY {
            return Err(ConfigError::AssociativityTooLarge {
                cache: name,
                assoc: associativity,
                bound: MAX_ASSOCIATIVITY,
            });
        }
        if associativity == 0 || cache_size_bytes % (associativity * line_size) != 0 {
            return Err(ConfigError::BadGeometry {
                cache: name,
                cache_size: cache_size_bytes,
                assoc: associativity,
                line_size,
            });
        }
        let num_sets = cache_size_bytes / (associativity * line_size);
        if !is_power_of_two(num_sets as u64) {
            return Err(ConfigError::NotPowerOfTwo {
                field: "num_sets",
                value: num_sets as u64,
            });
        }
        Ok(CacheGeometry {
            cache_size_bytes,
            line_size,
            associativity,
            num_sets,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        let cfg = Config::default();
        cfg.validate().expect("default config should be valid");
    }

    #[test]
    fn non_power_of_two_line_size_rejected() {
        let mut cfg = Config::default();
        cfg.icache_line_bytes = 60;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::NotPowerOfTwo { field: "line_size", .. })
        ));
    }

    #[test]
    fn non_power_of_two_set_count_rejected() {
        let mut cfg = Config::default();
        // 32KiB / (8 * 64) = 64 sets (power of two); make it 3 sets worth instead.
        cfg.icache_size_kb = 0;
        cfg.icache_assoc = 3;
        cfg.icache_line_bytes = 64;
        // cache_size_bytes = 0 -> 0 % (3*64) == 0 but num_sets = 0, not power of two.
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn associativity_past_the_configured_bound_rejected() {
        let mut cfg = Config::default();
        cfg.icache_assoc = MAX_ASSOCIATIVITY + 1;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::AssociativityTooLarge { cache: "icache", .. })
        ));
    }

    #[test]
    fn zero_miss_threshold_rejected() {
        let mut cfg = Config::default();
        cfg.miss_threshold = 0;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::NotPositiveInt { field: "miss_threshold", .. })
        ));
    }
}
