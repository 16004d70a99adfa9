use std::{env, fmt, fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sysinfo::System;
use zkc_recursion::ReductionStrategy;

/// Budget used when the available system memory cannot be determined
const FALLBACK_MEMORY_BUDGET: u64 = 4 << 30;

/// Default estimate for the working memory of one join job
const DEFAULT_JOIN_MEMORY: u64 = 64 << 10;

/// Options of the session prover
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProverOpts {
    /// Worker threads in the proving pool
    pub workers: usize,
    /// Bytes of working memory shared by all concurrent jobs
    pub memory_budget: u64,
    pub reduction: ReductionStrategy,
    /// Overrides the per-segment witness estimate
    pub segment_memory: Option<u64>,
    pub join_memory: u64,
}

/// Half of the memory the system reports as available
pub fn default_memory_budget() -> u64 {
    let mut sys = System::new();
    sys.refresh_memory();
    match sys.available_memory() {
        0 => FALLBACK_MEMORY_BUDGET,
        available => available / 2,
    }
}

impl Default for ProverOpts {
    fn default() -> Self {
        Self {
            workers: std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1),
            memory_budget: default_memory_budget(),
            reduction: ReductionStrategy::default(),
            segment_memory: None,
            join_memory: DEFAULT_JOIN_MEMORY,
        }
    }
}

impl ProverOpts {
    /// Reads options from a JSON file. Missing fields take their default values.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read prover options from {}", path.display()))?;
        let opts: ProverOpts = serde_json::from_str(&text)
            .with_context(|| format!("failed to parse prover options in {}", path.display()))?;
        opts.validate()?;
        Ok(opts)
    }

    /// Default options overlaid with `ZKC_WORKERS`, `ZKC_MEMORY_BUDGET` and `ZKC_REDUCTION`
    pub fn from_env() -> Result<Self> {
        Self::default().with_overrides(|key| env::var(key).ok())
    }

    /// Applies overrides looked up by environment variable name
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(v) = lookup("ZKC_WORKERS") {
            self.workers = v
                .trim()
                .parse::<usize>()
                .with_context(|| format!("invalid ZKC_WORKERS '{v}'"))?;
        }
        if let Some(v) = lookup("ZKC_MEMORY_BUDGET") {
            self.memory_budget = v
                .trim()
                .parse::<u64>()
                .with_context(|| format!("invalid ZKC_MEMORY_BUDGET '{v}'"))?;
        }
        if let Some(v) = lookup("ZKC_REDUCTION") {
            self.reduction = v
                .trim()
                .parse::<ReductionStrategy>()
                .map_err(anyhow::Error::msg)
                .context("invalid ZKC_REDUCTION")?;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            anyhow::bail!("workers must be at least 1");
        }
        if self.memory_budget == 0 {
            anyhow::bail!("memory_budget must be positive");
        }
        Ok(())
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_memory_budget(mut self, bytes: u64) -> Self {
        self.memory_budget = bytes;
        self
    }

    pub fn with_reduction(mut self, reduction: ReductionStrategy) -> Self {
        self.reduction = reduction;
        self
    }

    pub fn with_segment_memory(mut self, bytes: Option<u64>) -> Self {
        self.segment_memory = bytes;
        self
    }
}

impl fmt::Display for ProverOpts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "workers={} memory_budget={} reduction={} join_memory={}",
            self.workers, self.memory_budget, self.reduction, self.join_memory
        )?;
        if let Some(bytes) = self.segment_memory {
            write!(f, " segment_memory={bytes}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn overrides_replace_defaults() {
        let opts = ProverOpts::default()
            .with_overrides(lookup(&[
                ("ZKC_WORKERS", "3"),
                ("ZKC_MEMORY_BUDGET", "1048576"),
                ("ZKC_REDUCTION", "fold"),
            ]))
            .unwrap();
        assert_eq!(opts.workers, 3);
        assert_eq!(opts.memory_budget, 1 << 20);
        assert_eq!(opts.reduction, ReductionStrategy::Fold);
    }

    #[test]
    fn bad_overrides_are_reported() {
        for (key, value) in
            [("ZKC_WORKERS", "many"), ("ZKC_WORKERS", "0"), ("ZKC_REDUCTION", "zigzag")]
        {
            let opts = ProverOpts::default().with_overrides(lookup(&[(key, value)]));
            assert!(opts.is_err(), "{key}={value}");
        }
    }

    #[test]
    fn reads_partial_json_file() {
        let path = env::temp_dir().join(format!("zkc-prover-opts-{}.json", std::process::id()));
        fs::write(&path, r#"{ "workers": 2, "reduction": "fold" }"#).unwrap();
        let opts = ProverOpts::from_file(&path).unwrap();
        fs::remove_file(&path).unwrap();
        assert_eq!(opts.workers, 2);
        assert_eq!(opts.reduction, ReductionStrategy::Fold);
        assert_eq!(opts.join_memory, DEFAULT_JOIN_MEMORY);

        let err = ProverOpts::from_file(env::temp_dir().join("zkc-missing-opts.json")).unwrap_err();
        assert!(err.to_string().contains("failed to read prover options"));
    }
}
