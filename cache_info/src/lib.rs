//! Compute and return info about the caching structure of the host.
//!
//! The information comes from the CPUID deterministic cache parameters leaf.
//! On non x86_64 targets nothing can be probed and the list is empty.

#[cfg(feature = "serde_support")]
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde_support", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum CacheType {
    Data = 1,
    Instruction = 2,
    Unified = 3,
}

impl CacheType {
    /// Whether loads from a data array go through a cache of this type.
    pub fn holds_data(self) -> bool {
        matches!(self, CacheType::Data | CacheType::Unified)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde_support", derive(Serialize, Deserialize))]
pub struct CacheInfo {
    pub cache_type: CacheType,
    pub level: u8,
    pub line_size: usize,
    pub physical_line_partitions: usize,
    pub ways: usize,
    pub sets: usize,
}

impl CacheInfo {
    /// Capacity in bytes.
    pub fn size(&self) -> usize {
        self.ways * self.physical_line_partitions * self.line_size * self.sets
    }

    #[cfg(target_arch = "x86_64")]
    fn from_cache_parameter(cp: &raw_cpuid::CacheParameter) -> Option<CacheInfo> {
        let cache_type = match cp.cache_type() {
            raw_cpuid::CacheType::Data => CacheType::Data,
            raw_cpuid::CacheType::Instruction => CacheType::Instruction,
            raw_cpuid::CacheType::Unified => CacheType::Unified,
            _ => {
                return None;
            }
        };
        Some(CacheInfo {
            cache_type,
            level: cp.level(),
            line_size: cp.coherency_line_size(),
            physical_line_partitions: cp.physical_line_partitions(),
            ways: cp.associativity(),
            sets: cp.sets(),
        })
    }
}

#[cfg(target_arch = "x86_64")]
pub fn get_cache_info() -> Vec<CacheInfo> {
    let cpuid = raw_cpuid::CpuId::new();
    let params = if let Some(params) = cpuid.get_cache_parameters() {
        params
    } else {
        return Vec::new();
    };
    params
        .filter_map(|cp| CacheInfo::from_cache_parameter(&cp))
        .collect()
}

#[cfg(not(target_arch = "x86_64"))]
pub fn get_cache_info() -> Vec<CacheInfo> {
    Vec::new()
}

/// Sizes in bytes of the data caches seen by a load, per level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde_support", derive(Serialize, Deserialize))]
pub struct CacheHierarchy {
    pub l1: Option<usize>,
    pub l2: Option<usize>,
    pub l3: Option<usize>,
}

impl CacheHierarchy {
    pub fn from_caches(caches: &[CacheInfo]) -> CacheHierarchy {
        let level_size = |level: u8| {
            caches
                .iter()
                .filter(|c| c.level == level && c.cache_type.holds_data())
                .map(CacheInfo::size)
                .max()
        };
        CacheHierarchy {
            l1: level_size(1),
            l2: level_size(2),
            l3: level_size(3),
        }
    }

    pub fn detect() -> CacheHierarchy {
        Self::from_caches(&get_cache_info())
    }

    pub fn is_empty(&self) -> bool {
        self.l1.is_none() && self.l2.is_none() && self.l3.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache(cache_type: CacheType, level: u8, ways: usize, sets: usize) -> CacheInfo {
        CacheInfo {
            cache_type,
            level,
            line_size: 64,
            physical_line_partitions: 1,
            ways,
            sets,
        }
    }

    #[test]
    fn size_is_product_of_geometry() {
        // 12-way, 64 sets, 64 B lines: a typical 48 KiB L1d
        let l1d = cache(CacheType::Data, 1, 12, 64);
        assert_eq!(l1d.size(), 48 * 1024);

        let mut partitioned = cache(CacheType::Unified, 2, 16, 1024);
        partitioned.physical_line_partitions = 2;
        assert_eq!(partitioned.size(), 2 * 1024 * 1024);
    }

    #[test]
    fn hierarchy_ignores_instruction_caches() {
        let caches = [
            cache(CacheType::Data, 1, 8, 64),
            cache(CacheType::Instruction, 1, 16, 64),
            cache(CacheType::Unified, 2, 16, 1024),
            cache(CacheType::Unified, 3, 12, 8192),
        ];
        let h = CacheHierarchy::from_caches(&caches);
        assert_eq!(h.l1, Some(32 * 1024));
        assert_eq!(h.l2, Some(1024 * 1024));
        assert_eq!(h.l3, Some(6 * 1024 * 1024));
        assert!(!h.is_empty());
    }

    #[test]
    fn missing_levels_stay_unknown() {
        let h = CacheHierarchy::from_caches(&[cache(CacheType::Data, 1, 8, 64)]);
        assert_eq!(h.l2, None);
        assert_eq!(h.l3, None);
        assert!(CacheHierarchy::from_caches(&[]).is_empty());
    }
}
