use cache_info::CacheHierarchy;
use serde::{Deserialize, Serialize};

pub const KIB: u64 = 1024;
pub const MIB: u64 = 1024 * KIB;
pub const GIB: u64 = 1024 * MIB;

/// Cache hierarchy parameters, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConstants {
    pub l1_size: u64,
    pub l2_size: u64,
    pub l3_size: u64,
    pub word_size: u64,
    pub page_size: u64,
}

impl Default for CacheConstants {
    fn default() -> Self {
        Self {
            l1_size: 128 * KIB,
            l2_size: MIB,
            l3_size: 6 * MIB,
            word_size: 8, // 64-bit system
            page_size: 4096,
        }
    }
}

impl CacheConstants {
    /// Replace the cache sizes that were detected, keep the others.
    pub fn with_hierarchy(mut self, hierarchy: &CacheHierarchy) -> Self {
        if let Some(l1) = hierarchy.l1 {
            self.l1_size = l1 as u64;
        }
        if let Some(l2) = hierarchy.l2 {
            self.l2_size = l2 as u64;
        }
        if let Some(l3) = hierarchy.l3 {
            self.l3_size = l3 as u64;
        }
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub l1: u64,
    pub l2: u64,
    pub l3: u64,
    /// Working set size at which the page table entries covering it fill
    /// half of the L3.
    pub pagetable_eviction: f64,
}

pub fn compute_thresholds(constants: &CacheConstants) -> Thresholds {
    let entries_per_page = constants.page_size as f64 / constants.word_size as f64;
    Thresholds {
        l1: constants.l1_size,
        l2: constants.l2_size,
        l3: constants.l3_size,
        pagetable_eviction: constants.l3_size as f64 * 0.5 * entries_per_page,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerColor {
    Red,
    Green,
    Brown,
    Purple,
}

impl MarkerColor {
    pub fn rgb(self) -> (u8, u8, u8) {
        match self {
            MarkerColor::Red => (255, 0, 0),
            MarkerColor::Green => (0, 128, 0),
            MarkerColor::Brown => (165, 42, 42),
            MarkerColor::Purple => (128, 0, 128),
        }
    }

    /// xcolor expression.
    pub fn tex(self) -> &'static str {
        match self {
            MarkerColor::Red => "red",
            MarkerColor::Green => "green!50!black",
            MarkerColor::Brown => "brown",
            MarkerColor::Purple => "purple",
        }
    }
}

/// A labelled vertical reference line.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdMarker {
    pub label: String,
    pub x: f64,
    pub color: MarkerColor,
}

impl Thresholds {
    pub fn markers(&self) -> Vec<ThresholdMarker> {
        vec![
            ThresholdMarker {
                label: format!("L1 ({})", format_size(self.l1)),
                x: self.l1 as f64,
                color: MarkerColor::Red,
            },
            ThresholdMarker {
                label: format!("L2 ({})", format_size(self.l2)),
                x: self.l2 as f64,
                color: MarkerColor::Green,
            },
            ThresholdMarker {
                label: format!("L3 ({})", format_size(self.l3)),
                x: self.l3 as f64,
                color: MarkerColor::Brown,
            },
            ThresholdMarker {
                label: String::from("PT Evic. Thres."),
                x: self.pagetable_eviction,
                color: MarkerColor::Purple,
            },
        ]
    }
}

/// Largest binary unit that divides `bytes` exactly.
pub fn format_size(bytes: u64) -> String {
    for (unit, name) in [(GIB, "GiB"), (MIB, "MiB"), (KIB, "KiB")] {
        if bytes >= unit && bytes % unit == 0 {
            return format!("{} {}", bytes / unit, name);
        }
    }
    format!("{} B", bytes)
}

/// Parse `4096`, `128K`, `128KiB`, `1.5M`, `6 MiB`, ... into bytes.
/// All suffixes are binary multiples.
pub fn parse_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    let split = s
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(s.len());
    let (number, suffix) = s.split_at(split);
    let multiplier = match suffix.trim().to_ascii_lowercase().as_str() {
        "" | "b" => 1,
        "k" | "kb" | "kib" => KIB,
        "m" | "mb" | "mib" => MIB,
        "g" | "gb" | "gib" => GIB,
        other => return Err(format!("unknown size suffix {:?}", other)),
    };
    if let Ok(n) = number.parse::<u64>() {
        return n
            .checked_mul(multiplier)
            .ok_or_else(|| format!("size {:?} overflows", s));
    }
    let value = number
        .parse::<f64>()
        .map_err(|_| format!("invalid size {:?}", s))?
        * multiplier as f64;
    if value.fract() != 0.0 || value > u64::MAX as f64 {
        return Err(format!("size {:?} is not a whole number of bytes", s));
    }
    Ok(value as u64)
}
