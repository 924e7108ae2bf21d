//! 模糊算法与强度档位的参数表
//!
//! 每个 (mode, tier) 组合的数值参数全部来自 [`BLUR_CONFIGURATIONS`]，
//! 这是唯一的数值来源，代码不做任何数值推导。

/// Dual/Tent Filter 最大的总 pass 数（一半下采样，一半上采样）
pub const MAX_FILTER_ITERATIONS: usize = 10;
/// Kawase 最大迭代次数
pub const MAX_KAWASE_ITERATIONS: usize = 5;
/// 支持的最大 Gaussian kernel 尺寸
pub const MAX_GAUSSIAN_KERNEL: u32 = 51;
/// 截断 kernel 时，可以接受的最小系数
pub const MIN_ACCEPTABLE_COEFFICIENT: f64 = 0.0003;
/// 模糊图像相对于显示分辨率的缩小倍率
pub const BLUR_SCALE: u32 = 4;

/// 强度档位的数量
pub const SIZE_TIER_COUNT: usize = 5;
/// 默认的强度档位
pub const DEFAULT_SIZE_TIER: usize = 2;

/// 模糊算法，Left/Right 按此顺序循环切换
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlurMode {
    NoBloom,
    GaussianOriginal,
    GaussianLinear,
    ComputeGaussian,
    HybridGaussian,
    GaussianLinearTruncated,
    Kawase,
    DualFilter,
    TentFilter,
}

impl BlurMode {
    /// 循环切换顺序
    pub const CYCLE: [BlurMode; 9] = [
        BlurMode::NoBloom,
        BlurMode::GaussianOriginal,
        BlurMode::GaussianLinear,
        BlurMode::ComputeGaussian,
        BlurMode::HybridGaussian,
        BlurMode::GaussianLinearTruncated,
        BlurMode::Kawase,
        BlurMode::DualFilter,
        BlurMode::TentFilter,
    ];

    #[inline]
    fn cycle_index(self) -> usize {
        Self::CYCLE.iter().position(|m| *m == self).unwrap()
    }

    /// 下一个模式，循环
    #[inline]
    pub fn next(self) -> Self {
        Self::CYCLE[(self.cycle_index() + 1) % Self::CYCLE.len()]
    }

    /// 上一个模式，循环
    #[inline]
    pub fn prev(self) -> Self {
        Self::CYCLE[(self.cycle_index() + Self::CYCLE.len() - 1) % Self::CYCLE.len()]
    }

    /// 命令行的模式序号，越界返回 None
    #[inline]
    pub fn from_index(index: u32) -> Option<Self> {
        Self::CYCLE.get(index as usize).copied()
    }

    /// NoBloom 之外的模式都会产生模糊 pass
    #[inline]
    pub fn has_blur(self) -> bool {
        self != BlurMode::NoBloom
    }

    pub fn label(self) -> &'static str {
        match self {
            BlurMode::NoBloom => "No Bloom",
            BlurMode::GaussianOriginal => "Gaussian (Reference)",
            BlurMode::GaussianLinear => "Gaussian (Linear Sampling)",
            BlurMode::ComputeGaussian => "Gaussian (Compute Sliding Average)",
            BlurMode::HybridGaussian => "Hybrid Gaussian (Compute + Fragment)",
            BlurMode::GaussianLinearTruncated => "Gaussian (Truncated Linear)",
            BlurMode::Kawase => "Kawase",
            BlurMode::DualFilter => "Dual Filter",
            BlurMode::TentFilter => "Tent Filter",
        }
    }
}

/// Kawase 的单档配置：迭代次数 + 每次迭代的整数 kernel
#[derive(Clone, Copy, Debug)]
pub struct KawaseTierConfig {
    pub iterations: usize,
    pub kernels: [u32; MAX_KAWASE_ITERATIONS],
}

/// 单个强度档位的全部数值参数，一行对应一个档位
#[derive(Clone, Copy, Debug)]
pub struct BlurTierConfig {
    /// Gaussian Original/Linear/Compute 的 kernel 尺寸
    pub gaussian_kernel: u32,
    /// Truncated Linear 的 kernel 尺寸（Hybrid 也使用这一项）
    pub truncated_kernel: u32,
    pub kawase: KawaseTierConfig,
    /// Dual/Tent Filter 的总 pass 数，恒为偶数
    pub filter_passes: usize,
    pub label: &'static str,
}

/// 每个档位的参数，来自原始调优数据，必须保持为数据而非代码
pub const BLUR_CONFIGURATIONS: [BlurTierConfig; SIZE_TIER_COUNT] = [
    BlurTierConfig {
        gaussian_kernel: 5,
        truncated_kernel: 5,
        kawase: KawaseTierConfig { iterations: 2, kernels: [0, 0, 0, 0, 0] },
        filter_passes: 2,
        label: "tier 0 (lightest)",
    },
    BlurTierConfig {
        gaussian_kernel: 15,
        truncated_kernel: 11,
        kawase: KawaseTierConfig { iterations: 3, kernels: [0, 0, 1, 0, 0] },
        filter_passes: 4,
        label: "tier 1",
    },
    BlurTierConfig {
        gaussian_kernel: 25,
        truncated_kernel: 17,
        kawase: KawaseTierConfig { iterations: 4, kernels: [0, 0, 1, 1, 0] },
        filter_passes: 6,
        label: "tier 2 (default)",
    },
    BlurTierConfig {
        gaussian_kernel: 35,
        truncated_kernel: 21,
        kawase: KawaseTierConfig { iterations: 4, kernels: [0, 1, 1, 1, 0] },
        filter_passes: 8,
        label: "tier 3",
    },
    BlurTierConfig {
        gaussian_kernel: 51,
        truncated_kernel: 25,
        kawase: KawaseTierConfig { iterations: 5, kernels: [0, 0, 1, 1, 2] },
        filter_passes: 10,
        label: "tier 4 (heaviest)",
    },
];

/// 当前激活的 bloom 配置
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BloomConfig {
    pub mode: BlurMode,
    pub tier: usize,
    /// 只显示 bloom，不合成原图
    pub bloom_only: bool,
}

impl Default for BloomConfig {
    fn default() -> Self {
        Self {
            mode: BlurMode::GaussianLinear,
            tier: DEFAULT_SIZE_TIER,
            bloom_only: false,
        }
    }
}

impl BloomConfig {
    #[inline]
    pub fn tier_config(&self) -> &'static BlurTierConfig {
        &BLUR_CONFIGURATIONS[self.tier]
    }

    /// 档位循环 +1
    #[inline]
    pub fn next_tier(&mut self) {
        self.tier = (self.tier + 1) % SIZE_TIER_COUNT;
    }

    /// 档位循环 -1
    #[inline]
    pub fn prev_tier(&mut self) {
        self.tier = (self.tier + SIZE_TIER_COUNT - 1) % SIZE_TIER_COUNT;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_cycle_wraps_both_directions() {
        assert_eq!(BlurMode::TentFilter.next(), BlurMode::NoBloom);
        assert_eq!(BlurMode::NoBloom.prev(), BlurMode::TentFilter);

        let mut mode = BlurMode::NoBloom;
        for _ in 0..BlurMode::CYCLE.len() {
            mode = mode.next();
        }
        assert_eq!(mode, BlurMode::NoBloom);
    }

    #[test]
    fn mode_from_index_bounds() {
        assert_eq!(BlurMode::from_index(0), Some(BlurMode::NoBloom));
        assert_eq!(BlurMode::from_index(8), Some(BlurMode::TentFilter));
        assert_eq!(BlurMode::from_index(9), None);
    }

    #[test]
    fn only_no_bloom_skips_blur() {
        assert!(!BlurMode::NoBloom.has_blur());
        for mode in BlurMode::CYCLE.iter().skip(1) {
            assert!(mode.has_blur());
        }
    }

    #[test]
    fn tier_table_invariants() {
        for cfg in &BLUR_CONFIGURATIONS {
            assert_eq!(cfg.gaussian_kernel % 2, 1);
            assert_eq!(cfg.truncated_kernel % 2, 1);
            assert!(cfg.gaussian_kernel <= MAX_GAUSSIAN_KERNEL);
            assert!(cfg.kawase.iterations >= 1 && cfg.kawase.iterations <= MAX_KAWASE_ITERATIONS);
            assert_eq!(cfg.filter_passes % 2, 0);
            assert!(cfg.filter_passes <= MAX_FILTER_ITERATIONS);
        }
    }

    #[test]
    fn tier_cycle_wraps() {
        let mut cfg = BloomConfig::default();
        cfg.tier = SIZE_TIER_COUNT - 1;
        cfg.next_tier();
        assert_eq!(cfg.tier, 0);
        cfg.prev_tier();
        assert_eq!(cfg.tier, SIZE_TIER_COUNT - 1);
    }
}
