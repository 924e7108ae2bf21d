//! Gaussian kernel 系数生成
//!
//! 利用 Pascal 三角形计算离散 Gaussian 权重（二项分布是正态分布的离散等价），
//! 支持两种可选变换：
//! - 截断：忽略幅度低于阈值的外围系数，向更高的行借取有效系数，
//!   并修正归一化的分母，避免反复模糊导致画面变暗；
//! - 线性采样折叠：将相邻的两个 texel 权重合并为一次双线性采样，
//!   采样次数约减半。
//!
//! 方法参考 <http://rastergrid.com/blog/2010/09/efficient-gaussian-blur-with-linear-sampling/>

use crate::config::MAX_GAUSSIAN_KERNEL;

/// 折叠后的采样模式
///
/// 决定 shader 对中心 texel 的处理方式，消费方据此选择对应的 pipeline 变体
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FoldedPattern {
    /// 折叠后样本数为奇数，中心 texel 是一次独立采样
    CenterTap,
    /// 折叠后中心 texel 的权重被拆分到两侧的双线性采样中
    SplitCenter,
}

/// 生成出来的 kernel：完整（对称）的权重与偏移序列
///
/// 权重与偏移以 f64 存储，上传 shader 时取非负半边转为 f32
#[derive(Clone, Debug)]
pub struct KernelTable {
    pub weights: Vec<f64>,
    /// 以中心 texel 为 0 的偏移，单位是 texel
    pub offsets: Vec<f64>,
    pub pattern: FoldedPattern,
}

// getters
impl KernelTable {
    /// 完整序列的样本数
    #[inline]
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// 非负偏移的半边序列（CenterTap 时首个元素是中心），f32，供 shader 上传使用
    ///
    /// shader 按对称性对 ±offset 各采样一次，只需要半边
    pub fn half_f32(&self) -> (Vec<f32>, Vec<f32>) {
        let center = self.offsets.iter().position(|o| *o >= 0.0).unwrap();
        let weights = self.weights[center..].iter().map(|w| *w as f32).collect();
        let offsets = self.offsets[center..].iter().map(|o| *o as f32).collect();
        (weights, offsets)
    }
}

/// 生成指定 Pascal 行的系数，返回 (系数, 行内系数之和)
///
/// 行内每个值由上一行相邻两值相加得到，第 0 行是单个 1
fn pascal_triangle_row(row: usize) -> (Vec<u64>, u64) {
    let mut coefficients = Vec::with_capacity(row + 1);
    coefficients.push(1u64);
    let mut sum = 1u64;
    for i in 0..row {
        let val = coefficients[i] * (row - i) as u64 / (i as u64 + 1);
        coefficients.push(val);
        sum += val;
    }
    (coefficients, sum)
}

/// 将 Pascal 系数的中间 `count` 个归一化后写入 weights/offsets
fn push_coefficients(
    coefficients: &[u64],
    pascal_sum: u64,
    half_minus_one: usize,
    count: usize,
    weights: &mut Vec<f64>,
    offsets: &mut Vec<f64>,
) {
    let skipped = (coefficients.len() - count) / 2;
    for i in skipped..coefficients.len() - skipped {
        weights.push(coefficients[i] as f64 / pascal_sum as f64);
        offsets.push(i as f64 - half_minus_one as f64);
    }
}

/// 相邻权重对折叠为单次双线性采样
///
/// 折叠后的偏移是两个 texel 偏移按权重的加权平均；
/// 半边长度为奇数时中心 texel 无法独立成对，权重一分为二并入两侧
fn fold_for_linear_sampling(half_minus_one: usize, weights: &mut Vec<f64>, offsets: &mut Vec<f64>) {
    let mut folded_weights = Vec::new();
    let mut folded_offsets = Vec::new();

    let fold_pair = |w0: f64, o0: f64, w1: f64, o1: f64| {
        let w = w0 + w1;
        let o = (o0 * w0 + o1 * w1) / w;
        (w, o)
    };

    if half_minus_one % 2 == 0 {
        // 中心 texel 独立成一次采样
        let mut i = 0;
        while half_minus_one > 0 && i < half_minus_one - 1 {
            let (w, o) = fold_pair(weights[i], offsets[i], weights[i + 1], offsets[i + 1]);
            folded_weights.push(w);
            folded_offsets.push(o);
            i += 2;
        }

        folded_weights.push(weights[half_minus_one]);
        folded_offsets.push(0.0);

        let mut i = half_minus_one + 1;
        while i < offsets.len() {
            let (w, o) = fold_pair(weights[i], offsets[i], weights[i + 1], offsets[i + 1]);
            folded_weights.push(w);
            folded_offsets.push(o);
            i += 2;
        }
    } else {
        // 中心 texel 的权重拆分到两侧的采样对中
        let mut i = 0;
        while i < half_minus_one {
            let (w, o) = if i == half_minus_one - 1 {
                fold_pair(weights[i], offsets[i], weights[i + 1] * 0.5, offsets[i + 1])
            } else {
                fold_pair(weights[i], offsets[i], weights[i + 1], offsets[i + 1])
            };
            folded_weights.push(w);
            folded_offsets.push(o);
            i += 2;
        }

        let mut i = half_minus_one;
        while i < offsets.len() {
            let (w, o) = if i == half_minus_one {
                fold_pair(weights[i] * 0.5, offsets[i], weights[i + 1], offsets[i + 1])
            } else {
                fold_pair(weights[i], offsets[i], weights[i + 1], offsets[i + 1])
            };
            folded_weights.push(w);
            folded_offsets.push(o);
            i += 2;
        }
    }

    *weights = folded_weights;
    *offsets = folded_offsets;
}

/// 生成 Gaussian kernel
///
/// # param
/// * kernel_size - kernel 尺寸，必须是奇数且不超过 [`MAX_GAUSSIAN_KERNEL`]
/// * linear_sampling - 折叠为双线性采样
/// * truncate - 忽略低于 min_coefficient 的外围系数
///
/// # Panics
/// 尺寸为偶数或超限是编程错误，直接 panic
pub fn gaussian_kernel(kernel_size: u32, linear_sampling: bool, truncate: bool, min_coefficient: f64) -> KernelTable {
    assert_eq!(kernel_size % 2, 1, "gaussian kernel size must be odd, got {kernel_size}");
    assert!(
        kernel_size <= MAX_GAUSSIAN_KERNEL,
        "gaussian kernel size {kernel_size} exceeds the supported maximum {MAX_GAUSSIAN_KERNEL}"
    );

    let pascal_row = (kernel_size - 1) as usize;
    let mut half_minus_one = pascal_row / 2;

    let mut weights = Vec::new();
    let mut offsets = Vec::new();

    if !truncate {
        let (coefficients, sum) = pascal_triangle_row(pascal_row);
        push_coefficients(&coefficients, sum, half_minus_one, coefficients.len(), &mut weights, &mut offsets);
    } else {
        // 从 kernel_size 对应的行开始，每次 +2 行，
        // 直到某一行能提供足够多的非可忽略系数
        let mut current_row = pascal_row;
        loop {
            weights.clear();
            offsets.clear();

            let (coefficients, sum) = pascal_triangle_row(current_row);
            half_minus_one = current_row / 2;

            let skipped = coefficients[half_minus_one..]
                .iter()
                .filter(|c| (**c as f64 / sum as f64) < min_coefficient)
                .count();

            if (half_minus_one + 1) - skipped < pascal_row / 2 + 1 {
                current_row += 2;
                continue;
            }

            // 被丢弃的系数也要从归一化的分母中扣除，
            // 否则权重之和小于 1，反复模糊会让画面变暗
            let unrequired = (coefficients.len() - kernel_size as usize - skipped * 2) / 2;
            let mut adjusted_sum = sum;
            for i in 0..skipped + unrequired {
                adjusted_sum -= 2 * coefficients[coefficients.len() - 1 - i];
            }

            let count = coefficients.len() - 2 * (skipped + unrequired);
            push_coefficients(&coefficients, adjusted_sum, half_minus_one, count, &mut weights, &mut offsets);
            half_minus_one = (offsets.len() - 1) / 2;
            break;
        }
    }

    if linear_sampling {
        fold_for_linear_sampling(half_minus_one, &mut weights, &mut offsets);
    }

    // 最终序列里是否保留了独立的中心 texel，决定消费方选哪条 pipeline
    let pattern =
        if offsets.contains(&0.0) { FoldedPattern::CenterTap } else { FoldedPattern::SplitCenter };

    KernelTable { weights, offsets, pattern }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MIN_ACCEPTABLE_COEFFICIENT;

    fn weight_sum(table: &KernelTable) -> f64 {
        table.weights.iter().sum()
    }

    #[test]
    fn plain_kernel_is_normalized_and_symmetric() {
        for size in [5u32, 15, 25, 35, 51] {
            let table = gaussian_kernel(size, false, false, MIN_ACCEPTABLE_COEFFICIENT);
            assert_eq!(table.len(), size as usize);
            assert!((weight_sum(&table) - 1.0).abs() < 1e-6, "size {size}");

            let n = table.len();
            for i in 0..n / 2 {
                assert!((table.weights[i] - table.weights[n - 1 - i]).abs() < 1e-12);
                assert!((table.offsets[i] + table.offsets[n - 1 - i]).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn offsets_increase_from_center() {
        let table = gaussian_kernel(25, false, false, MIN_ACCEPTABLE_COEFFICIENT);
        for pair in table.offsets.windows(2) {
            assert!(pair[1] > pair[0]);
        }
        assert_eq!(table.offsets[table.len() / 2], 0.0);
    }

    #[test]
    fn size_25_linear_folds_to_13_samples() {
        let table = gaussian_kernel(25, true, false, MIN_ACCEPTABLE_COEFFICIENT);
        assert_eq!(table.len(), 13);
        assert_eq!(table.pattern, FoldedPattern::CenterTap);
        assert!((weight_sum(&table) - 1.0).abs() < 1e-4);
    }

    #[test]
    fn folding_preserves_unit_sum() {
        for size in [5u32, 15, 25, 35, 51] {
            let table = gaussian_kernel(size, true, false, MIN_ACCEPTABLE_COEFFICIENT);
            assert!((weight_sum(&table) - 1.0).abs() < 1e-6, "size {size}");
        }
    }

    #[test]
    fn truncated_kernel_is_not_larger_and_not_empty() {
        for size in [5u32, 11, 17, 21, 25] {
            let plain = gaussian_kernel(size, false, false, MIN_ACCEPTABLE_COEFFICIENT);
            let truncated = gaussian_kernel(size, false, true, MIN_ACCEPTABLE_COEFFICIENT);
            assert!(!truncated.is_empty());
            assert!(truncated.len() <= plain.len() || truncated.len() == size as usize);
            // 修正过分母，截断后仍然归一化
            assert!((weight_sum(&truncated) - 1.0).abs() < 1e-6, "size {size}");
        }
    }

    #[test]
    fn unfolded_kernel_always_keeps_center_tap() {
        for size in [5u32, 15, 25, 35, 51] {
            let table = gaussian_kernel(size, false, false, MIN_ACCEPTABLE_COEFFICIENT);
            assert_eq!(table.pattern, FoldedPattern::CenterTap, "size {size}");
        }
    }

    #[test]
    fn size_15_linear_splits_the_center() {
        let table = gaussian_kernel(15, true, false, MIN_ACCEPTABLE_COEFFICIENT);
        assert_eq!(table.pattern, FoldedPattern::SplitCenter);
        assert!(!table.offsets.contains(&0.0));

        // 半边序列从第一个正偏移开始
        let (weights, offsets) = table.half_f32();
        assert!(offsets[0] > 0.0);
        assert_eq!(weights.len(), table.len() / 2);
    }

    #[test]
    fn half_kernel_starts_at_center() {
        let table = gaussian_kernel(25, true, false, MIN_ACCEPTABLE_COEFFICIENT);
        let (weights, offsets) = table.half_f32();
        assert_eq!(offsets[0], 0.0);
        assert_eq!(weights.len(), offsets.len());
        assert_eq!(weights.len(), 7);
    }

    #[test]
    #[should_panic]
    fn even_kernel_size_panics() {
        gaussian_kernel(24, false, false, MIN_ACCEPTABLE_COEFFICIENT);
    }

    #[test]
    #[should_panic]
    fn oversized_kernel_panics() {
        gaussian_kernel(MAX_GAUSSIAN_KERNEL + 2, false, false, MIN_ACCEPTABLE_COEFFICIENT);
    }
}
