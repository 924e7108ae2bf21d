//! 模糊迭代使用的 ping-pong image 对与下采样金字塔
//!
//! 每个 swapchain image 持有独立的一组；相邻帧可能提交到不同 queue，
//! 各帧只写自己的那组 image，queue 之间不共享模糊中间结果。
//! 组内所有算法复用同一批 image，切换算法不产生新的分配。
//! 镜像复用规则：Dual/Tent Filter 上采样阶段按相反顺序重写下采样阶段的各级。

use ash::vk;

use crate::config::MAX_FILTER_ITERATIONS;
use crate::graph::handle::FxImageHandle;
use crate::graph::registry::FxImageRegistry;

/// ping-pong 对 + 金字塔各级的句柄集合
pub struct PingPongImages {
    /// 同分辨率的一对，迭代式算法交替读写
    pair: [FxImageHandle; 2],
    /// 逐级减半的金字塔，level i 的边长是模糊分辨率的 1/2^(i+1)
    pyramid: Vec<FxImageHandle>,
}

// new & init
impl PingPongImages {
    /// 金字塔级数，满配的 Dual/Tent Filter 会用满
    pub const PYRAMID_LEVELS: usize = MAX_FILTER_ITERATIONS - 1;

    pub fn allocate(registry: &mut FxImageRegistry, blur_extent: vk::Extent2D, format: vk::Format, prefix: &str) -> Self {
        let usage = vk::ImageUsageFlags::COLOR_ATTACHMENT
            | vk::ImageUsageFlags::SAMPLED
            | vk::ImageUsageFlags::STORAGE
            | vk::ImageUsageFlags::TRANSFER_SRC
            | vk::ImageUsageFlags::TRANSFER_DST;

        let pair = [
            registry.register_image(blur_extent, format, usage, &format!("{prefix}-ping-pong-0")),
            registry.register_image(blur_extent, format, usage, &format!("{prefix}-ping-pong-1")),
        ];

        let pyramid = (0..Self::PYRAMID_LEVELS)
            .map(|level| {
                let extent = Self::level_extent(blur_extent, level);
                registry.register_image(extent, format, usage, &format!("{prefix}-pyramid-{level}"))
            })
            .collect();

        Self { pair, pyramid }
    }

    /// level 0 是模糊分辨率的一半，之后逐级减半，最小 1x1
    pub fn level_extent(blur_extent: vk::Extent2D, level: usize) -> vk::Extent2D {
        let shift = level as u32 + 1;
        vk::Extent2D {
            width: (blur_extent.width >> shift).max(1),
            height: (blur_extent.height >> shift).max(1),
        }
    }
}

// getters
impl PingPongImages {
    /// 第 iteration 次迭代的 (读, 写) 句柄
    ///
    /// 偶数次从 0 读写 1，奇数次反之，读写永不重叠
    #[inline]
    pub fn acquire(&self, iteration: usize) -> (FxImageHandle, FxImageHandle) {
        let read = self.pair[iteration % 2];
        let write = self.pair[(iteration + 1) % 2];
        debug_assert_ne!(read, write);
        (read, write)
    }

    /// 迭代结束后持有结果的那一张
    #[inline]
    pub fn result_of(&self, iterations: usize) -> FxImageHandle {
        self.pair[iterations % 2]
    }

    #[inline]
    pub fn front(&self) -> FxImageHandle {
        self.pair[0]
    }

    #[inline]
    pub fn back(&self) -> FxImageHandle {
        self.pair[1]
    }

    #[inline]
    pub fn pyramid_level(&self, level: usize) -> FxImageHandle {
        self.pyramid[level]
    }
}

// tools
impl PingPongImages {
    /// Dual/Tent Filter 的镜像复用：
    /// 下采样 pass j 写 level j；上采样 pass j 写 level K-2-j，
    /// 最后一次上采样（j = K-1）直接写合成目标，不占用金字塔
    pub fn upsample_target(&self, total_passes: usize, up_pass: usize) -> Option<FxImageHandle> {
        let half = total_passes / 2;
        debug_assert!(up_pass < half);
        if up_pass + 1 == half {
            None
        } else {
            Some(self.pyramid[half - 2 - up_pass])
        }
    }
}

#[cfg(test)]
impl PingPongImages {
    /// 不创建任何 GPU 资源，仅分配句柄，用于纯逻辑测试
    pub(crate) fn minted() -> Self {
        let mut map: slotmap::SlotMap<FxImageHandle, ()> = slotmap::SlotMap::with_key();
        Self::minted_in(&mut map)
    }

    /// 同一个 map 里铸多组句柄，模拟多个 swapchain image 各持一组
    pub(crate) fn minted_in(map: &mut slotmap::SlotMap<FxImageHandle, ()>) -> Self {
        Self {
            pair: [map.insert(()), map.insert(())],
            pyramid: (0..Self::PYRAMID_LEVELS).map(|_| map.insert(())).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_alternates_and_never_aliases() {
        let images = PingPongImages::minted();
        for iteration in 0..16 {
            let (read, write) = images.acquire(iteration);
            assert_ne!(read, write);
            let (next_read, _) = images.acquire(iteration + 1);
            assert_eq!(next_read, write);
        }
    }

    #[test]
    fn result_is_last_written_image() {
        let images = PingPongImages::minted();
        for iterations in 1..=8 {
            let (_, last_write) = images.acquire(iterations - 1);
            assert_eq!(images.result_of(iterations), last_write);
        }
    }

    #[test]
    fn level_extent_halves_and_clamps() {
        let blur = vk::Extent2D { width: 480, height: 270 };
        assert_eq!(PingPongImages::level_extent(blur, 0), vk::Extent2D { width: 240, height: 135 });
        assert_eq!(PingPongImages::level_extent(blur, 1), vk::Extent2D { width: 120, height: 67 });
        let tiny = PingPongImages::level_extent(blur, 12);
        assert_eq!(tiny, vk::Extent2D { width: 1, height: 1 });
    }

    #[test]
    fn upsample_mirrors_downsample_levels() {
        let images = PingPongImages::minted();
        // 6 个 pass：下采样写 level 0,1,2，上采样写 level 1,0，最后一次合并进合成
        let total = 6;
        assert_eq!(images.upsample_target(total, 0), Some(images.pyramid_level(1)));
        assert_eq!(images.upsample_target(total, 1), Some(images.pyramid_level(0)));
        assert_eq!(images.upsample_target(total, 2), None);
    }

    #[test]
    fn per_frame_sets_share_no_handles() {
        let mut map: slotmap::SlotMap<FxImageHandle, ()> = slotmap::SlotMap::with_key();
        let a = PingPongImages::minted_in(&mut map);
        let b = PingPongImages::minted_in(&mut map);

        let collect = |set: &PingPongImages| {
            let mut handles = vec![set.front(), set.back()];
            handles.extend((0..PingPongImages::PYRAMID_LEVELS).map(|level| set.pyramid_level(level)));
            handles
        };
        let first = collect(&a);
        for handle in collect(&b) {
            assert!(!first.contains(&handle));
        }
    }

    #[test]
    fn max_iterations_fit_in_pyramid() {
        let images = PingPongImages::minted();
        let total = MAX_FILTER_ITERATIONS;
        let half = total / 2;
        for up_pass in 0..half - 1 {
            assert!(images.upsample_target(total, up_pass).is_some());
        }
        assert_eq!(images.upsample_target(total, half - 1), None);
    }
}
