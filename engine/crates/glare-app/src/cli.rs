//! 启动参数
//!
//! 模式序号越界是硬错误，档位越界退回默认档并告警。

use clap::Parser;
use glare_postfx::config::{BloomConfig, BlurMode, DEFAULT_SIZE_TIER, SIZE_TIER_COUNT};

#[derive(Parser, Debug)]
#[command(name = "glare-postfx", about = "Runtime-switchable bloom demo")]
pub struct Cli {
    /// 初始模糊模式，序号见 BlurMode 的循环顺序
    #[arg(long = "blurmode")]
    pub blur_mode: Option<u32>,

    /// 初始模糊档位，0 最弱 4 最强
    #[arg(long = "blursize")]
    pub blur_size: Option<u32>,

    /// 启动时只显示 bloom，不合成原图
    #[arg(long = "bloom")]
    pub bloom_only: bool,
}

impl Cli {
    pub fn initial_config(&self) -> anyhow::Result<BloomConfig> {
        let mut config = BloomConfig::default();

        if let Some(index) = self.blur_mode {
            config.mode = BlurMode::from_index(index).ok_or_else(|| {
                anyhow::anyhow!("invalid blur mode {index}, expected 0..={}", BlurMode::CYCLE.len() - 1)
            })?;
        }
        if let Some(tier) = self.blur_size {
            if (tier as usize) < SIZE_TIER_COUNT {
                config.tier = tier as usize;
            } else {
                log::warn!("blur size {tier} out of range, falling back to tier {DEFAULT_SIZE_TIER}");
                config.tier = DEFAULT_SIZE_TIER;
            }
        }
        config.bloom_only = self.bloom_only;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(blur_mode: Option<u32>, blur_size: Option<u32>, bloom_only: bool) -> Cli {
        Cli {
            blur_mode,
            blur_size,
            bloom_only,
        }
    }

    #[test]
    fn defaults_when_unspecified() {
        let config = cli(None, None, false).initial_config().unwrap();
        assert_eq!(config, BloomConfig::default());
    }

    #[test]
    fn mode_out_of_range_is_fatal() {
        assert!(cli(Some(9), None, false).initial_config().is_err());
    }

    #[test]
    fn tier_out_of_range_falls_back() {
        let config = cli(None, Some(99), false).initial_config().unwrap();
        assert_eq!(config.tier, DEFAULT_SIZE_TIER);
    }

    #[test]
    fn explicit_flags_apply() {
        let config = cli(Some(7), Some(4), true).initial_config().unwrap();
        assert_eq!(config.mode, BlurMode::DualFilter);
        assert_eq!(config.tier, 4);
        assert!(config.bloom_only);
    }
}
