//! 检查命令
//!
//! 只解析配置和关节描述，不运行控制器。

use crate::settings::RunSettings;
use anyhow::{Context, Result};
use clap::Args;
use effort_control::{ControllerConfig, JointModel, RobotDescription};
use std::path::PathBuf;

/// 检查命令参数
#[derive(Args, Debug)]
pub struct CheckCommand {
    /// 配置文件
    #[arg(short, long)]
    pub config: PathBuf,

    /// 关节描述文件（默认与配置文件相同）
    #[arg(long)]
    pub description: Option<PathBuf>,
}

impl CheckCommand {
    /// 执行
    pub fn execute(&self) -> Result<()> {
        let config = ControllerConfig::load_from_file(&self.config)
            .with_context(|| format!("加载控制器配置失败: {}", self.config.display()))?;
        let description_path = self.description.as_ref().unwrap_or(&self.config);
        let model = RobotDescription::load_from_file(description_path)
            .with_context(|| format!("加载关节描述失败: {}", description_path.display()))?;
        let settings = RunSettings::load_from_file(&self.config)?;

        let topology = model.joint_topology(&config.joint)?;
        let gains = config.gains;

        println!("✅ 配置有效");
        println!("  关节: {} ({})", config.joint, topology);
        println!(
            "  增益: p={} i={} d={} i_clamp=[{}, {}] antiwindup={}",
            gains.p, gains.i, gains.d, gains.i_min, gains.i_max, gains.antiwindup
        );
        println!("  诊断间隔: 每 {} 个周期", config.publish_every);
        println!("  仿真频率: {} Hz", settings.simulation.frequency_hz);
        if !settings.trajectory.targets.is_empty() {
            println!(
                "  设定值序列: {:?}（每个保持 {} 秒）",
                settings.trajectory.targets, settings.trajectory.hold_secs
            );
        }

        Ok(())
    }
}
