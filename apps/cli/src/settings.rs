//! 运行设置
//!
//! 控制器配置和关节描述由 `effort-control` 解析；这里只解析 CLI 自己的两张表：
//!
//! ```toml
//! [simulation]
//! frequency_hz = 500.0
//! inertia = 0.2
//! damping = 0.05
//! initial_position = 0.0
//!
//! [trajectory]
//! targets = [1.0, -1.0]
//! hold_secs = 2.0
//! ```

use anyhow::{Context, Result, bail};
use effort_control::JointTopology;
use effort_control::sim::SimJointParams;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// 仿真参数
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    /// 控制频率（Hz）
    pub frequency_hz: f64,
    /// 转动惯量或质量
    pub inertia: f64,
    /// 粘滞阻尼
    pub damping: f64,
    /// 初始位置
    pub initial_position: f64,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        SimulationSettings {
            frequency_hz: 500.0,
            inertia: 1.0,
            damping: 0.0,
            initial_position: 0.0,
        }
    }
}

impl SimulationSettings {
    /// 按关节类型生成仿真关节参数
    ///
    /// 有限位旋转关节的限位同时作为硬限位，无限位旋转关节的位置回绕。
    pub fn joint_params(&self, topology: JointTopology) -> SimJointParams {
        let params = SimJointParams::default()
            .with_inertia(self.inertia)
            .with_damping(self.damping)
            .with_initial_position(self.initial_position);

        match topology {
            JointTopology::Revolute(limits) => params.with_hard_stops(limits),
            JointTopology::Continuous => params.wrapping(),
            JointTopology::Prismatic => params,
        }
    }
}

/// 设定值序列：每个目标保持 `hold_secs` 秒，循环播放
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TrajectorySettings {
    /// 目标位置序列（空表示保持启动位置）
    pub targets: Vec<f64>,
    /// 每个目标的保持时间（秒）
    pub hold_secs: f64,
}

/// 配置文件中 CLI 使用的部分
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RunSettings {
    /// 仿真参数
    pub simulation: SimulationSettings,
    /// 设定值序列
    pub trajectory: TrajectorySettings,
}

impl RunSettings {
    /// 从 TOML 字符串解析（忽略控制器配置和关节表）
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let settings: RunSettings = toml::from_str(content).context("解析 [simulation] / [trajectory] 失败")?;
        settings.validate()?;
        Ok(settings)
    }

    /// 从文件加载
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("读取配置文件失败: {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    /// 校验设置
    pub fn validate(&self) -> Result<()> {
        if !(self.simulation.inertia > 0.0) {
            bail!("simulation.inertia must be > 0, got {}", self.simulation.inertia);
        }
        if self.simulation.damping < 0.0 {
            bail!("simulation.damping must be >= 0, got {}", self.simulation.damping);
        }
        if !self.trajectory.hold_secs.is_finite() || self.trajectory.hold_secs < 0.0 {
            bail!(
                "trajectory.hold_secs must be finite and >= 0, got {}",
                self.trajectory.hold_secs
            );
        }
        if self.trajectory.targets.len() > 1 && self.trajectory.hold_secs == 0.0 {
            bail!(
                "trajectory.hold_secs must be > 0 when more than one target is given, got {}",
                self.trajectory.hold_secs
            );
        }
        if let Some(target) = self.trajectory.targets.iter().find(|t| !t.is_finite()) {
            bail!("trajectory target {} is not finite", target);
        }
        Ok(())
    }
}
