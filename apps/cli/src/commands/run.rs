//! 运行命令
//!
//! 在仿真关节上运行位置控制器：实时循环在主线程，设定值序列在独立线程，
//! 诊断快照通过日志输出。Ctrl+C 或到达 `--duration` 后停止。

use crate::settings::{RunSettings, TrajectorySettings};
use anyhow::{Context, Result};
use clap::Args;
use effort_control::prelude::*;
use effort_rt::StateSink;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tracing::info;

/// 设定值线程重发当前目标的间隔
const RESEND_INTERVAL: Duration = Duration::from_millis(20);

/// 运行命令参数
#[derive(Args, Debug)]
pub struct RunCommand {
    /// 配置文件（控制器配置 + 关节表 + 仿真参数）
    #[arg(short, long)]
    pub config: PathBuf,

    /// 关节描述文件（默认与配置文件相同）
    #[arg(long)]
    pub description: Option<PathBuf>,

    /// 控制频率（Hz，覆盖配置）
    #[arg(short, long)]
    pub frequency: Option<f64>,

    /// 运行时长（秒，不指定则运行到 Ctrl+C）
    #[arg(short, long)]
    pub duration: Option<f64>,
}

/// 把诊断快照写入日志
struct LogSink;

impl StateSink<ControllerState> for LogSink {
    fn publish(&mut self, state: &ControllerState) {
        info!(
            "t={:.3}s setpoint={:.4} position={:.4} velocity={:.4} error={:.4} effort={:.4}",
            state.stamp.as_secs_f64(),
            state.setpoint,
            state.position,
            state.velocity,
            state.error,
            state.effort
        );
    }
}

impl RunCommand {
    /// 执行
    pub fn execute(&self) -> Result<()> {
        let config = ControllerConfig::load_from_file(&self.config)
            .with_context(|| format!("加载控制器配置失败: {}", self.config.display()))?;
        let description_path = self.description.as_ref().unwrap_or(&self.config);
        let model = RobotDescription::load_from_file(description_path)
            .with_context(|| format!("加载关节描述失败: {}", description_path.display()))?;
        let settings = RunSettings::load_from_file(&self.config)?;

        let topology = model.joint_topology(&config.joint)?;
        let mut hw = SimulatedHardware::new()
            .with_joint(&config.joint, settings.simulation.joint_params(topology));

        let mut controller = JointPositionController::init(&hw, &model, &config)?.with_state_sink(LogSink)?;
        let handle = controller
            .take_handle()
            .context("controller handle already taken")?;

        let loop_config = self.loop_config(&settings)?;
        loop_config.validate()?;

        let stop = Arc::new(AtomicBool::new(false));
        {
            let stop = Arc::clone(&stop);
            ctrlc::set_handler(move || {
                eprintln!("\nReceived interrupt signal. Stopping controller...");
                stop.store(true, Ordering::Release);
            })
            .context("设置 Ctrl+C 处理失败")?;
        }

        let setpoints = {
            let stop = Arc::clone(&stop);
            let trajectory = settings.trajectory.clone();
            thread::Builder::new()
                .name("setpoints".to_string())
                .spawn(move || play_trajectory(handle, &trajectory, &stop))
                .context("启动设定值线程失败")?
        };

        info!(
            "Running {} controller on joint '{}' at {} Hz",
            topology, config.joint, loop_config.frequency_hz
        );
        let stats = run_controller(&mut hw, &mut controller, &loop_config, &stop)?;

        stop.store(true, Ordering::Release);
        if setpoints.join().is_err() {
            tracing::warn!("Setpoint thread panicked");
        }

        println!("✅ 运行结束");
        println!("  周期数: {}", stats.iterations);
        println!("  时间跳变: {}", stats.time_jumps);
        println!("  最大周期: {:?}", stats.max_period);
        if let Some(position) = hw.position(&config.joint) {
            println!("  最终位置: {:.4}", position);
        }
        println!("  最终误差: {:.4}", controller.last_error());

        Ok(())
    }

    fn loop_config(&self, settings: &RunSettings) -> Result<LoopConfig> {
        let frequency_hz = self.frequency.unwrap_or(settings.simulation.frequency_hz);
        let max_iterations = match self.duration {
            Some(secs) if secs.is_finite() && secs > 0.0 => Some((secs * frequency_hz).round() as u64),
            Some(secs) => anyhow::bail!("Invalid duration: {} (must be > 0)", secs),
            None => None,
        };
        Ok(LoopConfig {
            frequency_hz,
            max_iterations,
            ..Default::default()
        })
    }
}

/// 按序列写入设定值，直到 `stop` 置位
///
/// 当前目标会被周期性重发：控制器启动时会用当前位置覆盖设定值。
fn play_trajectory(mut handle: ControllerHandle, trajectory: &TrajectorySettings, stop: &AtomicBool) {
    if trajectory.targets.is_empty() {
        return;
    }

    let hold = Duration::try_from_secs_f64(trajectory.hold_secs).unwrap_or(Duration::ZERO);
    let started = Instant::now();
    let mut current = usize::MAX;

    while !stop.load(Ordering::Acquire) {
        let index = if trajectory.targets.len() == 1 || hold.is_zero() {
            0
        } else {
            (started.elapsed().as_secs_f64() / hold.as_secs_f64()) as usize % trajectory.targets.len()
        };
        let target = trajectory.targets[index];
        if index != current {
            info!("Setpoint for joint '{}' -> {:.4}", handle.joint_name(), target);
            current = index;
        }
        handle.set_command(target);
        thread::sleep(RESEND_INTERVAL);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(frequency: Option<f64>, duration: Option<f64>) -> RunCommand {
        RunCommand {
            config: PathBuf::from("configs/joint_position.toml"),
            description: None,
            frequency,
            duration,
        }
    }

    #[test]
    fn test_loop_config_from_settings() {
        let settings = RunSettings::default();
        let config = command(None, Some(2.0)).loop_config(&settings).unwrap();
        assert_eq!(config.frequency_hz, 500.0);
        assert_eq!(config.max_iterations, Some(1000));
    }

    #[test]
    fn test_frequency_override() {
        let settings = RunSettings::default();
        let config = command(Some(1000.0), None).loop_config(&settings).unwrap();
        assert_eq!(config.frequency_hz, 1000.0);
        assert_eq!(config.max_iterations, None);
    }

    #[test]
    fn test_invalid_duration() {
        let settings = RunSettings::default();
        assert!(command(None, Some(-1.0)).loop_config(&settings).is_err());
    }

    #[test]
    fn test_unrepresentable_frequency_rejected() {
        let settings = RunSettings::default();
        let config = command(Some(1e-30), None).loop_config(&settings).unwrap();
        assert!(config.validate().is_err());
    }
}
