//! # Effort CLI
//!
//! 在仿真关节上运行单关节位置控制器。
//!
//! ```bash
//! # 检查配置
//! effort-cli check --config configs/joint_position.toml
//!
//! # 运行 10 秒
//! effort-cli run --config configs/joint_position.toml --duration 10
//!
//! # 调整日志级别
//! RUST_LOG=effort_control=debug effort-cli run --config configs/joint_position.toml
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod settings;

use commands::{CheckCommand, RunCommand};

/// Effort CLI - 单关节位置控制器
#[derive(Parser, Debug)]
#[command(name = "effort-cli")]
#[command(about = "Run a single-joint effort position controller on a simulated joint", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 运行控制器
    Run {
        #[command(flatten)]
        args: RunCommand,
    },

    /// 检查配置文件
    Check {
        #[command(flatten)]
        args: CheckCommand,
    },
}

fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("effort_cli=info,effort_control=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { args } => args.execute(),
        Commands::Check { args } => args.execute(),
    }
}
