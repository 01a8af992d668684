use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;

#[derive(Parser, Debug)]
#[command(name = "refueler", version, about = "跨链 gas refuel 批量工具")]
pub struct Cli {
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "配置文件路径（默认查找 refueler.toml 或 config/refueler.toml）"
    )]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// 为账户文件中的所有账户执行 refuel
    Run,
    /// 只查询余额、报价并拆单，不发送交易
    #[command(name = "dry-run")]
    DryRun,
    /// 打印配置路线的桥限额
    Limits,
    /// 离线预览拆单结果
    Plan(PlanCmd),
    /// 初始化配置模版文件
    Init(InitCmd),
}

#[derive(Args, Debug)]
pub struct PlanCmd {
    #[arg(long, help = "请求总额（原生代币单位）")]
    pub total: Decimal,
    #[arg(long, help = "桥最小值")]
    pub min: Decimal,
    #[arg(long, help = "桥最大值")]
    pub max: Decimal,
    #[arg(long, default_value_t = 0, help = "随机填充交易数量上限")]
    pub fillers: u32,
    #[arg(long, help = "单笔填充交易最小金额，默认等于桥最小值")]
    pub filler_min: Option<Decimal>,
    #[arg(long, help = "随机种子，便于复现")]
    pub seed: Option<u64>,
}

#[derive(Args, Debug)]
pub struct InitCmd {
    #[arg(long, value_name = "DIR", help = "可选输出目录（默认当前目录）")]
    pub output: Option<PathBuf>,
    #[arg(long, help = "若文件存在则覆盖")]
    pub force: bool,
}
