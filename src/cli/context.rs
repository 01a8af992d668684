use std::fs;
use std::path::PathBuf;

use anyhow::{Result, anyhow};
use time::{UtcOffset, macros::format_description};
use tracing_subscriber::fmt::time::OffsetTime;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::{AppConfig, ConfigError, LoggingConfig, LoggingProfile, load_config};

/// 初始化 tracing，兼顾 JSON 与文本输出模式。
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let mut filter = EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new("info"));

    // 默认压低外部依赖的调试输出；Verbose 模式打开核心模块的 debug。
    if matches!(config.profile, LoggingProfile::Lean) {
        const QUIET_TARGETS: &[(&str, &str)] = &[
            ("hyper", "warn"),
            ("hyper_util::client::legacy", "warn"),
            ("reqwest", "info"),
            ("alloy_rpc_client", "info"),
            ("alloy_transport_http", "info"),
            ("latency", "warn"),
        ];
        for (module, level) in QUIET_TARGETS {
            if !config.level.contains(module) {
                if let Ok(directive) = format!("{module}={level}").parse() {
                    filter = filter.add_directive(directive);
                }
            }
        }
    }

    if matches!(config.profile, LoggingProfile::Verbose) {
        const VERBOSE_TARGETS: &[(&str, &str)] = &[
            ("refuel::planner", "debug"),
            ("engine::job", "debug"),
            ("api::refuel", "debug"),
            ("rpc::deposit", "debug"),
            ("latency", "debug"),
        ];
        for (module, level) in VERBOSE_TARGETS {
            if let Ok(directive) = format!("{module}={level}").parse() {
                filter = filter.add_directive(directive);
            }
        }
    }

    let time_format =
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:3]");
    let offset = log_offset(config)?;
    let offset_timer = OffsetTime::new(offset, time_format);

    let base = fmt()
        .with_timer(offset_timer.clone())
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_target(true)
        .with_level(true);

    if config.json {
        base.json()
            .with_current_span(false)
            .with_span_list(false)
            .with_env_filter(filter)
            .try_init()
            .map_err(|err| anyhow!(err.to_string()))?;
    } else {
        base.with_env_filter(filter)
            .event_format(fmt::format().compact())
            .try_init()
            .map_err(|err| anyhow!(err.to_string()))?;
    }
    Ok(())
}

/// 日志与结果目录共用的时区。
pub fn log_offset(config: &LoggingConfig) -> Result<UtcOffset> {
    UtcOffset::from_hms(config.timezone_offset_hours, 0, 0).map_err(|err| {
        anyhow!(
            "invalid logging timezone offset {}: {err}",
            config.timezone_offset_hours
        )
    })
}

/// 加载主配置；用于 `refueler --config` 的入口。
pub fn load_configuration(path: Option<PathBuf>) -> Result<AppConfig, ConfigError> {
    load_config(path)
}

pub fn init_configs(args: crate::cli::args::InitCmd) -> Result<()> {
    let output_dir = match args.output {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };

    fs::create_dir_all(&output_dir)?;

    let templates: [(&str, &str); 1] = [(
        "refueler.toml",
        include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/refueler.toml")),
    )];

    for (filename, contents) in templates {
        let target_path = output_dir.join(filename);
        if target_path.exists() && !args.force {
            println!(
                "跳过 {}（文件已存在，如需覆盖请加 --force）",
                target_path.display()
            );
            continue;
        }

        fs::write(&target_path, contents)?;
        println!("已写入 {}", target_path.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::args::InitCmd;

    #[test]
    fn bundled_template_parses() {
        let tmp = tempfile::tempdir().unwrap();
        init_configs(InitCmd {
            output: Some(tmp.path().to_path_buf()),
            force: false,
        })
        .unwrap();
        let config = load_configuration(Some(tmp.path().join("refueler.toml"))).unwrap();
        crate::config::validate::validate_static(&config).unwrap();
    }

    #[test]
    fn rejects_out_of_range_offset() {
        let config = LoggingConfig {
            timezone_offset_hours: 30,
            ..LoggingConfig::default()
        };
        assert!(log_offset(&config).is_err());
    }
}
