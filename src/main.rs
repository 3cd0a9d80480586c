use blocktime::core::config::{DEFAULT_LOG_LEVEL, load_config, resolve};
use blocktime::tui;
use clap::Parser;
use log::LevelFilter;
use simplelog::{ConfigBuilder, WriteLogger};
use std::fs::File;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "blocktime", about = "Keyboard-driven time blocks and outline notes")]
struct Args {
    /// Server base URL, e.g. http://localhost:3000/api
    #[arg(long)]
    base_url: Option<String>,

    /// Config file to use instead of ~/.blocktime/config.toml
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> std::io::Result<()> {
    let args = Args::parse();
    dotenv::dotenv().ok();

    init_logger(Path::new("blocktime.log"));

    let config = load_config(args.config.as_deref()).map_err(std::io::Error::other)?;
    let resolved = resolve(&config, args.base_url.as_deref()).map_err(std::io::Error::other)?;
    log::set_max_level(resolved.log_level);

    log::info!("blocktime starting up against {}", resolved.base_url);

    tui::run(resolved).await
}

/// Start the file logger before the config is read, so its warnings are
/// kept. The logger accepts every level; `log::set_max_level` narrows it
/// once the configured level is known.
fn init_logger(path: &Path) -> bool {
    let log_config = ConfigBuilder::new()
        .set_time_format_rfc3339()
        .build();

    let Ok(log_file) = File::create(path) else {
        return false;
    };
    let installed = WriteLogger::init(LevelFilter::Trace, log_config, log_file).is_ok();
    log::set_max_level(DEFAULT_LOG_LEVEL);
    installed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logger_keeps_messages_from_before_config() {
        let path = std::env::temp_dir().join(format!("blocktime-{}.log", std::process::id()));
        assert!(init_logger(&path));

        log::warn!("config warning");
        log::set_max_level(LevelFilter::Warn);
        log::info!("below configured level");
        log::error!("after config");
        log::logger().flush();

        let written = std::fs::read_to_string(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert!(written.contains("config warning"));
        assert!(!written.contains("below configured level"));
        assert!(written.contains("after config"));
    }
}
