use clap::Parser;

use agora::cli::{Cli, Commands, run_cli_command};
use agora::config::{get_config, init_config_from};
use agora::runtime::modes::run_server;
use agora::system::logging::init_logging;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_config_from(&cli.config);

    let config = get_config();
    // guard 必须活到进程结束，否则异步日志不会刷盘
    let _log_guard = init_logging(&config.logging)?;

    match cli.command {
        None | Some(Commands::Serve) => run_server().await,
        Some(cmd) => {
            if let Err(e) = run_cli_command(cmd).await {
                eprintln!("{}", e.format_colored());
                std::process::exit(1);
            }
            Ok(())
        }
    }
}
