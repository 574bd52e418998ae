use anyhow::Result;
use crabtmi::{config, logging, Bot, Context};
use std::path::PathBuf;
use tracing::{error, info};

async fn ping(ctx: Context) -> Result<()> {
    ctx.send("pong")?;
    Ok(())
}

fn main() -> Result<()> {
    // Load config
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let cfg = config::load_config(config_path.as_deref())?;

    logging::init(&cfg.log_filter)?;
    info!(channel = %cfg.channel, nickname = %cfg.nickname, "Starting bot");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let mut bot = Bot::new(cfg);
    bot.on_ready(|bot| async move {
        info!(name = %bot.name(), channel = %bot.channel(), "Bot ready");
        Ok::<(), anyhow::Error>(())
    });
    bot.command_fn(ping)?;

    if let Err(e) = bot.run_on(&runtime) {
        error!(error = %e, "Session ended with an error");
        return Err(e.into());
    }
    info!("Session closed");
    Ok(())
}
