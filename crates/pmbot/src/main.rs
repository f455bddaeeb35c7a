use std::sync::Arc;

use pmbot_core::config::Config;
use pmbot_redis::RedisKv;

#[tokio::main]
async fn main() -> Result<(), pmbot_core::Error> {
    pmbot_core::logging::init("pmbot")?;

    let cfg = Config::load()?;
    let kv = Arc::new(RedisKv::connect(&cfg.redis_url).await?);

    pmbot_telegram::router::run(cfg, kv)
        .await
        .map_err(|e| pmbot_core::Error::External(format!("telegram bot failed: {e}")))?;

    Ok(())
}
