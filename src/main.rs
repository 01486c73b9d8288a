/// vidhub server binary
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use vidhub::{jobs::JobScheduler, server, AppContext, HubResult, ServerConfig};

#[tokio::main]
async fn main() -> HubResult<()> {
    // Load configuration first: it decides the log format
    let config = ServerConfig::from_env()?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "vidhub=debug,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    print_banner();

    // Create application context
    let ctx = Arc::new(AppContext::new(config).await?);

    // Start background jobs
    let scheduler = Arc::new(JobScheduler::new(Arc::clone(&ctx)));
    scheduler.start();

    // Start server
    server::serve((*ctx).clone()).await?;

    Ok(())
}

fn print_banner() {
    println!(
        r#"
        _     _ _           _
 __   _(_) __| | |__  _   _| |__
 \ \ / / |/ _` | '_ \| | | | '_ \
  \ V /| | (_| | | | | |_| | |_) |
   \_/ |_|\__,_|_| |_|\__,_|_.__/

        video sharing backend v{}
        "#,
        env!("CARGO_PKG_VERSION")
    );
}
