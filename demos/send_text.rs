use courier::{Context, Mailer};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let mailer = Mailer::from_env()?;
    let ctx = Context::with_shutdown_signal();

    let subject = std::env::args().nth(1).unwrap_or_else(|| "ping".to_owned());
    let text = std::env::args().nth(2).unwrap_or_else(|| "pong".to_owned());

    match mailer.send_text_context(&ctx, &subject, &text).await {
        Ok(()) => info!("message sent"),
        Err(e) if e.message_accepted() => info!("message sent, closing failed: {e}"),
        Err(e) => return Err(e.into()),
    }
    Ok(())
}
