//! Console driver for the chat broker
//!
//! Every command-line argument names a user to connect. Lines read from
//! stdin are sent from `console`: `@bob hi there` goes to bob only, any
//! other line is broadcast. Ctrl-C or end of input shuts the broker down.

use std::error::Error;
use std::sync::Arc;

use chatcore::broker::{Broker, Inbox, Message};
use chatcore::config::{Settings, load_config};
use chatcore::user::User;
use chatcore::utils::logging;
use futures::future::join_all;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

const CONSOLE_SENDER: &str = "console";

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    let settings = match load_config() {
        Ok(settings) => settings,
        Err(e) => {
            logging::init("info");
            error!("Failed to load configuration: {e}");
            return;
        }
    };
    logging::init(&settings.logging.level);

    if let Err(e) = run(settings).await {
        error!("Broker failed: {e}");
    }
}

async fn run(settings: Settings) -> Result<(), Box<dyn Error>> {
    let cancel = CancellationToken::new();
    let broker = Arc::new(Broker::with_config(
        cancel.clone(),
        settings.broker.broker_config(),
    )?);

    let dispatcher = tokio::spawn({
        let broker = broker.clone();
        async move { broker.run().await }
    });

    let inboxes = connect_users(
        &broker,
        std::env::args().skip(1),
        settings.broker.delivery_capacity,
    )
    .await;
    let consumers: Vec<_> = inboxes
        .into_iter()
        .map(|(id, mut inbox)| {
            tokio::spawn(async move {
                while let Some(msg) = inbox.recv().await {
                    match msg.to_json() {
                        Ok(json) => info!(user = %id, "{json}"),
                        Err(e) => warn!(user = %id, "Failed to serialize message: {e}"),
                    }
                }
                info!(user = %id, "Inbox closed");
            })
        })
        .collect();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received.");
                break;
            }
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    let Some(msg) = parse_line(&line) else { continue };
                    if let Err(e) = broker.send_message(msg).await {
                        warn!("Failed to send message: {e}");
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    error!("Failed to read stdin: {e}");
                    break;
                }
            },
        }
    }

    cancel.cancel();
    if let Err(e) = dispatcher.await {
        error!("Dispatch task failed: {e}");
    }

    for id in broker.registered_users().await {
        broker.unregister_user(&id).await;
    }
    join_all(consumers).await;

    info!(stats = ?broker.stats(), "Broker stopped");
    Ok(())
}

/// Connect one user per name. Names that fail validation or are already
/// connected are logged and skipped.
async fn connect_users(
    broker: &Broker,
    names: impl IntoIterator<Item = String>,
    capacity: usize,
) -> Vec<(String, Inbox)> {
    let mut inboxes = Vec::new();
    for name in names {
        let user = User::new(name.clone(), format!("{name}@chatcore.local"), name.clone());
        let user = match user.into_validated() {
            Ok(user) => user,
            Err(e) => {
                warn!(user = %name, "Skipping user: {e}");
                continue;
            }
        };

        match broker.connect(&user, capacity).await {
            Ok(inbox) => inboxes.push((user.id().to_string(), inbox)),
            Err(e) => warn!(user = %name, "Skipping user: {e}"),
        }
    }
    inboxes
}

fn parse_line(line: &str) -> Option<Message> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    match line
        .strip_prefix('@')
        .and_then(|rest| rest.split_once(char::is_whitespace))
    {
        Some((to, text)) => Some(Message::direct(CONSOLE_SENDER, to, text.trim())),
        None => Some(Message::broadcast(CONSOLE_SENDER, line)),
    }
}
