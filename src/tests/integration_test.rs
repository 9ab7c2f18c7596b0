use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use crate::broker::{Broker, Inbox, Message};
use crate::config::Settings;
use crate::user::User;
use crate::utils::error::BrokerError;

const WAIT: Duration = Duration::from_secs(2);

async fn next(inbox: &mut Inbox) -> Message {
    timeout(WAIT, inbox.recv())
        .await
        .expect("timed out waiting for message")
        .expect("inbox closed")
}

#[tokio::test]
async fn integration_chat_end_to_end() {
    crate::utils::logging::init("debug");

    let settings = Settings::default();
    let cancel = CancellationToken::new();
    let broker = Arc::new(
        Broker::with_config(cancel.clone(), settings.broker.broker_config()).unwrap(),
    );
    let dispatcher = tokio::spawn({
        let broker = broker.clone();
        async move { broker.run().await }
    });

    let alice = User::new("Alice", "alice@example.com", "alice")
        .into_validated()
        .unwrap();
    let bob = User::new("Bob", "bob@example.com", "bob")
        .into_validated()
        .unwrap();
    let mut inbox_a = broker
        .connect(&alice, settings.broker.delivery_capacity)
        .await
        .unwrap();
    let mut inbox_b = broker
        .connect(&bob, settings.broker.delivery_capacity)
        .await
        .unwrap();

    broker
        .send_message(Message::direct("sys", "bob", "hi"))
        .await
        .unwrap();
    let got = next(&mut inbox_b).await;
    assert_eq!(got.sender, "sys");
    assert_eq!(got.content, "hi");
    assert!(got.timestamp > 0);

    broker
        .send_message(Message::broadcast("sys", "all"))
        .await
        .unwrap();
    assert_eq!(next(&mut inbox_a).await.content, "all");
    assert_eq!(next(&mut inbox_b).await.content, "all");
    assert!(inbox_a.try_recv().is_err());
    assert!(inbox_b.try_recv().is_err());

    cancel.cancel();
    timeout(WAIT, dispatcher).await.unwrap().unwrap();
    assert_eq!(
        broker.send_message(Message::broadcast("sys", "late")).await,
        Err(BrokerError::Closed)
    );

    broker.unregister_user("alice").await;
    broker.unregister_user("bob").await;
    assert!(inbox_a.recv().await.is_none());
    assert!(inbox_b.recv().await.is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn integration_concurrent_producers_keep_per_producer_order() {
    let cancel = CancellationToken::new();
    let broker = Arc::new(Broker::new(cancel.clone()));
    let dispatcher = tokio::spawn({
        let broker = broker.clone();
        async move { broker.run().await }
    });

    let mut inboxes = Vec::new();
    for id in ["a", "b"] {
        let (queue, inbox) = crate::broker::delivery_queue(512);
        broker.register_user(id, queue).await.unwrap();
        inboxes.push(inbox);
    }

    const PER_PRODUCER: usize = 50;
    let producers = (0..4).map(|p| {
        let broker = broker.clone();
        tokio::spawn(async move {
            for i in 0..PER_PRODUCER {
                broker
                    .send_message(Message::broadcast(format!("p{p}"), i.to_string()))
                    .await
                    .unwrap();
            }
        })
    });
    for result in futures::future::join_all(producers).await {
        result.unwrap();
    }

    for inbox in &mut inboxes {
        let mut last_seen = [None::<usize>; 4];
        for _ in 0..4 * PER_PRODUCER {
            let msg = next(inbox).await;
            let p: usize = msg.sender[1..].parse().unwrap();
            let i: usize = msg.content.parse().unwrap();
            if let Some(prev) = last_seen[p] {
                assert!(i > prev, "producer {p} reordered: {prev} then {i}");
            }
            last_seen[p] = Some(i);
        }
        assert!(inbox.try_recv().is_err());
    }

    cancel.cancel();
    timeout(WAIT, broker.closed()).await.unwrap();
    dispatcher.await.unwrap();
    assert_eq!(broker.stats().delivered, 2 * 4 * PER_PRODUCER as u64);
}
