//! KV and QUEUE proxies against a live bridge.

use serde_json::json;

use binding_bridge::bindings::kv::{KvGetOptions, KvListOptions, KvPutOptions};
use binding_bridge::bindings::queue::{BatchOptions, ContentType, QueueMessage, SendOptions};
use binding_bridge::bindings::ErrorKind;
use binding_bridge::codec::Value;

mod common;

#[tokio::test]
async fn test_kv_round_trip_with_metadata() {
    let bridge = common::start_bridge().await;
    let kv = bridge.client.kv("CACHE");

    assert!(kv.get("session", KvGetOptions::default()).await.unwrap().is_none());

    kv.put(
        "session",
        r#"{"user":"ada"}"#,
        KvPutOptions {
            metadata: Some(json!({"source": "login"})),
            expiration_ttl: Some(3600),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let entry = kv
        .get_with_metadata("session", KvGetOptions::default())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(entry.metadata, Some(json!({"source": "login"})));

    let parsed: serde_json::Value = kv
        .get_json("session", KvGetOptions::default())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(parsed["user"], "ada");

    kv.delete("session").await.unwrap();
    assert!(kv.get_text("session", KvGetOptions::default()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_kv_empty_value_is_not_absent() {
    let bridge = common::start_bridge().await;
    let kv = bridge.client.kv("CACHE");

    kv.put("blank", "", KvPutOptions::default()).await.unwrap();
    let entry = kv.get_with_metadata("blank", KvGetOptions::default()).await.unwrap().unwrap();
    assert!(entry.value.is_empty());
    assert_eq!(entry.metadata, None);
}

#[tokio::test]
async fn test_kv_list_pages_by_prefix() {
    let bridge = common::start_bridge().await;
    let kv = bridge.client.kv("CACHE");
    for key in ["user:1", "user:2", "user:3", "team:1"] {
        kv.put(key, key.to_string(), KvPutOptions::default()).await.unwrap();
    }

    let first = kv
        .list(KvListOptions {
            prefix: Some("user:".into()),
            limit: Some(2),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(first.keys.len(), 2);
    assert!(!first.list_complete);

    let rest = kv
        .list(KvListOptions {
            prefix: Some("user:".into()),
            cursor: first.cursor.clone(),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(rest.list_complete);
    let names: Vec<_> = rest.keys.iter().map(|k| k.name.as_str()).collect();
    assert_eq!(names, vec!["user:3"]);
}

#[tokio::test]
async fn test_kv_rejects_short_ttl() {
    let bridge = common::start_bridge().await;
    let err = bridge
        .client
        .kv("CACHE")
        .put(
            "short",
            "v",
            KvPutOptions {
                expiration_ttl: Some(5),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::InvalidArgument));
}

#[tokio::test]
async fn test_queue_send_and_batch() {
    let bridge = common::start_bridge().await;
    let queue = bridge.client.queue("JOBS");

    queue
        .send(
            Value::from("resize image 7"),
            SendOptions {
                content_type: Some(ContentType::Text),
                delay_seconds: None,
            },
        )
        .await
        .unwrap();

    let batch = vec![
        QueueMessage {
            content_type: Some(ContentType::Bytes),
            ..QueueMessage::new(Value::from(vec![1u8, 2, 3]))
        },
        QueueMessage {
            delay_seconds: Some(5),
            ..QueueMessage::new(Value::from("explicit delay"))
        },
    ];
    queue
        .send_batch(
            batch,
            BatchOptions {
                delay_seconds: Some(30),
            },
        )
        .await
        .unwrap();

    let messages = bridge.queue.drain().await;
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[0].body, Value::from("resize image 7"));
    assert_eq!(messages[0].content_type, Some(ContentType::Text));
    assert_eq!(messages[1].body, Value::from(vec![1u8, 2, 3]));
    assert_eq!(messages[1].delay_seconds, Some(30));
    assert_eq!(messages[2].delay_seconds, Some(5));
}

#[tokio::test]
async fn test_queue_batch_is_all_or_nothing() {
    let bridge = common::start_bridge().await;
    let queue = bridge.client.queue("JOBS");

    let batch = vec![
        QueueMessage::new(Value::from("fine")),
        QueueMessage {
            delay_seconds: Some(999_999),
            ..QueueMessage::new(Value::from("too late"))
        },
    ];
    let err = queue.send_batch(batch, BatchOptions::default()).await.unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::InvalidArgument));
    assert!(bridge.queue.messages().await.is_empty());
}

#[tokio::test]
async fn test_kv_out_of_range_ttl_is_a_typed_error() {
    let bridge = common::start_bridge().await;
    let kv = bridge.client.kv("CACHE");

    let err = kv
        .put(
            "forever",
            "v",
            KvPutOptions {
                expiration_ttl: Some(u64::MAX),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(500));
    assert_eq!(err.kind(), Some(ErrorKind::InvalidArgument));

    kv.put("after", "still serving", KvPutOptions::default()).await.unwrap();
    assert_eq!(
        kv.get_text("after", KvGetOptions::default()).await.unwrap().as_deref(),
        Some("still serving")
    );
}
