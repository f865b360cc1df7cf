//! R2 proxy against a live bridge.

use std::collections::BTreeMap;

use bytes::Bytes;
use chrono::{Duration as ChronoDuration, Utc};
use futures_util::stream::{self, StreamExt};

use binding_bridge::bindings::r2::{
    ByteStream, Conditional, GetOptions, HttpMetadata, HttpMetadataInit, Include, ListOptions, OnlyIf,
    PutOptions, Range, Sha256,
};
use binding_bridge::bindings::ErrorKind;
use binding_bridge::client::ObjectGet;

mod common;

#[tokio::test]
async fn test_put_get_head_delete() {
    let bridge = common::start_bridge().await;
    let bucket = bridge.client.r2("BUCKET");

    let mut custom = BTreeMap::new();
    custom.insert("owner".to_string(), "ops".to_string());
    let put = bucket
        .put(
            "reports/2024.txt",
            "hello bridge",
            PutOptions {
                http_metadata: Some(HttpMetadataInit::Fields(HttpMetadata {
                    content_type: Some("text/plain".into()),
                    ..Default::default()
                })),
                custom_metadata: Some(custom.clone()),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .expect("unconditional put stores the object");
    assert_eq!(put.key(), "reports/2024.txt");
    assert_eq!(put.size(), 12);
    assert_eq!(put.http_etag(), format!("\"{}\"", put.etag()));

    let head = bucket.head("reports/2024.txt").await.unwrap().unwrap();
    assert_eq!(head.etag(), put.etag());
    assert_eq!(head.http_metadata().content_type.as_deref(), Some("text/plain"));
    assert_eq!(head.custom_metadata(), &custom);

    let body = bucket
        .get("reports/2024.txt", GetOptions::default())
        .await
        .unwrap()
        .into_body()
        .unwrap();
    assert_eq!(body.version(), put.version());
    assert_eq!(body.text().await.unwrap(), "hello bridge");

    bucket.delete("reports/2024.txt").await.unwrap();
    assert!(bucket.head("reports/2024.txt").await.unwrap().is_none());
    assert!(bucket
        .get("reports/2024.txt", GetOptions::default())
        .await
        .unwrap()
        .is_absent());
}

#[tokio::test]
async fn test_delete_many_keys() {
    let bridge = common::start_bridge().await;
    let bucket = bridge.client.r2("BUCKET");

    for key in ["a", "b", "c"] {
        bucket.put(key, key.to_string(), PutOptions::default()).await.unwrap();
    }
    bucket
        .delete(vec!["a".to_string(), "c".to_string(), "never-existed".to_string()])
        .await
        .unwrap();

    assert_eq!(bridge.bucket.count(), 1);
    assert!(bucket.head("b").await.unwrap().is_some());
}

#[tokio::test]
async fn test_awkward_keys_survive_the_trip() {
    let bridge = common::start_bridge().await;
    let bucket = bridge.client.r2("BUCKET");

    for key in ["with space.txt", "100% done", "ünïcødé/ключ", "a+b=c&d?e#f"] {
        let put = bucket.put(key, "x", PutOptions::default()).await.unwrap().unwrap();
        assert_eq!(put.key(), key);
        let head = bucket.head(key).await.unwrap().unwrap();
        assert_eq!(head.key(), key);
    }

    let listed = bucket.list(ListOptions::default()).await.unwrap();
    let mut keys: Vec<_> = listed.objects.iter().map(|o| o.key().to_string()).collect();
    keys.sort();
    assert!(keys.contains(&"ünïcødé/ключ".to_string()));
    assert_eq!(keys.len(), 4);
}

#[tokio::test]
async fn test_get_precondition_by_upload_time() {
    let bridge = common::start_bridge().await;
    let bucket = bridge.client.r2("BUCKET");
    bucket.put("dated", "contents", PutOptions::default()).await.unwrap();

    let past = GetOptions {
        only_if: Some(OnlyIf::Conditional(Conditional {
            uploaded_after: Some(Utc::now() - ChronoDuration::hours(1)),
            ..Default::default()
        })),
        ..Default::default()
    };
    let body = bucket.get("dated", past).await.unwrap().into_body().unwrap();
    assert_eq!(body.bytes().await.unwrap(), Bytes::from_static(b"contents"));

    let future = GetOptions {
        only_if: Some(OnlyIf::Conditional(Conditional {
            uploaded_after: Some(Utc::now() + ChronoDuration::hours(1)),
            ..Default::default()
        })),
        ..Default::default()
    };
    match bucket.get("dated", future).await.unwrap() {
        ObjectGet::MetadataOnly(head) => assert_eq!(head.key(), "dated"),
        other => panic!("expected metadata only, got {other:?}"),
    }
}

#[tokio::test]
async fn test_conditional_put_on_etag() {
    let bridge = common::start_bridge().await;
    let bucket = bridge.client.r2("BUCKET");
    let first = bucket.put("cfg", "v1", PutOptions::default()).await.unwrap().unwrap();

    let stale = PutOptions {
        only_if: Some(OnlyIf::Conditional(Conditional {
            etag_matches: Some("0000".into()),
            ..Default::default()
        })),
        ..Default::default()
    };
    assert!(bucket.put("cfg", "v2", stale).await.unwrap().is_none());

    let fresh = PutOptions {
        only_if: Some(OnlyIf::Conditional(Conditional {
            etag_matches: Some(first.etag().to_string()),
            ..Default::default()
        })),
        ..Default::default()
    };
    let second = bucket.put("cfg", "v2", fresh).await.unwrap().unwrap();
    assert_ne!(second.etag(), first.etag());
}

#[tokio::test]
async fn test_ranged_get() {
    let bridge = common::start_bridge().await;
    let bucket = bridge.client.r2("BUCKET");
    bucket.put("digits", "0123456789", PutOptions::default()).await.unwrap();

    let options = GetOptions {
        range: Some(Range::Slice {
            offset: Some(2),
            length: Some(3),
        }),
        ..Default::default()
    };
    let body = bucket.get("digits", options).await.unwrap().into_body().unwrap();
    assert_eq!(body.range().map(|r| (r.offset, r.length)), Some((2, 3)));
    assert_eq!(body.text().await.unwrap(), "234");

    let options = GetOptions {
        range: Some(Range::Suffix(4)),
        ..Default::default()
    };
    let body = bucket.get("digits", options).await.unwrap().into_body().unwrap();
    assert_eq!(body.text().await.unwrap(), "6789");
}

#[tokio::test]
async fn test_streamed_put_and_get() {
    let bridge = common::start_bridge().await;
    let bucket = bridge.client.r2("BUCKET");

    let chunk = Bytes::from(vec![b'z'; 64 * 1024]);
    let chunks: Vec<Result<Bytes, std::io::Error>> = (0..16).map(|_| Ok(chunk.clone())).collect();
    let upload: ByteStream = stream::iter(chunks).boxed();

    let put = bucket.put("big.bin", upload, PutOptions::default()).await.unwrap().unwrap();
    assert_eq!(put.size(), 16 * 64 * 1024);

    let mut download = bucket
        .get("big.bin", GetOptions::default())
        .await
        .unwrap()
        .into_body()
        .unwrap()
        .into_stream();
    let mut total = 0usize;
    while let Some(piece) = download.next().await {
        let piece = piece.unwrap();
        assert!(piece.iter().all(|b| *b == b'z'));
        total += piece.len();
    }
    assert_eq!(total, 16 * 64 * 1024);
}

#[tokio::test]
async fn test_checksum_mismatch_is_typed() {
    let bridge = common::start_bridge().await;
    let bucket = bridge.client.r2("BUCKET");

    let options = PutOptions {
        sha256: Some(Sha256::Hex("00".repeat(32))),
        ..Default::default()
    };
    let err = bucket.put("checked", "payload", options).await.unwrap_err();
    assert_eq!(err.status(), Some(500));
    assert_eq!(err.kind(), Some(ErrorKind::ChecksumMismatch));
    assert!(bucket.head("checked").await.unwrap().is_none());
}

#[tokio::test]
async fn test_list_with_delimiter_and_pages() {
    let bridge = common::start_bridge().await;
    let bucket = bridge.client.r2("BUCKET");
    for key in ["logs/a", "logs/b", "photos/1.jpg", "photos/2.jpg", "readme"] {
        bucket.put(key, "-", PutOptions::default()).await.unwrap();
    }

    let grouped = bucket
        .list(ListOptions {
            delimiter: Some("/".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(grouped.delimited_prefixes, vec!["logs/", "photos/"]);
    assert_eq!(grouped.objects.len(), 1);
    assert_eq!(grouped.objects[0].key(), "readme");

    let first = bucket
        .list(ListOptions {
            limit: Some(2),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(first.truncated);
    let rest = bucket
        .list(ListOptions {
            cursor: first.cursor.clone(),
            include: vec![Include::HttpMetadata],
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(!rest.truncated);
    assert_eq!(first.objects.len() + rest.objects.len(), 5);
}

#[tokio::test]
async fn test_identical_content_gives_identical_etags_on_two_bridges() {
    let left = common::start_bridge().await;
    let right = common::start_bridge().await;

    let (a, b) = common::run_both(left.client.r2("BUCKET"), right.client.r2("BUCKET"), |bucket| async move {
        bucket
            .put("same", "identical bytes", PutOptions::default())
            .await
            .unwrap()
            .unwrap()
    })
    .await;

    assert_eq!(a.etag(), b.etag());
    assert_eq!(a.size(), b.size());
    assert_ne!(a.version(), b.version());
}

#[tokio::test]
async fn test_metadata_with_del_character_reads_back_with_body() {
    let bridge = common::start_bridge().await;
    let bucket = bridge.client.r2("BUCKET");

    let mut custom = BTreeMap::new();
    custom.insert("note".to_string(), "a\u{7f}b".to_string());
    bucket
        .put(
            "odd\u{7f}key",
            "body",
            PutOptions {
                custom_metadata: Some(custom.clone()),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();

    let body = bucket
        .get("odd\u{7f}key", GetOptions::default())
        .await
        .unwrap()
        .into_body()
        .unwrap();
    assert_eq!(body.custom_metadata(), &custom);
    assert_eq!(body.text().await.unwrap(), "body");
}
