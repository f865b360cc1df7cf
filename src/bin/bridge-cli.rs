use std::collections::BTreeMap;
use std::path::PathBuf;

use binding_bridge::bindings::kv::{KvGetOptions, KvListOptions, KvPutOptions};
use binding_bridge::bindings::queue::{ContentType, SendOptions};
use binding_bridge::bindings::r2::{GetOptions, HttpMetadata, HttpMetadataInit, ListOptions, PutOptions};
use binding_bridge::client::{BridgeClient, HeadResult, ObjectGet};
use binding_bridge::codec::Value;
use clap::{Parser, Subcommand};
use serde_json::json;

#[derive(Parser)]
#[command(name = "bridge-cli")]
#[command(about = "Call bindings hosted by a binding bridge", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://127.0.0.1:8787")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Object storage operations
    R2 {
        /// Binding name
        binding: String,
        #[command(subcommand)]
        op: R2Op,
    },
    /// Key-value operations
    Kv {
        binding: String,
        #[command(subcommand)]
        op: KvOp,
    },
    /// Queue operations
    Queue {
        binding: String,
        #[command(subcommand)]
        op: QueueOp,
    },
}

#[derive(Subcommand)]
enum R2Op {
    List {
        #[arg(long)]
        prefix: Option<String>,
        #[arg(long)]
        delimiter: Option<String>,
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Print object content to stdout
    Get { key: String },
    /// Upload a file
    Put {
        key: String,
        file: PathBuf,
        #[arg(long)]
        content_type: Option<String>,
    },
    Head { key: String },
    Delete { keys: Vec<String> },
}

#[derive(Subcommand)]
enum KvOp {
    Get { key: String },
    Put {
        key: String,
        value: String,
        #[arg(long)]
        ttl: Option<u64>,
    },
    Delete { key: String },
    List {
        #[arg(long)]
        prefix: Option<String>,
    },
}

#[derive(Subcommand)]
enum QueueOp {
    /// Send a text message
    Send {
        body: String,
        #[arg(long)]
        delay: Option<u32>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = BridgeClient::new(&cli.url)?;

    match cli.command {
        Commands::R2 { binding, op } => {
            let bucket = client.r2(&binding);
            match op {
                R2Op::List {
                    prefix,
                    delimiter,
                    limit,
                } => {
                    let page = bucket
                        .list(ListOptions {
                            prefix,
                            delimiter,
                            limit,
                            ..Default::default()
                        })
                        .await?;
                    let objects: Vec<_> = page.objects.iter().map(describe).collect();
                    print_json(&json!({
                        "objects": objects,
                        "truncated": page.truncated,
                        "cursor": page.cursor,
                        "delimitedPrefixes": page.delimited_prefixes,
                    }))?;
                }
                R2Op::Get { key } => match bucket.get(&key, GetOptions::default()).await? {
                    ObjectGet::Absent | ObjectGet::MetadataOnly(_) => {
                        eprintln!("Object not found: {key}");
                    }
                    ObjectGet::WithBody(body) => {
                        use std::io::Write;
                        let bytes = body.bytes().await?;
                        std::io::stdout().write_all(&bytes)?;
                    }
                },
                R2Op::Put {
                    key,
                    file,
                    content_type,
                } => {
                    let data = tokio::fs::read(&file).await?;
                    let options = PutOptions {
                        http_metadata: content_type.map(|ct| {
                            HttpMetadataInit::Fields(HttpMetadata {
                                content_type: Some(ct),
                                ..Default::default()
                            })
                        }),
                        ..Default::default()
                    };
                    match bucket.put(&key, data, options).await? {
                        Some(head) => print_json(&describe(&head))?,
                        None => eprintln!("Precondition failed for {key}"),
                    }
                }
                R2Op::Head { key } => match bucket.head(&key).await? {
                    Some(head) => print_json(&describe(&head))?,
                    None => eprintln!("Object not found: {key}"),
                },
                R2Op::Delete { keys } => {
                    bucket.delete(keys).await?;
                }
            }
        }
        Commands::Kv { binding, op } => {
            let kv = client.kv(&binding);
            match op {
                KvOp::Get { key } => match kv.get_with_metadata(&key, KvGetOptions::default()).await? {
                    Some(entry) => {
                        println!("{}", String::from_utf8_lossy(&entry.value));
                        if let Some(metadata) = entry.metadata {
                            eprintln!("metadata: {metadata}");
                        }
                    }
                    None => eprintln!("Key not found: {key}"),
                },
                KvOp::Put { key, value, ttl } => {
                    let options = KvPutOptions {
                        expiration_ttl: ttl,
                        ..Default::default()
                    };
                    kv.put(&key, value, options).await?;
                }
                KvOp::Delete { key } => kv.delete(&key).await?,
                KvOp::List { prefix } => {
                    let result = kv
                        .list(KvListOptions {
                            prefix,
                            ..Default::default()
                        })
                        .await?;
                    print_json(&serde_json::to_value(&result)?)?;
                }
            }
        }
        Commands::Queue { binding, op } => {
            let queue = client.queue(&binding);
            match op {
                QueueOp::Send { body, delay } => {
                    let options = SendOptions {
                        content_type: Some(ContentType::Text),
                        delay_seconds: delay,
                    };
                    queue.send(Value::from(body), options).await?;
                }
            }
        }
    }

    Ok(())
}

fn describe(head: &HeadResult) -> serde_json::Value {
    let custom: BTreeMap<_, _> = head.custom_metadata().clone();
    json!({
        "key": head.key(),
        "size": head.size(),
        "etag": head.etag(),
        "version": head.version(),
        "uploaded": head.uploaded().to_rfc3339(),
        "httpMetadata": head.http_metadata(),
        "customMetadata": custom,
    })
}

fn print_json(value: &serde_json::Value) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
