//! Sensor feed example using the in-memory pub/sub hub.
//!
//! A producer thread publishes readings as fast as it can while the main task
//! pulls them from a queue at its own pace. Closing the hub completes the
//! queue after every buffered reading has been read.
//!
//! Run with: RUST_LOG=debug cargo run --example queue_memory --features logging

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::time::Duration;

use mom_queue::{Error, MemoryPubSub, QueueBuilder, Result, UnsubscribeOptions};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt as tracing_format, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // ---
    tracing_format()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .with_line_number(true)
        .init();

    let hub = MemoryPubSub::new();

    let temperature = QueueBuilder::new(hub.clone())
        .topic("sensors/temperature")
        .build_async()
        .await?;

    let humidity = QueueBuilder::new(hub.clone())
        .topic("sensors/humidity")
        .build()?;

    // Delivery happens on a plain thread that must never block.
    let producer = {
        let hub = hub.clone();
        std::thread::spawn(move || {
            for i in 0..5 {
                hub.publish("sensors/temperature", format!("{:.1}", 21.0 + i as f32 * 0.5));
                hub.publish("sensors/humidity", format!("{}", 40 + i));
            }
            hub.close();
        })
    };

    // Humidity is handled by a background consumer loop.
    let humidity_task = humidity.on_message(|message: mom_queue::Message| async move {
        println!("Humidity:    {}%", message.payload_str().unwrap_or("?"));
        Ok::<_, Error>(())
    });

    // Temperature is pulled explicitly, with a per-read deadline.
    loop {
        let token = CancellationToken::new();
        let deadline = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            deadline.cancel();
        });

        match temperature.read_cancellable(&token).await {
            Ok(message) => println!("Temperature: {} C", message.payload_str().unwrap_or("?")),
            Err(Error::EndOfStream) => break,
            Err(Error::Cancelled) => {
                println!("no reading within 1s, giving up");
                break;
            }
            Err(err) => return Err(err),
        }
    }

    producer.join().expect("producer panicked");
    humidity_task.await.expect("consumer panicked")?;

    // Queues are already complete; this only releases the hub references.
    temperature.unsubscribe_async(UnsubscribeOptions::default(), None).await?;
    humidity.unsubscribe(UnsubscribeOptions::default(), None)?;

    Ok(())
}
