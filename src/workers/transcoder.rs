use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicQosOptions, QueueDeclareOptions,
};
use lapin::types::FieldTable;
use tracing::{error, info, warn};

use crate::infrastructure::queue::rabbitmq::RabbitMqService;
use crate::modules::transcode::events::decode_trigger;
use crate::modules::transcode::orchestrator::TranscodeOrchestrator;

const RECONNECT_DELAY: Duration = Duration::from_secs(5);
const REQUEUE_DELAY: Duration = Duration::from_secs(2);

/// What to tell the broker about a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Ack,
    Requeue,
}

/// Consumes trigger payloads from `queue_name` until the process exits,
/// reconnecting whenever the channel drops.
pub async fn start_transcoder_worker(
    queue: RabbitMqService,
    queue_name: String,
    orchestrator: Arc<TranscodeOrchestrator>,
) {
    info!("🎥 Starting Transcoder Worker...");

    loop {
        match consume(&queue, &queue_name, &orchestrator).await {
            Ok(()) => warn!("Consumer stream for '{}' ended", queue_name),
            Err(e) => error!("❌ Consumer for '{}' failed: {}", queue_name, e),
        }

        tokio::time::sleep(RECONNECT_DELAY).await;
        if let Err(e) = queue.reconnect().await {
            error!("RabbitMQ reconnect failed: {}", e);
        }
    }
}

async fn consume(
    queue: &RabbitMqService,
    queue_name: &str,
    orchestrator: &TranscodeOrchestrator,
) -> anyhow::Result<()> {
    let channel = queue.channel().await;

    channel
        .queue_declare(
            queue_name,
            QueueDeclareOptions {
                durable: true,
                ..QueueDeclareOptions::default()
            },
            FieldTable::default(),
        )
        .await?;

    // One encode at a time per worker; ffmpeg already saturates the CPU.
    channel.basic_qos(1, BasicQosOptions::default()).await?;

    let mut consumer = channel
        .basic_consume(
            queue_name,
            "transcoder_worker",
            BasicConsumeOptions::default(),
            FieldTable::default(),
        )
        .await?;

    info!("🎥 Transcoder Worker listening on '{}'", queue_name);

    while let Some(delivery) = consumer.next().await {
        let delivery = delivery?;

        match handle_payload(orchestrator, &delivery.data).await {
            Disposition::Ack => {
                delivery.ack(BasicAckOptions::default()).await?;
            }
            Disposition::Requeue => {
                tokio::time::sleep(REQUEUE_DELAY).await;
                delivery
                    .nack(BasicNackOptions {
                        requeue: true,
                        ..BasicNackOptions::default()
                    })
                    .await?;
            }
        }
    }

    Ok(())
}

/// Runs every upload event in `payload` and decides the delivery's fate.
///
/// Unreadable payloads are acknowledged and dropped since redelivery would
/// never fix them. Any retryable pipeline failure requeues the whole
/// delivery; events that already completed are safe to run again.
pub async fn handle_payload(orchestrator: &TranscodeOrchestrator, payload: &[u8]) -> Disposition {
    let events = match decode_trigger(payload) {
        Ok(events) => events,
        Err(e) => {
            error!("❌ Dropping unreadable trigger: {}", e);
            return Disposition::Ack;
        }
    };

    info!("📦 Received trigger with {} event(s)", events.len());

    let mut disposition = Disposition::Ack;
    for event in &events {
        if let Err(e) = orchestrator.handle_upload(event).await {
            warn!(object_path = %event.object_path, error = %e, "Requeueing trigger");
            disposition = Disposition::Requeue;
        }
    }
    disposition
}
