use crate::error::CallError;
use crate::logger::log;
use crate::protocol::SignalMessage;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio_tungstenite::{connect_async, tungstenite::Message};

/// Outbound half of the signaling contract.
///
/// `send` is fire-and-forget: there is no acknowledgement and no retry. The
/// orchestrator only depends on this trait, so tests can collect outbound
/// messages without a socket.
pub trait SignalSink: Send + Sync {
    fn send(&self, message: SignalMessage);
}

/// Duplex WebSocket connection to the signaling relay.
///
/// Inbound messages are delivered in arrival order through the receiver
/// returned by `connect`. A failed or closed socket is logged and the reader
/// stops; the channel itself is never reconnected.
pub struct SignalingChannel {
    outbound: UnboundedSender<SignalMessage>,
}

impl SignalingChannel {
    pub async fn connect(
        url: &str,
    ) -> Result<(Arc<Self>, UnboundedReceiver<SignalMessage>), CallError> {
        let (ws, _) = connect_async(url).await?;
        log(&format!("signaling connected: {url}"));
        let (mut write, mut read) = ws.split();

        let (out_tx, mut out_rx) = unbounded_channel::<SignalMessage>();
        let (in_tx, in_rx) = unbounded_channel::<SignalMessage>();

        tokio::spawn(async move {
            while let Some(msg) = out_rx.recv().await {
                let text = match serde_json::to_string(&msg) {
                    Ok(text) => text,
                    Err(e) => {
                        log(&format!("outbound message encoding failed: {e}"));
                        continue;
                    }
                };
                if let Err(e) = write.send(Message::Text(text)).await {
                    log(&format!("signaling send failed: {e}"));
                    break;
                }
            }
        });

        tokio::spawn(async move {
            while let Some(frame) = read.next().await {
                match frame {
                    Ok(Message::Text(text)) => match serde_json::from_str(&text) {
                        Ok(msg) => {
                            if in_tx.send(msg).is_err() {
                                break;
                            }
                        }
                        Err(e) => log(&format!("unrecognized signaling message: {e}")),
                    },
                    Ok(Message::Close(_)) => {
                        log("signaling channel closed by relay");
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        log(&format!("signaling channel error: {e}"));
                        break;
                    }
                }
            }
        });

        Ok((Arc::new(Self { outbound: out_tx }), in_rx))
    }
}

impl SignalSink for SignalingChannel {
    fn send(&self, message: SignalMessage) {
        if self.outbound.send(message).is_err() {
            log("signaling channel gone, outbound message dropped");
        }
    }
}
