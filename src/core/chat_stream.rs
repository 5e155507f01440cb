use futures_util::StreamExt;
use tokio::sync::mpsc;
use tracing::debug;

use crate::api::{ChatMessage, ChatRequest};
use crate::core::config::Config;
use crate::core::decoder::StreamDecoder;
use crate::utils::url::construct_api_url;

const FALLBACK_ERROR: &str = "something went wrong";

#[derive(Clone, Debug)]
pub enum StreamMessage {
    Chunk(String),
    Error(String),
    End,
}

pub struct StreamParams {
    pub client: reqwest::Client,
    pub config: Config,
    pub prompt: String,
    pub cancel_token: tokio_util::sync::CancellationToken,
    pub stream_id: u64,
}

/// Publishes stream events tagged with the stream id they belong to.
///
/// Every exit path of a spawned stream ends with [`StreamMessage::End`],
/// except cancellation, where the superseding stream has already taken over
/// the state.
#[derive(Clone)]
pub struct ChatStreamService {
    tx: mpsc::UnboundedSender<(StreamMessage, u64)>,
}

impl ChatStreamService {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(StreamMessage, u64)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn spawn_stream(&self, params: StreamParams) {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let cancel_token = params.cancel_token.clone();
            tokio::select! {
                _ = run_stream(tx, params) => {}
                _ = cancel_token.cancelled() => {}
            }
        });
    }
}

async fn run_stream(tx: mpsc::UnboundedSender<(StreamMessage, u64)>, params: StreamParams) {
    let StreamParams {
        client,
        config,
        prompt,
        cancel_token,
        stream_id,
    } = params;

    let request = ChatRequest {
        model: config.model.clone(),
        messages: vec![ChatMessage::user(prompt)],
        max_tokens: config.max_tokens,
        stream: true,
    };

    let chat_url = construct_api_url(&config.base_url, "chat/completions");
    let outcome = client
        .post(chat_url)
        .header("Authorization", format!("Bearer {}", config.api_key))
        .header("Content-Type", "application/json")
        .json(&request)
        .send()
        .await;

    match outcome {
        Ok(response) => {
            let status = response.status();
            if !status.is_success() {
                let reason = status.canonical_reason().unwrap_or("request failed");
                let _ = tx.send((
                    StreamMessage::Error(format!(
                        "request failed: {} {}",
                        status.as_u16(),
                        reason
                    )),
                    stream_id,
                ));
                let _ = tx.send((StreamMessage::End, stream_id));
                return;
            }

            let mut stream = response.bytes_stream();
            let mut decoder = StreamDecoder::new();

            while let Some(chunk) = stream.next().await {
                if cancel_token.is_cancelled() {
                    return;
                }

                match chunk {
                    Ok(bytes) => {
                        for delta in decoder.push_chunk(&bytes) {
                            let _ = tx.send((StreamMessage::Chunk(delta), stream_id));
                        }
                    }
                    Err(err) => {
                        let _ = tx.send((StreamMessage::Error(describe_error(&err)), stream_id));
                        let _ = tx.send((StreamMessage::End, stream_id));
                        return;
                    }
                }
            }

            debug!(stream_id, saw_done = decoder.saw_done(), "stream finished");
            let _ = tx.send((StreamMessage::End, stream_id));
        }
        Err(err) => {
            let _ = tx.send((StreamMessage::Error(describe_error(&err)), stream_id));
            let _ = tx.send((StreamMessage::End, stream_id));
        }
    }
}

fn describe_error(err: &reqwest::Error) -> String {
    let message = err.to_string();
    if message.trim().is_empty() {
        FALLBACK_ERROR.to_string()
    } else {
        message
    }
}
