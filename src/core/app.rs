use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::core::chat_stream::{ChatStreamService, StreamMessage, StreamParams};
use crate::core::config::Config;
use crate::core::state::StreamState;

/// Drives one request/response cycle at a time and owns the observable
/// [`StreamState`].
///
/// Stream tasks publish `(event, stream_id)` pairs on the channel returned
/// by [`App::new`]; the consumer feeds them back through
/// [`App::apply_event`], which is where all state mutation happens.
pub struct App {
    config: Config,
    client: reqwest::Client,
    service: ChatStreamService,
    state: StreamState,
    current_stream_id: u64,
    stream_cancel_token: Option<CancellationToken>,
}

impl App {
    pub fn new(config: Config) -> (Self, mpsc::UnboundedReceiver<(StreamMessage, u64)>) {
        let (service, rx) = ChatStreamService::new();
        (
            Self {
                config,
                client: reqwest::Client::new(),
                service,
                state: StreamState::default(),
                current_stream_id: 0,
                stream_cancel_token: None,
            },
            rx,
        )
    }

    pub fn state(&self) -> &StreamState {
        &self.state
    }

    pub fn is_current_stream(&self, stream_id: u64) -> bool {
        self.current_stream_id == stream_id
    }

    /// Submit one prompt as a fresh single-shot request.
    ///
    /// Any stream still in flight is cancelled first, so the state machine
    /// re-enters `streaming` from a quiet position. Callers are expected to
    /// hand in a prompt that is non-empty once trimmed.
    pub fn send_message(&mut self, prompt: impl Into<String>) {
        let (cancel_token, stream_id) = self.start_new_stream();
        self.state.begin();
        self.service.spawn_stream(StreamParams {
            client: self.client.clone(),
            config: self.config.clone(),
            prompt: prompt.into(),
            cancel_token,
            stream_id,
        });
    }

    pub fn cancel_current_stream(&mut self) {
        if let Some(token) = &self.stream_cancel_token {
            token.cancel();
        }
        self.stream_cancel_token = None;
    }

    fn start_new_stream(&mut self) -> (CancellationToken, u64) {
        self.cancel_current_stream();
        self.current_stream_id += 1;
        let token = CancellationToken::new();
        self.stream_cancel_token = Some(token.clone());
        (token, self.current_stream_id)
    }

    /// Apply one event published by a stream task. Events tagged with a
    /// superseded stream id are dropped.
    pub fn apply_event(&mut self, message: StreamMessage, stream_id: u64) {
        if !self.is_current_stream(stream_id) {
            return;
        }
        match message {
            StreamMessage::Chunk(delta) => self.state.append(&delta),
            StreamMessage::Error(message) => self.state.fail(message),
            StreamMessage::End => {
                self.state.finish();
                self.stream_cancel_token = None;
            }
        }
    }
}
