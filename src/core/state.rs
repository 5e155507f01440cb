/// Observable outcome of one streaming request.
///
/// Exactly one of three conditions holds at any time: actively streaming,
/// completed with text, or completed with an error. The orchestrator
/// ([`App`](crate::core::app::App)) is the sole mutator; everything else
/// reads through the accessors.
#[derive(Debug, Default)]
pub struct StreamState {
    response: String,
    is_loading: bool,
    error: Option<String>,
}

impl StreamState {
    pub fn response(&self) -> &str {
        &self.response
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Reset for a fresh request: empty response, no error, loading.
    pub(crate) fn begin(&mut self) {
        self.response.clear();
        self.error = None;
        self.is_loading = true;
    }

    /// Append one decoded delta. The response only ever grows within a
    /// single request.
    pub(crate) fn append(&mut self, delta: &str) {
        self.response.push_str(delta);
    }

    /// Terminal failure for the current request. Accumulated text stays put.
    pub(crate) fn fail(&mut self, message: String) {
        self.error = Some(message);
        self.is_loading = false;
    }

    /// The stream is over; the error (if any) is already in place.
    pub(crate) fn finish(&mut self) {
        self.is_loading = false;
    }
}
