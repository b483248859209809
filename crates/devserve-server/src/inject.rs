//! Live reload script injection for HTML responses.
//!
//! [`InjectSession`] accumulates an HTML document chunk by chunk and inserts
//! the reload client right before the first `</body>` (ASCII case-insensitive)
//! once the input is complete. The tag may straddle chunk boundaries, so the
//! search only happens in [`InjectSession::finish`].
//!
//! Documents without a closing body tag pass through byte-for-byte.

use crate::RELOAD_MESSAGE;

/// Tag the reload script is inserted in front of.
const BODY_CLOSE: &[u8] = b"</body>";

/// Delay before the client reloads after its socket closes.
pub const RECONNECT_DELAY_MS: u32 = 2000;

/// Build the reload client for a listener on `reload_port`.
///
/// The socket host follows the page's own hostname so the script keeps working
/// when the server is reached through a LAN address.
#[must_use]
pub fn reload_script(reload_port: u16) -> String {
    format!(
        r"
<!-- devserve live reload -->
<script>
(function () {{
  var socket = new WebSocket('ws://' + (window.location.hostname || 'localhost') + ':{reload_port}/');
  socket.onmessage = function (event) {{
    if (event.data === '{RELOAD_MESSAGE}') {{
      window.location.reload();
    }}
  }};
  socket.onclose = function () {{
    setTimeout(function () {{
      window.location.reload();
    }}, {RECONNECT_DELAY_MS});
  }};
  socket.onerror = function (error) {{
    console.error('[devserve] live reload socket error', error);
  }};
}})();
</script>
"
    )
}

/// Per-response injection state.
///
/// One session is created for every HTML response. The script is written at
/// most once, no matter how many times [`finish`](Self::finish) runs.
#[derive(Debug)]
pub struct InjectSession<'a> {
    script: &'a str,
    buffer: Vec<u8>,
    injected: bool,
}

impl<'a> InjectSession<'a> {
    /// Start a session that will inject `script`.
    #[must_use]
    pub fn new(script: &'a str) -> Self {
        Self {
            script,
            buffer: Vec::new(),
            injected: false,
        }
    }

    /// Append the next chunk of the document.
    pub fn push(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Whether the script has already been written.
    #[must_use]
    pub fn injected(&self) -> bool {
        self.injected
    }

    /// Signal end of input and take the rewritten document.
    ///
    /// Returns everything pushed since the previous call.
    pub fn finish(&mut self) -> Vec<u8> {
        let mut output = std::mem::take(&mut self.buffer);
        if self.injected {
            return output;
        }

        if let Some(pos) = find_body_close(&output) {
            output.splice(pos..pos, self.script.bytes());
            self.injected = true;
        }

        output
    }
}

/// Inject `script` into a complete document.
#[must_use]
pub fn inject(html: &[u8], script: &str) -> Vec<u8> {
    let mut session = InjectSession::new(script);
    session.push(html);
    session.finish()
}

/// Offset of the first `</body>`, ignoring ASCII case.
fn find_body_close(haystack: &[u8]) -> Option<usize> {
    haystack
        .windows(BODY_CLOSE.len())
        .position(|window| window.eq_ignore_ascii_case(BODY_CLOSE))
}
