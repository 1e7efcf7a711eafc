//! Live update channel for the preview server.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Messages pushed to preview pages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LiveMessage {
    /// Reload the whole page
    Reload,

    /// Replace the page with freshly rendered HTML
    UpdateContent { html: String },

    /// Connection established
    Connected,
}

/// Broadcasts live messages to every connected page.
#[derive(Debug, Clone)]
pub struct LiveHub {
    sender: broadcast::Sender<LiveMessage>,
}

impl LiveHub {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(100);
        Self { sender }
    }

    pub fn send(&self, msg: LiveMessage) {
        // No pages connected is fine
        let _ = self.sender.send(msg);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LiveMessage> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for LiveHub {
    fn default() -> Self {
        Self::new()
    }
}

/// Browser script that applies live messages. The WebSocket URL is derived
/// from the page location so the preview works behind any host and port.
pub fn live_client_script(ws_path: &str) -> String {
    format!(
        r#"
(function() {{
  'use strict';

  const scheme = location.protocol === 'https:' ? 'wss://' : 'ws://';
  const ws = new WebSocket(scheme + location.host + '{}');
  let reconnectAttempts = 0;
  const maxReconnectAttempts = 10;

  ws.onopen = function() {{
    console.log('[live] Connected');
    reconnectAttempts = 0;
  }};

  ws.onmessage = function(event) {{
    const msg = JSON.parse(event.data);

    switch (msg.type) {{
      case 'reload':
        location.reload();
        break;

      case 'update_content':
        const next = new DOMParser().parseFromString(msg.html, 'text/html');
        document.title = next.title;
        document.head.innerHTML = next.head.innerHTML;
        document.body.innerHTML = next.body.innerHTML;
        break;

      case 'connected':
        break;
    }}
  }};

  ws.onclose = function() {{
    if (reconnectAttempts < maxReconnectAttempts) {{
      reconnectAttempts++;
      setTimeout(function() {{
        location.reload();
      }}, 1000 * reconnectAttempts);
    }}
  }};
}})();
"#,
        ws_path
    )
}
