//! Network actor - runs HTTP executions in the Tokio runtime, off the UI loop

use std::collections::HashMap;
use tokio::sync::mpsc;
use tokio::task::{AbortHandle, JoinSet};

use crate::messages::{NetworkCommand, NetworkResponse};
use crate::network::client::Transport;

/// Network actor that executes descriptors and reports results by request id
pub struct NetworkActor {
    transport: Transport,
    response_tx: mpsc::UnboundedSender<NetworkResponse>,
    active_requests: JoinSet<u64>,
    abort_handles: HashMap<u64, AbortHandle>,
}

impl NetworkActor {
    pub fn new(transport: Transport, response_tx: mpsc::UnboundedSender<NetworkResponse>) -> Self {
        NetworkActor {
            transport,
            response_tx,
            active_requests: JoinSet::new(),
            abort_handles: HashMap::new(),
        }
    }

    /// Run the network actor message loop
    pub async fn run(mut self, mut cmd_rx: mpsc::UnboundedReceiver<NetworkCommand>) {
        loop {
            tokio::select! {
                biased;

                cmd = cmd_rx.recv() => {
                    match cmd {
                        Some(NetworkCommand::Execute { id, descriptor }) => {
                            let response_tx = self.response_tx.clone();
                            let transport = self.transport.clone();

                            let handle = self.active_requests.spawn(async move {
                                tracing::info!(id, url = %descriptor.url, method = descriptor.method.as_str(), "Executing request");
                                let result = transport.execute(&descriptor).await;
                                tracing::info!(
                                    id,
                                    status = ?result.status(),
                                    elapsed_ms = result.response_time_ms(),
                                    success = result.is_success(),
                                    "Request completed"
                                );
                                let _ = response_tx.send(NetworkResponse::Completed { id, descriptor, result });
                                id
                            });
                            self.abort_handles.insert(id, handle);
                        }

                        Some(NetworkCommand::Cancel(id)) => {
                            if let Some(handle) = self.abort_handles.remove(&id) {
                                tracing::info!(id, "Cancelling request");
                                handle.abort();
                                let _ = self.response_tx.send(NetworkResponse::Cancelled { id });
                            }
                        }

                        Some(NetworkCommand::Shutdown) => {
                            for (_, handle) in self.abort_handles.drain() {
                                handle.abort();
                            }
                            break;
                        }

                        None => break,
                    }
                }

                Some(joined) = self.active_requests.join_next() => {
                    if let Ok(id) = joined {
                        self.abort_handles.remove(&id);
                    }
                }
            }
        }
    }
}
