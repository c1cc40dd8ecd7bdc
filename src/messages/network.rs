//! Network messages - communication between App and Network layers

use crate::models::{ExecutionResult, RequestDescriptor};

/// Commands sent from App layer to Network layer
#[derive(Debug, Clone, PartialEq)]
pub enum NetworkCommand {
    /// Execute a resolved request
    Execute {
        id: u64,
        descriptor: RequestDescriptor,
    },
    /// Abort a pending request
    Cancel(u64),
    /// Shutdown the network actor
    Shutdown,
}

/// Responses sent from Network layer to App layer
#[derive(Debug, Clone)]
pub enum NetworkResponse {
    /// Execution finished, successfully or not
    Completed {
        id: u64,
        descriptor: RequestDescriptor,
        result: ExecutionResult,
    },
    /// Request was aborted before completing
    Cancelled { id: u64 },
}

impl NetworkResponse {
    /// Get the request ID from the response
    pub fn id(&self) -> u64 {
        match self {
            NetworkResponse::Completed { id, .. } => *id,
            NetworkResponse::Cancelled { id } => *id,
        }
    }
}
