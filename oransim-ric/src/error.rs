//! Error types for RIC operations
//!
//! Every error here is scoped to the single operation that raised it. The
//! protocol entry points log and drop them; none of them stops the decision
//! loop.

use thiserror::Error;

use oransim_common::{NodeId, NodeType, SimTime};

/// Top-level RIC error type
#[derive(Error, Debug)]
pub enum RicError {
    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(#[from] oransim_common::Error),

    /// Repository operation failed
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// Command could not be applied
    #[error("Command error: {0}")]
    Command(#[from] CommandError),

    /// No terminator behind the given handle
    #[error("Unknown terminator handle: {0}")]
    UnknownTerminator(usize),
}

/// Errors raised by the data repository
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RepositoryError {
    /// The repository is deactivated
    #[error("Repository is inactive")]
    Inactive,

    /// No registration record for the node
    #[error("Unknown E2 node: {0}")]
    UnknownNode(NodeId),

    /// The node exists but is not currently registered
    #[error("E2 node {0} is not registered")]
    NotRegistered(NodeId),

    /// Node id 0 cannot be stored
    #[error("Node id 0 is reserved for unregistered nodes")]
    ReservedNodeId,

    /// The sample kind does not fit the node's type
    #[error("{kind} sample not valid for {node_type} node {node_id}")]
    WrongNodeType {
        /// Node the sample was for
        node_id: NodeId,
        /// Registered node type
        node_type: NodeType,
        /// Sample kind
        kind: &'static str,
    },

    /// Sample carries a non-finite value
    #[error("Invalid {kind} sample at {time}: {reason}")]
    InvalidSample {
        /// Sample kind
        kind: &'static str,
        /// Sample time
        time: SimTime,
        /// Description of the problem
        reason: String,
    },
}

/// Errors raised when a terminator applies a command
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CommandError {
    /// Terminator is not registered
    #[error("Terminator not active")]
    NotActive,

    /// Command addressed to another node id
    #[error("Command for node {actual} delivered to node {expected}")]
    WrongTarget {
        /// Id of the receiving terminator
        expected: NodeId,
        /// Id in the command
        actual: NodeId,
    },

    /// Command fields are unusable
    #[error("Malformed command: {0}")]
    Malformed(String),

    /// Command kind not handled by this node type
    #[error("{command} command not supported by {node_type} node")]
    UnsupportedForNodeType {
        /// Receiving node type
        node_type: NodeType,
        /// Command kind
        command: &'static str,
    },

    /// No device at the terminator's device index
    #[error("No device at index {index} ({count} devices on element)")]
    MissingDevice {
        /// Configured device index
        index: u32,
        /// Devices on the element
        count: u32,
    },

    /// The device has no controller of the required kind
    #[error("No {controller} controller on device {index}")]
    MissingController {
        /// Controller kind
        controller: &'static str,
        /// Device index
        index: u32,
    },
}
