use crate::graph::NodeId;
use crate::parameter::ParameterType;
use crate::slot::SlotDirection;
use crate::types::DataTypeId;
use thiserror::Error;

/// The failure categories callers branch on, independent of which holder raised them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidName,
    DuplicateName,
    NotFound,
    TypeNotAllowed,
    IncompatibleTypes,
    SlotOccupied,
    CyclicParameterGraph,
    Other,
}

/// Errors raised while populating a `DataTypeRegistry`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Data type '{0}' is already registered")]
    AlreadyRegistered(DataTypeId),

    #[error("Data type '{0}' is not registered")]
    UnknownType(DataTypeId),
}

impl RegistryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RegistryError::AlreadyRegistered(_) => ErrorKind::DuplicateName,
            RegistryError::UnknownType(_) => ErrorKind::NotFound,
        }
    }
}

/// Errors raised by slot configuration commands.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SlotError {
    #[error("'{name}' is not a valid slot name (allowed: letters, digits and . _ , #)")]
    InvalidName { name: String },

    #[error("{direction} slot '{name}' already exists")]
    DuplicateName {
        name: String,
        direction: SlotDirection,
    },

    #[error("{direction} slot '{name}' does not exist")]
    NotFound {
        name: String,
        direction: SlotDirection,
    },

    #[error("Data type '{data_type}' is not allowed for {direction} slots of this node")]
    TypeNotAllowed {
        data_type: DataTypeId,
        direction: SlotDirection,
    },

    #[error("{direction} slots of this node cannot be edited")]
    Sealed { direction: SlotDirection },

    #[error("This node accepts at most {limit} {direction} slots")]
    LimitReached {
        direction: SlotDirection,
        limit: usize,
    },

    #[error("Slot index {index} is out of range for {len} {direction} slots")]
    IndexOutOfRange {
        direction: SlotDirection,
        index: usize,
        len: usize,
    },
}

impl SlotError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SlotError::InvalidName { .. } => ErrorKind::InvalidName,
            SlotError::DuplicateName { .. } => ErrorKind::DuplicateName,
            SlotError::NotFound { .. } => ErrorKind::NotFound,
            SlotError::TypeNotAllowed { .. } => ErrorKind::TypeNotAllowed,
            SlotError::Sealed { .. }
            | SlotError::LimitReached { .. }
            | SlotError::IndexOutOfRange { .. } => ErrorKind::Other,
        }
    }
}

/// Errors raised by graph connectivity and graph-level slot commands.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("Node {0} is not part of this graph")]
    NodeNotFound(NodeId),

    #[error("Node {node} has no {direction} slot '{slot}'")]
    SlotNotFound {
        node: NodeId,
        slot: String,
        direction: SlotDirection,
    },

    #[error("Data type '{0}' is not registered")]
    UnknownDataType(DataTypeId),

    #[error("Cannot connect '{source_type}' to a slot accepting '{target_type}'")]
    IncompatibleTypes {
        source_type: DataTypeId,
        target_type: DataTypeId,
    },

    #[error("Input slot '{slot}' of node {node} is already connected")]
    SlotOccupied { node: NodeId, slot: String },

    #[error("Connecting node {source_node} to node {target_node} would create a cycle")]
    WouldCreateCycle {
        source_node: NodeId,
        target_node: NodeId,
    },

    #[error(transparent)]
    Slot(#[from] SlotError),

    #[error(transparent)]
    Parameter(#[from] ParameterError),
}

impl GraphError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GraphError::NodeNotFound(_) | GraphError::SlotNotFound { .. } => ErrorKind::NotFound,
            GraphError::UnknownDataType(_) => ErrorKind::TypeNotAllowed,
            GraphError::IncompatibleTypes { .. } => ErrorKind::IncompatibleTypes,
            GraphError::SlotOccupied { .. } => ErrorKind::SlotOccupied,
            GraphError::WouldCreateCycle { .. } => ErrorKind::Other,
            GraphError::Slot(e) => e.kind(),
            GraphError::Parameter(e) => e.kind(),
        }
    }
}

/// Errors raised by parameter holders and parameter tree construction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParameterError {
    #[error("'{key}' is not a valid parameter key")]
    InvalidName { key: String },

    #[error("Parameter key '{key}' is already in use")]
    DuplicateName { key: String },

    #[error("Parameter '{key}' does not exist")]
    NotFound { key: String },

    #[error("Values of type {value_type} are not allowed in this collection")]
    TypeNotAllowed { value_type: ParameterType },

    #[error("Parameter '{key}' expects a {expected} value, but received {found}")]
    TypeMismatch {
        key: String,
        expected: ParameterType,
        found: ParameterType,
    },

    #[error("Parameter '{key}' is read-only")]
    ReadOnly { key: String },

    #[error("Parameter holder '{key}' contains itself")]
    CyclicParameterGraph { key: String },

    #[error("Parameter holder '{key}' does not accept user-defined entries")]
    NotDynamic { key: String },
}

impl ParameterError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ParameterError::InvalidName { .. } => ErrorKind::InvalidName,
            ParameterError::DuplicateName { .. } => ErrorKind::DuplicateName,
            ParameterError::NotFound { .. } => ErrorKind::NotFound,
            ParameterError::TypeNotAllowed { .. } => ErrorKind::TypeNotAllowed,
            ParameterError::TypeMismatch { .. } => ErrorKind::IncompatibleTypes,
            ParameterError::ReadOnly { .. } => ErrorKind::Other,
            ParameterError::CyclicParameterGraph { .. } => ErrorKind::CyclicParameterGraph,
            ParameterError::NotDynamic { .. } => ErrorKind::Other,
        }
    }
}

/// Errors that can occur when converting a custom user format into a `PipelineDefinition`
/// or building a graph from one.
#[derive(Error, Debug, Clone)]
pub enum DefinitionError {
    #[error("Failed to parse pipeline JSON: {0}")]
    JsonParseError(String),

    #[error("Invalid custom data: {0}")]
    ValidationError(String),

    #[error("Edge references unknown node '{0}'")]
    UnknownNode(String),

    #[error("Node '{node}': {source}")]
    Node { node: String, source: GraphError },

    #[error(transparent)]
    Registry(#[from] RegistryError),
}
