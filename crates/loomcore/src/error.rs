use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("node error: {0}")]
    Node(#[from] NodeError),

    #[error("workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    #[error("execution error: {0}")]
    Execution(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Error, Debug, Clone)]
pub enum NodeError {
    #[error("missing required input: {0}")]
    MissingInput(String),

    #[error("invalid input type for '{field}': expected {expected}, got {actual}")]
    InvalidInputType {
        field: String,
        expected: String,
        actual: String,
    },

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    #[error("timed out after {ms}ms")]
    Timeout { ms: u64 },

    #[error("cancelled")]
    Cancelled,
}

#[derive(Error, Debug, Clone)]
pub enum WorkflowError {
    #[error("workflow not found: {0}")]
    NotFound(String),

    #[error("invalid workflow: {0}")]
    Invalid(String),

    #[error("cyclic dependency detected at node {0}")]
    CyclicDependency(String),

    #[error("node not found: {0}")]
    NodeNotFound(String),

    #[error("unknown node type: {0}")]
    UnknownNodeType(String),

    #[error("node type already registered: {0}")]
    DuplicateNodeType(String),

    #[error("invalid connection: {0}")]
    InvalidConnection(String),
}
