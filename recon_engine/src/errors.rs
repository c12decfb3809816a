use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not read the config file. {0}")]
    ReadError(String),
    #[error("Could not parse the config file. {0}")]
    ParseError(String),
    #[error("Duplicate client name in config: {0}")]
    DuplicateClient(String),
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Could not create the report directory. {0}")]
    CreateDir(String),
    #[error("Could not write a report file. {0}")]
    WriteFile(String),
    #[error("Could not serialize report data. {0}")]
    Serialize(String),
    #[error("A report worker failed. {0}")]
    WorkerFailure(String),
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("A reconciliation run is already in progress")]
    AlreadyRunning,
    #[error("Invalid configuration. {0}")]
    Config(#[from] ConfigError),
    #[error("Report generation failed. {0}")]
    Report(#[from] ReportError),
}
