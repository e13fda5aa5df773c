#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("Resource not found: {resource}")]
    NotFound { resource: String },
    #[error("Unauthorized ({status}) for {resource}")]
    Unauthorized { resource: String, status: u16 },
    #[error("Malformed response from {resource}")]
    MalformedResponse { resource: String, details: String },
    #[error("Fetch failed for {resource}")]
    Fetch {
        resource: String,
        status: Option<u16>,
        details: String,
    },
    #[error("Invalid configuration: {key}")]
    Config { key: String, details: String },
    #[error("Configuration file error")]
    ConfigFile { path: String, details: String },
}

impl Error {
    pub fn malformed(resource: impl Into<String>, details: impl Into<String>) -> Self {
        Error::MalformedResponse {
            resource: resource.into(),
            details: details.into(),
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::NotFound { .. } | Error::Unauthorized { .. })
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Error::NotFound { .. } => Some(404),
            Error::Unauthorized { status, .. } => Some(*status),
            Error::Fetch { status, .. } => *status,
            _ => None,
        }
    }

    pub fn user_summary(&self) -> String {
        match self {
            Error::NotFound { resource } => format!("Not found: {resource}."),
            Error::Unauthorized { .. } => {
                "Session rejected. Check SESSION_ID and restart.".to_string()
            }
            Error::MalformedResponse { resource, .. } => {
                format!("Unexpected data from {resource}.")
            }
            Error::Fetch { resource, .. } => format!("Could not reach {resource}."),
            Error::Config { key, .. } => format!("Configuration value {key} is invalid."),
            Error::ConfigFile { path, .. } => format!("Failed to load {path}."),
        }
    }

    pub fn technical_detail(&self) -> String {
        match self {
            Error::NotFound { resource } => format!("HTTP 404 for {resource}."),
            Error::Unauthorized { resource, status } => {
                format!("HTTP {status} for {resource}.")
            }
            Error::MalformedResponse { resource, details } => {
                format!("Malformed response from {resource}: {details}")
            }
            Error::Fetch {
                resource,
                status,
                details,
            } => {
                let status = status
                    .map(|code| format!(" status={code}."))
                    .unwrap_or_default();
                format!("Fetch failed for {resource}.{status} {details}")
            }
            Error::Config { key, details } => format!("Config {key}: {details}"),
            Error::ConfigFile { path, details } => {
                format!("Config file path={path}. {details}")
            }
        }
    }
}
