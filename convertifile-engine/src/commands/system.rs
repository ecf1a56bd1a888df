use crate::types::{EngineInfo, ServerStatusInfo};
use crate::{AppState, Error, Result};
use convertifile::ClientConfig;
use std::path::PathBuf;

/// Validate and canonicalize a filesystem path.
/// Rejects empty paths, URL schemes, and paths that don't exist on disk.
pub(crate) fn validate_path(path: &str) -> Result<PathBuf> {
    if path.is_empty() {
        return Err(Error::InvalidInput("Path cannot be empty".into()));
    }
    if path.contains("://") {
        return Err(Error::InvalidInput("URL schemes are not allowed in file paths".into()));
    }
    let p = PathBuf::from(path);
    let canonical = p.canonicalize().map_err(|_| {
        Error::InvalidInput(format!("Path does not exist or is inaccessible: {}", path))
    })?;
    Ok(canonical)
}

pub fn get_engine_version() -> EngineInfo {
    EngineInfo {
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        description: env!("CARGO_PKG_DESCRIPTION").to_string(),
    }
}

pub async fn get_config(state: &AppState) -> Result<ClientConfig> {
    state.get_config().await
}

/// Ask the backend now instead of waiting for the next monitor tick
pub async fn server_status(state: &AppState) -> Result<ServerStatusInfo> {
    let client = state.get_client().await?;
    let status = client.health().await;
    state.set_server_status(status).await;
    Ok(status.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_path() {
        assert!(validate_path("").is_err());
        assert!(validate_path("https://example.com/file").is_err());
        assert!(validate_path("/definitely/not/here/photo.heic").is_err());

        let dir = tempfile::tempdir().unwrap();
        let path = validate_path(dir.path().to_str().unwrap()).unwrap();
        assert!(path.is_absolute());
    }

    #[test]
    fn test_engine_version() {
        let info = get_engine_version();
        assert_eq!(info.name, "convertifile-engine");
        assert!(!info.version.is_empty());
    }
}
