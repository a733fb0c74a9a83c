use std::fs::DirBuilder;

use camino::Utf8Path;
use camino::Utf8PathBuf;
use thiserror::Error;

/// Permissions applied to a freshly created socket directory.
///
/// The directory stays traversable for the service group; access control is
/// enforced by the socket file itself.
pub const SOCKET_DIRECTORY_MODE: u32 = 0o755;

/// Ensures the parent directory of a Unix socket path exists.
///
/// An existing directory is left untouched, including its permissions and
/// ownership, so operators can provision it ahead of time for a dedicated
/// service user.
pub fn prepare_socket_directory(path: &Utf8Path) -> Result<(), SocketPreparationError> {
    let Some(parent) = path.parent().filter(|parent| !parent.as_str().is_empty()) else {
        return Err(SocketPreparationError::MissingParent {
            path: path.to_path_buf(),
        });
    };

    let mut builder = DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(SOCKET_DIRECTORY_MODE);
    }

    match builder.create(parent.as_std_path()) {
        Ok(()) => Ok(()),
        Err(source)
            if source.kind() == std::io::ErrorKind::AlreadyExists && parent.is_dir() =>
        {
            Ok(())
        }
        Err(source) => Err(SocketPreparationError::CreateDirectory {
            path: parent.to_path_buf(),
            source,
        }),
    }
}

/// Errors raised when preparing socket directories.
#[derive(Debug, Error)]
pub enum SocketPreparationError {
    /// Socket path has no parent directory component.
    #[error("socket path '{path}' has no parent directory")]
    MissingParent { path: Utf8PathBuf },
    /// Failed to create the socket directory.
    #[error("failed to create socket directory '{path}': {source}")]
    CreateDirectory {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
}
