//! Listener implementation for the daemon socket.

use std::fs;
use std::io;
use std::os::unix::fs::FileTypeExt;
use std::os::unix::net::{UnixListener, UnixStream};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::thread;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::{debug, info, warn};

use super::{ConnectionHandler, LISTENER_TARGET, ListenerError};

const ACCEPT_BACKOFF: Duration = Duration::from_millis(25);
const ERROR_BACKOFF: Duration = Duration::from_millis(150);
const QUEUE_FULL_BACKOFF: Duration = Duration::from_millis(10);

/// Listener bound to the daemon's Unix socket.
#[derive(Debug)]
pub(crate) struct SocketListener {
    path: Utf8PathBuf,
    listener: UnixListener,
}

impl SocketListener {
    /// Binds `path`, replacing a stale socket left behind by a dead daemon.
    pub(crate) fn bind(path: &Utf8Path) -> Result<Self, ListenerError> {
        let listener = bind_unix(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            listener,
        })
    }

    /// Starts the acceptor and dispatcher threads.
    ///
    /// `queue_capacity` bounds the number of accepted connections waiting for
    /// the dispatcher.
    pub(crate) fn start(
        self,
        handler: Arc<dyn ConnectionHandler>,
        queue_capacity: usize,
    ) -> Result<ListenerHandle, ListenerError> {
        if let Err(source) = self.listener.set_nonblocking(true) {
            cleanup_socket(&self.path);
            return Err(ListenerError::NonBlocking { source });
        }

        let (sender, receiver) = mpsc::sync_channel(queue_capacity.max(1));
        let dispatcher = thread::Builder::new()
            .name(String::from("dokku-dispatcher"))
            .spawn(move || run_dispatch_loop(&receiver, &handler))
            .map_err(|source| {
                cleanup_socket(&self.path);
                ListenerError::Spawn {
                    role: "dispatcher",
                    source,
                }
            })?;

        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_flag = Arc::clone(&shutdown);
        let path = self.path.clone();
        // On failure the sender is dropped with the closure, which stops the
        // dispatcher.
        let acceptor = thread::Builder::new()
            .name(String::from("dokku-acceptor"))
            .spawn(move || run_accept_loop(&self, &shutdown_flag, &sender))
            .map_err(|source| {
                cleanup_socket(&path);
                ListenerError::Spawn {
                    role: "acceptor",
                    source,
                }
            })?;

        Ok(ListenerHandle {
            shutdown,
            acceptor: Some(acceptor),
            dispatcher: Some(dispatcher),
        })
    }
}

/// Handle to the background listener threads.
pub(crate) struct ListenerHandle {
    shutdown: Arc<AtomicBool>,
    acceptor: Option<thread::JoinHandle<()>>,
    dispatcher: Option<thread::JoinHandle<()>>,
}

impl ListenerHandle {
    /// Asks the acceptor to stop; the dispatcher follows once the queue drains.
    pub(crate) fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Waits for both threads. Connection threads are not joined.
    pub(crate) fn join(mut self) -> Result<(), ListenerError> {
        let acceptor = self.acceptor.take().map(thread::JoinHandle::join);
        let dispatcher = self.dispatcher.take().map(thread::JoinHandle::join);
        match (acceptor, dispatcher) {
            (Some(Err(_)), _) | (_, Some(Err(_))) => Err(ListenerError::ThreadPanic),
            _ => Ok(()),
        }
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }
}

fn run_accept_loop(
    listener: &SocketListener,
    shutdown: &AtomicBool,
    queue: &SyncSender<UnixStream>,
) {
    info!(
        target: LISTENER_TARGET,
        socket = %listener.path,
        "socket listener active"
    );
    let mut last_error = None::<io::ErrorKind>;
    while !shutdown.load(Ordering::SeqCst) {
        match accept_connection(&listener.listener) {
            Ok(Some(stream)) => {
                last_error = None;
                if !enqueue(queue, stream, shutdown) {
                    break;
                }
            }
            Ok(None) => thread::sleep(ACCEPT_BACKOFF),
            Err(error) => {
                let kind = error.kind();
                if last_error != Some(kind) {
                    warn!(
                        target: LISTENER_TARGET,
                        error = %error,
                        "socket accept error"
                    );
                }
                last_error = Some(kind);
                thread::sleep(ERROR_BACKOFF);
            }
        }
    }

    cleanup_socket(&listener.path);
    info!(
        target: LISTENER_TARGET,
        socket = %listener.path,
        "socket listener stopped"
    );
}

/// Pushes `stream` onto the queue, waiting while it is full.
///
/// Returns `false` when the dispatcher is gone and accepting should stop.
fn enqueue(queue: &SyncSender<UnixStream>, stream: UnixStream, shutdown: &AtomicBool) -> bool {
    let mut pending = stream;
    let mut reported_full = false;
    loop {
        match queue.try_send(pending) {
            Ok(()) => return true,
            Err(TrySendError::Full(stream)) => {
                if !reported_full {
                    debug!(
                        target: LISTENER_TARGET,
                        "connection queue full, applying backpressure"
                    );
                    reported_full = true;
                }
                // Dropping the stream during shutdown closes the connection.
                if shutdown.load(Ordering::SeqCst) {
                    return false;
                }
                pending = stream;
                thread::sleep(QUEUE_FULL_BACKOFF);
            }
            Err(TrySendError::Disconnected(_)) => {
                warn!(
                    target: LISTENER_TARGET,
                    "connection dispatcher stopped unexpectedly"
                );
                return false;
            }
        }
    }
}

fn run_dispatch_loop(queue: &Receiver<UnixStream>, handler: &Arc<dyn ConnectionHandler>) {
    for stream in queue {
        let handler = Arc::clone(handler);
        let spawned = thread::Builder::new()
            .name(String::from("dokku-connection"))
            .spawn(move || handler.handle(stream));
        if let Err(error) = spawned {
            warn!(
                target: LISTENER_TARGET,
                error = %error,
                "failed to spawn connection thread"
            );
        }
    }
    debug!(target: LISTENER_TARGET, "connection dispatcher stopped");
}

fn accept_connection(listener: &UnixListener) -> io::Result<Option<UnixStream>> {
    match listener.accept() {
        Ok((stream, _)) => {
            stream.set_nonblocking(false)?;
            Ok(Some(stream))
        }
        Err(error) if error.kind() == io::ErrorKind::WouldBlock => Ok(None),
        Err(error) => Err(error),
    }
}

fn bind_unix(path: &Utf8Path) -> Result<UnixListener, ListenerError> {
    match fs::symlink_metadata(path) {
        Ok(metadata) => {
            if !metadata.file_type().is_socket() {
                return Err(ListenerError::NotSocket {
                    path: path.to_string(),
                });
            }
            remove_stale_socket(path)?;
        }
        Err(error) if error.kind() == io::ErrorKind::NotFound => {}
        Err(source) => {
            return Err(ListenerError::Metadata {
                path: path.to_string(),
                source,
            });
        }
    }

    UnixListener::bind(path).map_err(|source| ListenerError::Bind {
        path: path.to_string(),
        source,
    })
}

fn remove_stale_socket(path: &Utf8Path) -> Result<(), ListenerError> {
    match UnixStream::connect(path) {
        Ok(_stream) => Err(ListenerError::InUse {
            path: path.to_string(),
        }),
        Err(error)
            if error.kind() == io::ErrorKind::ConnectionRefused
                || error.kind() == io::ErrorKind::NotFound =>
        {
            debug!(
                target: LISTENER_TARGET,
                socket = %path,
                "removing stale socket"
            );
            fs::remove_file(path).map_err(|source| ListenerError::Cleanup {
                path: path.to_string(),
                source,
            })
        }
        Err(source) => Err(ListenerError::Connect {
            path: path.to_string(),
            source,
        }),
    }
}

fn cleanup_socket(path: &Utf8Path) {
    if let Err(error) = fs::remove_file(path)
        && error.kind() != io::ErrorKind::NotFound
    {
        warn!(
            target: LISTENER_TARGET,
            error = %error,
            socket = %path,
            "failed to remove unix socket file"
        );
    }
}
