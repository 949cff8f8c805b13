//! Local control socket for pushing commands to a running engine.
//!
//! One JSON object per line in each direction. The control surface writes a
//! request and reads the acknowledgement carrying the applied value.

use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use modepin_protocol::ControlAck;
use modepin_protocol::ControlRequest;
use tokio::io::AsyncBufReadExt;
use tokio::io::AsyncWriteExt;
use tokio::io::BufReader;
use tokio::net::UnixListener;
use tokio::net::UnixStream;
use tokio::task::JoinHandle;
use tracing::debug;
use tracing::info;

use crate::gate::EnableSource;
use crate::gate::EnablementGate;

pub const SOCKET_FILE: &str = "modepin.sock";

pub fn socket_path(home: &Path) -> PathBuf {
    home.join(SOCKET_FILE)
}

/// Bind the control socket under `home` and serve commands against the gate.
pub fn serve(home: &Path, gate: Arc<EnablementGate>) -> io::Result<JoinHandle<()>> {
    std::fs::create_dir_all(home)?;
    let path = socket_path(home);
    // A previous engine may have left a stale socket behind.
    let _ = std::fs::remove_file(&path);
    let listener = UnixListener::bind(&path)?;
    info!(path = %path.display(), "control socket listening");

    Ok(tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((stream, _addr)) => {
                    let gate = gate.clone();
                    tokio::spawn(async move {
                        if let Err(error) = handle_connection(stream, gate).await {
                            debug!(%error, "control connection failed");
                        }
                    });
                }
                Err(error) => debug!(%error, "control accept failed"),
            }
        }
    }))
}

async fn handle_connection(stream: UnixStream, gate: Arc<EnablementGate>) -> io::Result<()> {
    let (read_half, mut write_half) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();

    while let Some(line) = lines.next_line().await? {
        let request: ControlRequest = match serde_json::from_str(&line) {
            Ok(request) => request,
            Err(error) => {
                debug!(%error, "ignoring malformed control request");
                continue;
            }
        };

        let ControlRequest::SetEnabled { enabled } = request;
        let applied = gate.apply(enabled, EnableSource::Control).await;
        let mut payload = serde_json::to_vec(&ControlAck {
            ok: true,
            enabled: applied,
        })?;
        payload.push(b'\n');
        write_half.write_all(&payload).await?;
    }

    Ok(())
}

/// Push a set-enabled command to a running engine and return its ack.
/// Callers treat any error as "no engine is listening" and move on.
pub async fn push_set_enabled(home: &Path, enabled: bool) -> io::Result<ControlAck> {
    let stream = UnixStream::connect(socket_path(home)).await?;
    let (read_half, mut write_half) = stream.into_split();

    let mut payload = serde_json::to_vec(&ControlRequest::SetEnabled { enabled })?;
    payload.push(b'\n');
    write_half.write_all(&payload).await?;

    let mut lines = BufReader::new(read_half).lines();
    match lines.next_line().await? {
        Some(line) => Ok(serde_json::from_str(&line)?),
        None => Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "engine closed control connection",
        )),
    }
}
