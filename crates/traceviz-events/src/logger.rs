use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, instrument, warn};
use traceviz_protocol::{SessionId, TraceError, TraceEvent, TraceResult};

enum LogCommand {
    Append(String),
    Close(oneshot::Sender<()>),
}

/// Append-only JSONL log of one session.
///
/// Lines are handed to a background writer task, so [`SessionLogger::write`]
/// never waits on the disk. Output is buffered and only flushed on
/// [`SessionLogger::close`] (or when the logger is dropped). Write failures
/// are logged and swallowed.
#[derive(Debug)]
pub struct SessionLogger {
    path: PathBuf,
    sender: mpsc::UnboundedSender<LogCommand>,
}

impl SessionLogger {
    /// `<dir>/<session_id>.jsonl`
    pub fn file_path(dir: impl AsRef<Path>, session_id: &SessionId) -> PathBuf {
        dir.as_ref().join(format!("{}.jsonl", session_id.as_str()))
    }

    /// Open (or create) the session log and start its writer task.
    ///
    /// Must be called from within a tokio runtime.
    #[instrument(skip(dir, session_id), fields(session_id = %session_id))]
    pub async fn open(dir: impl AsRef<Path>, session_id: &SessionId) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .await
            .with_context(|| format!("failed to create session log dir {dir:?}"))?;

        let path = Self::file_path(dir, session_id);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .with_context(|| format!("failed opening session log {path:?}"))?;

        let (sender, receiver) = mpsc::unbounded_channel();
        tokio::spawn(run_writer(path.clone(), BufWriter::new(file), receiver));
        info!(path = %path.display(), "session log opened");

        Ok(Self { path, sender })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Queue one event for persistence. Never fails the caller.
    pub fn write(&self, event: &TraceEvent) {
        let line = match serde_json::to_string(event) {
            Ok(line) => line,
            Err(error) => {
                warn!(%error, event_id = %event.id, "failed serializing event for session log");
                return;
            }
        };
        if self.sender.send(LogCommand::Append(line)).is_err() {
            debug!(event_id = %event.id, "session log closed, event not persisted");
        }
    }

    /// Flush buffered lines and release the file. Later writes are dropped.
    pub async fn close(&self) -> TraceResult<()> {
        let (ack, done) = oneshot::channel();
        self.sender
            .send(LogCommand::Close(ack))
            .map_err(|_| TraceError::LoggerClosed)?;
        done.await.map_err(|_| TraceError::LoggerClosed)
    }
}

async fn run_writer(
    path: PathBuf,
    mut writer: BufWriter<File>,
    mut receiver: mpsc::UnboundedReceiver<LogCommand>,
) {
    while let Some(command) = receiver.recv().await {
        match command {
            LogCommand::Append(line) => {
                if let Err(error) = append_line(&mut writer, &line).await {
                    warn!(%error, path = %path.display(), "failed appending to session log");
                }
            }
            LogCommand::Close(ack) => {
                flush(&mut writer, &path).await;
                let _ = ack.send(());
                debug!(path = %path.display(), "session log closed");
                return;
            }
        }
    }
    // Every logger handle dropped without an explicit close.
    flush(&mut writer, &path).await;
}

async fn append_line(writer: &mut BufWriter<File>, line: &str) -> std::io::Result<()> {
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\n").await
}

async fn flush(writer: &mut BufWriter<File>, path: &Path) {
    if let Err(error) = writer.flush().await {
        warn!(%error, path = %path.display(), "failed flushing session log");
    }
}

/// Decode a session log, skipping blank and malformed lines.
pub fn parse_session_log(content: &str) -> Vec<TraceEvent> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .filter_map(|(index, line)| match serde_json::from_str(line) {
            Ok(event) => Some(event),
            Err(error) => {
                debug!(line = index + 1, %error, "skipping malformed session log line");
                None
            }
        })
        .collect()
}

pub async fn read_session_log(path: impl AsRef<Path>) -> Result<Vec<TraceEvent>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("failed reading session log {path:?}"))?;
    let events = parse_session_log(&content);
    debug!(count = events.len(), path = %path.display(), "session log loaded");
    Ok(events)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    use anyhow::Result;
    use tokio::fs;
    use traceviz_protocol::{AgentId, EventKind, NotificationLevel, SessionId, TraceEvent};

    use super::*;

    fn unique_test_root(name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        std::env::temp_dir().join(format!("{name}-{nanos}"))
    }

    fn notification(session_id: &SessionId, message: &str) -> TraceEvent {
        TraceEvent::new(
            session_id.clone(),
            AgentId::root(),
            EventKind::Notification {
                message: message.into(),
                level: NotificationLevel::Info,
            },
        )
    }

    #[tokio::test]
    async fn writes_one_line_per_event_in_order() -> Result<()> {
        let root = unique_test_root("traceviz-logger");
        let session_id = SessionId::new_uuid();
        let logger = SessionLogger::open(&root, &session_id).await?;

        let first = notification(&session_id, "one");
        let second = notification(&session_id, "two");
        logger.write(&first);
        logger.write(&second);
        logger.close().await?;

        assert_eq!(logger.path().to_path_buf(), SessionLogger::file_path(&root, &session_id));
        let content = fs::read_to_string(logger.path()).await?;
        assert_eq!(content.lines().count(), 2);
        assert_eq!(read_session_log(logger.path()).await?, vec![first, second]);

        let _ = fs::remove_dir_all(root).await;
        Ok(())
    }

    #[tokio::test]
    async fn writes_after_close_are_dropped() -> Result<()> {
        let root = unique_test_root("traceviz-logger-closed");
        let session_id = SessionId::new_uuid();
        let logger = SessionLogger::open(&root, &session_id).await?;

        logger.write(&notification(&session_id, "kept"));
        logger.close().await?;
        logger.write(&notification(&session_id, "dropped"));
        assert!(logger.close().await.is_err());

        let events = read_session_log(logger.path()).await?;
        assert_eq!(events.len(), 1);

        let _ = fs::remove_dir_all(root).await;
        Ok(())
    }

    #[tokio::test]
    async fn reopening_appends_to_existing_log() -> Result<()> {
        let root = unique_test_root("traceviz-logger-reopen");
        let session_id = SessionId::new_uuid();

        let logger = SessionLogger::open(&root, &session_id).await?;
        logger.write(&notification(&session_id, "before restart"));
        logger.close().await?;

        let logger = SessionLogger::open(&root, &session_id).await?;
        logger.write(&notification(&session_id, "after restart"));
        logger.close().await?;

        assert_eq!(read_session_log(logger.path()).await?.len(), 2);

        let _ = fs::remove_dir_all(root).await;
        Ok(())
    }

    #[test]
    fn parse_skips_blank_and_malformed_lines() {
        let session_id = SessionId::from_string("S1");
        let good = serde_json::to_string(&notification(&session_id, "ok")).unwrap();
        let content = format!("{good}\n\nnot-json\n{{\"type\":\"teleport\"}}\n{good}\n");
        let events = parse_session_log(&content);
        assert_eq!(events.len(), 2);
    }
}
