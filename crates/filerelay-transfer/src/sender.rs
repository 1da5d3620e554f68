//! Sender transfer session: offers, streams and completes a batch of files.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use filerelay_core::config::TransferConfig;
use filerelay_core::result::AppResult;
use filerelay_core::traits::TransferLog;
use filerelay_core::types::{
    BatchId, OfferMeta, PublicProfile, SenderSummary, TransferRecord, TransferStatus, UserId,
};
use filerelay_realtime::InboundMessage;

use crate::chunker::chunks;
use crate::error::TransferError;
use crate::link::RelayLink;
use crate::progress::ProgressCounter;

/// One file queued for sending.
#[derive(Debug, Clone)]
pub struct OutgoingFile {
    /// File name announced to the receiver.
    pub name: String,
    /// Declared MIME type.
    pub mime_type: String,
    /// Payload.
    pub data: Bytes,
}

impl OutgoingFile {
    /// Create a queued file.
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    /// Payload size in bytes.
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// Where the sender is within its batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SenderState {
    /// No batch in progress.
    Idle,
    /// Announcing file `index`.
    Offering(usize),
    /// Emitting the chunks of file `index`.
    Streaming(usize),
    /// Emitting the completion marker of file `index`.
    Completing(usize),
}

/// Progress notification emitted after every chunk and every finished file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressUpdate {
    /// Batch the update belongs to.
    pub batch_id: BatchId,
    /// Index of the file in the batch.
    pub file_index: usize,
    /// Name of the file.
    pub file_name: String,
    /// Aggregate batch progress in `[0, 100]`.
    pub percent: u8,
}

/// Summary of a finished batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    /// Batch identifier.
    pub batch_id: BatchId,
    /// Files that were offered, streamed and completed.
    pub sent: Vec<String>,
    /// Zero-byte files that were skipped.
    pub skipped: Vec<String>,
    /// Final progress (always 100 for a finished batch).
    pub percent: u8,
}

/// Drives one batch at a time over a [`RelayLink`].
#[derive(Debug)]
pub struct SenderSession {
    link: Arc<dyn RelayLink>,
    profile: PublicProfile,
    log: Arc<dyn TransferLog>,
    config: TransferConfig,
    state: SenderState,
    progress_tx: Option<mpsc::UnboundedSender<ProgressUpdate>>,
}

impl SenderSession {
    /// Create a session sending as `profile`.
    pub fn new(
        link: Arc<dyn RelayLink>,
        profile: PublicProfile,
        log: Arc<dyn TransferLog>,
        config: TransferConfig,
    ) -> Self {
        Self {
            link,
            profile,
            log,
            config,
            state: SenderState::Idle,
            progress_tx: None,
        }
    }

    /// Receive a [`ProgressUpdate`] after every chunk.
    pub fn with_progress(mut self, tx: mpsc::UnboundedSender<ProgressUpdate>) -> Self {
        self.progress_tx = Some(tx);
        self
    }

    /// Current state.
    pub fn state(&self) -> SenderState {
        self.state
    }

    /// Offer, stream and complete every file in order.
    ///
    /// Transfer-log failures are logged and never fail the batch. A link
    /// failure stops the batch; the session returns to idle either way.
    pub async fn send_batch(&mut self, to: &UserId, files: Vec<OutgoingFile>) -> AppResult<BatchReport> {
        let batch_id = BatchId::new();
        let result = self.run_batch(batch_id, to, files).await;
        self.state = SenderState::Idle;
        result
    }

    async fn run_batch(
        &mut self,
        batch_id: BatchId,
        to: &UserId,
        files: Vec<OutgoingFile>,
    ) -> AppResult<BatchReport> {
        if self.config.verify_recipient && !self.link.recipient_online(to).await? {
            return Err(TransferError::NoRecipient(to.clone()).into());
        }

        info!(batch_id = %batch_id, to = %to, files = files.len(), "Sending batch");

        let mut progress = ProgressCounter::new(files.len());
        let mut report = BatchReport {
            batch_id,
            sent: Vec::new(),
            skipped: Vec::new(),
            percent: 0,
        };

        for (index, file) in files.into_iter().enumerate() {
            if file.data.is_empty() {
                warn!(batch_id = %batch_id, file = %file.name, "Skipping empty file");
                let percent = progress.file_done();
                self.notify(batch_id, index, &file.name, percent);
                report.skipped.push(file.name);
                continue;
            }

            if let Err(e) = self.send_file(batch_id, index, to, &file, &mut progress).await {
                self.record(to, &file, TransferStatus::Failed).await;
                return Err(e);
            }

            let percent = progress.file_done();
            self.notify(batch_id, index, &file.name, percent);
            self.record(to, &file, TransferStatus::Completed).await;
            report.sent.push(file.name);
        }

        report.percent = progress.percent();
        info!(
            batch_id = %batch_id,
            to = %to,
            sent = report.sent.len(),
            skipped = report.skipped.len(),
            "Batch sent"
        );
        Ok(report)
    }

    async fn send_file(
        &mut self,
        batch_id: BatchId,
        index: usize,
        to: &UserId,
        file: &OutgoingFile,
        progress: &mut ProgressCounter,
    ) -> AppResult<()> {
        let size = file.size();

        self.state = SenderState::Offering(index);
        self.link
            .emit(InboundMessage::Offer {
                to: to.clone(),
                meta: OfferMeta {
                    name: file.name.clone(),
                    size,
                    mime_type: file.mime_type.clone(),
                    sender: Some(SenderSummary {
                        id: self.profile.id.clone(),
                        name: self.profile.name.clone(),
                        user_id: self.profile.user_id.clone(),
                    }),
                },
            })
            .await?;

        self.state = SenderState::Streaming(index);
        let pacing = self.config.pacing_delay();
        let mut sent = 0u64;
        for (n, chunk) in chunks(&file.data, self.config.chunk_size_bytes).enumerate() {
            if n > 0 && !pacing.is_zero() {
                tokio::time::sleep(pacing).await;
            }
            sent += chunk.len() as u64;
            self.link
                .emit(InboundMessage::Chunk {
                    to: to.clone(),
                    chunk,
                })
                .await?;
            let percent = progress.chunk_sent(sent, size);
            self.notify(batch_id, index, &file.name, percent);
        }
        debug!(batch_id = %batch_id, file = %file.name, bytes = sent, "File streamed");

        self.state = SenderState::Completing(index);
        self.link
            .emit(InboundMessage::Complete { to: to.clone() })
            .await?;

        Ok(())
    }

    fn notify(&self, batch_id: BatchId, file_index: usize, file_name: &str, percent: u8) {
        if let Some(tx) = &self.progress_tx {
            let _ = tx.send(ProgressUpdate {
                batch_id,
                file_index,
                file_name: file_name.to_string(),
                percent,
            });
        }
    }

    async fn record(&self, to: &UserId, file: &OutgoingFile, status: TransferStatus) {
        let record = TransferRecord::now(
            self.profile.id.clone(),
            to.clone(),
            file.name.clone(),
            file.size(),
            file.mime_type.clone(),
            status,
        );

        match tokio::time::timeout(self.config.log_timeout(), self.log.record(record)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(file = %file.name, error = %e, "Transfer log failed"),
            Err(_) => warn!(file = %file.name, "Transfer log timed out"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use filerelay_core::error::{AppError, ErrorKind};

    use super::*;

    #[derive(Debug, Default)]
    struct RecordingLink {
        online: bool,
        emitted: Mutex<Vec<InboundMessage>>,
    }

    impl RecordingLink {
        fn kinds(&self) -> Vec<&'static str> {
            self.emitted
                .lock()
                .unwrap()
                .iter()
                .map(|m| m.kind())
                .collect()
        }
    }

    #[async_trait]
    impl RelayLink for RecordingLink {
        async fn emit(&self, msg: InboundMessage) -> AppResult<()> {
            self.emitted.lock().unwrap().push(msg);
            Ok(())
        }

        async fn recipient_online(&self, _user_id: &UserId) -> AppResult<bool> {
            Ok(self.online)
        }
    }

    #[derive(Debug, Default)]
    struct FailingLog {
        calls: Mutex<Vec<TransferRecord>>,
    }

    #[async_trait]
    impl TransferLog for FailingLog {
        async fn record(&self, record: TransferRecord) -> AppResult<()> {
            self.calls.lock().unwrap().push(record);
            Err(AppError::external("history service down"))
        }
    }

    fn session(link: Arc<RecordingLink>, log: Arc<FailingLog>, config: TransferConfig) -> SenderSession {
        let alice = UserId::new("alice");
        SenderSession::new(link, PublicProfile::anonymous(&alice), log, config)
    }

    fn config(chunk: usize) -> TransferConfig {
        TransferConfig {
            chunk_size_bytes: chunk,
            pacing_delay_ms: 0,
            ..TransferConfig::default()
        }
    }

    #[tokio::test]
    async fn test_two_files_emit_three_chunks_two_completes_in_order() {
        let link = Arc::new(RecordingLink::default());
        let log = Arc::new(FailingLog::default());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut sender = session(link.clone(), log.clone(), config(512_000)).with_progress(tx);

        let files = vec![
            OutgoingFile::new("big.bin", "application/octet-stream", vec![1u8; 1_000_000]),
            OutgoingFile::new("small.txt", "text/plain", vec![2u8; 10]),
        ];
        let report = sender
            .send_batch(&UserId::new("bob"), files)
            .await
            .expect("batch");

        assert_eq!(link.kinds(), vec![
            "offer", "chunk", "chunk", "complete", "offer", "chunk", "complete"
        ]);
        assert_eq!(report.sent, vec!["big.bin", "small.txt"]);
        assert_eq!(report.percent, 100);
        assert_eq!(sender.state(), SenderState::Idle);

        let mut percents = Vec::new();
        while let Ok(update) = rx.try_recv() {
            percents.push(update.percent);
        }
        assert!(percents.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(percents.last(), Some(&100));

        // Log failures never fail the batch.
        assert_eq!(log.calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_offer_carries_sender_summary() {
        let link = Arc::new(RecordingLink::default());
        let mut sender = session(link.clone(), Arc::new(FailingLog::default()), config(4));

        sender
            .send_batch(&UserId::new("bob"), vec![OutgoingFile::new("a", "text/plain", "abc")])
            .await
            .expect("batch");

        match &link.emitted.lock().unwrap()[0] {
            InboundMessage::Offer { to, meta } => {
                assert_eq!(to, &UserId::new("bob"));
                assert_eq!(meta.size, 3);
                let summary = meta.sender.as_ref().expect("sender summary");
                assert_eq!(summary.id, UserId::new("alice"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_zero_byte_file_is_skipped() {
        let link = Arc::new(RecordingLink::default());
        let mut sender = session(link.clone(), Arc::new(FailingLog::default()), config(4));

        let report = sender
            .send_batch(&UserId::new("bob"), vec![
                OutgoingFile::new("empty", "text/plain", Bytes::new()),
                OutgoingFile::new("a", "text/plain", "abc"),
            ])
            .await
            .expect("batch");

        assert_eq!(report.skipped, vec!["empty"]);
        assert_eq!(link.kinds(), vec!["offer", "chunk", "complete"]);
        assert_eq!(report.percent, 100);
    }

    #[tokio::test]
    async fn test_verify_recipient_fails_before_any_event() {
        let link = Arc::new(RecordingLink::default());
        let cfg = TransferConfig {
            verify_recipient: true,
            ..config(4)
        };
        let mut sender = session(link.clone(), Arc::new(FailingLog::default()), cfg);

        let err = sender
            .send_batch(&UserId::new("ghost"), vec![OutgoingFile::new("a", "text/plain", "abc")])
            .await
            .unwrap_err();

        assert_eq!(err.kind, ErrorKind::NotFound);
        assert!(link.kinds().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_pacing_delay_between_chunks() {
        let link = Arc::new(RecordingLink::default());
        let cfg = TransferConfig {
            pacing_delay_ms: 5,
            ..config(1)
        };
        let mut sender = session(link.clone(), Arc::new(FailingLog::default()), cfg);

        let started = tokio::time::Instant::now();
        sender
            .send_batch(&UserId::new("bob"), vec![OutgoingFile::new("a", "text/plain", "abcd")])
            .await
            .expect("batch");

        // Four chunks, three gaps.
        let elapsed = started.elapsed();
        assert!(elapsed >= std::time::Duration::from_millis(15), "{elapsed:?}");
        assert!(elapsed < std::time::Duration::from_millis(20), "{elapsed:?}");
    }
}
