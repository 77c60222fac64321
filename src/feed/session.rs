//! Feed Session - primary stream ingest and gap recovery
//!
//! Drives the full client sequence: open the primary connection, request the
//! record stream, reassemble and decode frames until the server half-closes,
//! detect sequence gaps, then recover each missing record over short-lived
//! resend connections, strictly one at a time.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};

use super::assembler::FrameAssembler;
use super::store::RecordStore;
use super::wire::{Record, RequestFrame, WireError, RECORD_FRAME_SIZE, REQUEST_FRAME_SIZE};

/// Configuration for a feed client session
#[derive(Debug, Clone)]
pub struct FeedClientConfig {
    /// Feed service host
    pub host: String,
    /// Feed service port
    pub port: u16,
    /// Timeout for establishing any connection
    pub connect_timeout: Duration,
    /// Timeout for each read on the primary stream and for resend responses
    pub read_timeout: Duration,
    /// Retries per missing sequence number after the first attempt
    pub recovery_retries: u32,
    /// Initial backoff between resend attempts (doubles per retry)
    pub retry_backoff: Duration,
    /// Upper bound on the doubled resend backoff
    pub retry_backoff_cap: Duration,
}

impl Default for FeedClientConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 3000,
            connect_timeout: Duration::from_secs(5),
            read_timeout: Duration::from_secs(10),
            recovery_retries: 3,
            retry_backoff: Duration::from_millis(250),
            retry_backoff_cap: Duration::from_secs(5),
        }
    }
}

impl FeedClientConfig {
    fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Recovery orchestrator state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryState {
    /// Primary stream still in progress, no gap scan yet
    Idle,
    /// Draining the missing queue, one resend in flight at most
    Recovering,
    /// Missing queue empty, finalization may proceed
    Done,
}

/// Session counters
#[derive(Debug, Default)]
pub struct SessionStats {
    pub bytes_received: AtomicU64,
    pub frames_decoded: AtomicU64,
    pub duplicates: AtomicU64,
    pub malformed_frames: AtomicU64,
    pub truncated_tail_bytes: AtomicU64,
    pub gaps_detected: AtomicU64,
    pub resend_requests: AtomicU64,
    pub resend_retries: AtomicU64,
    pub resend_overflows: AtomicU64,
    pub unrecovered_sequences: AtomicU64,
}

impl SessionStats {
    pub fn snapshot(&self) -> SessionStatsSnapshot {
        SessionStatsSnapshot {
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            frames_decoded: self.frames_decoded.load(Ordering::Relaxed),
            duplicates: self.duplicates.load(Ordering::Relaxed),
            malformed_frames: self.malformed_frames.load(Ordering::Relaxed),
            truncated_tail_bytes: self.truncated_tail_bytes.load(Ordering::Relaxed),
            gaps_detected: self.gaps_detected.load(Ordering::Relaxed),
            resend_requests: self.resend_requests.load(Ordering::Relaxed),
            resend_retries: self.resend_retries.load(Ordering::Relaxed),
            resend_overflows: self.resend_overflows.load(Ordering::Relaxed),
            unrecovered_sequences: self.unrecovered_sequences.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct SessionStatsSnapshot {
    pub bytes_received: u64,
    pub frames_decoded: u64,
    pub duplicates: u64,
    pub malformed_frames: u64,
    pub truncated_tail_bytes: u64,
    pub gaps_detected: u64,
    pub resend_requests: u64,
    pub resend_retries: u64,
    pub resend_overflows: u64,
    pub unrecovered_sequences: u64,
}

/// Result of a completed session
#[derive(Debug)]
pub struct SessionOutcome {
    /// Final record set, ascending by sequence
    pub records: Vec<Record>,
    pub stats: SessionStatsSnapshot,
}

/// One logical client session against the feed service.
///
/// Owns the record store outright; everything runs on a single task, so
/// stream ingest and recovery never mutate it concurrently.
pub struct FeedSession {
    config: FeedClientConfig,
    store: RecordStore,
    stats: SessionStats,
    recovery_state: RecoveryState,
}

impl FeedSession {
    pub fn new(config: FeedClientConfig) -> Self {
        Self {
            config,
            store: RecordStore::new(),
            stats: SessionStats::default(),
            recovery_state: RecoveryState::Idle,
        }
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn recovery_state(&self) -> RecoveryState {
        self.recovery_state
    }

    /// Run the session to completion and freeze the record set.
    ///
    /// Primary-stream failures are fatal and propagate. Recovery failures
    /// for individual sequence numbers are retried, then logged and counted;
    /// finalization always runs over whatever was obtained.
    pub async fn run(mut self) -> Result<SessionOutcome> {
        self.stream_all().await?;

        let missing = self.store.missing_sequences();
        if missing.is_empty() {
            info!(
                "stream complete: {} records, no gaps detected",
                self.store.len()
            );
        } else {
            self.recover(missing).await;
        }
        self.recovery_state = RecoveryState::Done;

        let stats = self.stats.snapshot();
        Ok(SessionOutcome {
            records: self.store.into_sorted_records(),
            stats,
        })
    }

    async fn connect(&self) -> Result<TcpStream> {
        let addr = self.config.addr();
        let stream = timeout(self.config.connect_timeout, TcpStream::connect(&addr))
            .await
            .map_err(|_| {
                anyhow!(
                    "connect to {} timed out after {:?}",
                    addr,
                    self.config.connect_timeout
                )
            })?
            .with_context(|| format!("connect to {}", addr))?;
        Ok(stream)
    }

    /// Request the full record stream and ingest frames until the server
    /// half-closes the connection.
    async fn stream_all(&mut self) -> Result<()> {
        let mut stream = self.connect().await.context("primary stream")?;
        info!("connected to {}", self.config.addr());

        let request = RequestFrame::StreamAll.encode()?;
        stream
            .write_all(&request)
            .await
            .context("send stream-all request")?;

        let mut assembler = FrameAssembler::new();
        let mut buf = [0u8; 4096];

        loop {
            let n = timeout(self.config.read_timeout, stream.read(&mut buf))
                .await
                .map_err(|_| {
                    anyhow!(
                        "primary stream read timed out after {:?}",
                        self.config.read_timeout
                    )
                })?
                .context("primary stream read")?;
            if n == 0 {
                break;
            }

            self.stats
                .bytes_received
                .fetch_add(n as u64, Ordering::Relaxed);
            assembler.extend(&buf[..n]);
            while let Some(frame) = assembler.next_frame() {
                self.ingest_frame(&frame);
            }
        }

        let tail = assembler.residual_len();
        if tail > 0 {
            // Known protocol edge case: the stream can end mid-frame.
            self.stats
                .truncated_tail_bytes
                .fetch_add(tail as u64, Ordering::Relaxed);
            debug!("discarding {} trailing bytes short of a full frame", tail);
        }

        Ok(())
    }

    fn ingest_frame(&mut self, frame: &[u8; RECORD_FRAME_SIZE]) {
        match Record::try_from_slice(frame) {
            Ok(record) => {
                self.stats.frames_decoded.fetch_add(1, Ordering::Relaxed);
                debug!(
                    "record: seq={} {} {:?} qty={} px={}",
                    record.sequence, record.symbol, record.side, record.quantity, record.price
                );
                if self.store.upsert(record).is_some() {
                    self.stats.duplicates.fetch_add(1, Ordering::Relaxed);
                }
            }
            Err(e) => {
                self.stats.malformed_frames.fetch_add(1, Ordering::Relaxed);
                warn!("dropping malformed frame: {}", e);
            }
        }
    }

    /// Drain the missing queue in ascending order, one resend at a time.
    ///
    /// The queue is built once from the pre-recovery snapshot and never
    /// recomputed; resend responses are not re-scanned for further gaps.
    async fn recover(&mut self, missing: Vec<i32>) {
        self.recovery_state = RecoveryState::Recovering;
        self.stats
            .gaps_detected
            .fetch_add(missing.len() as u64, Ordering::Relaxed);
        info!(
            "detected {} missing sequence(s): {:?}",
            missing.len(),
            missing
        );

        for sequence in missing {
            if let Err(e) = self.recover_one(sequence).await {
                self.stats
                    .unrecovered_sequences
                    .fetch_add(1, Ordering::Relaxed);
                error!("sequence {} left unrecovered: {:#}", sequence, e);
            }
        }
    }

    /// Recover a single sequence number, retrying with backoff.
    async fn recover_one(&mut self, sequence: i32) -> Result<()> {
        let request = match (RequestFrame::Resend { sequence }).encode() {
            Ok(req) => req,
            Err(e @ WireError::ResendSequenceOverflow(_)) => {
                self.stats.resend_overflows.fetch_add(1, Ordering::Relaxed);
                return Err(e.into());
            }
            Err(e) => return Err(e.into()),
        };

        let mut backoff = self.config.retry_backoff;
        let mut last_err = None;

        for attempt in 0..=self.config.recovery_retries {
            if attempt > 0 {
                self.stats.resend_retries.fetch_add(1, Ordering::Relaxed);
                sleep(backoff).await;
                backoff = (backoff * 2).min(self.config.retry_backoff_cap);
            }

            self.stats.resend_requests.fetch_add(1, Ordering::Relaxed);
            match self.request_resend(&request).await {
                Ok(record) => {
                    if record.sequence != sequence {
                        warn!(
                            "resend for {} answered with sequence {}",
                            sequence, record.sequence
                        );
                    }
                    debug!("recovered sequence {}", record.sequence);
                    if self.store.upsert(record).is_some() {
                        self.stats.duplicates.fetch_add(1, Ordering::Relaxed);
                    }
                    return Ok(());
                }
                Err(e) => {
                    warn!(
                        "resend {} attempt {}/{} failed: {:#}",
                        sequence,
                        attempt + 1,
                        self.config.recovery_retries + 1,
                        e
                    );
                    last_err = Some(e);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow!("no resend attempt made")))
    }

    /// One resend exchange on a fresh connection: send the 2-byte request,
    /// read exactly one response frame, decode, drop the connection.
    async fn request_resend(&self, request: &[u8; REQUEST_FRAME_SIZE]) -> Result<Record> {
        let mut stream = self.connect().await.context("recovery connection")?;
        stream
            .write_all(request)
            .await
            .context("send resend request")?;

        let mut frame = [0u8; RECORD_FRAME_SIZE];
        timeout(self.config.read_timeout, stream.read_exact(&mut frame))
            .await
            .map_err(|_| {
                anyhow!(
                    "resend response timed out after {:?}",
                    self.config.read_timeout
                )
            })?
            .context("read resend response")?;

        Ok(Record::try_from_slice(&frame)?)
    }
}
