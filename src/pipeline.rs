//! Dedicated writer thread fed by a queue.
//!
//! Fetches complete concurrently upstream, but writes into one archive
//! stream must be serialized: offsets are only meaningful when exactly one
//! record is in flight, and the warcinfo record must stay first. The
//! pipeline gives the [`CdxWriter`] to a single thread and lets any number
//! of producers submit captures over a bounded channel.
//!
//! A write failure is fatal to the file: the thread records the error and
//! drains remaining captures without writing them.

use crate::error::{Result, WarcError};
use crate::index::CdxWriter;
use crate::types::{FetchMeta, RecordId, TruncatedReason, WarcinfoFields};
use chrono::{DateTime, Utc};
use crossbeam_channel::{bounded, Sender};
use parking_lot::Mutex;
use std::io::Write;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error};

/// One fetched resource: the request that produced it plus the response.
#[derive(Debug)]
pub struct Capture {
    pub target_uri: String,
    pub ip: String,
    pub date: DateTime<Utc>,
    pub request_body: Vec<u8>,
    pub response_body: Vec<u8>,
    pub payload_digest: Option<String>,
    pub block_digest: Option<String>,
    pub truncated: Option<TruncatedReason>,
    pub meta: FetchMeta,
}

/// Handle owned by producers; the writer itself lives on the spawned thread.
pub struct WriterPipeline {
    tx: Option<Sender<Capture>>,
    handle: Option<JoinHandle<()>>,
    last_error: Arc<Mutex<Option<WarcError>>>,
}

impl WriterPipeline {
    /// Write the warcinfo record, then hand the writer to a dedicated
    /// thread consuming captures from a channel of depth `queue_depth`.
    pub fn spawn<W, C>(
        mut writer: CdxWriter<W, C>,
        fields: &WarcinfoFields,
        queue_depth: usize,
    ) -> Result<Self>
    where
        W: Write + Send + 'static,
        C: Write + Send + 'static,
    {
        let warcinfo_id = writer.write_warcinfo(fields)?;

        let (tx, rx) = bounded::<Capture>(queue_depth);
        let last_error = Arc::new(Mutex::new(None));
        let thread_error = Arc::clone(&last_error);

        let handle = thread::spawn(move || {
            for capture in rx {
                if thread_error.lock().is_some() {
                    // File is suspect after a failed write; drain only.
                    continue;
                }
                if let Err(e) = write_capture(&mut writer, &warcinfo_id, capture) {
                    error!(error = %e, "archive write failed, dropping remaining captures");
                    *thread_error.lock() = Some(e);
                }
            }
            if thread_error.lock().is_none() {
                if let Err(e) = writer.finish() {
                    *thread_error.lock() = Some(e);
                }
            }
        });

        Ok(Self {
            tx: Some(tx),
            handle: Some(handle),
            last_error,
        })
    }

    /// Queue a capture for writing. Blocks when the queue is full.
    ///
    /// Fails once the pipeline has recorded a write error or been closed;
    /// the definitive error is returned by [`WriterPipeline::close`].
    pub fn submit(&self, capture: Capture) -> Result<()> {
        if self.last_error.lock().is_some() {
            return Err(WarcError::PipelineClosed);
        }
        self.tx
            .as_ref()
            .ok_or(WarcError::PipelineClosed)?
            .send(capture)
            .map_err(|_| WarcError::PipelineClosed)
    }

    /// Stop accepting captures, wait for queued ones to be written, and
    /// surface the first write error if any occurred.
    pub fn close(mut self) -> Result<()> {
        self.tx.take();
        if let Some(handle) = self.handle.take() {
            handle.join().map_err(|_| WarcError::PipelineClosed)?;
        }
        match self.last_error.lock().take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl Drop for WriterPipeline {
    fn drop(&mut self) {
        self.tx.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn write_capture<W: Write, C: Write>(
    writer: &mut CdxWriter<W, C>,
    warcinfo_id: &RecordId,
    capture: Capture,
) -> Result<()> {
    let Capture {
        target_uri,
        ip,
        date,
        request_body,
        response_body,
        payload_digest,
        block_digest,
        truncated,
        meta,
    } = capture;

    let request_id = writer.write_request(&target_uri, &ip, date, warcinfo_id, &request_body)?;
    let response_id = writer.write_response(
        &target_uri,
        &ip,
        date,
        warcinfo_id,
        &request_id,
        payload_digest.as_deref(),
        block_digest.as_deref(),
        truncated,
        &response_body,
        &meta,
    )?;
    debug!(%response_id, target_uri, "archived capture");
    Ok(())
}
