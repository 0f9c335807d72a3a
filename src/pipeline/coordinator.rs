//! Pipeline coordinator
//!
//! Sole owner of the statement and the ledger. Wires settle events from the
//! statement into ledger verification and applies asynchronous results only
//! when they are still current.
//!
//! ## Revision tagging
//!
//! - Sign requests carry the statement revision and the connection epoch they
//!   were issued under. A completion is applied only if both still match;
//!   otherwise it is dropped (last edit wins, disconnect cancels).
//! - Verification jobs carry `(settled revision, ledger generation)`. A result
//!   is accepted only if neither moved while the job ran.

use crate::account::AccountId;
use crate::attestation::{AttestationEntry, AttestationLedger};
use crate::crypto::traits::{SignatureRecovery, Signer, SignerError};
use crate::pipeline::events::{Command, ExportedBundle, Update};
use crate::pipeline::stream::UpdateSender;
use crate::serialization::{Bundle, BundleFormatError};
use crate::statement::{Revision, StatementState, DEFAULT_DEBOUNCE};
use futures::future::BoxFuture;
use futures::stream::FuturesUnordered;
use futures::{FutureExt, StreamExt};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Identifies the inputs a verification pass was computed from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerificationTicket {
    pub revision: Revision,
    pub generation: u64,
}

/// Verification work detached from the coordinator, runnable off-loop.
pub struct VerificationJob<R> {
    ticket: VerificationTicket,
    content: String,
    ledger: AttestationLedger,
    recovery: Arc<R>,
}

impl<R: SignatureRecovery> VerificationJob<R> {
    pub fn ticket(&self) -> VerificationTicket {
        self.ticket
    }

    pub fn run(self) -> VerificationResult {
        let entries = self
            .ledger
            .verified_against(&self.content, self.recovery.as_ref());
        VerificationResult {
            ticket: self.ticket,
            entries,
        }
    }
}

/// Output of a [`VerificationJob`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationResult {
    pub ticket: VerificationTicket,
    pub entries: Vec<AttestationEntry>,
}

/// Last accepted verified set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedSnapshot {
    pub ticket: VerificationTicket,
    pub entries: Vec<AttestationEntry>,
}

/// Export work detached from the coordinator, runnable off-loop.
pub struct ExportJob<R> {
    content: String,
    ledger: AttestationLedger,
    extra: Map<String, Value>,
    recovery: Arc<R>,
}

impl<R: SignatureRecovery> ExportJob<R> {
    /// Verify against the snapshotted text and serialize what passes
    pub fn run(self) -> Result<ExportedBundle, serde_json::Error> {
        let bundle = self
            .ledger
            .to_bundle(&self.content, self.recovery.as_ref())
            .with_extra(self.extra);
        let json = bundle.to_json_pretty()?;
        info!(attestations = bundle.attestations().len(), "bundle exported");
        Ok(ExportedBundle {
            file_name: Bundle::file_name(),
            json,
        })
    }
}

type ExportResult = Result<ExportedBundle, serde_json::Error>;

/// A sign request tagged with the state it was issued under.
pub struct SignRequest {
    revision: Revision,
    epoch: u64,
    content: String,
    account: AccountId,
    signer: Arc<dyn Signer>,
}

impl SignRequest {
    pub fn revision(&self) -> Revision {
        self.revision
    }

    pub fn account(&self) -> &AccountId {
        &self.account
    }

    /// Await the signer. This is the suspension point.
    pub async fn execute(self) -> SignCompletion {
        let result = self.signer.sign(&self.content, &self.account).await;
        SignCompletion {
            revision: self.revision,
            epoch: self.epoch,
            account: self.account,
            result,
        }
    }
}

/// Signer response, still tagged
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignCompletion {
    pub revision: Revision,
    pub epoch: u64,
    pub account: AccountId,
    pub result: Result<String, SignerError>,
}

/// What happened to a completed sign request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignOutcome {
    /// Stored in the ledger
    Applied { account: AccountId },

    /// The statement or the connection changed while signing
    Discarded { revision: Revision },
}

/// Owns the statement, the ledger and the signer capability.
pub struct Coordinator<R> {
    statement: StatementState,
    ledger: AttestationLedger,
    recovery: Arc<R>,
    signer: Option<Arc<dyn Signer>>,
    epoch: u64,
    generation: u64,
    verified: Option<VerifiedSnapshot>,
    extra: Map<String, Value>,
}

impl<R: SignatureRecovery + 'static> Coordinator<R> {
    /// Coordinator with an empty ledger and the default settle window
    pub fn new(content: impl Into<String>, recovery: R) -> Self {
        Self::with_window(content, recovery, DEFAULT_DEBOUNCE)
    }

    pub fn with_window(content: impl Into<String>, recovery: R, window: Duration) -> Self {
        Self {
            statement: StatementState::with_window(content, window),
            ledger: AttestationLedger::new(),
            recovery: Arc::new(recovery),
            signer: None,
            epoch: 0,
            generation: 0,
            verified: None,
            extra: Map::new(),
        }
    }

    pub fn statement(&self) -> &StatementState {
        &self.statement
    }

    pub fn ledger(&self) -> &AttestationLedger {
        &self.ledger
    }

    pub fn content(&self) -> &str {
        self.statement.content()
    }

    pub fn is_stable(&self) -> bool {
        self.statement.is_stable()
    }

    /// Register a settle handler on the owned statement
    pub fn on_settle(&mut self, handler: impl FnMut(Revision) + Send + 'static) {
        self.statement.on_settle(handler);
    }

    /// Attach a signer. Requests issued under a previous signer are dropped.
    pub fn connect(&mut self, signer: Arc<dyn Signer>) {
        self.epoch += 1;
        info!(account = ?signer.account(), "signer connected");
        self.signer = Some(signer);
    }

    /// Detach the signer. Pending requests resolve into discards.
    pub fn disconnect(&mut self) {
        if self.signer.take().is_some() {
            info!("signer disconnected");
        }
        self.epoch += 1;
    }

    /// Account the connected signer would sign with
    pub fn signer_account(&self) -> Option<AccountId> {
        self.signer.as_ref().and_then(|signer| signer.account())
    }

    /// Apply a statement edit. Verification waits for the settle window.
    pub fn content_changed(&mut self, text: impl Into<String>) -> Revision {
        let revision = self.statement.set_content(text);
        debug!(%revision, "statement edited");
        revision
    }

    /// Store an externally supplied signature. No validation happens here.
    pub fn signature_submitted(
        &mut self,
        account: impl Into<AccountId>,
        signature: impl Into<String>,
    ) {
        let account = account.into();
        if self.ledger.upsert(account.clone(), signature).is_some() {
            debug!(%account, "replaced attestation");
        } else {
            debug!(%account, "added attestation");
        }
        self.generation += 1;
    }

    /// Replace statement and ledger from bundle bytes, all or nothing.
    pub fn load_bundle(&mut self, bytes: &[u8]) -> Result<Revision, BundleFormatError> {
        let bundle = Bundle::from_slice(bytes).map_err(|e| {
            warn!(error = %e, "rejected bundle import");
            e
        })?;

        let extra = bundle.extra().clone();
        let (content, entries) = AttestationLedger::from_bundle(bundle);
        let count = entries.len();

        self.ledger.replace_all(entries);
        self.generation += 1;
        self.extra = extra;
        let revision = self.statement.load(content);

        info!(%revision, attestations = count, "bundle imported");
        Ok(revision)
    }

    /// Snapshot the current statement and ledger for export.
    ///
    /// The job verifies against the text as it is now, so the output never
    /// depends on whether the last edit has settled.
    pub fn export_job(&self) -> ExportJob<R> {
        ExportJob {
            content: self.statement.content().to_string(),
            ledger: self.ledger.clone(),
            extra: self.extra.clone(),
            recovery: Arc::clone(&self.recovery),
        }
    }

    /// Serialize the current statement with its verified attestations.
    pub fn export_bundle(&self) -> Result<ExportedBundle, serde_json::Error> {
        self.export_job().run()
    }

    fn current_ticket(&self) -> VerificationTicket {
        VerificationTicket {
            revision: self.statement.settled_revision(),
            generation: self.generation,
        }
    }

    /// Snapshot the inputs for a verification pass, if the statement is stable.
    pub fn verification_job(&self) -> Option<VerificationJob<R>> {
        if !self.statement.is_stable() {
            return None;
        }
        Some(VerificationJob {
            ticket: self.current_ticket(),
            content: self.statement.content().to_string(),
            ledger: self.ledger.clone(),
            recovery: Arc::clone(&self.recovery),
        })
    }

    /// Accept a verification result if its inputs are still current.
    pub fn accept_verification(
        &mut self,
        result: VerificationResult,
    ) -> Option<&[AttestationEntry]> {
        if !self.statement.is_stable() || result.ticket != self.current_ticket() {
            debug!(
                ticket = ?result.ticket,
                current = ?self.current_ticket(),
                "discarding stale verification"
            );
            return None;
        }

        let snapshot = self.verified.insert(VerifiedSnapshot {
            ticket: result.ticket,
            entries: result.entries,
        });
        Some(&snapshot.entries)
    }

    /// Run and accept a verification pass inline.
    pub fn verify_now(&mut self) -> Option<Vec<AttestationEntry>> {
        let job = self.verification_job()?;
        let result = job.run();
        self.accept_verification(result).map(<[_]>::to_vec)
    }

    /// Verified set for the current state; empty while an edit is settling
    /// or before the first pass completes.
    pub fn verified_entries(&self) -> &[AttestationEntry] {
        match &self.verified {
            Some(snapshot)
                if self.statement.is_stable() && snapshot.ticket == self.current_ticket() =>
            {
                snapshot.entries.as_slice()
            }
            _ => &[],
        }
    }

    /// Issue a sign request for the current statement.
    pub fn begin_sign(&self) -> Result<SignRequest, SignerError> {
        let signer = self
            .signer
            .clone()
            .ok_or_else(|| SignerError::Connection("no wallet connected".to_string()))?;
        let account = signer
            .account()
            .ok_or_else(|| SignerError::Connection("wallet exposes no account".to_string()))?;

        Ok(SignRequest {
            revision: self.statement.edit_revision(),
            epoch: self.epoch,
            content: self.statement.content().to_string(),
            account,
            signer,
        })
    }

    /// Apply a signer response if it is still current.
    ///
    /// A stale response is discarded whether it succeeded or failed.
    pub fn complete_sign(
        &mut self,
        completion: SignCompletion,
    ) -> Result<SignOutcome, SignerError> {
        if completion.revision != self.statement.edit_revision() || completion.epoch != self.epoch {
            warn!(
                signed = %completion.revision,
                current = %self.statement.edit_revision(),
                failed = completion.result.is_err(),
                "discarding sign response for stale statement"
            );
            return Ok(SignOutcome::Discarded {
                revision: completion.revision,
            });
        }

        let signature = completion.result.map_err(|e| {
            warn!(account = %completion.account, error = %e, "signing failed");
            e
        })?;

        info!(account = %completion.account, "statement signed");
        self.signature_submitted(completion.account.clone(), signature);
        Ok(SignOutcome::Applied {
            account: completion.account,
        })
    }

    /// Drive the pipeline until the command channel closes.
    ///
    /// All state changes happen on this task. Sign requests run concurrently
    /// on it as futures. Verification passes and exports run on the blocking
    /// pool.
    pub async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        updates: UpdateSender,
    ) -> Self {
        let mut signing: FuturesUnordered<BoxFuture<'static, SignCompletion>> =
            FuturesUnordered::new();
        let mut verifying: FuturesUnordered<JoinHandle<VerificationResult>> =
            FuturesUnordered::new();
        let mut exporting: FuturesUnordered<JoinHandle<ExportResult>> = FuturesUnordered::new();

        // Initial pass for whatever the coordinator was built with
        self.schedule_verification(&mut verifying);

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => {
                        self.handle(
                            command,
                            &updates,
                            &mut signing,
                            &mut verifying,
                            &mut exporting,
                        );
                    }
                    None => break,
                },
                _ = self.statement.settled() => {
                    self.schedule_verification(&mut verifying);
                }
                Some(completion) = signing.next(), if !signing.is_empty() => {
                    match self.complete_sign(completion) {
                        Ok(SignOutcome::Applied { .. }) => self.schedule_verification(&mut verifying),
                        Ok(SignOutcome::Discarded { revision }) => {
                            updates.send(Update::SignatureDiscarded { revision });
                        }
                        Err(e) => {
                            updates.send(Update::SigningFailed(e));
                        }
                    }
                }
                Some(joined) = verifying.next(), if !verifying.is_empty() => {
                    match joined {
                        Ok(result) => {
                            let revision = result.ticket.revision;
                            if let Some(entries) = self.accept_verification(result) {
                                updates.send(Update::StableVerifiedSet {
                                    revision,
                                    entries: entries.to_vec(),
                                });
                            }
                        }
                        Err(e) => error!(error = %e, "verification task failed"),
                    }
                }
                Some(joined) = exporting.next(), if !exporting.is_empty() => {
                    match joined {
                        Ok(Ok(bundle)) => {
                            updates.send(Update::SerializedBundle(bundle));
                        }
                        Ok(Err(e)) => error!(error = %e, "bundle serialization failed"),
                        Err(e) => error!(error = %e, "export task failed"),
                    }
                }
            }
        }

        self
    }

    fn handle(
        &mut self,
        command: Command,
        updates: &UpdateSender,
        signing: &mut FuturesUnordered<BoxFuture<'static, SignCompletion>>,
        verifying: &mut FuturesUnordered<JoinHandle<VerificationResult>>,
        exporting: &mut FuturesUnordered<JoinHandle<ExportResult>>,
    ) {
        match command {
            Command::ContentChanged(text) => {
                let revision = self.content_changed(text);
                updates.send(Update::VerificationPending { revision });
            }
            Command::SignatureSubmitted { account, signature } => {
                self.signature_submitted(account, signature);
                self.schedule_verification(verifying);
            }
            Command::SignRequested => match self.begin_sign() {
                Ok(request) => signing.push(request.execute().boxed()),
                Err(e) => {
                    updates.send(Update::SigningFailed(e));
                }
            },
            Command::BundleLoaded(bytes) => match self.load_bundle(&bytes) {
                Ok(_) => self.schedule_verification(verifying),
                Err(e) => {
                    updates.send(Update::FormatError(e));
                }
            },
            Command::BundleExportRequested => {
                let job = self.export_job();
                exporting.push(tokio::task::spawn_blocking(move || job.run()));
            }
            Command::Connect(signer) => self.connect(signer),
            Command::Disconnect => self.disconnect(),
        }
    }

    fn schedule_verification(
        &self,
        verifying: &mut FuturesUnordered<JoinHandle<VerificationResult>>,
    ) {
        if let Some(job) = self.verification_job() {
            debug!(ticket = ?job.ticket(), "verification scheduled");
            verifying.push(tokio::task::spawn_blocking(move || job.run()));
        }
    }
}
