//! Events consumed and produced by the coordinator.

use crate::account::AccountId;
use crate::attestation::AttestationEntry;
use crate::crypto::traits::{Signer, SignerError};
use crate::serialization::BundleFormatError;
use crate::statement::Revision;
use std::fmt;
use std::sync::Arc;

/// Input from the UI side
pub enum Command {
    /// Statement text edited
    ContentChanged(String),

    /// An (account, signature) pair arrived from outside, e.g. pasted in
    SignatureSubmitted {
        account: AccountId,
        signature: String,
    },

    /// Ask the connected signer to sign the current statement
    SignRequested,

    /// Raw bytes of an imported bundle file
    BundleLoaded(Vec<u8>),

    /// Produce the bundle for download
    BundleExportRequested,

    /// A wallet became available
    Connect(Arc<dyn Signer>),

    /// The wallet went away; pending sign requests are dropped
    Disconnect,
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ContentChanged(text) => f.debug_tuple("ContentChanged").field(text).finish(),
            Self::SignatureSubmitted { account, signature } => f
                .debug_struct("SignatureSubmitted")
                .field("account", account)
                .field("signature", signature)
                .finish(),
            Self::SignRequested => f.write_str("SignRequested"),
            Self::BundleLoaded(bytes) => f
                .debug_tuple("BundleLoaded")
                .field(&format_args!("{} bytes", bytes.len()))
                .finish(),
            Self::BundleExportRequested => f.write_str("BundleExportRequested"),
            Self::Connect(signer) => f
                .debug_tuple("Connect")
                .field(&signer.account())
                .finish(),
            Self::Disconnect => f.write_str("Disconnect"),
        }
    }
}

/// A serialized bundle ready to be written out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedBundle {
    /// Always `attest.json`
    pub file_name: String,
    pub json: String,
}

/// Output toward the UI side
#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    /// An edit is waiting to settle; the previous verified set is stale
    VerificationPending { revision: Revision },

    /// Verified attestations for a settled revision, ordered by account
    StableVerifiedSet {
        revision: Revision,
        entries: Vec<AttestationEntry>,
    },

    /// Result of an export request
    SerializedBundle(ExportedBundle),

    /// An import was rejected; nothing changed
    FormatError(BundleFormatError),

    /// The signer refused or failed; nothing changed
    SigningFailed(SignerError),

    /// A signature arrived for a statement revision that is no longer current
    SignatureDiscarded { revision: Revision },
}
