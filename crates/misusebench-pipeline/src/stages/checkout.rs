//! Checkout stage

use std::path::{Path, PathBuf};

use tracing::debug;

use misusebench_core::Checkout;

use crate::stage::{ArtifactKind, Stage, StageContext, StageError, StageScope};

/// Materializes the working copy of each version
///
/// A project without a repository descriptor is a configuration error and
/// skipped. Existing checkouts are reused unless force is set.
pub struct CheckoutStage {
    checkouts_base: PathBuf,
    force: bool,
}

impl CheckoutStage {
    /// Create the stage
    pub fn new(checkouts_base: &Path, force: bool) -> Self {
        Self {
            checkouts_base: checkouts_base.to_path_buf(),
            force,
        }
    }
}

impl Stage for CheckoutStage {
    fn name(&self) -> &'static str {
        "checkout"
    }

    fn scope(&self) -> StageScope {
        StageScope::Version
    }

    fn produces(&self) -> &'static [ArtifactKind] {
        &[ArtifactKind::Checkout]
    }

    fn run(&self, ctx: &mut StageContext<'_>) -> Result<(), StageError> {
        let version = ctx.version()?;
        let checkout = Checkout::for_version(&self.checkouts_base, ctx.project, version)?;
        checkout.materialize(self.force)?;
        debug!(version = %version, path = %checkout.path().display(), "checkout ready");
        ctx.checkout = Some(checkout);
        Ok(())
    }
}
