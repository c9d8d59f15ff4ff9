//! High-level pipeline: list → manifest → encode → spawn → route.
//!
//! [`Poster::post`] is the single entry point callers use. It consumes one
//! [`JobOptions`], lists every source before anything is spawned (so listing and
//! probe failures never leave a partial job behind), then hands the manifest to the
//! supervisor.
//!
//! # Output
//! - `out = "-"`: live, returns [`JobOutcome::Running`] straight away
//! - `out = <path>`: file, returns [`JobOutcome::Running`] straight away
//! - `out` unset: buffered, returns [`JobOutcome::Buffered`] once stdout has closed

use tracing::{error, info};

use crate::contract::{ArchiveProbe, Lister};
use crate::encoder::encode_args;
use crate::error::Result;
use crate::manifest::{FetchCommands, Manifest, ManifestBuilder};
use crate::options::{JobOptions, JobPlan, INPUT_FILE_KEY};
use crate::supervisor::{supervise, EngineConfig, JobOutcome};

/// Posts sources through the engine using the given collaborators.
pub struct Poster<L: Lister, A: ArchiveProbe> {
    pub lister: L,
    pub archiver: A,
    pub fetch: FetchCommands,
    pub engine: EngineConfig,
}

impl<L: Lister, A: ArchiveProbe> Poster<L, A> {
    pub fn new(lister: L, archiver: A, fetch: FetchCommands, engine: EngineConfig) -> Self {
        Self {
            lister,
            archiver,
            fetch,
            engine,
        }
    }

    /// Builds the manifest for `sources` (concatenated in order) and the engine argv.
    pub async fn prepare(
        &self,
        sources: &[String],
        plan: &mut JobPlan,
    ) -> Result<(Manifest, Vec<String>)> {
        let builder = ManifestBuilder::new(&self.lister, &self.archiver, &self.fetch);
        let mut manifest = Manifest::default();
        for source in sources {
            manifest.extend(builder.build(source, &plan.naming, plan.archive).await?);
        }

        plan.engine_options.set(INPUT_FILE_KEY, "-");
        let args = encode_args(&plan.engine_options);
        Ok((manifest, args))
    }

    pub async fn post(&self, sources: &[String], options: JobOptions) -> Result<JobOutcome> {
        let mut plan = options.into_plan();
        info!(sources = ?sources, output = ?plan.output, "Starting posting job");

        let (manifest, args) = self.prepare(sources, &mut plan).await.map_err(|e| {
            error!(error = %e, "Job aborted before spawning the engine");
            e
        })?;
        info!(
            files = manifest.len(),
            total_bytes = manifest.total_size(),
            "Manifest ready"
        );

        supervise(&self.engine, &args, &manifest, plan.output, plan.observer).await
    }
}
