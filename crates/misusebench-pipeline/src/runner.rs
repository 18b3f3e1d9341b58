//! Pipeline runner — depth-first traversal of the entity hierarchy
//!
//! The runner executes a configured stage list over projects, versions and
//! misuses, single-threaded and in loaded order. Failures are isolated per
//! entity: a broken project never aborts the walk of its siblings.

use std::fmt;

use tracing::{debug, error, info, warn};

use misusebench_core::Project;

use crate::registry::RegistryError;
use crate::stage::{Stage, StageContext, StageScope};

/// Whether to continue into the current entity's subtree
enum Outcome {
    Continue,
    Stop,
}

/// Aggregate result of one pipeline run
#[derive(Debug, Default)]
pub struct RunReport {
    /// Version walks that completed all their stages
    pub completed: usize,
    /// Skipped entities with the configuration-error reason
    pub skipped: Vec<(String, String)>,
    /// Failed entities with the error text
    pub failed: Vec<(String, String)>,
}

impl RunReport {
    /// Whether the run finished without entity failures
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} completed, {} skipped, {} failed",
            self.completed,
            self.skipped.len(),
            self.failed.len()
        )
    }
}

/// Executes an ordered stage list over the entity hierarchy
pub struct PipelineRunner {
    stages: Vec<Box<dyn Stage>>,
}

impl fmt::Debug for PipelineRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineRunner")
            .field(
                "stages",
                &self.stages.iter().map(|s| s.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl PipelineRunner {
    /// Validate and wrap a stage list
    ///
    /// Composition is checked up front: stage scopes must not get broader
    /// along the list, and every required artifact kind must be produced by
    /// an earlier stage. Violations are startup errors, raised before any
    /// entity is processed.
    pub fn new(stages: Vec<Box<dyn Stage>>) -> Result<Self, RegistryError> {
        let mut available = Vec::new();
        let mut deepest = StageScope::Project;
        for stage in &stages {
            if stage.scope() < deepest {
                return Err(RegistryError::ScopeOrder {
                    stage: stage.name().to_string(),
                });
            }
            deepest = stage.scope();
            for input in stage.requires() {
                if !available.contains(input) {
                    return Err(RegistryError::UnsatisfiedInput {
                        stage: stage.name().to_string(),
                        input: *input,
                    });
                }
            }
            available.extend_from_slice(stage.produces());
        }
        Ok(Self { stages })
    }

    /// Names of the configured stages, in execution order
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    /// Execute the configured stages over all projects
    pub fn run(&self, projects: &[Project]) -> RunReport {
        let mut report = RunReport::default();
        for project in projects {
            let mut ctx = StageContext::new(project);
            if let Outcome::Stop = self.run_scope(&mut ctx, StageScope::Project, &mut report) {
                continue;
            }
            for version in &project.versions {
                let mut vctx = ctx.for_version(version);
                if let Outcome::Stop = self.run_scope(&mut vctx, StageScope::Version, &mut report)
                {
                    continue;
                }
                let mut version_ok = true;
                for misuse in &version.misuses {
                    let mut mctx = vctx.for_misuse(misuse);
                    if let Outcome::Stop =
                        self.run_scope(&mut mctx, StageScope::Misuse, &mut report)
                    {
                        version_ok = false;
                    }
                }
                if version_ok {
                    report.completed += 1;
                }
            }
        }
        info!(%report, "pipeline run finished");
        report
    }

    /// Run all stages of one scope against the current entity
    fn run_scope(
        &self,
        ctx: &mut StageContext<'_>,
        scope: StageScope,
        report: &mut RunReport,
    ) -> Outcome {
        for stage in self.stages.iter().filter(|stage| stage.scope() == scope) {
            debug!(stage = stage.name(), entity = %ctx.entity_id(), "running stage");
            match stage.run(ctx) {
                Ok(()) => {}
                Err(err) if err.is_skip() => {
                    warn!(
                        stage = stage.name(),
                        entity = %ctx.entity_id(),
                        reason = %err,
                        "skipping entity"
                    );
                    report.skipped.push((ctx.entity_id(), err.to_string()));
                    return Outcome::Stop;
                }
                Err(err) => {
                    error!(
                        stage = stage.name(),
                        entity = %ctx.entity_id(),
                        error = %err,
                        "stage failed"
                    );
                    report.failed.push((ctx.entity_id(), err.to_string()));
                    return Outcome::Stop;
                }
            }
        }
        Outcome::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    use misusebench_core::{CompilePaths, Location, Misuse, Version};

    use crate::stage::{ArtifactKind, StageError};

    type Log = Rc<RefCell<Vec<String>>>;

    /// Scripted stage: records invocations and fails or skips on marked entities
    struct ScriptedStage {
        name: &'static str,
        scope: StageScope,
        requires: &'static [ArtifactKind],
        produces: &'static [ArtifactKind],
        fail_on: Option<&'static str>,
        skip_on: Option<&'static str>,
        log: Log,
    }

    impl ScriptedStage {
        fn new(name: &'static str, scope: StageScope, log: Log) -> Self {
            Self {
                name,
                scope,
                requires: &[],
                produces: &[],
                fail_on: None,
                skip_on: None,
                log,
            }
        }
    }

    impl Stage for ScriptedStage {
        fn name(&self) -> &'static str {
            self.name
        }

        fn scope(&self) -> StageScope {
            self.scope
        }

        fn requires(&self) -> &'static [ArtifactKind] {
            self.requires
        }

        fn produces(&self) -> &'static [ArtifactKind] {
            self.produces
        }

        fn run(&self, ctx: &mut StageContext<'_>) -> Result<(), StageError> {
            let entity = ctx.entity_id();
            self.log.borrow_mut().push(format!("{}:{}", self.name, entity));
            if self.fail_on.is_some_and(|id| entity == id) {
                return Err(StageError::Failed("scripted failure".into()));
            }
            if self.skip_on.is_some_and(|id| entity == id) {
                return Err(StageError::skip("scripted skip"));
            }
            if self.produces.contains(&ArtifactKind::Compile) {
                ctx.compile = Some(CompilePaths::new(std::path::Path::new("/tmp"), "p", "v"));
            }
            Ok(())
        }
    }

    fn project_with_versions(id: &str, versions: &[&str]) -> Project {
        let mut project = Project::new(id, None);
        for version_id in versions {
            project.versions.push(Version::new(id, *version_id, "/tmp"));
        }
        project
    }

    #[test]
    fn visits_entities_in_loaded_order() {
        let log: Log = Rc::default();
        let runner = PipelineRunner::new(vec![Box::new(ScriptedStage::new(
            "s",
            StageScope::Version,
            log.clone(),
        ))])
        .unwrap();

        let projects = vec![
            project_with_versions("a", &["v1", "v2"]),
            project_with_versions("b", &["v1"]),
        ];
        let report = runner.run(&projects);

        assert_eq!(*log.borrow(), vec!["s:a.v1", "s:a.v2", "s:b.v1"]);
        assert_eq!(report.completed, 3);
        assert!(report.is_success());
    }

    #[test]
    fn failure_stops_subtree_but_not_siblings() {
        let log: Log = Rc::default();
        let mut first = ScriptedStage::new("first", StageScope::Version, log.clone());
        first.fail_on = Some("a.v1");
        let second = ScriptedStage::new("second", StageScope::Version, log.clone());

        let runner = PipelineRunner::new(vec![Box::new(first), Box::new(second)]).unwrap();
        let projects = vec![project_with_versions("a", &["v1", "v2"])];
        let report = runner.run(&projects);

        assert_eq!(
            *log.borrow(),
            vec!["first:a.v1", "first:a.v2", "second:a.v2"]
        );
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "a.v1");
        assert_eq!(report.completed, 1);
    }

    #[test]
    fn skip_is_recorded_separately_from_failure() {
        let log: Log = Rc::default();
        let mut stage = ScriptedStage::new("s", StageScope::Version, log.clone());
        stage.skip_on = Some("a.v1");

        let runner = PipelineRunner::new(vec![Box::new(stage)]).unwrap();
        let projects = vec![project_with_versions("a", &["v1", "v2"])];
        let report = runner.run(&projects);

        assert!(report.is_success());
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].0, "a.v1");
        assert_eq!(report.completed, 1);
    }

    #[test]
    fn project_failure_skips_all_its_versions() {
        let log: Log = Rc::default();
        let mut project_stage = ScriptedStage::new("prep", StageScope::Project, log.clone());
        project_stage.fail_on = Some("a");
        let version_stage = ScriptedStage::new("work", StageScope::Version, log.clone());

        let runner =
            PipelineRunner::new(vec![Box::new(project_stage), Box::new(version_stage)]).unwrap();
        let projects = vec![
            project_with_versions("a", &["v1"]),
            project_with_versions("b", &["v1"]),
        ];
        let report = runner.run(&projects);

        assert_eq!(*log.borrow(), vec!["prep:a", "prep:b", "work:b.v1"]);
        assert_eq!(report.completed, 1);
    }

    #[test]
    fn misuse_stages_run_per_misuse() {
        let log: Log = Rc::default();
        let stage = ScriptedStage::new("m", StageScope::Misuse, log.clone());
        let runner = PipelineRunner::new(vec![Box::new(stage)]).unwrap();

        let mut project = project_with_versions("a", &["v1"]);
        for misuse_id in ["mu1", "mu2"] {
            project.versions[0].misuses.push(Misuse::new(
                "a",
                misuse_id,
                Location {
                    file: "f".into(),
                    method: None,
                },
            ));
        }
        let report = runner.run(&[project]);

        assert_eq!(*log.borrow(), vec!["m:a.v1.mu1", "m:a.v1.mu2"]);
        assert_eq!(report.completed, 1);
    }

    #[test]
    fn misuse_stage_not_invoked_without_misuses() {
        let log: Log = Rc::default();
        let stage = ScriptedStage::new("m", StageScope::Misuse, log.clone());
        let runner = PipelineRunner::new(vec![Box::new(stage)]).unwrap();

        let report = runner.run(&[project_with_versions("a", &["v1"])]);

        assert!(log.borrow().is_empty());
        assert_eq!(report.completed, 1);
    }

    #[test]
    fn artifacts_thread_between_stages() {
        let log: Log = Rc::default();
        let mut producer = ScriptedStage::new("producer", StageScope::Version, log.clone());
        producer.produces = &[ArtifactKind::Compile];
        let mut consumer = ScriptedStage::new("consumer", StageScope::Version, log.clone());
        consumer.requires = &[ArtifactKind::Compile];

        let runner = PipelineRunner::new(vec![Box::new(producer), Box::new(consumer)]).unwrap();
        let report = runner.run(&[project_with_versions("a", &["v1"])]);
        assert!(report.is_success());
        assert_eq!(report.completed, 1);
    }

    #[test]
    fn composition_rejects_unsatisfied_input() {
        let log: Log = Rc::default();
        let mut consumer = ScriptedStage::new("consumer", StageScope::Version, log);
        consumer.requires = &[ArtifactKind::Checkout];

        let err = PipelineRunner::new(vec![Box::new(consumer)]).unwrap_err();
        assert!(matches!(err, RegistryError::UnsatisfiedInput { .. }));
    }

    #[test]
    fn composition_rejects_scope_regression() {
        let log: Log = Rc::default();
        let version_stage = ScriptedStage::new("v", StageScope::Version, log.clone());
        let project_stage = ScriptedStage::new("p", StageScope::Project, log);

        let err =
            PipelineRunner::new(vec![Box::new(version_stage), Box::new(project_stage)])
                .unwrap_err();
        assert!(matches!(err, RegistryError::ScopeOrder { .. }));
    }
}
