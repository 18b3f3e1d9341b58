//! Compile stage — incremental build cache
//!
//! Per version the stage assembles a build directory from the checkout,
//! invokes the external build command set once, and partitions the compiled
//! classes into original, misuse and per-pattern class directories. The
//! existence of the original-classes directory is the cache check: when it
//! is present and force-compile is unset, the build is not invoked again.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use misusebench_core::fsutil;
use misusebench_core::{Builder, CompilePaths, ConfigError, Version};

use crate::stage::{ArtifactKind, Stage, StageContext, StageError, StageScope};

/// Compiles each version's sources into partitioned class directories
pub struct CompileStage {
    compiles_base: PathBuf,
    force_compile: bool,
    builder: Box<dyn Builder>,
}

impl CompileStage {
    /// Create the stage
    pub fn new(compiles_base: &Path, force_compile: bool, builder: Box<dyn Builder>) -> Self {
        Self {
            compiles_base: compiles_base.to_path_buf(),
            force_compile,
            builder,
        }
    }

    /// Delete all previous outputs so a rebuild starts from a clean slate
    fn clean_outputs(&self, paths: &CompilePaths) -> std::io::Result<()> {
        for dir in [
            paths.build_dir(),
            paths.original_sources(),
            paths.original_classes(),
            paths.misuse_sources(),
            paths.misuse_classes(),
            paths.patterns_sources_root(),
            paths.patterns_classes_root(),
        ] {
            fsutil::remove_tree(&dir)?;
        }
        Ok(())
    }

    /// Copy the source files referenced by misuse locations
    fn copy_misuse_sources(
        &self,
        version: &Version,
        paths: &CompilePaths,
    ) -> std::io::Result<()> {
        for misuse in &version.misuses {
            let source = paths.original_sources().join(&misuse.location.file);
            if source.is_file() {
                fsutil::copy_file(&source, &paths.misuse_sources().join(&misuse.location.file))?;
            } else {
                warn!(misuse = %misuse, file = %misuse.location.file, "misuse source not found");
            }
        }
        Ok(())
    }

    /// Copy each misuse's pattern sources into its per-misuse directory
    fn copy_pattern_sources(
        &self,
        version: &Version,
        paths: &CompilePaths,
    ) -> std::io::Result<()> {
        for misuse in &version.misuses {
            for pattern in &misuse.patterns {
                fsutil::copy_file(
                    &pattern.path,
                    &paths.pattern_sources(&misuse.misuse_id).join(&pattern.relative),
                )?;
            }
        }
        Ok(())
    }

    /// Assemble the directory the external build runs against
    fn assemble_build_dir(
        &self,
        version: &Version,
        checkout_src: &Path,
        build_src: &Path,
        build_dir: &Path,
    ) -> std::io::Result<()> {
        fsutil::copy_tree(checkout_src, build_src)?;
        for misuse in &version.misuses {
            for pattern in &misuse.patterns {
                fsutil::copy_file(&pattern.path, &build_src.join(&pattern.relative))?;
            }
        }
        let additional = version.additional_compile_sources();
        if additional.is_dir() {
            fsutil::copy_tree(&additional, build_dir)?;
        }
        Ok(())
    }

    /// Partition compiled classes into misuse and per-pattern directories
    fn partition_classes(
        &self,
        version: &Version,
        classes_dir: &Path,
        paths: &CompilePaths,
    ) -> std::io::Result<()> {
        for misuse in &version.misuses {
            copy_matching_classes(
                classes_dir,
                Path::new(&misuse.location.file),
                &paths.misuse_classes(),
            )?;
            for pattern in &misuse.patterns {
                copy_matching_classes(
                    classes_dir,
                    &pattern.relative,
                    &paths.pattern_classes(&misuse.misuse_id),
                )?;
            }
        }
        Ok(())
    }
}

impl Stage for CompileStage {
    fn name(&self) -> &'static str {
        "compile"
    }

    fn scope(&self) -> StageScope {
        StageScope::Version
    }

    fn requires(&self) -> &'static [ArtifactKind] {
        &[ArtifactKind::Checkout]
    }

    fn produces(&self) -> &'static [ArtifactKind] {
        &[ArtifactKind::Compile]
    }

    fn run(&self, ctx: &mut StageContext<'_>) -> Result<(), StageError> {
        let version = ctx.version()?;
        let build = version
            .build
            .as_ref()
            .ok_or_else(|| StageError::from(ConfigError::MissingBuild(version.full_id())))?;

        let paths = CompilePaths::new(&self.compiles_base, &ctx.project.id, &version.version_id);
        if paths.is_compiled() && !self.force_compile {
            debug!(version = %version, "already compiled");
            ctx.compile = Some(paths);
            return Ok(());
        }

        info!(version = %version, "compiling");
        self.clean_outputs(&paths)?;

        let checkout_src = ctx.checkout()?.path().join(&build.src);
        if !checkout_src.is_dir() {
            return Err(StageError::Failed(format!(
                "source directory '{}' missing in checkout of {}",
                build.src, version
            )));
        }

        fsutil::copy_tree(&checkout_src, &paths.original_sources())?;
        self.copy_misuse_sources(version, &paths)?;
        self.copy_pattern_sources(version, &paths)?;

        let build_dir = paths.build_dir();
        let build_src = build_dir.join(&build.src);
        self.assemble_build_dir(version, &checkout_src, &build_src, &build_dir)?;
        fs::create_dir_all(paths.dependencies())?;

        if let Err(err) = self
            .builder
            .build(&build.commands, &build_dir, &paths.dependencies())
        {
            // A later non-forced run must not mistake partial output for success.
            let _ = fsutil::remove_tree(&paths.original_classes());
            return Err(err.into());
        }

        let classes_dir = build_dir.join(&build.classes);
        if !classes_dir.is_dir() {
            return Err(StageError::Failed(format!(
                "build of {} did not produce classes directory '{}'",
                version, build.classes
            )));
        }

        fsutil::copy_tree(&classes_dir, &paths.original_classes())?;
        self.partition_classes(version, &classes_dir, &paths)?;

        ctx.compile = Some(paths);
        Ok(())
    }
}

/// Copy the class files compiled from one source file
///
/// Matches the source's basename in the same package directory, including
/// nested and anonymous class outputs sharing a `$`-delimited basename
/// (`Mu.class`, `Mu$1.class`, `Mu$Inner.class` for `Mu.java`).
fn copy_matching_classes(
    classes_dir: &Path,
    source_rel: &Path,
    target_dir: &Path,
) -> std::io::Result<usize> {
    let Some(stem) = source_rel.file_stem().and_then(|stem| stem.to_str()) else {
        return Ok(0);
    };
    let rel_dir = source_rel.parent().unwrap_or_else(|| Path::new(""));
    let search_dir = classes_dir.join(rel_dir);
    if !search_dir.is_dir() {
        return Ok(0);
    }

    let mut copied = 0;
    for entry in fs::read_dir(&search_dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        let Some(base) = name.strip_suffix(".class") else {
            continue;
        };
        let matches = base == stem
            || base
                .strip_prefix(stem)
                .is_some_and(|rest| rest.starts_with('$'));
        if matches {
            fsutil::copy_file(&entry.path(), &target_dir.join(rel_dir).join(name))?;
            copied += 1;
        }
    }
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    use misusebench_core::{
        BuildConfig, Checkout, CommandError, Location, Misuse, Pattern, Project, RepoKind,
        Repository,
    };
    use tempfile::TempDir;

    type Calls = Rc<RefCell<Vec<Vec<String>>>>;

    /// Fake build collaborator: mirrors `.java` files under `src/` into
    /// `classes/` as `.class` files and records every invocation.
    struct FakeBuilder {
        calls: Calls,
        fail: bool,
        extra_classes: Vec<PathBuf>,
    }

    impl FakeBuilder {
        fn new(calls: Calls) -> Self {
            Self {
                calls,
                fail: false,
                extra_classes: Vec::new(),
            }
        }
    }

    impl Builder for FakeBuilder {
        fn build(
            &self,
            commands: &[String],
            build_dir: &Path,
            _dependencies_dir: &Path,
        ) -> Result<(), CommandError> {
            self.calls.borrow_mut().push(commands.to_vec());
            if self.fail {
                return Err(CommandError::Failed {
                    command: "-cmd-".into(),
                    output: "-error-".into(),
                });
            }
            let src = build_dir.join("src");
            let classes = build_dir.join("classes");
            fs::create_dir_all(&classes).unwrap();
            mirror_classes(&src, &src, &classes);
            for extra in &self.extra_classes {
                let path = classes.join(extra);
                fs::create_dir_all(path.parent().unwrap()).unwrap();
                fs::write(path, "").unwrap();
            }
            Ok(())
        }
    }

    fn mirror_classes(root: &Path, dir: &Path, classes: &Path) {
        if !dir.is_dir() {
            return;
        }
        for entry in fs::read_dir(dir).unwrap() {
            let entry = entry.unwrap();
            let path = entry.path();
            if path.is_dir() {
                mirror_classes(root, &path, classes);
            } else if path.extension().is_some_and(|ext| ext == "java") {
                let rel = path.strip_prefix(root).unwrap().with_extension("class");
                let target = classes.join(rel);
                fs::create_dir_all(target.parent().unwrap()).unwrap();
                fs::write(target, "").unwrap();
            }
        }
    }

    struct Fixture {
        temp: TempDir,
        project: Project,
        version: Version,
        calls: Calls,
    }

    impl Fixture {
        fn new() -> Self {
            let temp = TempDir::new().unwrap();
            let project = Project::new(
                "proj",
                Some(Repository {
                    kind: RepoKind::Synthetic,
                    url: None,
                }),
            );
            let version_dir = temp.path().join("data/proj/versions/v1");
            fs::create_dir_all(version_dir.join("checkout/src")).unwrap();
            let version = Version::new("proj", "v1", &version_dir).with_build(BuildConfig {
                src: "src".into(),
                commands: vec!["build".into()],
                classes: "classes".into(),
            });
            Self {
                temp,
                project,
                version,
                calls: Calls::default(),
            }
        }

        fn checkouts_base(&self) -> PathBuf {
            self.temp.path().join("checkouts")
        }

        fn write_source(&self, name: &str) {
            let path = self.version.data_path.join("checkout/src").join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, "class X {}").unwrap();
        }

        fn add_misuse(&mut self, misuse_id: &str, file: &str) {
            self.version.misuses.push(Misuse::new(
                "proj",
                misuse_id,
                Location {
                    file: file.into(),
                    method: None,
                },
            ));
        }

        fn add_pattern(&mut self, misuse_id: &str, relative: &str) {
            let pattern_path = self.temp.path().join("patterns").join(relative);
            fs::create_dir_all(pattern_path.parent().unwrap()).unwrap();
            fs::write(&pattern_path, "class P {}").unwrap();
            let misuse = self
                .version
                .misuses
                .iter_mut()
                .find(|misuse| misuse.misuse_id == misuse_id)
                .expect("misuse registered");
            misuse.patterns.push(Pattern::new(pattern_path, relative));
        }

        fn paths(&self) -> CompilePaths {
            CompilePaths::new(&self.checkouts_base(), "proj", "v1")
        }

        fn run_with(&self, builder: FakeBuilder, force: bool) -> Result<(), StageError> {
            let checkout =
                Checkout::for_version(&self.checkouts_base(), &self.project, &self.version)
                    .unwrap();
            checkout.materialize(false).unwrap();

            let stage = CompileStage::new(&self.checkouts_base(), force, Box::new(builder));
            let ctx = StageContext::new(&self.project);
            let mut vctx = ctx.for_version(&self.version);
            vctx.checkout = Some(checkout);
            stage.run(&mut vctx)
        }

        fn run(&self) -> Result<(), StageError> {
            self.run_with(FakeBuilder::new(self.calls.clone()), false)
        }
    }

    #[test]
    fn copies_original_sources() {
        let fixture = Fixture::new();
        fixture.write_source("a.file");

        fixture.run().unwrap();

        assert!(fixture.paths().original_sources().join("a.file").is_file());
    }

    #[test]
    fn copies_misuse_sources() {
        let mut fixture = Fixture::new();
        fixture.write_source("mu.file");
        fixture.add_misuse("mu1", "mu.file");

        fixture.run().unwrap();

        assert!(fixture.paths().misuse_sources().join("mu.file").is_file());
    }

    #[test]
    fn copies_pattern_sources() {
        let mut fixture = Fixture::new();
        fixture.write_source("mu.java");
        fixture.add_misuse("m", "mu.java");
        fixture.add_pattern("m", "a.java");

        fixture.run().unwrap();

        assert!(fixture.paths().pattern_sources("m").join("a.java").is_file());
    }

    #[test]
    fn skips_without_build_config() {
        let mut fixture = Fixture::new();
        fixture.version.build = None;

        let err = fixture.run().unwrap_err();
        assert!(err.is_skip());
    }

    #[test]
    fn skips_build_when_classes_exist() {
        let fixture = Fixture::new();
        fixture.write_source("some.java");
        fs::create_dir_all(fixture.paths().original_classes()).unwrap();

        fixture.run().unwrap();

        assert!(fixture.calls.borrow().is_empty());
        assert!(!fixture
            .paths()
            .original_classes()
            .join("some.class")
            .exists());
    }

    #[test]
    fn force_rebuilds_despite_existing_classes() {
        let fixture = Fixture::new();
        fixture.write_source("some.java");
        fs::create_dir_all(fixture.paths().original_classes()).unwrap();

        fixture
            .run_with(FakeBuilder::new(fixture.calls.clone()), true)
            .unwrap();

        assert_eq!(fixture.calls.borrow().len(), 1);
    }

    #[test]
    fn force_cleans_stale_outputs() {
        let fixture = Fixture::new();
        fixture.write_source("a.file");
        let stale = fixture.paths().original_sources().join("old.file");
        fs::create_dir_all(stale.parent().unwrap()).unwrap();
        fs::write(&stale, "stale").unwrap();

        fixture
            .run_with(FakeBuilder::new(fixture.calls.clone()), true)
            .unwrap();

        assert!(!stale.exists());
        assert!(fixture.paths().original_sources().join("a.file").is_file());
    }

    #[test]
    fn passes_build_commands() {
        let mut fixture = Fixture::new();
        fixture.version.build.as_mut().unwrap().commands = vec!["a".into(), "b".into()];

        fixture.run().unwrap();

        assert_eq!(*fixture.calls.borrow(), vec![vec!["a".to_string(), "b".to_string()]]);
    }

    #[test]
    fn copies_additional_compile_files() {
        let fixture = Fixture::new();
        let additional = fixture.version.data_path.join("compile/additional.file");
        fs::create_dir_all(additional.parent().unwrap()).unwrap();
        fs::write(additional, "extra").unwrap();

        fixture.run().unwrap();

        assert!(fixture.paths().build_dir().join("additional.file").is_file());
    }

    #[test]
    fn build_failure_cleans_classes_and_fails() {
        let fixture = Fixture::new();
        fixture.write_source("a.java");
        let mut builder = FakeBuilder::new(fixture.calls.clone());
        builder.fail = true;

        let err = fixture.run_with(builder, false).unwrap_err();

        assert!(!err.is_skip());
        assert!(matches!(err, StageError::Command(_)));
        assert!(!fixture.paths().is_compiled());
    }

    #[test]
    fn partitions_misuse_classes_including_inner() {
        let mut fixture = Fixture::new();
        fixture.write_source("mu.java");
        fixture.add_misuse("mu1", "mu.java");
        let mut builder = FakeBuilder::new(fixture.calls.clone());
        builder.extra_classes = vec!["mu$1.class".into(), "mu$Inner.class".into()];

        fixture.run_with(builder, false).unwrap();

        let misuse_classes = fixture.paths().misuse_classes();
        assert!(misuse_classes.join("mu.class").is_file());
        assert!(misuse_classes.join("mu$1.class").is_file());
        assert!(misuse_classes.join("mu$Inner.class").is_file());
    }

    #[test]
    fn does_not_match_unrelated_prefixes() {
        let mut fixture = Fixture::new();
        fixture.write_source("mu.java");
        fixture.write_source("mutable.java");
        fixture.add_misuse("mu1", "mu.java");

        fixture.run().unwrap();

        let misuse_classes = fixture.paths().misuse_classes();
        assert!(misuse_classes.join("mu.class").is_file());
        assert!(!misuse_classes.join("mutable.class").exists());
    }

    #[test]
    fn partitions_pattern_classes_in_package() {
        let mut fixture = Fixture::new();
        fixture.write_source("mu.java");
        fixture.add_misuse("m", "mu.java");
        fixture.add_pattern("m", "a/b.java");

        fixture.run().unwrap();

        assert!(fixture
            .paths()
            .pattern_classes("m")
            .join("a/b.class")
            .is_file());
    }

    #[test]
    fn second_run_does_not_rebuild() {
        let fixture = Fixture::new();
        fixture.write_source("a.java");

        fixture.run().unwrap();
        fixture.run().unwrap();

        assert_eq!(fixture.calls.borrow().len(), 1);
    }
}
