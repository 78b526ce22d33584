use pretty_assertions::assert_eq;
use wetwire_discover::{DiscoveryCache, DiscoveryEngine, DiscoveryError, DiscoveryOptions};
use wetwire_model::EntityKind;
use wetwire_test_utils::{TestProject, CLEAN_WORKFLOW, MISSING_NEEDS, SYNTAX_ERROR};

#[test]
fn discovers_entities_across_directory() {
    let project = TestProject::with_files(&[
        ("ci/build.py", CLEAN_WORKFLOW),
        ("ci/release.py", MISSING_NEEDS),
        ("README.md", "# not python"),
        (".hidden/skip.py", CLEAN_WORKFLOW),
    ]);
    let engine = DiscoveryEngine::default();
    let report = engine.discover_directory(project.root()).unwrap();

    assert!(report.is_clean());
    assert_eq!(report.modules.len(), 2);
    assert_eq!(report.entities_of(EntityKind::Workflow).count(), 2);

    // Sorted path order: build.py before release.py
    let first = &report.entities[0];
    assert!(first.location.file.ends_with("ci/build.py"));
    assert_eq!(first.id.as_str(), "checkout");
}

#[test]
fn syntax_errors_are_scoped_to_their_file() {
    let project = TestProject::with_files(&[
        ("good.py", CLEAN_WORKFLOW),
        ("broken.py", SYNTAX_ERROR),
    ]);
    let report = DiscoveryEngine::default()
        .discover_directory(project.root())
        .unwrap();

    assert_eq!(report.modules.len(), 1);
    assert_eq!(report.errors.len(), 1);
    match &report.errors[0] {
        DiscoveryError::Syntax { path, .. } => assert!(path.ends_with("broken.py")),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(report.model().workflows.len(), 1);
}

#[test]
fn model_spans_modules() {
    let project = TestProject::with_files(&[
        (
            "jobs.py",
            "from wetwire_github.workflow import Job, Step\n\nbuild = Job(runs_on=\"ubuntu-latest\", steps=[Step(run=\"make\")])\n",
        ),
        (
            "workflows.py",
            "from wetwire_github.workflow import Workflow\nfrom jobs import build\n\nci = Workflow(name=\"CI\", on={\"push\": {}}, jobs={\"build\": build})\n",
        ),
    ]);
    let report = DiscoveryEngine::default()
        .discover_directory(project.root())
        .unwrap();
    let model = report.model();
    assert_eq!(model.workflows.len(), 1);
    assert!(model.detached_jobs.is_empty());
    let build = model.workflows[0].job("build").unwrap();
    assert!(build.location.file.ends_with("jobs.py"));
    assert_eq!(build.steps.len(), 1);
}

#[test]
fn cache_serves_unchanged_files() {
    let project = TestProject::with_files(&[("ci.py", CLEAN_WORKFLOW)]);
    let cache = DiscoveryCache::new(64);
    let engine = DiscoveryEngine::new(DiscoveryOptions::default()).with_cache(cache.clone());

    let first = engine.discover_directory(project.root()).unwrap();
    let second = engine.discover_directory(project.root()).unwrap();
    assert!(std::sync::Arc::ptr_eq(&first.modules[0], &second.modules[0]));
    assert_eq!(cache.stats().entry_count, 1);
}

#[test]
fn single_file_root() {
    let project = TestProject::with_files(&[("ci.py", CLEAN_WORKFLOW)]);
    let engine = DiscoveryEngine::default();
    let files = engine.collect_files(&project.path("ci.py")).unwrap();
    assert_eq!(files, vec![project.path("ci.py")]);
}
