//! Project runs over on-disk fixtures

use pretty_assertions::assert_eq;
use wetwire_discover::DiscoveryError;
use wetwire_lint::{LintConfig, LintError, ProjectRunner};
use wetwire_test_utils::{
    TestProject, CLEAN_WORKFLOW, MISSING_NEEDS, SYNTAX_ERROR, UNUSED_OUTPUT,
};

#[test]
fn fix_writes_only_changed_files() {
    let project = TestProject::with_files(&[
        ("workflows/ci.py", UNUSED_OUTPUT),
        ("workflows/clean.py", CLEAN_WORKFLOW),
    ]);
    let clean_before = project.modified("workflows/clean.py");

    let summary = ProjectRunner::new(LintConfig::default())
        .with_fix(true)
        .run(project.root())
        .unwrap();

    assert_eq!(summary.files.len(), 2);
    assert_eq!(summary.written(), 1);
    assert_eq!(summary.fixed(), 1);
    assert_eq!(summary.exit_code(), 0);
    assert_eq!(project.read("workflows/clean.py"), CLEAN_WORKFLOW);
    assert_eq!(project.modified("workflows/clean.py"), clean_before);
    assert!(!project.read("workflows/ci.py").contains(r#""b":"#));

    let written: Vec<_> = summary.files.iter().filter(|f| f.written).collect();
    assert_eq!(written[0].path, project.path("workflows/ci.py"));
}

#[test]
fn lint_without_fix_leaves_files_alone() {
    let project = TestProject::with_files(&[("ci.py", UNUSED_OUTPUT)]);

    let summary = ProjectRunner::new(LintConfig::default()).run(project.root()).unwrap();

    assert_eq!(summary.written(), 0);
    assert_eq!(summary.warning_count(), 1);
    assert_eq!(summary.diagnostics().next().map(|d| d.rule_id.as_str()), Some("WAG050"));
    assert_eq!(summary.exit_code(), 0);
    assert_eq!(project.read("ci.py"), UNUSED_OUTPUT);
}

#[test]
fn parse_errors_are_collected_not_fatal() {
    let project = TestProject::with_files(&[("broken.py", SYNTAX_ERROR), ("clean.py", CLEAN_WORKFLOW)]);

    let summary = ProjectRunner::new(LintConfig::default())
        .with_fix(true)
        .run(project.root())
        .unwrap();

    assert_eq!(summary.files.len(), 1);
    assert_eq!(summary.parse_errors.len(), 1);
    assert_eq!(summary.parse_errors[0].path, project.path("broken.py"));
    assert!(summary.parse_errors[0].line >= 1);
    assert_eq!(summary.exit_code(), 1);
    assert_eq!(project.read("broken.py"), SYNTAX_ERROR);
}

#[test]
fn blocking_findings_fail_the_run() {
    let project = TestProject::with_files(&[("ci.py", MISSING_NEEDS)]);

    let summary = ProjectRunner::new(LintConfig::default()).run(project.root()).unwrap();

    assert_eq!(summary.error_count(), 1);
    assert_eq!(summary.exit_code(), 1);
}

#[test]
fn config_file_disables_rules() {
    let project = TestProject::with_files(&[
        ("ci.py", MISSING_NEEDS),
        ("wetwire.toml", "disabled_rules = [\"WAG054\"]\n"),
    ]);

    let config = LintConfig::discover(project.root()).unwrap();
    let summary = ProjectRunner::new(config).run(project.root()).unwrap();

    assert_eq!(summary.files.len(), 1);
    assert_eq!(summary.error_count(), 0);
    assert_eq!(summary.exit_code(), 0);
}

const SPLIT_JOBS: &str = r#"from wetwire_github.workflow import Job, Step

build = Job(
    runs_on="ubuntu-latest",
    outputs={"version": "${{ steps.v.outputs.version }}", "sha": "${{ steps.v.outputs.sha }}"},
    steps=[Step(id="v", run="echo version=1 >> $GITHUB_OUTPUT")],
)
"#;

const SPLIT_WORKFLOWS: &str = r#"from wetwire_github.workflow import Job, Step, Workflow
from .jobs import build

deploy = Job(runs_on="ubuntu-latest", needs=["build"], steps=[Step(run="echo ${{ needs.build.outputs.version }}")])

ci = Workflow(name="CI", on={"push": {}}, jobs={"build": build, "deploy": deploy})
"#;

#[test]
fn jobs_imported_from_sibling_modules_resolve() {
    let project = TestProject::with_files(&[
        ("ci/jobs.py", SPLIT_JOBS),
        ("ci/workflows.py", SPLIT_WORKFLOWS),
    ]);

    let summary = ProjectRunner::new(LintConfig::default()).run(project.root()).unwrap();

    assert_eq!(summary.files.len(), 2);
    assert_eq!(summary.error_count(), 0, "{:#?}", summary.files);
    assert_eq!(summary.exit_code(), 0);

    let unused: Vec<_> = summary.diagnostics().collect();
    assert_eq!(unused.len(), 1);
    assert_eq!(unused[0].rule_id, "WAG050");
    assert_eq!(unused[0].file, project.path("ci/jobs.py"));
    assert!(unused[0].message.contains("'sha'"));
}

#[test]
fn fix_removes_output_of_job_defined_in_sibling_module() {
    let project = TestProject::with_files(&[
        ("ci/jobs.py", SPLIT_JOBS),
        ("ci/workflows.py", SPLIT_WORKFLOWS),
    ]);

    let summary = ProjectRunner::new(LintConfig::default())
        .with_fix(true)
        .run(project.root())
        .unwrap();

    assert_eq!(summary.fixed(), 1);
    assert_eq!(summary.written(), 1);
    assert_eq!(summary.diagnostics().count(), 0);
    let jobs = project.read("ci/jobs.py");
    assert!(jobs.contains(r#"outputs={"version": "${{ steps.v.outputs.version }}"},"#));
    assert!(!jobs.contains("sha"));
    assert_eq!(project.read("ci/workflows.py"), SPLIT_WORKFLOWS);
}

#[test]
fn missing_root_aborts() {
    let project = TestProject::new();
    let err = ProjectRunner::new(LintConfig::default())
        .run(&project.path("nope"))
        .unwrap_err();
    assert!(matches!(err, LintError::Discovery(DiscoveryError::RootNotFound(_))));
}
