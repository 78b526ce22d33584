//! Testing utilities for the wetwire workspace
//!
//! Fixture sources and on-disk project helpers.

#![allow(missing_docs)]

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Clean two-job workflow: every output consumed, actions pinned
pub const CLEAN_WORKFLOW: &str = r#""""CI workflow."""

from wetwire_github.workflow import Job, Step, Workflow

checkout = Step(uses="actions/checkout@v4")

build = Job(
    runs_on="ubuntu-latest",
    outputs={"version": "${{ steps.version.outputs.value }}"},
    steps=[
        checkout,
        Step(id="version", run="echo value=1.0 >> $GITHUB_OUTPUT"),
    ],
)

deploy = Job(
    runs_on="ubuntu-latest",
    needs=["build"],
    steps=[Step(run="echo deploying ${{ needs.build.outputs.version }}")],
)

ci = Workflow(
    name="CI",
    on={"push": {"branches": ["main"]}},
    jobs={"build": build, "deploy": deploy},
)
"#;

/// `build` declares outputs `a` and `b`; only `a` is consumed downstream
pub const UNUSED_OUTPUT: &str = r#"from wetwire_github.workflow import Job, Step, Workflow

build = Job(
    runs_on="ubuntu-latest",
    outputs={"a": "${{ steps.s.outputs.a }}", "b": "${{ steps.s.outputs.b }}"},
    steps=[Step(id="s", run="echo a=1 >> $GITHUB_OUTPUT")],
)

deploy = Job(
    runs_on="ubuntu-latest",
    needs=["build"],
    steps=[Step(run="echo ${{ needs.build.outputs.a }}")],
)

ci = Workflow(name="CI", on={"push": {}}, jobs={"build": build, "deploy": deploy})
"#;

/// A step reads the output of a step declared after it; the job outputs read it too
pub const FORWARD_REFERENCE: &str = r#"from wetwire_github.workflow import Job, Step, Workflow

build = Job(
    runs_on="ubuntu-latest",
    outputs={"x": "${{ steps.later.outputs.x }}"},
    steps=[
        Step(id="early", run="echo ${{ steps.later.outputs.x }}"),
        Step(id="later", run="echo x=1 >> $GITHUB_OUTPUT"),
    ],
)

publish = Job(
    runs_on="ubuntu-latest",
    needs=["build"],
    steps=[Step(run="echo ${{ needs.build.outputs.x }}")],
)

ci = Workflow(name="CI", on={"push": {}}, jobs={"build": build, "publish": publish})
"#;

/// `deploy` needs a job that does not exist
pub const MISSING_NEEDS: &str = r#"from wetwire_github.workflow import Job, Step, Workflow

build = Job(runs_on="ubuntu-latest", steps=[Step(run="make")])
deploy = Job(runs_on="ubuntu-latest", needs=["missing"], steps=[Step(run="make deploy")])

ci = Workflow(name="CI", on={"push": {}}, jobs={"build": build, "deploy": deploy})
"#;

/// `A` and `B` need each other
pub const CYCLE: &str = r#"from wetwire_github.workflow import Job, Step, Workflow

a = Job(runs_on="ubuntu-latest", needs=["B"], steps=[Step(run="echo a")])
b = Job(runs_on="ubuntu-latest", needs=["A"], steps=[Step(run="echo b")])

ci = Workflow(name="CI", on={"push": {}}, jobs={"A": a, "B": b})
"#;

/// `D` needs `B` and `C`, both of which need `A`
pub const DIAMOND: &str = r#"from wetwire_github.workflow import Job, Step, Workflow

d = Job(runs_on="ubuntu-latest", needs=["B", "C"], steps=[Step(run="echo d")])
c = Job(runs_on="ubuntu-latest", needs=["A"], steps=[Step(run="echo c")])
b = Job(runs_on="ubuntu-latest", needs=["A"], steps=[Step(run="echo b")])
a = Job(runs_on="ubuntu-latest", steps=[Step(run="echo a")])

ci = Workflow(name="CI", on={"push": {}}, jobs={"D": d, "C": c, "B": b, "A": a})
"#;

/// Job env binds two secrets; only `API_TOKEN` is read by a step
pub const ORPHAN_SECRET: &str = r#"from wetwire_github.workflow import Job, Step, Workflow

deploy = Job(
    runs_on="ubuntu-latest",
    env={"API_TOKEN": "${{ secrets.API_TOKEN }}", "UNUSED": "${{ secrets.UNUSED_SECRET }}"},
    steps=[Step(run="curl -H \"Authorization: $API_TOKEN\" https://example.com")],
)

ci = Workflow(name="Deploy", on={"push": {}}, jobs={"deploy": deploy})
"#;

/// Several independent fixable findings in one file
pub const MIXED_FIXABLE: &str = r#"from wetwire_github.workflow import Job, Step, Workflow

test = Job(
    runs_on="ubuntu-latest",
    steps=[
        Step(uses="actions/checkout"),
        Step(uses="actions/setup-python", with_={"python-version": "3.12"}),
        Step(run="pytest"),
        Step(if_="${{ always() }}", run="echo done"),
    ],
)

ci = Workflow(name="Tests", on={"pull_request": {}}, jobs={"test": test})
"#;

/// Not valid Python
pub const SYNTAX_ERROR: &str = "from wetwire_github.workflow import Job\n\nbuild = Job(runs_on=\"ubuntu-latest\"\n";

/// Temporary project directory
#[derive(Debug)]
pub struct TestProject {
    dir: TempDir,
}

impl TestProject {
    /// Create empty project
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("create temp dir"),
        }
    }

    /// Create project with files
    pub fn with_files(files: &[(&str, &str)]) -> Self {
        let project = Self::new();
        for (path, contents) in files {
            project.write(path, contents);
        }
        project
    }

    /// Project root
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Absolute path of a project file
    pub fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    /// Write a project file, creating parent directories
    pub fn write(&self, relative: &str, contents: &str) -> PathBuf {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dirs");
        }
        fs::write(&path, contents).expect("write fixture");
        path
    }

    /// Read a project file
    pub fn read(&self, relative: &str) -> String {
        fs::read_to_string(self.path(relative)).expect("read fixture")
    }

    /// Modification time of a project file
    pub fn modified(&self, relative: &str) -> std::time::SystemTime {
        fs::metadata(self.path(relative))
            .and_then(|m| m.modified())
            .expect("file metadata")
    }
}

impl Default for TestProject {
    fn default() -> Self {
        Self::new()
    }
}
