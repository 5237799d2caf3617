//! Behaviour of a whole compilation run

use pretty_assertions::assert_eq;
use stackvars::compiler::Compiler;
use stackvars::definitions::DefinitionParser;
use stackvars::expansion::Expansions;
use stackvars::schema::SchemaParser;
use stackvars::sources::Sources;
use stackvars::value::{Scalar, Value, Variables};
use std::path::{Path, PathBuf};

struct Project {
    dir: tempfile::TempDir,
}

impl Project {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("tempdir"),
        }
    }

    fn file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, content).expect("write");
        path
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

fn compile(sources: &Sources) -> String {
    compile_with(sources, Expansions::for_environment("dev"))
}

fn compile_with(sources: &Sources, expansions: Expansions) -> String {
    Compiler::new(expansions)
        .compile(sources, Variables::new())
        .expect("compiles")
        .render()
}

fn definitions(paths: &[&Path]) -> Sources {
    let mut sources = Sources::default();
    for path in paths {
        sources.add_definition(*path);
    }
    sources
}

#[test]
fn compiling_twice_is_identical() {
    let project = Project::new();
    let schema = project.file(
        "variables.tf",
        "variable \"tags\" {\n  default = { team = \"core\" }\n}\n",
    );
    let base = project.file(
        "base.tfvars",
        "zones = [\"a\", \"b\"]\ntags = { env = \"dev\" }\nreplicas = 2\n",
    );

    let mut sources = definitions(&[&base]);
    sources.add_schema(&schema);

    assert_eq!(compile(&sources), compile(&sources));
}

#[test]
fn later_definition_wins() {
    let project = Project::new();
    let a = project.file("a.tfvars", "region = \"a\"\nother = 1\n");
    let b = project.file("b.tfvars", "region = \"b\"\n");

    let ab = compile(&definitions(&[&a, &b]));
    let ba = compile(&definitions(&[&b, &a]));

    assert!(ab.contains("region = \"b\"\n"));
    assert!(ba.contains("region = \"a\"\n"));
    assert!(ab.contains("other = 1\n"));
}

#[test]
fn schema_map_default_merges_with_definition() {
    let project = Project::new();
    let schema = project.file(
        "variables.tf",
        r#"
variable "tags" {
  default = {
    team = "core"
    env  = "x"
  }
}
"#,
    );
    let dev = project.file("dev.tfvars", "tags = { env = \"prod\" }\n");

    let mut sources = definitions(&[&dev]);
    sources.add_schema(&schema);

    let set = Compiler::new(Expansions::default())
        .compile(&sources, Variables::new())
        .expect("compiles");

    let expected: stackvars::value::Map = [
        ("team".to_string(), Scalar::from("core")),
        ("env".to_string(), Scalar::from("prod")),
    ]
    .into_iter()
    .collect();
    assert_eq!(set.get("tags"), Some(&Value::Map(expected)));
}

#[test]
fn placeholders() {
    let mut expansions = Expansions::default();
    expansions.insert("ENV_TOKEN", "staging");

    let variables = DefinitionParser::new(&expansions).parse_str(
        r#"
known = "<%= expansion('ENV_TOKEN') %>"
unknown = "<%= expansion('OTHER') %>"
"#,
    );

    assert_eq!(variables["known"], Value::from("staging"));
    assert_eq!(variables["unknown"], Value::from("<%= expansion('OTHER') %>"));
}

#[test]
fn optional_default_becomes_map_default() {
    let defaults = SchemaParser::new().parse_str(
        r#"
variable "scaling" {
  type = object({ replicas = optional(number, 3) })
}
"#,
    );

    let expected: stackvars::value::Map = [("replicas".to_string(), Scalar::from(3.0))]
        .into_iter()
        .collect();
    assert_eq!(defaults["scaling"], Value::Map(expected));
}

#[test]
fn lists_survive_rendering() {
    let project = Project::new();
    let input = project.file(
        "base.tfvars",
        "allowed_cidrs = [\"10.0.0.0/16\", \"192.168.0.0/24\"]\n",
    );

    let rendered = compile(&definitions(&[&input]));
    let reparsed = DefinitionParser::new(&Expansions::default()).parse_str(&rendered);

    assert_eq!(
        reparsed["allowed_cidrs"],
        Value::from(vec!["10.0.0.0/16", "192.168.0.0/24"])
    );
}

#[test]
fn rendered_output_parses_back_to_the_same_set() {
    let project = Project::new();
    let input = project.file(
        "base.tfvars",
        r#"
message = "say \"hi\"\n"
ratio = 0.5
enabled = false
tags = {
  team = "core"
  "kubernetes.io/role" = "web"
}
"#,
    );
    let sources = definitions(&[&input]);

    let rendered = compile(&sources);
    let output = project.file("compiled.tfvars", &rendered);

    assert_eq!(compile(&definitions(&[&output])), rendered);
}

#[test]
fn missing_files_are_skipped() {
    let project = Project::new();
    let valid = project.file("valid.tfvars", "a = \"x\"\n");
    let missing = project.path("missing.tfvars");

    let rendered = compile(&definitions(&[&missing, &valid]));

    assert_eq!(
        rendered,
        "# Compiled variables from multiple tfvars files\n# Generated by stackvars\n\na = \"x\"\n"
    );
}

#[test]
fn output_is_sorted_by_name() {
    let project = Project::new();
    let first = project.file("first.tfvars", "zulu = 1\nalpha = 2\n");
    let second = project.file("second.tfvars", "mike = 3\n");

    let ordered = compile(&definitions(&[&first, &second]));
    let reversed = compile(&definitions(&[&second, &first]));

    assert_eq!(ordered, reversed);

    let names: Vec<_> = ordered
        .lines()
        .filter_map(|line| line.split_once(" = ").map(|(name, _)| name))
        .collect();
    assert_eq!(names, ["alpha", "mike", "zulu"]);
}
