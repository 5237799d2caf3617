//! Snapshot tests
//!
//! Builds a small project on disk, resolves and compiles it like the cli does and compares the
//! rendered output.

use stackvars::compiler::Compiler;
use stackvars::config::Config;
use stackvars::resolve::Resolver;
use stackvars::sources::Sources;
use stackvars::value::Variables;
use std::path::Path;

fn write(root: &Path, path: &str, content: &str) {
    let path = root.join(path);
    std::fs::create_dir_all(path.parent().expect("has parent")).expect("mkdir");
    std::fs::write(path, content).expect("write");
}

fn project() -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    let root = dir.path();

    write(
        root,
        "stackvars.yaml",
        r#"
defaults:
  environment: dev
expansions:
  ":REGION": us-gov-west-1
"#,
    );
    write(
        root,
        "environments/prod.yaml",
        r#"
expansions:
  ":REGION": us-gov-east-1
"#,
    );
    write(
        root,
        "app/stacks/web/variables.tf",
        r#"
variable "region" {
  description = <<-EOT
    Region to deploy to. Pick one of {
    us-gov-west-1, us-gov-east-1 (
    EOT
  type    = string
  default = "us-east-1"
}

variable "name" {
  type = string
}

variable "scaling" {
  type = object({
    min = optional(number, 1)
    max = optional(number, 3)
  })
}

variable "tags" {
  type = map(string)
  default = {
    team = "core"
    env  = "x"
  }
}

variable "allowed_cidrs" {
  type    = list(string)
  default = []
}

locals {
  unused = { a = 1 }
}
"#,
    );
    write(
        root,
        "config/terraform/tfvars/base.tfvars",
        r#"
# shared by all environments
region = "<%= expansion(':REGION') %>"
allowed_cidrs = [
  "10.0.0.0/16",
  "192.168.0.0/24",
]
"#,
    );
    write(
        root,
        "config/terraform/tfvars/dev.tfvars",
        r#"
name    = "web-<%= expansion(':ENV') %>"
scaling = { max = 5 }
tags    = { env = "dev" }
"#,
    );
    write(
        root,
        "config/terraform/tfvars/prod.tfvars",
        r#"
name = "web-<%= expansion(':ENV') %>"
tags = {
  env   = "prod"
  "kubernetes.io/role" = "web"
}
"#,
    );

    dir
}

fn compile(root: &Path, environment: Option<&str>, overrides: Variables) -> String {
    let config = Config::load(root, environment).expect("valid config");
    let environment = environment.unwrap_or(&config.defaults.environment);
    let sources = Resolver::new(root, &config).sources(environment, Some("web"), &Sources::default());

    Compiler::new(config.expansions(environment))
        .compile(&sources, overrides)
        .expect("compiles")
        .render()
}

#[test]
fn default_environment() {
    let dir = project();
    let rendered = compile(dir.path(), None, Variables::new());

    insta::assert_snapshot!(rendered.trim_end(), @r###"
# Compiled variables from multiple tfvars files
# Generated by stackvars

allowed_cidrs = ["10.0.0.0/16", "192.168.0.0/24"]
name = "web-dev"
region = "us-gov-west-1"
scaling = {
  min = 1
  max = 5
}
tags = {
  team = "core"
  env = "dev"
}
"###);
}

#[test]
fn prod_environment_with_overrides() {
    let dir = project();
    let config = Config::load(dir.path(), Some("prod")).expect("valid config");
    let overrides = stackvars::overrides::parse_overrides(
        ["replicas=3", r#"allowed_cidrs=["0.0.0.0/0"]"#],
        &config.expansions("prod"),
    )
    .expect("valid overrides");

    let rendered = compile(dir.path(), Some("prod"), overrides);

    insta::assert_snapshot!(rendered.trim_end(), @r###"
# Compiled variables from multiple tfvars files
# Generated by stackvars

allowed_cidrs = ["0.0.0.0/0"]
name = "web-prod"
region = "us-gov-east-1"
replicas = 3
scaling = {
  min = 1
  max = 3
}
tags = {
  team = "core"
  env = "prod"
  "kubernetes.io/role" = "web"
}
"###);
}

#[test]
fn output_is_valid_hcl() {
    let dir = project();

    for environment in ["dev", "prod"] {
        let rendered = compile(dir.path(), Some(environment), Variables::new());
        let parsed: serde_json::Value = hcl::from_str(&rendered).expect("valid hcl");

        assert_eq!(parsed["name"], format!("web-{environment}"));
        assert_eq!(parsed["scaling"]["min"], 1);
        assert_eq!(parsed["allowed_cidrs"][1], "192.168.0.0/24");
    }
}

#[test]
fn serialized_set() {
    let dir = project();
    let config = Config::load(dir.path(), None).expect("valid config");
    let sources = Resolver::new(dir.path(), &config).sources("dev", Some("web"), &Sources::default());
    let set = Compiler::new(config.expansions("dev"))
        .compile(&sources, Variables::new())
        .expect("compiles");

    let json = serde_json::to_string_pretty(&set).expect("serializable");
    insta::assert_snapshot!(json, @r###"
{
  "allowed_cidrs": [
    "10.0.0.0/16",
    "192.168.0.0/24"
  ],
  "name": "web-dev",
  "region": "us-gov-west-1",
  "scaling": {
    "min": 1,
    "max": 5
  },
  "tags": {
    "team": "core",
    "env": "dev"
  }
}
"###);
}
