//! Single project patch tests.

use predicates::prelude::*;

use super::common::{TestEnv, fixture_content};

#[test]
fn inserts_hint_path_into_self_closing_reference() {
  let env = TestEnv::empty();
  let project = env.write_file("App.csproj", r#"<Project><Reference Include="Foo"/></Project>"#);

  env
    .patcher_cmd()
    .arg("--projectFile")
    .arg(&project)
    .arg("--reference")
    .arg("Foo=/x/Foo.dll")
    .assert()
    .success()
    .stderr(predicate::str::contains("was not found").not());

  assert_eq!(
    env.read_file("App.csproj"),
    r#"<Project><Reference Include="Foo"><HintPath>/x/Foo.dll</HintPath></Reference></Project>"#
  );
}

#[test]
fn updates_existing_hint_path() {
  let env = TestEnv::empty();
  let project = env.with_fixture("Legacy.csproj", "Game.csproj");

  env
    .patcher_cmd()
    .arg("--projectFile")
    .arg(&project)
    .arg("--reference")
    .arg("UnityEngine=/nix/store/abc-unity/UnityEngine.dll")
    .assert()
    .success()
    .stdout(predicate::str::contains("Patched"));

  let patched = env.read_file("Game.csproj");
  assert!(patched.contains("<HintPath>/nix/store/abc-unity/UnityEngine.dll</HintPath>"));
  assert_eq!(patched.matches("<HintPath>").count(), 1);
}

#[test]
fn unmatched_override_warns_and_leaves_file_alone() {
  let env = TestEnv::empty();
  let project = env.with_fixture("Legacy.csproj", "Game.csproj");

  env
    .patcher_cmd()
    .arg("--projectFile")
    .arg(&project)
    .arg("--reference")
    .arg("Bar=/y/Bar.dll")
    .assert()
    .success()
    .stderr(predicate::str::contains("Reference \"Bar\" was not found in any of the project files"));

  assert_eq!(env.read_file("Game.csproj"), fixture_content("Legacy.csproj"));
}

#[test]
fn running_twice_gives_same_result() {
  let env = TestEnv::empty();
  let project = env.with_fixture("Legacy.csproj", "Game.csproj");
  let run = || {
    env
      .patcher_cmd()
      .arg("--project-file")
      .arg(&project)
      .arg("--reference")
      .arg("System=/s/System.dll")
      .arg("--reference")
      .arg("UnityEngine.UI=/u/UnityEngine.UI.dll")
      .assert()
      .success();
  };

  run();
  let first = env.read_file("Game.csproj");
  run();
  assert_eq!(env.read_file("Game.csproj"), first);
  assert!(first.contains("<!-- Compile items are left alone -->"));
}

#[test]
fn path_may_contain_equals_sign() {
  let env = TestEnv::empty();
  let project = env.with_fixture("Sdk.csproj", "Tool.csproj");

  env
    .patcher_cmd()
    .arg("--projectFile")
    .arg(&project)
    .arg("--reference")
    .arg("Newtonsoft.Json=/opt/a=b/Newtonsoft.Json.dll")
    .assert()
    .success();

  assert!(env
    .read_file("Tool.csproj")
    .contains("<HintPath>/opt/a=b/Newtonsoft.Json.dll</HintPath>"));
}

#[test]
fn duplicate_reference_aborts_before_touching_files() {
  let env = TestEnv::empty();
  let project = env.write_file("App.csproj", r#"<Project><Reference Include="Foo"/></Project>"#);

  env
    .patcher_cmd()
    .arg("--projectFile")
    .arg(&project)
    .arg("--reference")
    .arg("Foo=/a")
    .arg("--reference")
    .arg("Foo=/b")
    .assert()
    .failure()
    .stderr(predicate::str::contains("already defined as Foo=/a"));

  assert_eq!(env.read_file("App.csproj"), r#"<Project><Reference Include="Foo"/></Project>"#);
}

#[test]
fn missing_project_file_fails() {
  let env = TestEnv::empty();

  env
    .patcher_cmd()
    .arg("--projectFile")
    .arg(env.path("Nope.csproj"))
    .arg("--reference")
    .arg("Foo=/a")
    .assert()
    .failure()
    .stderr(predicate::str::contains("Nope.csproj could not be found"));
}

#[test]
fn invalid_xml_fails() {
  let env = TestEnv::empty();
  let project = env.write_file("Broken.csproj", "<Project><ItemGroup></Project>");

  env
    .patcher_cmd()
    .arg("--projectFile")
    .arg(&project)
    .assert()
    .failure()
    .stderr(predicate::str::contains("could not be parsed as valid XML"));

  assert_eq!(env.read_file("Broken.csproj"), "<Project><ItemGroup></Project>");
}

#[test]
fn json_format_reports_changes_and_unused() {
  let env = TestEnv::empty();
  let project = env.with_fixture("Legacy.csproj", "Game.csproj");

  let output = env
    .patcher_cmd()
    .arg("--projectFile")
    .arg(&project)
    .arg("--reference")
    .arg("UnityEngine.UI=/u.dll")
    .arg("--reference")
    .arg("Typo=/t.dll")
    .arg("--format")
    .arg("json")
    .output()
    .unwrap();

  assert!(output.status.success());
  let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(report["targets"][0]["references"][0]["name"], "UnityEngine.UI");
  assert_eq!(report["targets"][0]["references"][0]["change"], "inserted");
  assert_eq!(report["unused"], serde_json::json!(["Typo"]));
}
