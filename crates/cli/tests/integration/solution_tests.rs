//! Solution file patch tests.

use predicates::prelude::*;

use super::common::{TestEnv, fixture_content};

fn solution_env() -> TestEnv {
  let env = TestEnv::empty();
  env.with_fixture("Game.sln", "Game.sln");
  env.with_fixture("Legacy.csproj", "Game/Game.csproj");
  env.with_fixture("Sdk.csproj", "tools/Tools/Tools.csproj");
  env
}

#[test]
fn patches_every_project_in_solution() {
  let env = solution_env();

  env
    .patcher_cmd()
    .arg("--projectFile")
    .arg(env.path("Game.sln"))
    .arg("--reference")
    .arg("UnityEngine=/u/UnityEngine.dll")
    .arg("--reference")
    .arg("Newtonsoft.Json=/n/Newtonsoft.Json.dll")
    .assert()
    .success()
    .stderr(predicate::str::contains("was not found").not());

  assert!(env
    .read_file("Game/Game.csproj")
    .contains("<HintPath>/u/UnityEngine.dll</HintPath>"));
  assert!(env
    .read_file("tools/Tools/Tools.csproj")
    .contains("<HintPath>/n/Newtonsoft.Json.dll</HintPath>"));
}

#[test]
fn relative_solution_path_resolves_members() {
  let env = solution_env();

  env
    .patcher_cmd()
    .arg("--projectFile")
    .arg("Game.sln")
    .arg("--reference")
    .arg("System=/s.dll")
    .assert()
    .success();

  assert!(env.read_file("Game/Game.csproj").contains("<HintPath>/s.dll</HintPath>"));
}

#[test]
fn override_warned_once_across_projects() {
  let env = solution_env();

  env
    .patcher_cmd()
    .arg("--projectFile")
    .arg(env.path("Game.sln"))
    .arg("--reference")
    .arg("Missing=/m.dll")
    .assert()
    .success()
    .stderr(predicate::str::contains("Reference \"Missing\"").count(1));
}

#[test]
fn missing_member_stops_run_after_earlier_projects() {
  let env = TestEnv::empty();
  env.with_fixture("Game.sln", "Game.sln");
  env.with_fixture("Legacy.csproj", "Game/Game.csproj");

  env
    .patcher_cmd()
    .arg("--projectFile")
    .arg(env.path("Game.sln"))
    .arg("--reference")
    .arg("UnityEngine=/u.dll")
    .assert()
    .failure()
    .stderr(predicate::str::contains("Tools.csproj could not be found"));

  assert!(env.read_file("Game/Game.csproj").contains("<HintPath>/u.dll</HintPath>"));
}

#[test]
fn broken_solution_patches_nothing() {
  let env = TestEnv::empty();
  let sln = env.write_file("Broken.sln", "this is not a solution\n");
  env.with_fixture("Legacy.csproj", "Game/Game.csproj");

  env
    .patcher_cmd()
    .arg("--projectFile")
    .arg(&sln)
    .arg("--reference")
    .arg("UnityEngine=/u.dll")
    .assert()
    .failure()
    .stderr(predicate::str::contains("could not be parsed"));

  assert_eq!(env.read_file("Game/Game.csproj"), fixture_content("Legacy.csproj"));
}
