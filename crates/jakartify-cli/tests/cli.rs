use assert_cmd::Command;
use assert_fs::prelude::*;
use assert_fs::TempDir;
use jakartify_test_utils::archive;
use predicates::prelude::*;

const SERVLET_JAVA: &str = "import javax.servlet.http.HttpServlet;\n";
const CDI_JAVA: &str = "import javax.enterprise.inject.spi.Extension;\n";

fn jakartify() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("jakartify"));
    cmd.env_remove("RUST_LOG");
    cmd
}

#[test]
fn help_mentions_options_and_cache_command() {
    jakartify().arg("--help").assert().success().stdout(
        predicate::str::contains("--profile")
            .and(predicate::str::contains("--exclude"))
            .and(predicate::str::contains("--zip-in-memory"))
            .and(predicate::str::contains("--cache-dir"))
            .and(predicate::str::contains("cache")),
    );
}

#[test]
fn missing_arguments_is_a_usage_error() {
    jakartify().assert().failure().code(2);
}

#[test]
fn converts_a_single_file() {
    let temp = TempDir::new().unwrap();
    let src = temp.child("Hello.java");
    src.write_str(SERVLET_JAVA).unwrap();
    let dest = temp.child("out/Hello.java");

    jakartify()
        .arg(src.path())
        .arg(dest.path())
        .assert()
        .success()
        .stdout(predicate::str::starts_with("converted: true"));

    dest.assert("import jakarta.servlet.http.HttpServlet;\n");
}

#[test]
fn profile_flag_selects_the_namespace_list() {
    let temp = TempDir::new().unwrap();
    let src = temp.child("Ext.java");
    src.write_str(CDI_JAVA).unwrap();

    jakartify()
        .arg(src.path())
        .arg(temp.child("tomcat.java").path())
        .assert()
        .success()
        .stdout(predicate::str::starts_with("converted: false"));
    temp.child("tomcat.java").assert(CDI_JAVA);

    jakartify()
        .args(["--profile", "ee"])
        .arg(src.path())
        .arg(temp.child("ee.java").path())
        .assert()
        .success()
        .stdout(predicate::str::starts_with("converted: true"));
    temp.child("ee.java")
        .assert("import jakarta.enterprise.inject.spi.Extension;\n");
}

#[test]
fn json_report() {
    let temp = TempDir::new().unwrap();
    temp.child("app/Hello.java").write_str(SERVLET_JAVA).unwrap();
    temp.child("app/README.txt").write_str("hello\n").unwrap();

    let output = jakartify()
        .arg("--json")
        .arg(temp.child("app").path())
        .arg(temp.child("out").path())
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let v: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(v["converted"], true);
    assert_eq!(v["files"], 2);
    assert_eq!(v["converted_files"], 1);
    assert_eq!(v["profile"], "TOMCAT");
}

#[test]
fn unknown_profile_exits_with_error() {
    let temp = TempDir::new().unwrap();
    temp.child("Hello.java").write_str(SERVLET_JAVA).unwrap();

    jakartify()
        .args(["--profile", "JAKARTA"])
        .arg(temp.child("Hello.java").path())
        .arg(temp.child("out.java").path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unknown profile"));
    temp.child("out.java").assert(predicate::path::missing());
}

#[test]
fn missing_source_exits_with_error() {
    let temp = TempDir::new().unwrap();
    jakartify()
        .arg(temp.child("missing").path())
        .arg(temp.child("out").path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("cannot read source"));
}

#[test]
fn config_file_with_flag_override() {
    let temp = TempDir::new().unwrap();
    temp.child("jakartify.toml")
        .write_str("profile = \"TOMCAT\"\nexcludes = [\"Skip.java\"]\n")
        .unwrap();
    temp.child("app/Skip.java").write_str(CDI_JAVA).unwrap();
    temp.child("app/Ext.java").write_str(CDI_JAVA).unwrap();

    jakartify()
        .arg("--config")
        .arg(temp.child("jakartify.toml").path())
        .args(["--profile", "EE"])
        .arg(temp.child("app").path())
        .arg(temp.child("out").path())
        .assert()
        .success();

    temp.child("out/Skip.java").assert(CDI_JAVA);
    temp.child("out/Ext.java")
        .assert("import jakarta.enterprise.inject.spi.Extension;\n");
}

#[test]
fn cache_commands_after_a_cached_run() {
    let temp = TempDir::new().unwrap();
    let war = archive::build(&[("WEB-INF/web.xml", b"<listener-class>javax.servlet.ServletContextListener</listener-class>")]);
    temp.child("app.war").write_binary(&war).unwrap();
    let cache = temp.child("cache");

    jakartify()
        .arg("--cache-dir")
        .arg(cache.path())
        .arg(temp.child("app.war").path())
        .arg(temp.child("out.war").path())
        .assert()
        .success();

    let output = jakartify()
        .args(["cache", "stats", "--json", "--cache-dir"])
        .arg(cache.path())
        .output()
        .unwrap();
    assert!(output.status.success());
    let v: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(v["entries"], 1);
    assert!(v["total_bytes"].as_u64().unwrap() > 0);

    jakartify()
        .args(["cache", "prune", "--cache-dir"])
        .arg(cache.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("pruned 0 entries"));

    jakartify()
        .args(["cache", "clear", "--cache-dir"])
        .arg(cache.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("cleared"));

    jakartify()
        .args(["cache", "stats", "--cache-dir"])
        .arg(cache.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("entries: 0"));
}

#[test]
fn source_directory_named_cache_needs_a_path_prefix() {
    let temp = TempDir::new().unwrap();
    temp.child("cache/Hello.java").write_str(SERVLET_JAVA).unwrap();

    jakartify()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("./cache"));

    jakartify()
        .current_dir(temp.path())
        .args(["./cache", "out"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("converted: true"));
    temp.child("out/Hello.java")
        .assert("import jakarta.servlet.http.HttpServlet;\n");
}

#[test]
fn cache_command_requires_a_directory() {
    jakartify()
        .args(["cache", "stats"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--cache-dir"));
}
