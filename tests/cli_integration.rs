use serde_json::Value;
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(name: &str) -> std::path::PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let p = std::env::temp_dir().join(format!(
        "findclass_it_{}_{}_{}",
        std::process::id(),
        nanos,
        name
    ));
    std::fs::create_dir_all(&p).unwrap();
    std::fs::canonicalize(p).unwrap()
}

fn write_file(path: &std::path::Path, content: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    Ok(())
}

fn write_jar(path: &std::path::Path, entries: &[(&str, &[u8])]) -> anyhow::Result<()> {
    use std::io::Write;
    use zip::write::FileOptions;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(path)?;
    let mut zip = zip::ZipWriter::new(file);
    let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    for (name, content) in entries {
        zip.start_file(*name, options)?;
        zip.write_all(content)?;
    }
    zip.finish()?;
    Ok(())
}

fn run_json(args: &[&str]) -> anyhow::Result<Value> {
    let out = Command::new(env!("CARGO_BIN_EXE_findclass"))
        .args(args)
        .env_remove("FINDCLASS_ROOT")
        .env_remove("FINDCLASS_LOG")
        .output()?;
    if !out.status.success() {
        return Err(anyhow::anyhow!(
            "command failed: status={:?}, stderr={}",
            out.status.code(),
            String::from_utf8_lossy(&out.stderr)
        ));
    }
    Ok(serde_json::from_slice(&out.stdout)?)
}

#[test]
fn implicit_find_reports_hits_with_coordinates() -> anyhow::Result<()> {
    let base = temp_dir("find");
    write_jar(
        &base.join("lib/demo-1.0.jar"),
        &[
            ("org/example/Foo.class", b""),
            ("org/example/Bar.class", b""),
            (
                "META-INF/maven/org.example/demo/pom.properties",
                b"groupId=org.example\nartifactId=demo\nversion=1.0\n",
            ),
        ],
    )?;
    write_file(&base.join("broken.war"), "not a zip")?;

    let base_s = base.to_string_lossy().to_string();
    let report = run_json(&["-f", "json", &base_s, "Foo"])?;

    let archives = report["archives"].as_array().unwrap();
    assert_eq!(archives.len(), 1);
    assert_eq!(
        archives[0]["entries"][0],
        Value::String("org/example/Foo.class".to_string())
    );
    assert_eq!(archives[0]["build"]["version"], Value::String("1.0".to_string()));
    assert_eq!(report["skipped"].as_array().unwrap().len(), 1);

    let _ = std::fs::remove_dir_all(base);
    Ok(())
}

#[test]
fn list_recurses_and_sorts_by_name() -> anyhow::Result<()> {
    let base = temp_dir("list");
    write_file(&base.join("a.jar"), "x")?;
    write_file(&base.join("sub/b.jar"), "x")?;
    write_file(&base.join("sub/readme.txt"), "x")?;

    let base_s = base.to_string_lossy().to_string();
    let listed = run_json(&["-f", "json", "list", &base_s, r".*\.jar", "--recurse", "--sort", "name"])?;

    let paths: Vec<&str> = listed
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap())
        .collect();
    assert_eq!(paths.len(), 2);
    assert!(paths[0].ends_with("a.jar"));
    assert!(paths[1].ends_with("b.jar"));

    let _ = std::fs::remove_dir_all(base);
    Ok(())
}

#[test]
fn zip_put_get_and_print_round_trip() -> anyhow::Result<()> {
    let base = temp_dir("zip");
    let archive = base.join("out.zip");
    let file = base.join("notes/hello.txt");
    write_file(&file, "hello archive")?;

    let archive_s = archive.to_string_lossy().to_string();
    let file_s = file.to_string_lossy().to_string();
    let entry_pattern = regex::escape(&file_s);

    let put = run_json(&["-f", "json", "zip", "put", &archive_s, &file_s])?;
    assert_eq!(put["added"], Value::from(1));
    assert_eq!(put["failed"].as_array().unwrap().len(), 0);

    let printed = run_json(&["-f", "json", "zip", "print", &archive_s, &entry_pattern])?;
    assert_eq!(printed["contents"][0], Value::String("hello archive".to_string()));

    let refused = run_json(&["-f", "json", "zip", "get", &archive_s, &entry_pattern])?;
    assert_eq!(refused["extracted"], Value::from(0));
    assert_eq!(refused["failed"][0], Value::String(file_s.clone()));

    std::fs::remove_file(&file)?;
    let got = run_json(&["-f", "json", "zip", "get", &archive_s, &entry_pattern])?;
    assert_eq!(got["extracted"], Value::from(1));
    assert_eq!(std::fs::read_to_string(&file)?, "hello archive");

    let _ = std::fs::remove_dir_all(base);
    Ok(())
}
