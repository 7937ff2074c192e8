//! Maven coordinates for an archive, used only to annotate search results.
//!
//! Looks at the first `pom.properties` packaged in the archive, then at a
//! sibling `<name>.pom` next to the archive. Missing data is never an error.

use quick_xml::Reader;
use quick_xml::events::Event;
use serde::Serialize;
use std::path::Path;

use crate::archive::ArchiveStore;

pub const POM_PROPERTIES_PATTERN: &str = "META-INF/maven/.*/pom.properties";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildInfo {
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub version: Option<String>,
}

impl BuildInfo {
    pub fn is_empty(&self) -> bool {
        self.group_id.is_none() && self.artifact_id.is_none() && self.version.is_none()
    }

    fn slot(&mut self, key: &str) -> Option<&mut Option<String>> {
        if key.eq_ignore_ascii_case("groupId") {
            Some(&mut self.group_id)
        } else if key.eq_ignore_ascii_case("artifactId") {
            Some(&mut self.artifact_id)
        } else if key.eq_ignore_ascii_case("version") {
            Some(&mut self.version)
        } else {
            None
        }
    }

    // First value wins.
    fn set(&mut self, key: &str, value: &str) {
        if value.is_empty() {
            return;
        }
        if let Some(slot) = self.slot(key)
            && slot.is_none()
        {
            *slot = Some(value.to_string());
        }
    }
}

/// Reads `groupId=…`, `artifactId=…` and `version=…` lines. Keys match in any
/// letter case; `#` and `!` start comments.
pub fn parse_properties(text: &str) -> BuildInfo {
    let mut info = BuildInfo::default();
    for line in text.lines() {
        let line = line.trim_start();
        if line.starts_with('#') || line.starts_with('!') {
            continue;
        }
        let Some((key, value)) = line.split_once(['=', ':']) else {
            continue;
        };
        let value = value.split_whitespace().next().unwrap_or_default();
        info.set(key.trim(), value);
    }
    info
}

/// The project's own coordinates: only direct children of `<project>` count,
/// so `<parent>` and dependency coordinates are never picked up.
pub fn parse_pom(text: &str) -> BuildInfo {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut info = BuildInfo::default();
    let mut path: Vec<String> = Vec::new();
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                path.push(String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
            }
            Ok(Event::End(_)) => {
                path.pop();
            }
            Ok(Event::Text(e)) => match e.unescape() {
                Ok(text) => set_project_field(&mut info, &path, text.trim()),
                Err(err) => tracing::debug!(error = %err, "skipping undecodable pom text"),
            },
            Ok(Event::CData(e)) => {
                set_project_field(&mut info, &path, String::from_utf8_lossy(&e).trim());
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => {
                tracing::debug!(error = %err, "malformed pom, keeping what was read");
                break;
            }
        }
    }
    info
}

fn set_project_field(info: &mut BuildInfo, path: &[String], value: &str) {
    if let [project, field] = path
        && project == "project"
    {
        info.set(field, value);
    }
}

pub fn read_build_info(store: &ArchiveStore) -> BuildInfo {
    match store.entries_as_strings(POM_PROPERTIES_PATTERN) {
        Ok(contents) if !contents.is_empty() => return parse_properties(&contents[0]),
        Ok(_) => {}
        Err(err) => {
            tracing::debug!(archive = %store.path().display(), error = %err, "no packaged pom.properties");
        }
    }

    let sibling = sibling_pom(store.path());
    match std::fs::read_to_string(&sibling) {
        Ok(text) => parse_pom(&text),
        Err(_) => BuildInfo::default(),
    }
}

fn sibling_pom(archive: &Path) -> std::path::PathBuf {
    archive.with_extension("pom")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::{SystemTime, UNIX_EPOCH};
    use zip::write::FileOptions;

    fn temp_dir(name: &str) -> std::path::PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let p = std::env::temp_dir().join(format!(
            "findclass_pom_{}_{}_{}",
            std::process::id(),
            nanos,
            name
        ));
        std::fs::create_dir_all(&p).unwrap();
        p
    }

    fn write_jar(path: &Path, entries: &[(&str, &[u8])]) {
        let file = std::fs::File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        for (name, content) in entries {
            zip.start_file(*name, FileOptions::default()).unwrap();
            zip.write_all(content).unwrap();
        }
        zip.finish().unwrap();
    }

    #[test]
    fn parse_properties_reads_maven_keys() {
        let text = "#Generated by Maven\nversion=3.12.0\ngroupId=org.apache.commons\nartifactId=commons-lang3\n";
        let info = parse_properties(text);
        assert_eq!(info.group_id.as_deref(), Some("org.apache.commons"));
        assert_eq!(info.artifact_id.as_deref(), Some("commons-lang3"));
        assert_eq!(info.version.as_deref(), Some("3.12.0"));
    }

    #[test]
    fn parse_pom_skips_parent_block() {
        let text = r#"<project>
  <parent>
    <groupId>org.parent</groupId>
    <artifactId>parent</artifactId>
    <version>9</version>
  </parent>
  <artifactId>child</artifactId>
  <version>1.2</version>
</project>"#;
        let info = parse_pom(text);
        assert_eq!(info.group_id, None);
        assert_eq!(info.artifact_id.as_deref(), Some("child"));
        assert_eq!(info.version.as_deref(), Some("1.2"));
    }

    #[test]
    fn parse_pom_ignores_dependency_coordinates() {
        let text = r#"<?xml version="1.0"?>
<project xmlns="http://maven.apache.org/POM/4.0.0">
  <parent>
    <groupId>org.parent</groupId>
    <artifactId>parent</artifactId>
    <version>9</version>
  </parent>
  <artifactId>child</artifactId>
  <dependencies>
    <dependency>
      <groupId>junit</groupId>
      <artifactId>junit</artifactId>
      <version>4.13</version>
    </dependency>
  </dependencies>
</project>"#;
        let info = parse_pom(text);
        assert_eq!(info.group_id, None);
        assert_eq!(info.artifact_id.as_deref(), Some("child"));
        assert_eq!(info.version, None);
    }

    #[test]
    fn parse_pom_handles_comments_and_cdata() {
        let text = r#"<project>
  <!-- <groupId>commented.out</groupId> -->
  <groupId><![CDATA[org.cdata]]></groupId>
  <artifactId>lib &amp; tools</artifactId>
  <version>3.0</version>
</project>"#;
        let info = parse_pom(text);
        assert_eq!(info.group_id.as_deref(), Some("org.cdata"));
        assert_eq!(info.artifact_id.as_deref(), Some("lib & tools"));
        assert_eq!(info.version.as_deref(), Some("3.0"));
    }

    #[test]
    fn parse_properties_skips_comments_and_spacing() {
        let text = "# groupId=commented\n  groupId = org.spaced  \nARTIFACTID=upper\n";
        let info = parse_properties(text);
        assert_eq!(info.group_id.as_deref(), Some("org.spaced"));
        assert_eq!(info.artifact_id.as_deref(), Some("upper"));
        assert_eq!(info.version, None);
    }

    #[test]
    fn read_build_info_prefers_packaged_properties() {
        let dir = temp_dir("packaged");
        let jar = dir.join("demo-1.0.jar");
        write_jar(
            &jar,
            &[(
                "META-INF/maven/org.example/demo/pom.properties",
                b"groupId=org.example\nartifactId=demo\nversion=1.0\n",
            )],
        );
        std::fs::write(dir.join("demo-1.0.pom"), "<project><version>x</version></project>").unwrap();

        let info = read_build_info(&ArchiveStore::new(&jar));
        assert_eq!(info.version.as_deref(), Some("1.0"));
        assert_eq!(info.group_id.as_deref(), Some("org.example"));

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn read_build_info_falls_back_to_sibling_pom() {
        let dir = temp_dir("sibling");
        let jar = dir.join("lib-2.0.jar");
        write_jar(&jar, &[("a/B.class", b"")]);
        std::fs::write(
            dir.join("lib-2.0.pom"),
            "<project><groupId>g</groupId><artifactId>lib</artifactId><version>2.0</version></project>",
        )
        .unwrap();

        let info = read_build_info(&ArchiveStore::new(&jar));
        assert_eq!(info.artifact_id.as_deref(), Some("lib"));

        let bare = dir.join("bare.jar");
        write_jar(&bare, &[]);
        assert!(read_build_info(&ArchiveStore::new(&bare)).is_empty());

        let _ = std::fs::remove_dir_all(dir);
    }
}
