//! `.gem` archive assembly.
//!
//! Produces archives with the same layout `gem build` writes, with a
//! minimal YAML specification. Used to seed repositories and in tests.

use quarry_core::{QuarryError, QuarryResult, Requirement, DEFAULT_PLATFORM};
use tar::{Builder, Header};

use crate::compress::gzip;
use crate::gem::extract::METADATA_ENTRY;

const DATA_ENTRY: &str = "data.tar.gz";

#[derive(Debug, Clone)]
pub struct GemBuilder {
    name: String,
    version: String,
    platform: String,
    summary: String,
    date: String,
    dependencies: Vec<(String, String, &'static str)>,
    required_ruby_version: String,
    required_rubygems_version: String,
    files: Vec<(String, Vec<u8>)>,
}

impl GemBuilder {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            summary: format!("The {} gem", name),
            name,
            version: version.into(),
            platform: DEFAULT_PLATFORM.to_string(),
            date: "2024-01-15 00:00:00.000000000 Z".to_string(),
            dependencies: Vec::new(),
            required_ruby_version: ">= 0".to_string(),
            required_rubygems_version: ">= 0".to_string(),
            files: Vec::new(),
        }
    }

    pub fn platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = platform.into();
        self
    }

    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    pub fn date(mut self, date: impl Into<String>) -> Self {
        self.date = date.into();
        self
    }

    /// Add a runtime dependency; `requirement` uses the `op ver&op ver` form
    pub fn dependency(mut self, name: impl Into<String>, requirement: impl Into<String>) -> Self {
        self.dependencies
            .push((name.into(), requirement.into(), ":runtime"));
        self
    }

    pub fn development_dependency(
        mut self,
        name: impl Into<String>,
        requirement: impl Into<String>,
    ) -> Self {
        self.dependencies
            .push((name.into(), requirement.into(), ":development"));
        self
    }

    pub fn required_ruby_version(mut self, requirement: impl Into<String>) -> Self {
        self.required_ruby_version = requirement.into();
        self
    }

    pub fn required_rubygems_version(mut self, requirement: impl Into<String>) -> Self {
        self.required_rubygems_version = requirement.into();
        self
    }

    pub fn file(mut self, path: impl Into<String>, contents: &[u8]) -> Self {
        self.files.push((path.into(), contents.to_vec()));
        self
    }

    /// Render the YAML specification stored in `metadata.gz`
    pub fn metadata_yaml(&self) -> QuarryResult<String> {
        let mut out = String::from("--- !ruby/object:Gem::Specification\n");
        out.push_str(&format!("name: {}\n", quote(&self.name)));
        out.push_str("version: !ruby/object:Gem::Version\n");
        out.push_str(&format!("  version: {}\n", quote(&self.version)));
        out.push_str(&format!("platform: {}\n", quote(&self.platform)));
        out.push_str("authors:\n- Quarry\n");
        out.push_str(&format!("date: {}\n", self.date));

        if self.dependencies.is_empty() {
            out.push_str("dependencies: []\n");
        } else {
            out.push_str("dependencies:\n");
            for (name, requirement, kind) in &self.dependencies {
                out.push_str("- !ruby/object:Gem::Dependency\n");
                out.push_str(&format!("  name: {}\n", quote(name)));
                out.push_str("  requirement: !ruby/object:Gem::Requirement\n");
                render_requirement(&mut out, requirement, "    ")?;
                out.push_str(&format!("  type: {}\n", kind));
                out.push_str("  prerelease: false\n");
            }
        }

        out.push_str(&format!(
            "files:\n{}",
            self.files
                .iter()
                .map(|(path, _)| format!("- {}\n", quote(path)))
                .collect::<String>()
        ));
        out.push_str("licenses:\n- MIT\n");
        out.push_str("metadata: {}\n");
        out.push_str("require_paths:\n- lib\n");
        out.push_str("required_ruby_version: !ruby/object:Gem::Requirement\n");
        render_requirement(&mut out, &self.required_ruby_version, "  ")?;
        out.push_str("required_rubygems_version: !ruby/object:Gem::Requirement\n");
        render_requirement(&mut out, &self.required_rubygems_version, "  ")?;
        out.push_str("rubygems_version: 3.4.10\n");
        out.push_str("specification_version: 4\n");
        out.push_str(&format!("summary: {}\n", quote(&self.summary)));
        Ok(out)
    }

    /// Assemble the archive bytes
    pub fn build(&self) -> QuarryResult<Vec<u8>> {
        let metadata = gzip(self.metadata_yaml()?.as_bytes())?;

        let mut data = Builder::new(Vec::new());
        for (path, contents) in &self.files {
            append(&mut data, path, contents)?;
        }
        let data = data
            .into_inner()
            .map_err(|e| QuarryError::io("failed to finish data archive".to_string(), e))?;
        let data = gzip(&data)?;

        let mut gem = Builder::new(Vec::new());
        append(&mut gem, METADATA_ENTRY, &metadata)?;
        append(&mut gem, DATA_ENTRY, &data)?;
        gem.into_inner()
            .map_err(|e| QuarryError::io("failed to finish gem archive".to_string(), e))
    }
}

fn render_requirement(out: &mut String, requirement: &str, indent: &str) -> QuarryResult<()> {
    let parsed = Requirement::parse(requirement)?;
    out.push_str(&format!("{}requirements:\n", indent));
    for clause in &parsed.clauses {
        out.push_str(&format!("{}- - \"{}\"\n", indent, clause.op.as_str()));
        out.push_str(&format!("{}  - !ruby/object:Gem::Version\n", indent));
        out.push_str(&format!("{}    version: {}\n", indent, quote(&clause.version)));
    }
    Ok(())
}

/// Single-quoted YAML scalar, so versions like `1.0` stay strings
fn quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

fn append(builder: &mut Builder<Vec<u8>>, path: &str, contents: &[u8]) -> QuarryResult<()> {
    let mut header = Header::new_gnu();
    header.set_size(contents.len() as u64);
    header.set_mode(0o644);
    header.set_mtime(0);
    header.set_cksum();
    builder
        .append_data(&mut header, path, contents)
        .map_err(|e| QuarryError::io(format!("failed to add {} to archive", path), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gem::read_metadata;

    #[test]
    fn test_metadata_round_trips_through_archive() {
        let builder = GemBuilder::new("mygem", "1.0").dependency("rake", ">= 1");
        let archive = builder.build().unwrap();
        let metadata = read_metadata(&archive).unwrap();
        assert_eq!(
            String::from_utf8(metadata).unwrap(),
            builder.metadata_yaml().unwrap()
        );
    }

    #[test]
    fn test_build_is_deterministic() {
        let builder = GemBuilder::new("mygem", "1.0").file("lib/mygem.rb", b"1");
        assert_eq!(builder.build().unwrap(), builder.build().unwrap());
    }

    #[test]
    fn test_quoting() {
        assert_eq!(quote("1.0"), "'1.0'");
        assert_eq!(quote("it's"), "'it''s'");
    }

    #[test]
    fn test_bad_requirement_is_rejected() {
        let builder = GemBuilder::new("mygem", "1.0").dependency("rake", "~> 1");
        assert!(builder.metadata_yaml().is_err());
    }
}
