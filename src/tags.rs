/// Ordered tags parsed from a comma-separated list.
///
/// Entries are trimmed and empty ones dropped. Nothing else is checked:
/// duplicates are kept and tag text is passed through as given.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSet(Vec<String>);

impl TagSet {
    pub fn parse(input: &str) -> Self {
        Self(
            input
                .split(',')
                .map(str::trim)
                .filter(|tag| !tag.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Append each tag to `content` as a ` #tag` suffix.
    pub fn apply(&self, content: &str) -> String {
        let mut out = String::from(content);
        for tag in &self.0 {
            log::debug!(target: "flomo::cli", "Added tag: {}", tag);
            out.push_str(" #");
            out.push_str(tag);
        }
        out
    }
}
