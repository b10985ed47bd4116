use regex::Regex;
use specdraft_config::ClassifierConfig;

/// Section vocabulary for the classifier. Labels are compared after
/// normalization (lowercased, non-alphanumerics stripped), so spacing,
/// hyphenation and case in the generated headings do not matter.
#[derive(Debug, Clone)]
pub struct SectionRules {
    required: Vec<String>,
    optional: Vec<String>,
}

impl SectionRules {
    pub fn new(required: Vec<String>, optional: Vec<String>) -> Self {
        Self {
            required: required.iter().map(|s| normalize(s)).collect(),
            optional: optional.iter().map(|s| normalize(s)).collect(),
        }
    }
}

impl From<&ClassifierConfig> for SectionRules {
    fn from(config: &ClassifierConfig) -> Self {
        Self::new(
            config.required_sections.clone(),
            config.optional_sections.clone(),
        )
    }
}

impl Default for SectionRules {
    fn default() -> Self {
        (&ClassifierConfig::default()).into()
    }
}

/// Decides, after a chat-mode stream ends, whether the concatenated
/// content is a complete structured document or a partial suggestion.
#[derive(Debug, Clone)]
pub struct DocumentClassifier {
    rules: SectionRules,
    heading: Regex,
}

impl DocumentClassifier {
    pub fn new(rules: SectionRules) -> Self {
        // Levels 1-3, with an optional numeric ordinal ("## 3. Overview").
        let heading = Regex::new(r"^#{1,3}\s+(?:\d+\s*[.、)）:：]?\s*)?(.+?)\s*$")
            .expect("heading pattern is valid");
        Self { rules, heading }
    }

    /// Counts heading matches per bucket and applies the decision rule.
    /// Repeated headings each count; duplicates are not collapsed.
    pub fn is_full_document(&self, text: &str) -> bool {
        let mut required_hits = 0usize;
        let mut optional_hits = 0usize;

        for line in text.lines() {
            let Some(captures) = self.heading.captures(line.trim_start()) else {
                continue;
            };
            let label = normalize(&captures[1]);
            if label.is_empty() {
                continue;
            }
            if self.rules.required.iter().any(|r| *r == label) {
                required_hits += 1;
            } else if self.rules.optional.iter().any(|o| *o == label) {
                optional_hits += 1;
            }
        }

        required_hits >= 2 || (required_hits >= 1 && optional_hits >= 2)
    }
}

impl Default for DocumentClassifier {
    fn default() -> Self {
        Self::new(SectionRules::default())
    }
}

fn normalize(label: &str) -> String {
    label
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(|c| c.to_lowercase())
        .collect()
}
