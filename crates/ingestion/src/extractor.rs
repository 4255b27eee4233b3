//! Text extraction module
//!
//! Extracts plain text from uploaded resume files. Extraction never fails the
//! pipeline: unsupported formats and unparseable files produce a placeholder
//! so the resume still becomes usable, just without searchable content.

use tracing::{debug, warn};

/// Placeholder stored when a file cannot be parsed into text
pub const EXTRACTION_PLACEHOLDER: &str =
    "Text content could not be extracted from this file format. \
     Upload a PDF or plain-text version to enable proposal generation from this resume.";

/// Extract plain text from file bytes based on the declared file type
pub fn extract_text(bytes: &[u8], file_type: &str) -> String {
    match file_type.to_lowercase().as_str() {
        "txt" => extract_plain_text(bytes),
        "pdf" => match extract_pdf_text(bytes) {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "PDF extraction failed, storing placeholder");
                EXTRACTION_PLACEHOLDER.to_string()
            }
        },
        "doc" | "docx" => {
            // No Office parser wired in; resumes in these formats still get a
            // usable record without searchable chunks.
            warn!(file_type, "No parser for file type, storing placeholder");
            EXTRACTION_PLACEHOLDER.to_string()
        }
        other => {
            warn!(file_type = other, "Unknown file type, storing placeholder");
            EXTRACTION_PLACEHOLDER.to_string()
        }
    }
}

fn extract_plain_text(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    clean_text(&text)
}

/// Extract text from PDF bytes
fn extract_pdf_text(bytes: &[u8]) -> Result<String, String> {
    let doc = lopdf::Document::load_mem(bytes)
        .map_err(|e| format!("Failed to load PDF: {}", e))?;

    let mut text = String::new();
    let pages = doc.get_pages();

    debug!(page_count = pages.len(), "Extracting text from PDF");

    for (page_num, page_id) in pages.iter() {
        match doc.get_page_content(*page_id) {
            Ok(content) => {
                let page_text = extract_text_from_content(&content);
                text.push_str(&page_text);
                text.push('\n');
            }
            Err(e) => {
                warn!(page = page_num, error = %e, "Failed to read page content, skipping");
            }
        }
    }

    if text.trim().is_empty() {
        return Err("No text content extracted from PDF".to_string());
    }

    Ok(clean_text(&text))
}

/// Extract text from a PDF content stream
fn extract_text_from_content(content: &[u8]) -> String {
    // Walks the content stream looking for text between BT and ET operators
    let content_str = String::from_utf8_lossy(content);
    let mut text = String::new();
    let mut in_text_block = false;
    let mut current_text = String::new();

    for line in content_str.lines() {
        let trimmed = line.trim();

        if trimmed == "BT" {
            in_text_block = true;
            continue;
        }

        if trimmed == "ET" {
            in_text_block = false;
            if !current_text.is_empty() {
                text.push_str(&current_text);
                text.push(' ');
                current_text.clear();
            }
            continue;
        }

        if in_text_block {
            if let Some(text_content) = extract_text_from_operator(trimmed) {
                current_text.push_str(&text_content);
            }
        }
    }

    text
}

/// Extract text from a PDF text-showing operator
fn extract_text_from_operator(line: &str) -> Option<String> {
    // (text) Tj and its single-quote variants
    if line.ends_with("Tj") || line.ends_with('\'') || line.ends_with('"') {
        if let Some(start) = line.find('(') {
            if let Some(end) = line.rfind(')') {
                let text = &line[start + 1..end];
                return Some(decode_pdf_string(text));
            }
        }
    }

    // [(text) num (text) num] TJ array form
    if line.ends_with("TJ") {
        let mut result = String::new();
        let mut in_paren = false;
        let mut current = String::new();

        for ch in line.chars() {
            match ch {
                '(' => {
                    in_paren = true;
                }
                ')' => {
                    in_paren = false;
                    result.push_str(&decode_pdf_string(&current));
                    current.clear();
                }
                _ if in_paren => {
                    current.push(ch);
                }
                _ => {}
            }
        }

        if !result.is_empty() {
            return Some(result);
        }
    }

    None
}

/// Decode PDF string escapes
fn decode_pdf_string(s: &str) -> String {
    let mut result = String::new();
    let mut chars = s.chars();

    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some('n') => result.push('\n'),
                Some('r') => result.push('\r'),
                Some('t') => result.push('\t'),
                Some('\\') => result.push('\\'),
                Some('(') => result.push('('),
                Some(')') => result.push(')'),
                Some(c) => result.push(c),
                None => {}
            }
        } else {
            result.push(ch);
        }
    }

    result
}

/// Collapse whitespace within paragraphs and strip common artifacts
///
/// Blank lines survive as "\n\n" so the chunker can split on paragraph
/// boundaries downstream.
fn clean_text(text: &str) -> String {
    let normalized = text
        .replace('\u{FEFF}', "")
        .replace('\u{201C}', "\"")
        .replace('\u{201D}', "\"")
        .replace('\u{2018}', "'")
        .replace('\u{2019}', "'");

    let mut paragraphs: Vec<String> = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in normalized.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                paragraphs.push(current.join(" "));
                current.clear();
            }
        } else {
            current.extend(line.split_whitespace());
        }
    }
    if !current.is_empty() {
        paragraphs.push(current.join(" "));
    }

    paragraphs.join("\n\n")
}

/// Skill vocabulary matched against extracted resume text
const SKILL_VOCABULARY: &[&str] = &[
    "rust",
    "python",
    "javascript",
    "typescript",
    "react",
    "node.js",
    "go",
    "java",
    "c++",
    "sql",
    "postgresql",
    "mysql",
    "mongodb",
    "redis",
    "docker",
    "kubernetes",
    "aws",
    "gcp",
    "azure",
    "terraform",
    "graphql",
    "rest",
    "grpc",
    "machine learning",
    "data engineering",
    "devops",
    "ci/cd",
    "django",
    "flask",
    "spring",
    "kafka",
    "elasticsearch",
];

/// Detect known skills mentioned in the text, in vocabulary order
pub fn detect_skills(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    SKILL_VOCABULARY
        .iter()
        .filter(|skill| contains_term(&lower, skill))
        .map(|skill| skill.to_string())
        .collect()
}

/// True when `term` occurs in `haystack` without an adjoining letter or digit
///
/// Keeps "sql" from matching inside "postgresql" and "go" inside
/// "algorithms". Terms with their own punctuation ("c++", "node.js",
/// "ci/cd") still match because the boundary check only looks at the
/// characters just outside the occurrence.
fn contains_term(haystack: &str, term: &str) -> bool {
    let bytes = haystack.as_bytes();
    let mut start = 0;
    while let Some(pos) = haystack[start..].find(term) {
        let begin = start + pos;
        let end = begin + term.len();
        let before_ok = begin == 0 || !bytes[begin - 1].is_ascii_alphanumeric();
        let after_ok = end == bytes.len() || !bytes[end].is_ascii_alphanumeric();
        if before_ok && after_ok {
            return true;
        }
        start = begin + 1;
    }
    false
}

/// Extract the largest "N years" claim from the text, if any
pub fn years_of_experience(text: &str) -> Option<u32> {
    let pattern = regex_lite::Regex::new(r"(\d{1,2})\+?\s*years?").ok()?;
    pattern
        .captures_iter(&text.to_lowercase())
        .filter_map(|cap| cap.get(1)?.as_str().parse::<u32>().ok())
        .max()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_extraction() {
        let text = extract_text(b"Senior   Rust developer.\n\nBuilt APIs.", "txt");
        assert_eq!(text, "Senior Rust developer.\n\nBuilt APIs.");
    }

    #[test]
    fn test_clean_text_preserves_paragraph_breaks() {
        let text = extract_text(b"Summary\nBackend engineer.\n\n\n\nExperience\nShipped services.", "txt");
        assert_eq!(text, "Summary Backend engineer.\n\nExperience Shipped services.");
    }

    #[test]
    fn test_clean_text_collapses_intra_paragraph_whitespace() {
        let text = extract_text(b"  Rust \t developer\nwith  APIs  ", "txt");
        assert_eq!(text, "Rust developer with APIs");
    }

    #[test]
    fn test_unsupported_format_gets_placeholder() {
        let text = extract_text(b"\xd0\xcf\x11\xe0", "doc");
        assert_eq!(text, EXTRACTION_PLACEHOLDER);
    }

    #[test]
    fn test_corrupt_pdf_gets_placeholder() {
        let text = extract_text(b"not a pdf at all", "pdf");
        assert_eq!(text, EXTRACTION_PLACEHOLDER);
    }

    #[test]
    fn test_decode_pdf_string() {
        assert_eq!(decode_pdf_string("Hello\\nWorld"), "Hello\nWorld");
        assert_eq!(decode_pdf_string("Test\\(paren\\)"), "Test(paren)");
    }

    #[test]
    fn test_detect_skills() {
        let skills = detect_skills("Expert in Rust and PostgreSQL, some Docker.");
        assert_eq!(skills, vec!["rust", "postgresql", "docker"]);
    }

    #[test]
    fn test_detect_skills_empty() {
        assert!(detect_skills("Fine arts degree, oil painting").is_empty());
    }

    #[test]
    fn test_detect_skills_ignores_substring_hits() {
        assert!(detect_skills("Deep PostgreSQL tuning").contains(&"postgresql".to_string()));
        assert!(!detect_skills("Deep PostgreSQL tuning").contains(&"sql".to_string()));
        assert!(!detect_skills("JavaScript frontends").contains(&"java".to_string()));
        assert!(!detect_skills("Strong grasp of algorithms").contains(&"go".to_string()));
        assert!(!detect_skills("Interested in open source").contains(&"rest".to_string()));
    }

    #[test]
    fn test_detect_skills_punctuated_terms() {
        let skills = detect_skills("Node.js services, C++ tooling, CI/CD pipelines");
        assert_eq!(skills, vec!["node.js", "c++", "ci/cd"]);
    }

    #[test]
    fn test_years_of_experience_takes_max() {
        let text = "3 years of Go, 8+ years of backend development, 2 years of ML";
        assert_eq!(years_of_experience(text), Some(8));
    }

    #[test]
    fn test_years_of_experience_absent() {
        assert_eq!(years_of_experience("Recent graduate"), None);
    }
}
