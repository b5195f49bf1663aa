//! Fast-path language detection by file extension (Appendix table).
//!
//! Falls back to content sniffing (shebang line, null-byte heuristic) when
//! the extension is unknown or ambiguous. Both `TreeDiff`'s language filter
//! and `LanguagesDetection`'s output use this table; only one copy is kept
//! so the two stay consistent.

/// `(extension without leading dot, language name)`, checked
/// case-insensitively.
const EXTENSION_TABLE: &[(&str, &str)] = &[
    ("go", "Go"),
    ("rs", "Rust"),
    ("py", "Python"),
    ("pyi", "Python"),
    ("js", "JavaScript"),
    ("jsx", "JavaScript"),
    ("mjs", "JavaScript"),
    ("ts", "TypeScript"),
    ("tsx", "TypeScript"),
    ("java", "Java"),
    ("kt", "Kotlin"),
    ("kts", "Kotlin"),
    ("cs", "C#"),
    ("c", "C"),
    ("h", "C"),
    ("cc", "C++"),
    ("cpp", "C++"),
    ("cxx", "C++"),
    ("hpp", "C++"),
    ("hh", "C++"),
    ("rb", "Ruby"),
    ("php", "PHP"),
    ("swift", "Swift"),
    ("m", "Objective-C"),
    ("scala", "Scala"),
    ("sh", "Shell"),
    ("bash", "Shell"),
    ("pl", "Perl"),
    ("lua", "Lua"),
    ("ex", "Elixir"),
    ("exs", "Elixir"),
    ("erl", "Erlang"),
    ("hs", "Haskell"),
    ("clj", "Clojure"),
    ("cljs", "Clojure"),
    ("sql", "SQL"),
    ("html", "HTML"),
    ("htm", "HTML"),
    ("css", "CSS"),
    ("scss", "CSS"),
    ("json", "JSON"),
    ("yaml", "YAML"),
    ("yml", "YAML"),
    ("toml", "TOML"),
    ("md", "Markdown"),
    ("proto", "Protobuf"),
];

/// Returns a language name for `filename`'s extension, or `None` if the
/// extension is absent or unrecognized. Matching is case-insensitive
/// (Testable Property 8).
pub fn detect_by_extension(filename: &str) -> Option<&'static str> {
    let ext = filename.rsplit('.').next()?;
    if ext == filename {
        // No '.' in the name at all.
        return None;
    }
    let ext_lower = ext.to_lowercase();
    EXTENSION_TABLE
        .iter()
        .find(|(candidate, _)| *candidate == ext_lower)
        .map(|(_, lang)| *lang)
}

/// Content-sniffing slow path for files with no recognized extension:
/// shebang line, then a crude binary/text check.
pub fn detect_by_content(content: &[u8]) -> Option<&'static str> {
    if content.starts_with(b"#!") {
        let first_line = content
            .iter()
            .position(|&b| b == b'\n')
            .map(|idx| &content[..idx])
            .unwrap_or(content);
        let line = String::from_utf8_lossy(first_line);
        if line.contains("python") {
            return Some("Python");
        }
        if line.contains("bash") || line.contains("/sh") {
            return Some("Shell");
        }
        if line.contains("node") {
            return Some("JavaScript");
        }
        if line.contains("ruby") {
            return Some("Ruby");
        }
        if line.contains("perl") {
            return Some("Perl");
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_lookup_is_case_insensitive() {
        assert_eq!(detect_by_extension("main.go"), Some("Go"));
        assert_eq!(detect_by_extension("main.GO"), Some("Go"));
        assert_eq!(detect_by_extension("Main.Go"), Some("Go"));
    }

    #[test]
    fn unknown_extension_returns_none() {
        assert_eq!(detect_by_extension("README"), None);
        assert_eq!(detect_by_extension("data.xyz123"), None);
    }

    #[test]
    fn shebang_detects_python() {
        assert_eq!(
            detect_by_content(b"#!/usr/bin/env python\nprint(1)\n"),
            Some("Python")
        );
    }
}
