//! `'use client'` directive detection and removal.
//!
//! The directive is a file-level pragma: only the top of a module counts.

/// Number of leading lines searched for the directive.
pub const DIRECTIVE_SCAN_LINES: usize = 5;

const DIRECTIVES: [&str; 2] = ["'use client'", "\"use client\""];

/// Where a module is allowed to execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Boundary {
    ServerOnly,
    ClientEligible,
}

impl Boundary {
    pub fn is_client(self) -> bool {
        self == Boundary::ClientEligible
    }
}

impl std::fmt::Display for Boundary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Boundary::ServerOnly => write!(f, "server"),
            Boundary::ClientEligible => write!(f, "client"),
        }
    }
}

/// Classify a module by looking for the directive in its first lines.
pub fn classify(content: &str) -> Boundary {
    let found = content
        .split('\n')
        .take(DIRECTIVE_SCAN_LINES)
        .any(|line| DIRECTIVES.iter().any(|d| line.contains(d)));

    if found {
        Boundary::ClientEligible
    } else {
        Boundary::ServerOnly
    }
}

/// Remove the first directive occurrence, its optional `;` and the line break
/// that follows it. All other bytes are kept as-is.
///
/// This does not re-check the scan window; callers only strip content that
/// [`classify`] reported as client-eligible.
pub fn strip_directive(content: &str) -> String {
    let Some((start, token)) = DIRECTIVES
        .iter()
        .filter_map(|d| content.find(d).map(|pos| (pos, *d)))
        .min_by_key(|(pos, _)| *pos)
    else {
        return content.to_string();
    };

    let mut end = start + token.len();
    let rest = &content[end..];
    let rest = match rest.strip_prefix(';') {
        Some(r) => {
            end += 1;
            r
        }
        None => rest,
    };
    if rest.starts_with("\r\n") {
        end += 2;
    } else if rest.starts_with('\n') {
        end += 1;
    }

    let mut out = String::with_capacity(content.len() - (end - start));
    out.push_str(&content[..start]);
    out.push_str(&content[end..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_and_double_quotes() {
        assert_eq!(classify("'use client';\nexport function A(){}"), Boundary::ClientEligible);
        assert_eq!(classify("\"use client\"\nexport function A(){}"), Boundary::ClientEligible);
    }

    #[test]
    fn test_no_directive_is_server_only() {
        assert_eq!(classify("export default function Page(){}"), Boundary::ServerOnly);
        assert_eq!(classify(""), Boundary::ServerOnly);
    }

    #[test]
    fn test_case_and_quote_mismatch() {
        assert_eq!(classify("'Use Client';"), Boundary::ServerOnly);
        assert_eq!(classify("'use client\";"), Boundary::ServerOnly);
        assert_eq!(classify("use client;"), Boundary::ServerOnly);
    }

    #[test]
    fn test_scan_window() {
        let fifth = "// 1\n// 2\n// 3\n// 4\n'use client';\nexport const X = 1;";
        assert_eq!(classify(fifth), Boundary::ClientEligible);

        let sixth = "// 1\n// 2\n// 3\n// 4\n// 5\n'use client';\nexport const X = 1;";
        assert_eq!(classify(sixth), Boundary::ServerOnly);
    }

    #[test]
    fn test_strip_removes_line() {
        let src = "'use client';\nexport function Widget(){}";
        assert_eq!(strip_directive(src), "export function Widget(){}");
    }

    #[test]
    fn test_strip_without_semicolon_and_crlf() {
        assert_eq!(strip_directive("\"use client\"\r\nconst a = 1;\r\n"), "const a = 1;\r\n");
    }

    #[test]
    fn test_strip_keeps_surrounding_bytes() {
        let src = "// header\n  'use client';\nimport x from './x.js';\n";
        assert_eq!(strip_directive(src), "// header\n  import x from './x.js';\n");
    }

    #[test]
    fn test_strip_first_occurrence_only() {
        let src = "'use client';\nconst s = \"use client\";\n";
        let once = strip_directive(src);
        assert_eq!(once, "const s = \"use client\";\n");
    }

    #[test]
    fn test_strip_is_noop_without_directive() {
        let src = "export function Widget(){}";
        assert_eq!(strip_directive(src), src);

        let stripped = strip_directive("'use client';\nexport function Widget(){}");
        assert_eq!(strip_directive(&stripped), stripped);
    }
}
