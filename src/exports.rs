//! Component export discovery.
//!
//! This is a best-effort text scan, not a parse. Three export shapes are
//! recognised and only upper-camel-case names are reported:
//!
//! ```text
//! export function Name
//! export const Name
//! export default function Name
//! ```
//!
//! Anything else (`export { A }`, `export class`, `export async function`,
//! re-exports) is missed.

use crate::error::{LoaderError, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Exported component names per file, keyed by path.
pub type ComponentMap = BTreeMap<PathBuf, Vec<String>>;

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

fn skip_whitespace(s: &str) -> &str {
    s.trim_start_matches(|c: char| c.is_whitespace())
}

/// Split a leading identifier off `s`.
fn take_ident(s: &str) -> Option<(&str, &str)> {
    let end = s.find(|c: char| !is_ident_char(c)).unwrap_or(s.len());
    if end == 0 {
        None
    } else {
        Some((&s[..end], &s[end..]))
    }
}

/// Consume `word` followed by at least one whitespace character.
fn keyword<'a>(s: &'a str, word: &str) -> Option<&'a str> {
    let rest = s.strip_prefix(word)?;
    if rest.starts_with(|c: char| c.is_whitespace()) {
        Some(skip_whitespace(rest))
    } else {
        None
    }
}

fn is_component_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_uppercase())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Name bound by the export statement starting right after `export `.
fn exported_name(after_export: &str) -> Option<&str> {
    let declared = if let Some(rest) = keyword(after_export, "function") {
        rest
    } else if let Some(rest) = keyword(after_export, "const") {
        rest
    } else {
        let rest = keyword(after_export, "default")?;
        keyword(rest, "function")?
    };

    let (name, _) = take_ident(declared)?;
    is_component_name(name).then_some(name)
}

/// Component names exported by `content`, in source order without duplicates.
pub fn extract_component_names(content: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();

    for (pos, _) in content.match_indices("export") {
        let preceded_by_ident = content[..pos]
            .chars()
            .next_back()
            .is_some_and(is_ident_char);
        if preceded_by_ident {
            continue;
        }

        let Some(after) = keyword(&content[pos..], "export") else {
            continue;
        };
        if let Some(name) = exported_name(after) {
            if !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
    }

    names
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| extensions.iter().any(|allowed| allowed == ext))
}

/// Map every direct child of `dir` with a matching extension to the
/// component names it exports. Files without component exports are omitted.
///
/// A missing directory is not an error and yields an empty map.
pub fn scan_directory(dir: impl AsRef<Path>, extensions: &[String]) -> Result<ComponentMap> {
    let dir = dir.as_ref();
    let mut components = ComponentMap::new();

    if !dir.exists() {
        return Ok(components);
    }

    let entries = fs::read_dir(dir).map_err(|e| LoaderError::io(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| LoaderError::io(dir, e))?;
        let path = entry.path();

        if !path.is_file() || !has_extension(&path, extensions) {
            continue;
        }

        let content = fs::read_to_string(&path).map_err(|e| LoaderError::io(&path, e))?;
        let names = extract_component_names(&content);
        if !names.is_empty() {
            tracing::trace!(path = %path.display(), count = names.len(), "found component exports");
            components.insert(path, names);
        }
    }

    Ok(components)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn exts() -> Vec<String> {
        vec!["tsx".into(), "jsx".into()]
    }

    #[test]
    fn test_three_export_shapes_in_source_order() {
        let src = "export const Header = () => null;\n\
                   export function Foo() {}\n\
                   export default function Bar() {}\n";
        assert_eq!(extract_component_names(src), vec!["Header", "Foo", "Bar"]);
    }

    #[test]
    fn test_duplicates_collapsed() {
        let src = "export function Foo() {}\nexport const Foo = 1;\nexport function Baz(){}";
        assert_eq!(extract_component_names(src), vec!["Foo", "Baz"]);
    }

    #[test]
    fn test_ignores_lowercase_and_other_shapes() {
        let src = "export function helper() {}\n\
                   export const config = {};\n\
                   export class Widget {}\n\
                   export { Other };\n\
                   export default Page;\n\
                   export async function Loader() {}\n";
        assert!(extract_component_names(src).is_empty());
    }

    #[test]
    fn test_requires_word_boundaries() {
        let src = "reexport function Foo() {}\nexportfunction Bar() {}\nexport functional Baz";
        assert!(extract_component_names(src).is_empty());
    }

    #[test]
    fn test_whitespace_between_tokens() {
        let src = "export\n  default\tfunction   Card(props) {}";
        assert_eq!(extract_component_names(src), vec!["Card"]);
    }

    #[test]
    fn test_scan_missing_directory() {
        let dir = tempdir().unwrap();
        let result = scan_directory(dir.path().join("components"), &exts()).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_scan_directory() {
        let dir = tempdir().unwrap();
        let page = dir.path().join("page.tsx");
        fs::write(&page, "export function Foo() {}\nexport default function Bar() {}\nexport function Foo() {}").unwrap();
        fs::write(dir.path().join("util.tsx"), "export const helper = 1;").unwrap();
        fs::write(dir.path().join("notes.md"), "export function Ignored() {}").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested/deep.tsx"), "export function Deep() {}").unwrap();

        let result = scan_directory(dir.path(), &exts()).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[&page], vec!["Foo", "Bar"]);
    }
}
