//! Entry point conventions shared by the generators.
//!
//! Dynamic harnesses (Python, JavaScript) receive the candidate lists and
//! resolve at run time. Static harnesses (Java, C++, Apex) resolve here, from
//! the source text, before code is generated.

use lazy_static::lazy_static;
use regex::Regex;

/// Prefix of every diagnostic a harness itself writes to stderr
pub const HARNESS_MARKER: &str = "__HARNESS__";

/// Stderr prefix of a harness that found nothing to call
pub const MISSING_ENTRY_POINT: &str = "__HARNESS__: no entry point found";

/// Exit status of a harness that found nothing to call
pub const MISSING_ENTRY_EXIT_CODE: i32 = 3;

/// Words that can precede `name(` without it being a definition
const NON_TYPE_WORDS: &[&str] = &["return", "new", "else", "throw", "case", "await", "yield", "delete"];

lazy_static! {
    static ref BLOCK_COMMENT: Regex = Regex::new(r"(?s)/\*.*?\*/").unwrap();
    static ref LINE_COMMENT: Regex = Regex::new(r"//[^\n]*").unwrap();
    static ref PY_DEF: Regex = Regex::new(r"(?m)^\s*(?:async\s+)?def\s+[A-Za-z_]\w*\s*\(").unwrap();
    static ref JS_FUNCTION: Regex = Regex::new(r"\bfunction\s*\*?\s*([A-Za-z_$][\w$]*)\s*\(").unwrap();
    static ref JS_BINDING: Regex = Regex::new(
        r"\b(?:const|let|var)\s+([A-Za-z_$][\w$]*)\s*=\s*(?:async\s+)?(?:function\b|\([^)]*\)\s*=>|[A-Za-z_$][\w$]*\s*=>)"
    )
    .unwrap();
    static ref JS_CLASS: Regex = Regex::new(r"\bclass\s+([A-Za-z_$][\w$]*)").unwrap();
}

/// Where a statically resolved entry point lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticEntry {
    /// `None` for a free function
    pub class: Option<String>,
    pub method: String,
    pub is_static: bool,
}

/// `TwoSum.two_sum, TwoSum.twoSum, ..., two_sum, twoSum`
pub fn describe_tried(classes: &[&str], methods: &[String], free_functions: bool) -> String {
    let mut tried: Vec<String> = Vec::new();
    for class in classes {
        for method in methods {
            tried.push(format!("{}.{}", class, method));
        }
    }
    if free_functions {
        tried.extend(methods.iter().cloned());
    }
    tried.join(", ")
}

pub fn missing_entry_message(tried: &str) -> String {
    format!("{} (tried {})", MISSING_ENTRY_POINT, tried)
}

/// A double-quoted literal valid in Python, JavaScript, Java and C++
pub fn quoted(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}

pub fn strip_comments(code: &str) -> String {
    let without_blocks = BLOCK_COMMENT.replace_all(code, "");
    LINE_COMMENT.replace_all(&without_blocks, "").into_owned()
}

/// True if `code` declares a class, struct, interface or enum called `name`
pub fn defines_type(code: &str, name: &str) -> bool {
    type_decl(name).is_some_and(|re| re.is_match(&strip_comments(code)))
}

fn type_decl(name: &str) -> Option<Regex> {
    let pattern = format!(r"\b(?:class|struct|interface|enum|record)\s+{}\b", regex::escape(name));
    Regex::new(&pattern).ok()
}

/// Body of the first declaration of type `name`, braces included
fn type_body<'a>(code: &'a str, name: &str) -> Option<&'a str> {
    let decl = type_decl(name)?.find(code)?;
    let open = decl.end() + code[decl.end()..].find('{')?;
    let mut depth = 0usize;
    for (offset, c) in code[open..].char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&code[open..=open + offset]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Locate a definition of `method` in `code`; returns whether it is static
fn find_method_definition(code: &str, method: &str) -> Option<bool> {
    let pattern = format!(r"(\w+|[>\]\*&])\s+{}\s*\(", regex::escape(method));
    let re = Regex::new(&pattern).ok()?;
    for caps in re.captures_iter(code) {
        let preceding = caps.get(1).map(|m| m.as_str()).unwrap_or("");
        if NON_TYPE_WORDS.contains(&preceding) {
            continue;
        }
        let start = caps.get(0).map(|m| m.start()).unwrap_or(0);
        let line_start = code[..start].rfind('\n').map(|i| i + 1).unwrap_or(0);
        let line_prefix = &code[line_start..start];
        let is_static = line_prefix.split_whitespace().any(|w| w == "static");
        return Some(is_static);
    }
    None
}

/// Resolve the entry point textually: each candidate class in order, then
/// (if the language has them) free functions.
pub fn resolve_static(
    code: &str,
    classes: &[&str],
    methods: &[String],
    allow_free: bool,
) -> Option<StaticEntry> {
    let code = strip_comments(code);

    for class in classes {
        if let Some(body) = type_body(&code, class) {
            for method in methods {
                if let Some(is_static) = find_method_definition(body, method) {
                    return Some(StaticEntry {
                        class: Some(class.to_string()),
                        method: method.clone(),
                        is_static,
                    });
                }
            }
        }
    }

    if allow_free {
        for method in methods {
            if find_method_definition(&code, method).is_some() {
                return Some(StaticEntry {
                    class: None,
                    method: method.clone(),
                    is_static: true,
                });
            }
        }
    }

    None
}

pub fn python_defines_function(code: &str) -> bool {
    PY_DEF.is_match(code)
}

/// Functions, function-valued bindings and classes declared in `code`, in source order
pub fn javascript_callables(code: &str) -> Vec<String> {
    let code = strip_comments(code);
    let mut found: Vec<(usize, String)> = Vec::new();
    for re in [&*JS_FUNCTION, &*JS_BINDING, &*JS_CLASS] {
        for caps in re.captures_iter(&code) {
            if let Some(name) = caps.get(1) {
                found.push((name.start(), name.as_str().to_string()));
            }
        }
    }
    found.sort_by_key(|(pos, _)| *pos);

    let mut names: Vec<String> = Vec::new();
    for (_, name) in found {
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names
}
