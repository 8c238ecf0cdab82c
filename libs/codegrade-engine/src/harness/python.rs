//! Python harnesses: user code pasted at module level, entry point looked up
//! through `globals()` at run time.

use super::catalog::{InputShape, OutputShape, ProblemDef};
use super::entry::{
    defines_type, describe_tried, missing_entry_message, python_defines_function, quoted,
    MISSING_ENTRY_EXIT_CODE,
};
use super::template::render;
use super::{Harness, SourceFile};
use crate::error::{EngineError, EngineResult};
use codegrade_common::types::Language;
use serde_json::json;

pub const SOURCE_FILE: &str = "solution.py";

pub(super) const TEMPLATES: &[(&str, &str)] = &[
    ("python_prelude", PRELUDE),
    ("python_catalog", CATALOG),
    ("python_generic", GENERIC),
];

const PRELUDE: &str = r#"import sys
import json

_harness_lines = sys.stdin.read().split("\n")


def _harness_line(i):
    return _harness_lines[i].strip() if i < len(_harness_lines) else ""


def _harness_ints(i):
    return [int(t) for t in _harness_line(i).split()]


def _harness_plain(value):
    if hasattr(value, "val") and hasattr(value, "next"):
        out = []
        while value is not None:
            out.append(value.val)
            value = value.next
        return out
    if isinstance(value, tuple):
        return [_harness_plain(v) for v in value]
    if isinstance(value, list):
        return [_harness_plain(v) for v in value]
    return value


def _harness_fail(message):
    sys.stderr.write(message + "\n")
    sys.exit({{exit_code}})
"#;

const CATALOG: &str = r#"{{future_imports}}{{> python_prelude}}{{support_types}}
# ---- submitted code ----
{{code}}
# ---- end submitted code ----
{{builders}}

def _harness_resolve():
    for cls_name in {{classes}}:
        cls = globals().get(cls_name)
        if isinstance(cls, type):
            for name in {{methods}}:
                if callable(getattr(cls, name, None)):
                    return getattr(cls(), name)
    for name in {{methods}}:
        fn = globals().get(name)
        if callable(fn) and not isinstance(fn, type):
            return fn
    _harness_fail({{missing}})


if __name__ == "__main__":
    _harness_fn = _harness_resolve()
    _harness_args = {{call_args}}
    _harness_result = _harness_fn(*_harness_args)
    {{print_result}}
"#;

const GENERIC: &str = r#"{{future_imports}}{{> python_prelude}}
_harness_reserved = set(globals())

# ---- submitted code ----
{{code}}
# ---- end submitted code ----


def _harness_resolve():
    import inspect
    for name, value in list(globals().items()):
        if name in _harness_reserved or name.startswith("_"):
            continue
        if inspect.isclass(value) and value.__module__ == "__main__":
            for attr, member in vars(value).items():
                if callable(member) and not attr.startswith("_"):
                    return getattr(value(), attr)
        elif inspect.isfunction(value) and value.__module__ == "__main__":
            return value
    _harness_fail({{missing}})


def _harness_generic_arg():
    raw = _harness_line(0)
    try:
        return json.loads(raw)
    except ValueError:
        return [int(t) if t.lstrip("-").isdigit() else t for t in raw.split()]


if __name__ == "__main__":
    _harness_fn = _harness_resolve()
    _harness_result = _harness_fn(_harness_generic_arg())
    print(json.dumps(_harness_plain(_harness_result), separators=(",", ":")))
"#;

const LIST_NODE: &str = r#"
class ListNode:
    def __init__(self, val=0, next=None):
        self.val = val
        self.next = next
"#;

const TREE_NODE: &str = r#"
class TreeNode:
    def __init__(self, val=0, left=None, right=None):
        self.val = val
        self.left = left
        self.right = right
"#;

const BUILD_LIST: &str = r#"
def _harness_build_list(values):
    head = None
    for v in reversed(values):
        head = ListNode(v, head)
    return head
"#;

const BUILD_TREE: &str = r#"
def _harness_build_tree(tokens):
    if not tokens or tokens[0] == "-1":
        return None
    root = TreeNode(int(tokens[0]))
    queue = [root]
    i = 1
    while queue and i < len(tokens):
        node = queue.pop(0)
        if i < len(tokens) and tokens[i] != "-1":
            node.left = TreeNode(int(tokens[i]))
            queue.append(node.left)
        i += 1
        if i < len(tokens) and tokens[i] != "-1":
            node.right = TreeNode(int(tokens[i]))
            queue.append(node.right)
        i += 1
    return root
"#;

fn python_list(items: &[String]) -> String {
    let quoted: Vec<String> = items.iter().map(|s| quoted(s)).collect();
    format!("[{}]", quoted.join(", "))
}

fn parse_args(input: InputShape) -> &'static str {
    match input {
        InputShape::IntArray => "[_harness_ints(0)]",
        InputShape::IntArrayThenInt => "[_harness_ints(0), int(_harness_line(1))]",
        InputShape::SizedIntArray => "[_harness_ints(1)]",
        InputShape::SizedIntArrayThenInt => "[_harness_ints(1), int(_harness_line(2))]",
        InputShape::IntArrayWithTrailingInt => "[_harness_ints(0)[:-1], _harness_ints(0)[-1]]",
        InputShape::TwoIntArraysThenInt => {
            "[_harness_ints(0), _harness_ints(1), int(_harness_line(2))]"
        }
        InputShape::IntGrid => "[[_harness_ints(1 + r) for r in range(_harness_ints(0)[0])]]",
        InputShape::Tokens | InputShape::Chars => "[_harness_line(0).split()]",
        InputShape::Line => "[_harness_line(0)]",
        InputShape::TwoLines => "[_harness_line(0), _harness_line(1)]",
        InputShape::LinkedListThenInt => {
            "[_harness_build_list(_harness_ints(0)), int(_harness_line(1))]"
        }
        InputShape::LevelOrderTree => "[_harness_build_tree(_harness_line(0).split())]",
        InputShape::JsonArrayThenInt => "[json.loads(_harness_line(0)), int(_harness_line(1))]",
        InputShape::JsonValue => "[json.loads(_harness_line(0))]",
    }
}

fn format_output(output: OutputShape) -> &'static str {
    match output {
        OutputShape::Scalar => "print(_harness_result)",
        OutputShape::Bool => "print(str(_harness_result).lower())",
        OutputShape::SpaceJoined => {
            "print(\" \".join(str(x) for x in _harness_plain(_harness_result) or []))"
        }
        OutputShape::ListLiteral => {
            "print(\"[\" + \", \".join(str(x) for x in _harness_plain(_harness_result)) + \"]\")"
        }
        OutputShape::JsonCompact => {
            "print(json.dumps(_harness_plain(_harness_result), separators=(\",\", \":\")))"
        }
        OutputShape::SortedNestedJson => {
            "print(json.dumps(sorted(sorted(t) for t in _harness_plain(_harness_result)), separators=(\",\", \":\")))"
        }
        OutputShape::SortedPairsFlat => {
            "print(\" \".join(str(x) for p in sorted(sorted(p) for p in _harness_plain(_harness_result)) for x in p))"
        }
        OutputShape::InPlaceTokens => "print(\" \".join(str(x) for x in _harness_args[0]))",
        OutputShape::Json => {
            "print(json.dumps(_harness_plain(_harness_result), separators=(\",\", \":\")))"
        }
    }
}

/// `from __future__` imports must open the module, so they move above the prelude
fn split_future_imports(code: &str) -> (String, String) {
    let mut future = String::new();
    let mut rest = String::new();
    for line in code.lines() {
        if line.trim_start().starts_with("from __future__ import") {
            future.push_str(line.trim_start());
            future.push('\n');
        } else {
            rest.push_str(line);
            rest.push('\n');
        }
    }
    (future, rest)
}

/// Harness for a catalog problem
pub fn generate(problem: &ProblemDef, code: &str) -> EngineResult<Harness> {
    let classes = problem.class_names();
    let methods = problem.method_names();
    let tried = describe_tried(&classes, &methods, true);
    let class_list: Vec<String> = classes.iter().map(|c| c.to_string()).collect();

    let (future_imports, code) = split_future_imports(code);
    let mut support_types = String::new();
    if problem.input.needs_list_node() && !defines_type(&code, "ListNode") {
        support_types.push_str(LIST_NODE);
    }
    if problem.input.needs_tree_node() && !defines_type(&code, "TreeNode") {
        support_types.push_str(TREE_NODE);
    }
    let mut builders = String::new();
    if problem.input.needs_list_node() {
        builders.push_str(BUILD_LIST);
    }
    if problem.input.needs_tree_node() {
        builders.push_str(BUILD_TREE);
    }

    let data = json!({
        "exit_code": MISSING_ENTRY_EXIT_CODE,
        "future_imports": future_imports,
        "support_types": support_types,
        "code": code,
        "builders": builders,
        "classes": python_list(&class_list),
        "methods": python_list(&methods),
        "missing": quoted(&missing_entry_message(&tried)),
        "call_args": parse_args(problem.input),
        "print_result": format_output(problem.output),
    });
    let src = render(Language::Python, Some(problem.id), "python_catalog", &data)?;

    Ok(Harness::Local {
        files: vec![SourceFile::new(SOURCE_FILE, src)],
    })
}

/// Harness that calls the first user-defined function or method with one
/// argument parsed from the first input line and prints the JSON result
pub fn generate_generic(code: &str) -> EngineResult<Harness> {
    if !python_defines_function(code) {
        return Err(EngineError::HarnessGeneration {
            language: Language::Python,
            problem_id: None,
            reason: "no function definition found in submitted code".to_string(),
        });
    }

    let (future_imports, code) = split_future_imports(code);
    let data = json!({
        "exit_code": MISSING_ENTRY_EXIT_CODE,
        "future_imports": future_imports,
        "code": code,
        "missing": quoted(&missing_entry_message("first user-defined function or method")),
    });
    let src = render(Language::Python, None, "python_generic", &data)?;

    Ok(Harness::Local {
        files: vec![SourceFile::new(SOURCE_FILE, src)],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::catalog::find;

    fn source(harness: &Harness) -> &str {
        match harness {
            Harness::Local { files } => &files[0].contents,
            Harness::Remote(_) => panic!("expected a local harness"),
        }
    }

    #[test]
    fn test_two_sum_harness_shape() {
        let code = "class TwoSum:\n    def two_sum(self, nums, target):\n        return [0, 1]\n";
        let harness = generate(find("twosum").unwrap(), code).unwrap();
        let src = source(&harness);
        assert!(src.contains(code));
        assert!(src.contains(r#"["TwoSum", "Solution"]"#));
        assert!(src.contains(r#"["two_sum", "twoSum"]"#));
        assert!(src.contains("[_harness_ints(0), int(_harness_line(1))]"));
        assert!(src.contains("sys.exit(3)"));
        assert!(src.contains("no entry point found (tried TwoSum.two_sum"));
        assert!(!src.contains("class ListNode"));
    }

    #[test]
    fn test_support_types_injected_only_when_missing() {
        let problem = find("removenthfromend").unwrap();
        let without = generate(problem, "class Solution:\n    def removeNthFromEnd(self, head, n):\n        return head\n").unwrap();
        assert!(source(&without).contains("class ListNode:\n    def __init__"));

        let own = "class ListNode:\n    def __init__(self, x):\n        self.val = x\n        self.next = None\n";
        let with = generate(problem, own).unwrap();
        assert_eq!(source(&with).matches("class ListNode").count(), 1);
    }

    #[test]
    fn test_tree_problem_gets_builder() {
        let harness = generate(find("diagonaltraversal").unwrap(), "def diagonal_traversal(root):\n    return []\n").unwrap();
        let src = source(&harness);
        assert!(src.contains("class TreeNode"));
        assert!(src.contains("_harness_build_tree(_harness_line(0).split())"));
        assert!(src.contains("separators=(\",\", \":\")"));
    }

    #[test]
    fn test_future_imports_open_the_module() {
        let code = "from __future__ import annotations\ndef two_sum(nums, target):\n    return [0, 1]\n";
        let harness = generate(find("twosum").unwrap(), code).unwrap();
        assert!(source(&harness).starts_with("from __future__ import annotations\nimport sys"));
    }

    #[test]
    fn test_submitted_code_is_inserted_verbatim() {
        let code = "def two_sum(nums, target):\n    s = \"<{{x}}> & 'y'\"\n    return [0, 1]\n";
        let harness = generate(find("twosum").unwrap(), code).unwrap();
        let src = source(&harness);
        assert!(src.contains(code));
        assert!(src.contains("    _harness_args = [_harness_ints(0), int(_harness_line(1))]\n"));
        assert!(src.trim_end().ends_with("print(\" \".join(str(x) for x in _harness_plain(_harness_result) or []))"));
    }

    #[test]
    fn test_generic_requires_a_function() {
        assert!(generate_generic("print(42)").is_err());
        let harness = generate_generic("def double(xs):\n    return [x * 2 for x in xs]\n").unwrap();
        assert!(source(&harness).contains("_harness_generic_arg()"));
    }
}
