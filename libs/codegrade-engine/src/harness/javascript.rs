//! Node.js harnesses. Candidate names are bound through a generated
//! `typeof` table so lookups never evaluate submitted strings.

use super::catalog::{InputShape, OutputShape, ProblemDef};
use super::entry::{
    defines_type, describe_tried, javascript_callables, missing_entry_message, quoted,
    MISSING_ENTRY_EXIT_CODE,
};
use super::template::render;
use super::{Harness, SourceFile};
use crate::error::{EngineError, EngineResult};
use codegrade_common::types::Language;
use serde_json::json;

pub const SOURCE_FILE: &str = "solution.js";

pub(super) const TEMPLATES: &[(&str, &str)] = &[
    ("javascript_prelude", PRELUDE),
    ("javascript_resolve", RESOLVE),
    ("javascript_catalog", CATALOG),
    ("javascript_generic", GENERIC),
];

const PRELUDE: &str = r#"const __harnessLines = require('fs').readFileSync(0, 'utf8').split('\n');
const __harnessLine = (i) => (i < __harnessLines.length ? __harnessLines[i].trim() : '');
const __harnessInts = (i) => __harnessLine(i).split(/\s+/).filter(Boolean).map(Number);
function __harnessFail(message) {
  process.stderr.write(message + '\n');
  process.exit({{exit_code}});
}
function __harnessPlain(value) {
  if (value && typeof value === 'object' && 'val' in value && 'next' in value) {
    const out = [];
    for (let node = value; node; node = node.next) out.push(node.val);
    return out;
  }
  return value;
}
function __harnessCompare(a, b) {
  for (let i = 0; i < Math.min(a.length, b.length); i++) {
    if (a[i] !== b[i]) return a[i] < b[i] ? -1 : 1;
  }
  return a.length - b.length;
}
const __harnessNumeric = (a, b) => a - b;
"#;

const LIST_NODE: &str = r#"
class ListNode {
  constructor(val = 0, next = null) {
    this.val = val;
    this.next = next;
  }
}
"#;

const TREE_NODE: &str = r#"
class TreeNode {
  constructor(val = 0, left = null, right = null) {
    this.val = val;
    this.left = left;
    this.right = right;
  }
}
"#;

const BUILD_LIST: &str = r#"
function __harnessBuildList(values) {
  let head = null;
  for (let i = values.length - 1; i >= 0; i--) head = new ListNode(values[i], head);
  return head;
}
"#;

const BUILD_TREE: &str = r#"
function __harnessBuildTree(tokens) {
  if (!tokens.length || tokens[0] === '-1') return null;
  const root = new TreeNode(Number(tokens[0]));
  const queue = [root];
  let i = 1;
  while (queue.length && i < tokens.length) {
    const node = queue.shift();
    if (i < tokens.length && tokens[i] !== '-1') {
      node.left = new TreeNode(Number(tokens[i]));
      queue.push(node.left);
    }
    i++;
    if (i < tokens.length && tokens[i] !== '-1') {
      node.right = new TreeNode(Number(tokens[i]));
      queue.push(node.right);
    }
    i++;
  }
  return root;
}
"#;

const RESOLVE: &str = r#"
function __harnessResolve(classes, functions, methods) {
  for (const [, C] of classes) {
    if (typeof C !== 'function') continue;
    for (const m of methods) {
      if (C.prototype && typeof C.prototype[m] === 'function') {
        const instance = new C();
        return instance[m].bind(instance);
      }
      if (typeof C[m] === 'function') return C[m].bind(C);
    }
  }
  for (const [, fn] of functions) {
    if (typeof fn === 'function' && !/^class\b/.test(Function.prototype.toString.call(fn))) return fn;
  }
  return __harnessFail({{missing}});
}

function __harnessRun(fn, args, print) {
  Promise.resolve()
    .then(() => fn(...args))
    .then((result) => console.log(print(result, args)))
    .catch((err) => {
      console.error(err && err.stack ? err.stack : String(err));
      process.exit(1);
    });
}
"#;

const CATALOG: &str = r#"{{> javascript_prelude}}{{support_types}}
// ---- submitted code ----
{{code}}
// ---- end submitted code ----
{{builders}}{{> javascript_resolve}}
__harnessRun(
  __harnessResolve({{classes}}, {{functions}}, {{methods}}),
  {{call_args}},
  {{print_result}}
);
"#;

const GENERIC: &str = r#"{{> javascript_prelude}}
// ---- submitted code ----
{{code}}
// ---- end submitted code ----
{{> javascript_resolve}}
function __harnessGeneric(candidates) {
  for (const [, value] of candidates) {
    if (typeof value !== 'function') continue;
    if (/^class\b/.test(Function.prototype.toString.call(value))) {
      const m = Object.getOwnPropertyNames(value.prototype)
        .find((n) => n !== 'constructor' && typeof value.prototype[n] === 'function');
      if (m) {
        const instance = new value();
        return instance[m].bind(instance);
      }
      continue;
    }
    return value;
  }
  return __harnessResolve([], [], []);
}

function __harnessGenericArg() {
  const raw = __harnessLine(0);
  try {
    return JSON.parse(raw);
  } catch (e) {
    return raw.split(/\s+/).filter(Boolean).map((t) => (/^-?\d+$/.test(t) ? Number(t) : t));
  }
}

__harnessRun(__harnessGeneric({{candidates}}), [__harnessGenericArg()], (r) => JSON.stringify(__harnessPlain(r)));
"#;

/// `[["Name", typeof Name !== 'undefined' ? Name : undefined], ...]`
fn binding_table(names: &[String]) -> String {
    let entries: Vec<String> = names
        .iter()
        .map(|name| {
            format!(
                "[{}, typeof {} !== 'undefined' ? {} : undefined]",
                quoted(name),
                name,
                name
            )
        })
        .collect();
    format!("[{}]", entries.join(", "))
}

fn parse_args(input: InputShape) -> &'static str {
    match input {
        InputShape::IntArray => "[__harnessInts(0)]",
        InputShape::IntArrayThenInt => "[__harnessInts(0), Number(__harnessLine(1))]",
        InputShape::SizedIntArray => "[__harnessInts(1)]",
        InputShape::SizedIntArrayThenInt => "[__harnessInts(1), Number(__harnessLine(2))]",
        InputShape::IntArrayWithTrailingInt => {
            "((t) => [t.slice(0, -1), t[t.length - 1]])(__harnessInts(0))"
        }
        InputShape::TwoIntArraysThenInt => {
            "[__harnessInts(0), __harnessInts(1), Number(__harnessLine(2))]"
        }
        InputShape::IntGrid => {
            "[Array.from({ length: __harnessInts(0)[0] || 0 }, (_, r) => __harnessInts(1 + r))]"
        }
        InputShape::Tokens | InputShape::Chars => {
            "[__harnessLine(0).split(/\\s+/).filter(Boolean)]"
        }
        InputShape::Line => "[__harnessLine(0)]",
        InputShape::TwoLines => "[__harnessLine(0), __harnessLine(1)]",
        InputShape::LinkedListThenInt => {
            "[__harnessBuildList(__harnessInts(0)), Number(__harnessLine(1))]"
        }
        InputShape::LevelOrderTree => {
            "[__harnessBuildTree(__harnessLine(0).split(/\\s+/).filter(Boolean))]"
        }
        InputShape::JsonArrayThenInt => {
            "[JSON.parse(__harnessLine(0)), parseInt(__harnessLine(1), 10)]"
        }
        InputShape::JsonValue => "[JSON.parse(__harnessLine(0))]",
    }
}

fn format_output(output: OutputShape) -> &'static str {
    match output {
        OutputShape::Scalar => "(r) => String(r)",
        OutputShape::Bool => "(r) => String(Boolean(r))",
        OutputShape::SpaceJoined => "(r) => (__harnessPlain(r) || []).join(' ')",
        OutputShape::ListLiteral => "(r) => '[' + __harnessPlain(r).join(', ') + ']'",
        OutputShape::JsonCompact | OutputShape::Json => "(r) => JSON.stringify(__harnessPlain(r))",
        OutputShape::SortedNestedJson => {
            "(r) => JSON.stringify(r.map((t) => [...t].sort(__harnessNumeric)).sort(__harnessCompare))"
        }
        OutputShape::SortedPairsFlat => {
            "(r) => r.map((p) => [...p].sort(__harnessNumeric)).sort(__harnessCompare).flat().join(' ')"
        }
        OutputShape::InPlaceTokens => "(r, args) => args[0].join(' ')",
    }
}

pub fn generate(problem: &ProblemDef, code: &str) -> EngineResult<Harness> {
    let classes: Vec<String> = problem.class_names().iter().map(|c| c.to_string()).collect();
    let methods = problem.method_names();
    let tried = describe_tried(&problem.class_names(), &methods, true);

    let mut support_types = String::new();
    if problem.input.needs_list_node() && !defines_type(code, "ListNode") {
        support_types.push_str(LIST_NODE);
    }
    if problem.input.needs_tree_node() && !defines_type(code, "TreeNode") {
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
        "support_types": support_types,
        "code": code,
        "builders": builders,
        "missing": quoted(&missing_entry_message(&tried)),
        "classes": binding_table(&classes),
        "functions": binding_table(&methods),
        "methods": serde_json::Value::from(methods.clone()).to_string(),
        "call_args": parse_args(problem.input),
        "print_result": format_output(problem.output),
    });
    let src = render(Language::JavaScript, Some(problem.id), "javascript_catalog", &data)?;

    Ok(Harness::Local {
        files: vec![SourceFile::new(SOURCE_FILE, src)],
    })
}

/// First declared function (or first method of the first declared class),
/// called with the first input line parsed as JSON or as coerced tokens
pub fn generate_generic(code: &str) -> EngineResult<Harness> {
    let callables = javascript_callables(code);
    if callables.is_empty() {
        return Err(EngineError::HarnessGeneration {
            language: Language::JavaScript,
            problem_id: None,
            reason: "no function or class declaration found in submitted code".to_string(),
        });
    }

    let data = json!({
        "exit_code": MISSING_ENTRY_EXIT_CODE,
        "code": code,
        "missing": quoted(&missing_entry_message(&callables.join(", "))),
        "candidates": binding_table(&callables),
    });
    let src = render(Language::JavaScript, None, "javascript_generic", &data)?;

    Ok(Harness::Local {
        files: vec![SourceFile::new(SOURCE_FILE, src)],
    })
}
