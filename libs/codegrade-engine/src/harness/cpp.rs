//! C++17 harnesses compiled into `./main`. Output formatting is an overload
//! set so the entry point's return type never has to be known here.

use super::catalog::{InputShape, OutputShape, ProblemDef};
use super::entry::{
    defines_type, describe_tried, missing_entry_message, quoted, resolve_static, StaticEntry,
    MISSING_ENTRY_EXIT_CODE,
};
use super::template::render;
use super::{Harness, SourceFile};
use crate::error::EngineResult;
use codegrade_common::types::Language;
use serde_json::json;

pub const SOURCE_FILE: &str = "main.cpp";

pub(super) const TEMPLATES: &[(&str, &str)] = &[
    ("cpp_helpers", HELPERS),
    ("cpp_harness", HARNESS),
    ("cpp_main_call", MAIN_CALL),
    ("cpp_main_missing", MAIN_MISSING),
    ("cpp_main_unsupported", MAIN_UNSUPPORTED),
];

const HARNESS: &str = r#"#include <bits/stdc++.h>
using namespace std;
{{support_types}}
// ---- submitted code ----
{{code}}
// ---- end submitted code ----
{{> cpp_helpers}}{{tree_helpers}}
{{main}}"#;

const MAIN_CALL: &str = r#"int main() {
    ios::sync_with_stdio(false);
    for (string l; getline(cin, l);) cg::lines.push_back(l);
    {{decls}}
    {{invoke}}
    {{print_result}}
    return 0;
}
"#;

const MAIN_MISSING: &str = r#"int main() {
    cerr << {{missing}} << endl;
    return {{exit_code}};
}
"#;

const MAIN_UNSUPPORTED: &str = r#"int main() {
    cerr << "__HARNESS__: input shape not supported for cpp" << endl;
    return 2;
}
"#;

const LIST_NODE: &str = r#"
struct ListNode {
    int val;
    ListNode *next;
    ListNode() : val(0), next(nullptr) {}
    ListNode(int x) : val(x), next(nullptr) {}
    ListNode(int x, ListNode *next) : val(x), next(next) {}
};
"#;

const TREE_NODE: &str = r#"
struct TreeNode {
    int val;
    TreeNode *left;
    TreeNode *right;
    TreeNode() : val(0), left(nullptr), right(nullptr) {}
    TreeNode(int x) : val(x), left(nullptr), right(nullptr) {}
};
"#;

const HELPERS: &str = r#"
namespace cg {
static vector<string> lines;

static string line(size_t i) {
    if (i >= lines.size()) return "";
    const string &l = lines[i];
    size_t b = l.find_first_not_of(" \t\r");
    if (b == string::npos) return "";
    size_t e = l.find_last_not_of(" \t\r");
    return l.substr(b, e - b + 1);
}

static vector<string> tokens(size_t i) {
    vector<string> out;
    istringstream in(line(i));
    string t;
    while (in >> t) out.push_back(t);
    return out;
}

static vector<int> ints(size_t i) {
    vector<int> out;
    for (const string &t : tokens(i)) out.push_back(stoi(t));
    return out;
}

static vector<char> chars(size_t i) {
    vector<char> out;
    for (const string &t : tokens(i)) out.push_back(t.empty() ? ' ' : t[0]);
    return out;
}

inline string scalar(bool v) { return v ? "true" : "false"; }
inline string scalar(const string &v) { return v; }
inline string scalar(const char *v) { return string(v); }
inline string scalar(char v) { return string(1, v); }
template <typename T> string scalar(const T &v) {
    ostringstream os;
    os << v;
    return os.str();
}

inline string json(bool v) { return v ? "true" : "false"; }
inline string json(char v) { return string("\"") + v + "\""; }
inline string json(const string &v) {
    string out = "\"";
    for (char c : v) {
        if (c == '"' || c == '\\') out += '\\';
        out += c;
    }
    return out + "\"";
}
template <typename T> string json(const T &v) { return scalar(v); }
template <typename A, typename B> string json(const pair<A, B> &p) {
    return "[" + json(p.first) + "," + json(p.second) + "]";
}
template <typename T> string json(const vector<T> &v) {
    string out = "[";
    for (size_t i = 0; i < v.size(); i++) {
        if (i) out += ",";
        out += json(v[i]);
    }
    return out + "]";
}

template <typename T> string joined(const vector<T> &v, const string &sep) {
    string out;
    for (size_t i = 0; i < v.size(); i++) {
        if (i) out += sep;
        out += scalar(v[i]);
    }
    return out;
}
{{list_helpers}}
template <typename T> vector<vector<long long>> rows(const vector<vector<T>> &v) {
    vector<vector<long long>> out;
    for (const auto &r : v) out.emplace_back(r.begin(), r.end());
    return out;
}
template <typename A, typename B> vector<vector<long long>> rows(const vector<pair<A, B>> &v) {
    vector<vector<long long>> out;
    for (const auto &p : v) out.push_back({(long long)p.first, (long long)p.second});
    return out;
}
template <typename V> vector<vector<long long>> sorted_rows(const V &v) {
    vector<vector<long long>> out = rows(v);
    for (auto &r : out) sort(r.begin(), r.end());
    sort(out.begin(), out.end());
    return out;
}
inline string flat(const vector<vector<long long>> &v) {
    string out;
    for (const auto &r : v)
        for (long long x : r) {
            if (!out.empty()) out += " ";
            out += to_string(x);
        }
    return out;
}
}  // namespace cg
"#;

const LIST_HELPERS: &str = r#"
inline string joined(ListNode *head, const string &sep) {
    string out;
    for (ListNode *n = head; n; n = n->next) {
        if (!out.empty()) out += sep;
        out += to_string(n->val);
    }
    return out;
}
static ListNode *build_list(const vector<int> &values) {
    ListNode *head = nullptr;
    for (auto it = values.rbegin(); it != values.rend(); ++it) {
        ListNode *node = new ListNode(*it);
        node->next = head;
        head = node;
    }
    return head;
}
"#;

const TREE_HELPERS: &str = r#"
namespace cg {
static TreeNode *build_tree(const vector<string> &t) {
    if (t.empty() || t[0] == "-1") return nullptr;
    TreeNode *root = new TreeNode(stoi(t[0]));
    deque<TreeNode *> queue{root};
    size_t i = 1;
    while (!queue.empty() && i < t.size()) {
        TreeNode *node = queue.front();
        queue.pop_front();
        if (i < t.size() && t[i] != "-1") {
            node->left = new TreeNode(stoi(t[i]));
            queue.push_back(node->left);
        }
        i++;
        if (i < t.size() && t[i] != "-1") {
            node->right = new TreeNode(stoi(t[i]));
            queue.push_back(node->right);
        }
        i++;
    }
    return root;
}
}  // namespace cg
"#;

fn arg_decls(input: InputShape) -> Option<(&'static str, &'static str)> {
    let decl = match input {
        InputShape::IntArray => ("vector<int> a0 = cg::ints(0);", "a0"),
        InputShape::IntArrayThenInt => ("vector<int> a0 = cg::ints(0);\n    int a1 = stoi(cg::line(1));", "a0, a1"),
        InputShape::SizedIntArray => ("vector<int> a0 = cg::ints(1);", "a0"),
        InputShape::SizedIntArrayThenInt => ("vector<int> a0 = cg::ints(1);\n    int a1 = stoi(cg::line(2));", "a0, a1"),
        InputShape::IntArrayWithTrailingInt => (
            "vector<int> a0 = cg::ints(0);\n    int a1 = a0.empty() ? 0 : a0.back();\n    if (!a0.empty()) a0.pop_back();",
            "a0, a1",
        ),
        InputShape::TwoIntArraysThenInt => (
            "vector<int> a0 = cg::ints(0);\n    vector<int> a1 = cg::ints(1);\n    int a2 = stoi(cg::line(2));",
            "a0, a1, a2",
        ),
        InputShape::IntGrid => (
            "vector<int> dims = cg::ints(0);\n    vector<vector<int>> a0;\n    for (int r = 0; r < (dims.empty() ? 0 : dims[0]); r++) a0.push_back(cg::ints(1 + r));",
            "a0",
        ),
        InputShape::Tokens => ("vector<string> a0 = cg::tokens(0);", "a0"),
        InputShape::Chars => ("vector<char> a0 = cg::chars(0);", "a0"),
        InputShape::Line => ("string a0 = cg::line(0);", "a0"),
        InputShape::TwoLines => ("string a0 = cg::line(0);\n    string a1 = cg::line(1);", "a0, a1"),
        InputShape::LinkedListThenInt => (
            "ListNode *a0 = cg::build_list(cg::ints(0));\n    int a1 = stoi(cg::line(1));",
            "a0, a1",
        ),
        InputShape::LevelOrderTree => ("TreeNode *a0 = cg::build_tree(cg::tokens(0));", "a0"),
        InputShape::JsonArrayThenInt | InputShape::JsonValue => return None,
    };
    Some(decl)
}

fn print_statement(output: OutputShape) -> &'static str {
    match output {
        OutputShape::Scalar | OutputShape::Bool => "cout << cg::scalar(result) << endl;",
        OutputShape::SpaceJoined => "cout << cg::joined(result, \" \") << endl;",
        OutputShape::ListLiteral => "cout << \"[\" << cg::joined(result, \", \") << \"]\" << endl;",
        OutputShape::JsonCompact | OutputShape::Json => "cout << cg::json(result) << endl;",
        OutputShape::SortedNestedJson => "cout << cg::json(cg::sorted_rows(result)) << endl;",
        OutputShape::SortedPairsFlat => "cout << cg::flat(cg::sorted_rows(result)) << endl;",
        OutputShape::InPlaceTokens => "cout << cg::joined(a0, \" \") << endl;",
    }
}

fn call_expression(entry: &StaticEntry, args: &str) -> String {
    match (&entry.class, entry.is_static) {
        (Some(class), true) => format!("{}::{}({})", class, entry.method, args),
        (Some(class), false) => format!("{}().{}({})", class, entry.method, args),
        (None, _) => format!("{}({})", entry.method, args),
    }
}

pub fn generate(problem: &ProblemDef, code: &str) -> EngineResult<Harness> {
    let classes = problem.class_names();
    let methods = problem.method_names();

    let mut support_types = String::new();
    if problem.input.needs_list_node() && !defines_type(code, "ListNode") {
        support_types.push_str(LIST_NODE);
    }
    if problem.input.needs_tree_node() && !defines_type(code, "TreeNode") {
        support_types.push_str(TREE_NODE);
    }

    let entry = resolve_static(code, &classes, &methods, true);
    let main = match (entry, arg_decls(problem.input)) {
        (Some(entry), Some((decls, names))) => {
            let call = call_expression(&entry, names);
            let invoke = if problem.output == OutputShape::InPlaceTokens {
                format!("{};", call)
            } else {
                format!("auto result = {};", call)
            };
            let data = json!({
                "decls": decls,
                "invoke": invoke,
                "print_result": print_statement(problem.output),
            });
            render(Language::Cpp, Some(problem.id), "cpp_main_call", &data)?
        }
        (None, _) => {
            let tried = describe_tried(&classes, &methods, true);
            let data = json!({
                "missing": quoted(&missing_entry_message(&tried)),
                "exit_code": MISSING_ENTRY_EXIT_CODE,
            });
            render(Language::Cpp, Some(problem.id), "cpp_main_missing", &data)?
        }
        (Some(_), None) => render(Language::Cpp, Some(problem.id), "cpp_main_unsupported", &json!({}))?,
    };

    let list_helpers = if problem.input.needs_list_node() { LIST_HELPERS } else { "" };
    let tree_helpers = if problem.input.needs_tree_node() { TREE_HELPERS } else { "" };
    let data = json!({
        "support_types": support_types,
        "code": code,
        "list_helpers": list_helpers,
        "tree_helpers": tree_helpers,
        "main": main,
    });
    let src = render(Language::Cpp, Some(problem.id), "cpp_harness", &data)?;

    Ok(Harness::Local {
        files: vec![SourceFile::new(SOURCE_FILE, src)],
    })
}

pub fn supports(input: InputShape) -> bool {
    arg_decls(input).is_some()
}
