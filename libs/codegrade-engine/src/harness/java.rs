//! Java harnesses: one `Main.java` holding the submitted types plus a
//! generated `public class Main`. The entry point is resolved from the source
//! text since the call has to be typed at compile time.

use super::catalog::{InputShape, OutputShape, ProblemDef};
use super::entry::{
    defines_type, describe_tried, missing_entry_message, quoted, resolve_static, StaticEntry,
    MISSING_ENTRY_EXIT_CODE,
};
use super::template::render;
use super::{Harness, SourceFile};
use crate::error::EngineResult;
use codegrade_common::types::Language;
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::json;

pub const SOURCE_FILE: &str = "Main.java";

pub(super) const TEMPLATES: &[(&str, &str)] = &[
    ("java_helpers", MAIN_HELPERS),
    ("java_harness", HARNESS),
    ("java_main_call", MAIN_CALL),
    ("java_main_missing", MAIN_MISSING),
    ("java_main_unsupported", MAIN_UNSUPPORTED),
];

const HARNESS: &str = r#"import java.util.*;
import java.io.*;
{{imports}}{{support_types}}
// ---- submitted code ----
{{body}}
// ---- end submitted code ----

public class Main {
{{> java_helpers}}{{builders}}
    public static void main(String[] args) throws Exception {
{{main_body}}    }
}
"#;

const MAIN_CALL: &str = r#"        BufferedReader in = new BufferedReader(new InputStreamReader(System.in));
        for (String l = in.readLine(); l != null; l = in.readLine()) LINES.add(l);
        {{decls}}
        {{invoke}}
        {{print_result}}
"#;

const MAIN_MISSING: &str = r#"        System.err.println({{missing}});
        System.exit({{exit_code}});
"#;

const MAIN_UNSUPPORTED: &str = r#"        System.err.println("__HARNESS__: input shape not supported for java");
        System.exit(2);
"#;

lazy_static! {
    static ref PUBLIC_TOP_LEVEL: Regex = Regex::new(
        r"(?m)^public\s+((?:(?:final|abstract|sealed|strictfp)\s+)*)(class|interface|enum|record)\b"
    )
    .unwrap();
    static ref IMPORT_OR_PACKAGE: Regex =
        Regex::new(r"(?m)^\s*(import|package)\s+[\w.*\s]+;[ \t]*\r?$").unwrap();
}

const LIST_NODE: &str = r#"
class ListNode {
    int val;
    ListNode next;
    ListNode() {}
    ListNode(int val) { this.val = val; }
    ListNode(int val, ListNode next) { this.val = val; this.next = next; }
}
"#;

const TREE_NODE: &str = r#"
class TreeNode {
    int val;
    TreeNode left;
    TreeNode right;
    TreeNode() {}
    TreeNode(int val) { this.val = val; }
}
"#;

const MAIN_HELPERS: &str = r#"
    static final List<String> LINES = new ArrayList<>();

    static String line(int i) {
        return i < LINES.size() ? LINES.get(i).trim() : "";
    }

    static String[] tokens(int i) {
        String l = line(i);
        return l.isEmpty() ? new String[0] : l.split("\\s+");
    }

    static int[] ints(int i) {
        String[] parts = tokens(i);
        int[] out = new int[parts.length];
        for (int k = 0; k < parts.length; k++) out[k] = Integer.parseInt(parts[k]);
        return out;
    }

    static char[] chars(int i) {
        String[] parts = tokens(i);
        char[] out = new char[parts.length];
        for (int k = 0; k < parts.length; k++) out[k] = parts[k].charAt(0);
        return out;
    }

    static Object field(Object o, String name) {
        try {
            java.lang.reflect.Field f = o.getClass().getDeclaredField(name);
            f.setAccessible(true);
            return f.get(o);
        } catch (Exception e) {
            return null;
        }
    }

    static List<Object> items(Object value) {
        List<Object> out = new ArrayList<>();
        if (value == null) return out;
        if (value instanceof int[]) { for (int v : (int[]) value) out.add(v); }
        else if (value instanceof long[]) { for (long v : (long[]) value) out.add(v); }
        else if (value instanceof double[]) { for (double v : (double[]) value) out.add(v); }
        else if (value instanceof char[]) { for (char v : (char[]) value) out.add(v); }
        else if (value instanceof boolean[]) { for (boolean v : (boolean[]) value) out.add(v); }
        else if (value instanceof Object[]) { out.addAll(Arrays.asList((Object[]) value)); }
        else if (value instanceof Iterable) { for (Object v : (Iterable<?>) value) out.add(v); }
        else if (value.getClass().getSimpleName().equals("ListNode")) {
            for (Object node = value; node != null; node = field(node, "next")) out.add(field(node, "val"));
        }
        else out.add(value);
        return out;
    }

    static boolean isScalar(Object v) {
        return v == null || v instanceof String || v instanceof Character
            || v instanceof Number || v instanceof Boolean;
    }

    static String joined(Object value, String sep) {
        StringBuilder sb = new StringBuilder();
        List<Object> parts = items(value);
        for (int i = 0; i < parts.size(); i++) {
            if (i > 0) sb.append(sep);
            sb.append(String.valueOf(parts.get(i)));
        }
        return sb.toString();
    }

    static String json(Object v) {
        if (v == null) return "null";
        if (v instanceof String || v instanceof Character) {
            return "\"" + String.valueOf(v).replace("\\", "\\\\").replace("\"", "\\\"") + "\"";
        }
        if (isScalar(v)) return String.valueOf(v);
        List<Object> parts = items(v);
        if (parts.size() == 1 && parts.get(0) == v) return String.valueOf(v);
        StringBuilder sb = new StringBuilder("[");
        for (int i = 0; i < parts.size(); i++) {
            if (i > 0) sb.append(",");
            sb.append(json(parts.get(i)));
        }
        return sb.append("]").toString();
    }

    static List<List<Long>> sortedNested(Object value) {
        List<List<Long>> out = new ArrayList<>();
        for (Object inner : items(value)) {
            List<Long> row = new ArrayList<>();
            for (Object x : items(inner)) row.add(((Number) x).longValue());
            Collections.sort(row);
            out.add(row);
        }
        out.sort((a, b) -> {
            for (int i = 0; i < Math.min(a.size(), b.size()); i++) {
                int c = Long.compare(a.get(i), b.get(i));
                if (c != 0) return c;
            }
            return Integer.compare(a.size(), b.size());
        });
        return out;
    }

    static String flatJoined(List<List<Long>> rows) {
        StringBuilder sb = new StringBuilder();
        for (List<Long> row : rows) {
            for (Long x : row) {
                if (sb.length() > 0) sb.append(" ");
                sb.append(x);
            }
        }
        return sb.toString();
    }
"#;

const BUILD_LIST: &str = r#"
    static ListNode buildList(int[] values) {
        ListNode head = null;
        for (int i = values.length - 1; i >= 0; i--) {
            ListNode node = new ListNode(values[i]);
            node.next = head;
            head = node;
        }
        return head;
    }
"#;

const BUILD_TREE: &str = r#"
    static TreeNode buildTree(String[] t) {
        if (t.length == 0 || t[0].equals("-1")) return null;
        TreeNode root = new TreeNode(Integer.parseInt(t[0]));
        Deque<TreeNode> queue = new ArrayDeque<>();
        queue.add(root);
        int i = 1;
        while (!queue.isEmpty() && i < t.length) {
            TreeNode node = queue.poll();
            if (i < t.length && !t[i].equals("-1")) {
                node.left = new TreeNode(Integer.parseInt(t[i]));
                queue.add(node.left);
            }
            i++;
            if (i < t.length && !t[i].equals("-1")) {
                node.right = new TreeNode(Integer.parseInt(t[i]));
                queue.add(node.right);
            }
            i++;
        }
        return root;
    }
"#;

/// Argument declarations and their names, or `None` for shapes Java cannot type
fn arg_decls(input: InputShape) -> Option<(&'static str, &'static str)> {
    let decl = match input {
        InputShape::IntArray => ("int[] a0 = ints(0);", "a0"),
        InputShape::IntArrayThenInt => ("int[] a0 = ints(0);\n        int a1 = Integer.parseInt(line(1));", "a0, a1"),
        InputShape::SizedIntArray => ("int[] a0 = ints(1);", "a0"),
        InputShape::SizedIntArrayThenInt => ("int[] a0 = ints(1);\n        int a1 = Integer.parseInt(line(2));", "a0, a1"),
        InputShape::IntArrayWithTrailingInt => (
            "int[] t = ints(0);\n        int[] a0 = Arrays.copyOf(t, t.length - 1);\n        int a1 = t[t.length - 1];",
            "a0, a1",
        ),
        InputShape::TwoIntArraysThenInt => (
            "int[] a0 = ints(0);\n        int[] a1 = ints(1);\n        int a2 = Integer.parseInt(line(2));",
            "a0, a1, a2",
        ),
        InputShape::IntGrid => (
            "int rows = ints(0).length > 0 ? ints(0)[0] : 0;\n        int[][] a0 = new int[rows][];\n        for (int r = 0; r < rows; r++) a0[r] = ints(1 + r);",
            "a0",
        ),
        InputShape::Tokens => ("String[] a0 = tokens(0);", "a0"),
        InputShape::Chars => ("char[] a0 = chars(0);", "a0"),
        InputShape::Line => ("String a0 = line(0);", "a0"),
        InputShape::TwoLines => ("String a0 = line(0);\n        String a1 = line(1);", "a0, a1"),
        InputShape::LinkedListThenInt => (
            "ListNode a0 = buildList(ints(0));\n        int a1 = Integer.parseInt(line(1));",
            "a0, a1",
        ),
        InputShape::LevelOrderTree => ("TreeNode a0 = buildTree(tokens(0));", "a0"),
        InputShape::JsonArrayThenInt | InputShape::JsonValue => return None,
    };
    Some(decl)
}

fn print_statement(output: OutputShape) -> &'static str {
    match output {
        OutputShape::Scalar | OutputShape::Bool => "System.out.println(result);",
        OutputShape::SpaceJoined => "System.out.println(joined(result, \" \"));",
        OutputShape::ListLiteral => "System.out.println(\"[\" + joined(result, \", \") + \"]\");",
        OutputShape::JsonCompact | OutputShape::Json => "System.out.println(json(result));",
        OutputShape::SortedNestedJson => "System.out.println(json(sortedNested(result)));",
        OutputShape::SortedPairsFlat => "System.out.println(flatJoined(sortedNested(result)));",
        OutputShape::InPlaceTokens => "System.out.println(joined(a0, \" \"));",
    }
}

fn call_expression(entry: &StaticEntry, args: &str) -> String {
    match (&entry.class, entry.is_static) {
        (Some(class), true) => format!("{}.{}({})", class, entry.method, args),
        (Some(class), false) => format!("new {}().{}({})", class, entry.method, args),
        (None, _) => format!("{}({})", entry.method, args),
    }
}

/// Imports and package lines hoisted out of the body; `public` dropped from
/// top-level types so only `Main` is public
pub fn prepare_user_code(code: &str) -> (Vec<String>, String) {
    let mut imports = Vec::new();
    for caps in IMPORT_OR_PACKAGE.captures_iter(code) {
        if &caps[1] == "import" {
            imports.push(caps[0].trim().to_string());
        }
    }
    let body = IMPORT_OR_PACKAGE.replace_all(code, "");
    let body = PUBLIC_TOP_LEVEL.replace_all(&body, "${1}${2}");
    (imports, body.into_owned())
}

pub fn generate(problem: &ProblemDef, code: &str) -> EngineResult<Harness> {
    let classes = problem.class_names();
    let methods = problem.method_names();
    let (imports, body) = prepare_user_code(code);

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

    let entry = resolve_static(code, &classes, &methods, false);
    let main_body = match (entry, arg_decls(problem.input)) {
        (Some(entry), Some((decls, names))) => {
            let call = call_expression(&entry, names);
            let invoke = if problem.output == OutputShape::InPlaceTokens {
                format!("{};", call)
            } else {
                format!("var result = {};", call)
            };
            let data = json!({
                "decls": decls,
                "invoke": invoke,
                "print_result": print_statement(problem.output),
            });
            render(Language::Java, Some(problem.id), "java_main_call", &data)?
        }
        (None, _) => {
            let tried = describe_tried(&classes, &methods, false);
            let data = json!({
                "missing": quoted(&missing_entry_message(&tried)),
                "exit_code": MISSING_ENTRY_EXIT_CODE,
            });
            render(Language::Java, Some(problem.id), "java_main_missing", &data)?
        }
        (Some(_), None) => render(Language::Java, Some(problem.id), "java_main_unsupported", &json!({}))?,
    };

    let imports: String = imports.iter().map(|import| format!("{}\n", import)).collect();
    let data = json!({
        "imports": imports,
        "support_types": support_types,
        "body": body,
        "builders": builders,
        "main_body": main_body,
    });
    let src = render(Language::Java, Some(problem.id), "java_harness", &data)?;

    Ok(Harness::Local {
        files: vec![SourceFile::new(SOURCE_FILE, src)],
    })
}

/// Input shapes a Java harness can declare typed arguments for
pub fn supports(input: InputShape) -> bool {
    arg_decls(input).is_some()
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
    fn test_public_class_demoted_and_imports_hoisted() {
        let code = "package demo;\nimport java.util.HashMap;\n\npublic final class TwoSum {\n    public static class Inner {}\n}\n";
        let (imports, body) = prepare_user_code(code);
        assert_eq!(imports, vec!["import java.util.HashMap;".to_string()]);
        assert!(body.contains("final class TwoSum"));
        assert!(!body.contains("public final class"));
        assert!(body.contains("    public static class Inner"));
        assert!(!body.contains("package demo;"));
    }

    #[test]
    fn test_two_sum_instance_call() {
        let code = "public class TwoSum {\n    public int[] twoSum(int[] nums, int target) { return new int[]{0, 1}; }\n}";
        let harness = generate(find("twosum").unwrap(), code).unwrap();
        let src = source(&harness);
        assert!(src.contains("public class Main {"));
        assert!(src.contains("var result = new TwoSum().twoSum(a0, a1);"));
        assert!(src.contains("System.out.println(joined(result, \" \"));"));
        assert_eq!(src.matches("public class").count(), 1);
    }

    #[test]
    fn test_static_solution_method() {
        let code = "class Solution {\n    public static int minPathSum(int[][] grid) { return 0; }\n}";
        let src_harness = generate(find("minimumpathsum").unwrap(), code).unwrap();
        assert!(source(&src_harness).contains("var result = Solution.minPathSum(a0);"));
    }

    #[test]
    fn test_in_place_call_has_no_result_binding() {
        let code = "class ReverseString {\n    void reverseString(char[] s) {}\n}";
        let src_harness = generate(find("reversestring").unwrap(), code).unwrap();
        let src = source(&src_harness);
        assert!(src.contains("new ReverseString().reverseString(a0);"));
        assert!(!src.contains("var result"));
    }

    #[test]
    fn test_missing_entry_point_exits_with_marker() {
        let harness = generate(find("twosum").unwrap(), "class Helper { int add(int a, int b) { return a + b; } }").unwrap();
        let src = source(&harness);
        assert!(src.contains("__HARNESS__: no entry point found (tried TwoSum.two_sum"));
        assert!(src.contains("System.exit(3);"));
        assert!(!src.contains("BufferedReader in"));
    }

    #[test]
    fn test_list_node_injected_for_list_problems() {
        let code = "class Solution {\n    public ListNode removeNthFromEnd(ListNode head, int n) { return head; }\n}";
        let harness = generate(find("removenthfromend").unwrap(), code).unwrap();
        let src = source(&harness);
        assert!(src.contains("class ListNode {"));
        assert!(src.contains("ListNode a0 = buildList(ints(0));"));
        assert!(!supports(InputShape::JsonValue));
    }
}
