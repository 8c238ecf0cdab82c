/// Integration tests for the full submission path
///
/// These tests drive real processes through `Engine::submit_execution`:
/// 1. Results come back complete and in order
/// 2. Compilation failures fail the whole submission
/// 3. Runtime errors stay inside their own test case
/// 4. Timeouts terminate the process and are reported
/// 5. Concurrent submissions are isolated and admission is bounded
///
/// Tests in `pipeline_tests` swap the language toolchains for `sh` commands so
/// they run anywhere. Tests in `toolchain_tests` need the real compilers and
/// interpreters and are ignored by default.

#[cfg(test)]
mod pipeline_tests {
    use crate::config::{CommandSpec, LanguageConfig, LanguageConfigManager};
    use crate::executor::MAX_SOURCE_CODE_BYTES;
    use crate::Engine;
    use codegrade_common::config::EngineConfig;
    use codegrade_common::types::{ErrorKind, ExecutionRequest, Language, TestCase};
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    const TWO_SUM_PY: &str = "def two_sum(nums, target):\n    return [0, 1]\n";

    fn sh(script: &str) -> CommandSpec {
        CommandSpec {
            command: "sh".to_string(),
            args: vec!["-c".to_string(), script.to_string()],
        }
    }

    fn case(input: &str, expected: &str) -> TestCase {
        TestCase {
            input: input.to_string(),
            expected_output: expected.to_string(),
            description: format!("input {:?}", input),
        }
    }

    /// Engine whose python runs `run` and whose java compiles with `compile`
    fn engine_with(
        root: &tempfile::TempDir,
        run: &str,
        compile: Option<&str>,
        tune: impl FnOnce(&mut EngineConfig),
    ) -> Engine {
        let mut config = EngineConfig {
            execution_root_dir: root.path().to_path_buf(),
            cleanup_delay_ms: 0,
            execution_timeout_ms: 5_000,
            ..EngineConfig::default()
        };
        tune(&mut config);

        let mut languages = LanguageConfigManager::builtin();
        languages.set(
            Language::Python,
            LanguageConfig {
                name: "python".to_string(),
                source_file: "solution.py".to_string(),
                compile: None,
                run: Some(sh(run)),
            },
        );
        languages.set(
            Language::Java,
            LanguageConfig {
                name: "java".to_string(),
                source_file: "Main.java".to_string(),
                compile: compile.map(sh),
                run: Some(sh(run)),
            },
        );
        Engine::new(config, languages).unwrap()
    }

    #[tokio::test]
    async fn test_results_follow_test_case_order() {
        let root = tempfile::tempdir().unwrap();
        let engine = engine_with(&root, "read nums; read target; echo \"$nums|$target\"", None, |_| {});

        let request = ExecutionRequest::new(
            TWO_SUM_PY,
            Language::Python,
            Some("two-sum"),
            vec![
                case("2 7 11 15\n9", "2 7 11 15|9"),
                case("3 2 4\n6", "3 2 4|6"),
                case("3 3\n6", "3 3|6"),
            ],
        );
        let response = engine.submit_execution(request).await;

        assert!(response.success, "{:?}", response.error);
        let results = response.results.as_ref().unwrap();
        assert_eq!(results.len(), 3);
        for (i, result) in results.iter().enumerate() {
            assert_eq!(result.index, i + 1);
            assert!(result.passed, "{:?}", result);
            assert!(result.execution_time_ms > 0.0);
        }
        assert_eq!(response.passed_count(), 3);
    }

    #[tokio::test]
    async fn test_infinite_loop_times_out() {
        let root = tempfile::tempdir().unwrap();
        let engine = engine_with(&root, "while :; do :; done", None, |c| c.execution_timeout_ms = 500);

        let start = Instant::now();
        let response = engine
            .submit_execution(ExecutionRequest::new(
                "def two_sum(nums, target):\n    while True:\n        pass\n",
                Language::Python,
                Some("twosum"),
                vec![case("1 2\n3", "0 1")],
            ))
            .await;

        assert!(start.elapsed() < Duration::from_secs(3));
        assert!(response.success);
        let results = response.results.unwrap();
        assert_eq!(results.len(), 1);
        assert!(!results[0].passed);
        assert_eq!(results[0].error.as_ref().unwrap().kind, ErrorKind::TimeoutError);
    }

    #[tokio::test]
    async fn test_compile_error_fails_submission() {
        let root = tempfile::tempdir().unwrap();
        let engine = engine_with(
            &root,
            "echo unreachable",
            Some("echo \"Main.java:5: error: ';' expected\" >&2; exit 1"),
            |_| {},
        );

        let response = engine
            .submit_execution(ExecutionRequest::new(
                "class Solution { int[] twoSum(int[] nums, int target) { return null } }",
                Language::Java,
                Some("twosum"),
                vec![case("1 2\n3", "0 1"), case("3 3\n6", "0 1")],
            ))
            .await;

        assert!(!response.success);
        assert!(response.results.is_none());
        let error = response.error.unwrap();
        assert_eq!(error.kind, ErrorKind::CompileError);
        assert_eq!(error.message, "Compilation Error");
        assert_eq!(error.detail, "Main.java:5: error: ';' expected");
    }

    #[tokio::test]
    async fn test_runtime_error_does_not_abort_remaining_cases() {
        let root = tempfile::tempdir().unwrap();
        let engine = engine_with(
            &root,
            "read x; if [ \"$x\" = boom ]; then echo 'Traceback: ValueError' >&2; exit 1; fi; echo \"$x\"",
            None,
            |_| {},
        );

        let response = engine
            .submit_execution(ExecutionRequest::new(
                TWO_SUM_PY,
                Language::Python,
                Some("twosum"),
                vec![case("1", "1"), case("boom", "boom"), case("3", "4")],
            ))
            .await;

        let results = response.results.unwrap();
        assert_eq!(results.len(), 3);
        assert!(results[0].passed);
        assert!(!results[1].passed);
        let error = results[1].error.as_ref().unwrap();
        assert_eq!(error.kind, ErrorKind::RuntimeError);
        assert!(error.detail.contains("ValueError"));
        // a plain mismatch carries no error
        assert!(!results[2].passed);
        assert!(results[2].error.is_none());
    }

    #[tokio::test]
    async fn test_concurrent_submissions_are_isolated() {
        let root = tempfile::tempdir().unwrap();
        let engine = engine_with(&root, "sleep 0.2; cat solution.py", None, |_| {});

        let submit = |marker: &'static str| {
            engine.submit_execution(ExecutionRequest::new(
                format!("def two_sum(nums, target):\n    return '{}'\n", marker),
                Language::Python,
                Some("twosum"),
                vec![case("1 2\n3", "unused")],
            ))
        };
        let (a, b) = tokio::join!(submit("MARKER_A"), submit("MARKER_B"));

        let a = &a.results.unwrap()[0].actual_output;
        let b = &b.results.unwrap()[0].actual_output;
        assert!(a.contains("MARKER_A") && !a.contains("MARKER_B"));
        assert!(b.contains("MARKER_B") && !b.contains("MARKER_A"));
    }

    #[tokio::test]
    async fn test_admission_bounds_concurrent_submissions() {
        let root = tempfile::tempdir().unwrap();
        let engine = Arc::new(engine_with(&root, "sleep 0.4; echo 0 1", None, |c| {
            c.max_concurrent_executions = 5
        }));

        let start = Instant::now();
        let tasks: Vec<_> = (0..7)
            .map(|_| {
                let engine = Arc::clone(&engine);
                tokio::spawn(async move {
                    engine
                        .submit_execution(ExecutionRequest::new(
                            TWO_SUM_PY,
                            Language::Python,
                            Some("twosum"),
                            vec![case("1 2\n3", "0 1")],
                        ))
                        .await
                })
            })
            .collect();
        for task in tasks {
            assert!(task.await.unwrap().results.unwrap()[0].passed);
        }
        let elapsed = start.elapsed();

        // two admission waves, not seven sequential runs and not one wave
        assert!(elapsed >= Duration::from_millis(800), "{:?}", elapsed);
        assert!(elapsed < Duration::from_millis(2_400), "{:?}", elapsed);
        assert_eq!(engine.queue().running(), 0);
    }

    #[tokio::test]
    async fn test_background_child_does_not_hide_output() {
        let root = tempfile::tempdir().unwrap();
        let engine = engine_with(&root, "sleep 5 & echo 0 1", None, |_| {});

        let start = Instant::now();
        let response = engine
            .submit_execution(ExecutionRequest::new(
                TWO_SUM_PY,
                Language::Python,
                Some("twosum"),
                vec![case("2 7 11 15\n9", "0 1")],
            ))
            .await;

        assert!(start.elapsed() < Duration::from_secs(3));
        let results = response.results.unwrap();
        assert!(results[0].passed, "{:?}", results[0]);
        assert_eq!(results[0].actual_output, "0 1");
        assert!(results[0].error.is_none());
    }

    #[tokio::test]
    async fn test_workspace_removed_after_response() {
        let root = tempfile::tempdir().unwrap();
        let engine = engine_with(&root, "echo 0 1", None, |_| {});

        let response = engine
            .submit_execution(ExecutionRequest::new(
                TWO_SUM_PY,
                Language::Python,
                Some("twosum"),
                vec![case("1 2\n3", "0 1")],
            ))
            .await;
        assert!(response.success);

        tokio::time::sleep(Duration::from_millis(300)).await;
        let leftover = std::fs::read_dir(root.path()).unwrap().count();
        assert_eq!(leftover, 0);
    }

    #[tokio::test]
    async fn test_unresolvable_harness_fails_submission() {
        let root = tempfile::tempdir().unwrap();
        let engine = engine_with(&root, "echo 0 1", None, |_| {});

        let response = engine
            .submit_execution(ExecutionRequest::new(
                "class Foo { }",
                Language::Java,
                Some("mystery-problem"),
                vec![case("1", "1")],
            ))
            .await;

        assert!(!response.success);
        assert!(response.results.is_none());
        let error = response.error.unwrap();
        assert_eq!(error.kind, ErrorKind::HarnessGenerationError);
        assert_eq!(error.message, "Harness Generation Error");
    }

    #[tokio::test]
    async fn test_oversized_source_rejected() {
        let root = tempfile::tempdir().unwrap();
        let engine = engine_with(&root, "echo 0 1", None, |_| {});

        let code = format!("{}\n# {}", TWO_SUM_PY, "x".repeat(MAX_SOURCE_CODE_BYTES));
        let response = engine
            .submit_execution(ExecutionRequest::new(
                code,
                Language::Python,
                Some("twosum"),
                vec![case("1 2\n3", "0 1")],
            ))
            .await;

        assert!(!response.success);
        assert!(response.error.unwrap().detail.contains("source code exceeds"));
    }

    #[tokio::test]
    async fn test_remote_language_needs_credentials() {
        let root = tempfile::tempdir().unwrap();
        let engine = engine_with(&root, "echo 0 1", None, |_| {});
        assert!(!engine.executable_languages().contains(&Language::Apex));

        let response = engine
            .submit_execution(ExecutionRequest::new(
                "List<Integer> twoSum(List<Integer> nums, Integer target) { return null; }",
                Language::Apex,
                Some("twosum"),
                vec![case("1 2\n3", "0 1")],
            ))
            .await;

        assert!(!response.success);
        assert_eq!(response.error.unwrap().kind, ErrorKind::RemoteError);
    }

    #[tokio::test]
    async fn test_empty_test_list_yields_empty_results() {
        let root = tempfile::tempdir().unwrap();
        let engine = engine_with(&root, "echo 0 1", None, |_| {});

        let response = engine
            .submit_execution(ExecutionRequest::new(TWO_SUM_PY, Language::Python, Some("twosum"), vec![]))
            .await;
        assert!(response.success);
        assert_eq!(response.total_count(), 0);
    }
}

#[cfg(test)]
mod toolchain_tests {
    use crate::config::LanguageConfigManager;
    use crate::Engine;
    use codegrade_common::config::EngineConfig;
    use codegrade_common::types::{ErrorKind, ExecutionRequest, ExecutionResponse, Language, TestCase};

    fn cases(pairs: &[(&str, &str)]) -> Vec<TestCase> {
        pairs
            .iter()
            .map(|(input, expected)| TestCase {
                input: input.to_string(),
                expected_output: expected.to_string(),
                description: String::new(),
            })
            .collect()
    }

    fn two_sum_cases() -> Vec<TestCase> {
        cases(&[("2 7 11 15\n9", "0 1"), ("3 2 4\n6", "1 2"), ("3 3\n6", "0 1")])
    }

    async fn submit(root: &tempfile::TempDir, language: Language, problem: &str, code: &str, cases: Vec<TestCase>) -> ExecutionResponse {
        let config = EngineConfig {
            execution_root_dir: root.path().to_path_buf(),
            cleanup_delay_ms: 0,
            execution_timeout_ms: 2_000,
            ..EngineConfig::default()
        };
        let engine = Engine::new(config, LanguageConfigManager::builtin()).unwrap();
        engine
            .submit_execution(ExecutionRequest::new(code, language, Some(problem), cases))
            .await
    }

    fn assert_all_passed(response: &ExecutionResponse) {
        assert!(response.success, "{:?}", response.error);
        let results = response.results.as_ref().unwrap();
        assert_eq!(results.len(), 3);
        for result in results {
            assert!(result.passed, "{:?}", result);
        }
    }

    fn assert_missing_entry_point(response: ExecutionResponse) {
        let results = response.results.unwrap();
        assert_eq!(results.len(), 3);
        for result in results {
            assert!(!result.passed);
            assert_eq!(result.error.unwrap().kind, ErrorKind::MissingEntryPoint);
        }
    }

    #[tokio::test]
    #[ignore] // Requires python3
    async fn test_python_two_sum() {
        let root = tempfile::tempdir().unwrap();
        let code = r#"
class Solution:
    def twoSum(self, nums, target):
        seen = {}
        for i, n in enumerate(nums):
            if target - n in seen:
                return [seen[target - n], i]
            seen[n] = i
"#;
        assert_all_passed(&submit(&root, Language::Python, "twosum", code, two_sum_cases()).await);
    }

    #[tokio::test]
    #[ignore] // Requires python3
    async fn test_python_missing_entry_point() {
        let root = tempfile::tempdir().unwrap();
        let response = submit(&root, Language::Python, "twosum", "def helper(x):\n    return x\n", two_sum_cases()).await;
        assert_missing_entry_point(response);
    }

    #[tokio::test]
    #[ignore] // Requires python3
    async fn test_python_infinite_loop() {
        let root = tempfile::tempdir().unwrap();
        let code = "def two_sum(nums, target):\n    while True:\n        pass\n";
        let cases = two_sum_cases().into_iter().take(1).collect();
        let response = submit(&root, Language::Python, "twosum", code, cases).await;
        let results = response.results.unwrap();
        assert_eq!(results[0].error.as_ref().unwrap().kind, ErrorKind::TimeoutError);
    }

    #[tokio::test]
    #[ignore] // Requires node
    async fn test_javascript_two_sum() {
        let root = tempfile::tempdir().unwrap();
        let code = r#"
const twoSum = (nums, target) => {
  const seen = new Map();
  for (let i = 0; i < nums.length; i++) {
    if (seen.has(target - nums[i])) return [seen.get(target - nums[i]), i];
    seen.set(nums[i], i);
  }
  return [];
};
"#;
        assert_all_passed(&submit(&root, Language::JavaScript, "twosum", code, two_sum_cases()).await);
    }

    #[tokio::test]
    #[ignore] // Requires javac and java
    async fn test_java_two_sum() {
        let root = tempfile::tempdir().unwrap();
        let code = r#"
import java.util.HashMap;

public class Solution {
    public int[] twoSum(int[] nums, int target) {
        HashMap<Integer, Integer> seen = new HashMap<>();
        for (int i = 0; i < nums.length; i++) {
            if (seen.containsKey(target - nums[i])) return new int[]{seen.get(target - nums[i]), i};
            seen.put(nums[i], i);
        }
        return new int[0];
    }
}
"#;
        assert_all_passed(&submit(&root, Language::Java, "twosum", code, two_sum_cases()).await);
    }

    #[tokio::test]
    #[ignore] // Requires javac
    async fn test_java_compile_error() {
        let root = tempfile::tempdir().unwrap();
        let code = "class Solution { int[] twoSum(int[] nums, int target) { return null } }";
        let response = submit(&root, Language::Java, "twosum", code, two_sum_cases()).await;
        assert!(!response.success);
        assert_eq!(response.error.unwrap().kind, ErrorKind::CompileError);
    }

    #[tokio::test]
    #[ignore] // Requires g++
    async fn test_cpp_two_sum() {
        let root = tempfile::tempdir().unwrap();
        let code = r#"
class Solution {
public:
    vector<int> twoSum(vector<int>& nums, int target) {
        unordered_map<int, int> seen;
        for (int i = 0; i < (int)nums.size(); i++) {
            auto it = seen.find(target - nums[i]);
            if (it != seen.end()) return {it->second, i};
            seen[nums[i]] = i;
        }
        return {};
    }
};
"#;
        assert_all_passed(&submit(&root, Language::Cpp, "twosum", code, two_sum_cases()).await);
    }

    #[tokio::test]
    #[ignore] // Requires python3
    async fn test_python_linked_list() {
        let root = tempfile::tempdir().unwrap();
        let code = r#"
class Solution:
    def removeNthFromEnd(self, head, n):
        dummy = ListNode(0, head)
        fast = slow = dummy
        for _ in range(n + 1):
            fast = fast.next
        while fast:
            fast = fast.next
            slow = slow.next
        slow.next = slow.next.next
        return dummy.next
"#;
        let cases = cases(&[("1 2 3 4 5\n2", "1 2 3 5"), ("1 2\n1", "1"), ("1 2\n2", "2")]);
        assert_all_passed(&submit(&root, Language::Python, "removenthfromend", code, cases).await);
    }

    #[tokio::test]
    #[ignore] // Requires javac and java
    async fn test_java_linked_list() {
        let root = tempfile::tempdir().unwrap();
        let code = r#"
class Solution {
    public ListNode removeNthFromEnd(ListNode head, int n) {
        ListNode dummy = new ListNode(0, head);
        ListNode fast = dummy, slow = dummy;
        for (int i = 0; i <= n; i++) fast = fast.next;
        while (fast != null) {
            fast = fast.next;
            slow = slow.next;
        }
        slow.next = slow.next.next;
        return dummy.next;
    }
}
"#;
        let cases = cases(&[("1 2 3 4 5\n2", "1 2 3 5"), ("1 2\n1", "1"), ("1 2\n2", "2")]);
        assert_all_passed(&submit(&root, Language::Java, "removenthfromend", code, cases).await);
    }

    #[tokio::test]
    #[ignore] // Requires python3
    async fn test_python_tree_traversal() {
        let root = tempfile::tempdir().unwrap();
        let code = r#"
class Solution:
    def diagonalTraversal(self, root):
        groups = []

        def walk(node, depth):
            if node is None:
                return
            if depth == len(groups):
                groups.append([])
            groups[depth].append(node.val)
            walk(node.left, depth + 1)
            walk(node.right, depth)

        walk(root, 0)
        return groups
"#;
        let cases = cases(&[
            ("8 3 10 1 6 -1 14 -1 -1 4 7 13", "[[8,10,14],[3,6,7,13],[1,4]]"),
            ("1 2 3", "[[1,3],[2]]"),
            ("5", "[[5]]"),
        ]);
        assert_all_passed(&submit(&root, Language::Python, "diagonaltraversal", code, cases).await);
    }

    #[tokio::test]
    #[ignore] // Requires g++
    async fn test_cpp_tree_traversal() {
        let root = tempfile::tempdir().unwrap();
        let code = r#"
class Solution {
    void walk(TreeNode *node, size_t depth, vector<vector<int>> &groups) {
        if (!node) return;
        if (depth == groups.size()) groups.push_back({});
        groups[depth].push_back(node->val);
        walk(node->left, depth + 1, groups);
        walk(node->right, depth, groups);
    }

public:
    vector<vector<int>> diagonalTraversal(TreeNode *root) {
        vector<vector<int>> groups;
        walk(root, 0, groups);
        return groups;
    }
};
"#;
        let cases = cases(&[
            ("8 3 10 1 6 -1 14 -1 -1 4 7 13", "[[8,10,14],[3,6,7,13],[1,4]]"),
            ("1 2 3", "[[1,3],[2]]"),
            ("5", "[[5]]"),
        ]);
        assert_all_passed(&submit(&root, Language::Cpp, "diagonaltraversal", code, cases).await);
    }

    #[tokio::test]
    #[ignore] // Requires g++
    async fn test_cpp_grid() {
        let root = tempfile::tempdir().unwrap();
        let code = r#"
class Solution {
public:
    int minPathSum(vector<vector<int>> &grid) {
        for (size_t r = 0; r < grid.size(); r++) {
            for (size_t c = 0; c < grid[r].size(); c++) {
                if (r == 0 && c == 0) continue;
                int up = r > 0 ? grid[r - 1][c] : INT_MAX;
                int left = c > 0 ? grid[r][c - 1] : INT_MAX;
                grid[r][c] += min(up, left);
            }
        }
        return grid.back().back();
    }
};
"#;
        let cases = cases(&[("3 3\n1 3 1\n1 5 1\n4 2 1", "7"), ("2 3\n1 2 3\n4 5 6", "12"), ("1 1\n5", "5")]);
        assert_all_passed(&submit(&root, Language::Cpp, "minimumpathsum", code, cases).await);
    }

    #[tokio::test]
    #[ignore] // Requires python3
    async fn test_python_grid() {
        let root = tempfile::tempdir().unwrap();
        let code = r#"
def min_path_sum(grid):
    rows, cols = len(grid), len(grid[0])
    for r in range(rows):
        for c in range(cols):
            if r == 0 and c == 0:
                continue
            up = grid[r - 1][c] if r > 0 else float("inf")
            left = grid[r][c - 1] if c > 0 else float("inf")
            grid[r][c] += min(up, left)
    return grid[-1][-1]
"#;
        let cases = cases(&[("3 3\n1 3 1\n1 5 1\n4 2 1", "7"), ("2 3\n1 2 3\n4 5 6", "12"), ("1 1\n5", "5")]);
        assert_all_passed(&submit(&root, Language::Python, "minimumpathsum", code, cases).await);
    }

    #[tokio::test]
    #[ignore] // Requires javac and java
    async fn test_java_in_place() {
        let root = tempfile::tempdir().unwrap();
        let code = r#"
class Solution {
    public void reverseString(char[] s) {
        for (int i = 0, j = s.length - 1; i < j; i++, j--) {
            char t = s[i];
            s[i] = s[j];
            s[j] = t;
        }
    }
}
"#;
        let cases = cases(&[("h e l l o", "o l l e h"), ("a b", "b a"), ("x", "x")]);
        assert_all_passed(&submit(&root, Language::Java, "reversestring", code, cases).await);
    }

    #[tokio::test]
    #[ignore] // Requires g++
    async fn test_cpp_in_place() {
        let root = tempfile::tempdir().unwrap();
        let code = r#"
class Solution {
public:
    void reverseString(vector<char> &s) { reverse(s.begin(), s.end()); }
};
"#;
        let cases = cases(&[("h e l l o", "o l l e h"), ("a b", "b a"), ("x", "x")]);
        assert_all_passed(&submit(&root, Language::Cpp, "reversestring", code, cases).await);
    }

    #[tokio::test]
    #[ignore] // Requires node
    async fn test_javascript_structured_output() {
        let root = tempfile::tempdir().unwrap();
        let code = r#"
function chunk(arr, size) {
  const out = [];
  for (let i = 0; i < arr.length; i += size) out.push(arr.slice(i, i + size));
  return out;
}
"#;
        let cases = cases(&[("[1,2,3,4,5]\n2", "[[1,2],[3,4],[5]]"), ("[]\n3", "[]"), ("[1,2]\n5", "[[1,2]]")]);
        assert_all_passed(&submit(&root, Language::JavaScript, "arraychunk", code, cases).await);
    }

    #[tokio::test]
    #[ignore] // Requires node
    async fn test_javascript_object_output() {
        let root = tempfile::tempdir().unwrap();
        let code = r#"
const flattenObject = (obj, prefix = "") => {
  const out = {};
  for (const [key, value] of Object.entries(obj)) {
    const path = prefix ? `${prefix}.${key}` : key;
    if (value !== null && typeof value === "object" && !Array.isArray(value)) {
      Object.assign(out, flattenObject(value, path));
    } else {
      out[path] = value;
    }
  }
  return out;
};
"#;
        let cases = cases(&[
            (r#"{"a":{"b":1,"c":{"d":2}},"e":3}"#, r#"{"e":3,"a.c.d":2,"a.b":1}"#),
            ("{}", "{}"),
            (r#"{"k":{"m":"v"}}"#, r#"{"k.m":"v"}"#),
        ]);
        assert_all_passed(&submit(&root, Language::JavaScript, "flattenobject", code, cases).await);
    }

    #[tokio::test]
    #[ignore] // Requires python3
    async fn test_python_object_output() {
        let root = tempfile::tempdir().unwrap();
        let code = r#"
def flatten_object(obj, prefix=""):
    out = {}
    for key, value in obj.items():
        path = f"{prefix}.{key}" if prefix else key
        if isinstance(value, dict):
            out.update(flatten_object(value, path))
        else:
            out[path] = value
    return out
"#;
        let cases = cases(&[
            (r#"{"a":{"b":1,"c":{"d":2}},"e":3}"#, r#"{"a.b":1,"a.c.d":2,"e":3}"#),
            ("{}", "{}"),
            (r#"{"k":{"m":[1,2]}}"#, r#"{"k.m":[1,2]}"#),
        ]);
        assert_all_passed(&submit(&root, Language::Python, "flattenobject", code, cases).await);
    }

    #[tokio::test]
    #[ignore] // Requires javac and java
    async fn test_java_missing_entry_point() {
        let root = tempfile::tempdir().unwrap();
        let code = "class Helper {\n    int other(int x) { return x; }\n}\n";
        assert_missing_entry_point(submit(&root, Language::Java, "twosum", code, two_sum_cases()).await);
    }

    #[tokio::test]
    #[ignore] // Requires g++
    async fn test_cpp_missing_entry_point() {
        let root = tempfile::tempdir().unwrap();
        let code = "int helper(int x) { return x; }\n";
        assert_missing_entry_point(submit(&root, Language::Cpp, "twosum", code, two_sum_cases()).await);
    }
}
