//! Known problems and the I/O shape each harness has to speak.

use codegrade_common::types::Language;

/// How a test case's stdin is laid out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputShape {
    /// `2 7 11 15`
    IntArray,
    /// `2 7 11 15\n9`
    IntArrayThenInt,
    /// `4\n1 2 3 4` (the size line is ignored)
    SizedIntArray,
    /// `4\n1 2 3 4\n9`
    SizedIntArrayThenInt,
    /// `1 2 3 9`, last token is the scalar
    IntArrayWithTrailingInt,
    /// `1 2 3\n4 5\n2`
    TwoIntArraysThenInt,
    /// `m n` header followed by `m` rows
    IntGrid,
    /// whitespace separated strings
    Tokens,
    /// whitespace separated single characters, passed as a mutable list
    Chars,
    Line,
    TwoLines,
    /// level-order list values, then `n`
    LinkedListThenInt,
    /// level-order tree, `-1` marks a missing node
    LevelOrderTree,
    /// JSON array line, then an integer line
    JsonArrayThenInt,
    JsonValue,
}

impl InputShape {
    pub fn needs_list_node(&self) -> bool {
        matches!(self, InputShape::LinkedListThenInt)
    }

    pub fn needs_tree_node(&self) -> bool {
        matches!(self, InputShape::LevelOrderTree)
    }

    /// Shapes only dynamically typed harnesses can feed
    pub fn is_json(&self) -> bool {
        matches!(self, InputShape::JsonArrayThenInt | InputShape::JsonValue)
    }
}

/// How the harness prints the entry point's return value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputShape {
    Scalar,
    /// `true` / `false`
    Bool,
    /// `0 1`
    SpaceJoined,
    /// `[2, 3]`
    ListLiteral,
    /// `[[1,3,6],[2,5],[4]]`
    JsonCompact,
    /// inner lists sorted, then the outer list sorted, printed compact
    SortedNestedJson,
    /// pairs sorted, flattened, space joined
    SortedPairsFlat,
    /// the first argument after the call, space joined
    InPlaceTokens,
    Json,
}

impl OutputShape {
    /// Shapes whose printed form is JSON-like and is compared structurally
    pub fn is_structured(&self) -> bool {
        matches!(
            self,
            OutputShape::ListLiteral
                | OutputShape::JsonCompact
                | OutputShape::SortedNestedJson
                | OutputShape::Json
        )
    }
}

#[derive(Debug)]
pub struct ProblemDef {
    pub id: &'static str,
    pub title: &'static str,
    /// Conventional solution classes, tried before `Solution`
    pub classes: &'static [&'static str],
    /// Entry point base name in snake_case
    pub method: &'static str,
    /// Extra spellings beyond snake_case and derived camelCase
    pub method_aliases: &'static [&'static str],
    pub input: InputShape,
    pub output: OutputShape,
    /// Substrings that identify this problem in submitted code
    pub sniff: &'static [&'static str],
    pub languages: &'static [Language],
}

impl ProblemDef {
    /// Classes to try in order, always ending with `Solution`
    pub fn class_names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.classes.to_vec();
        if !names.contains(&"Solution") {
            names.push("Solution");
        }
        names
    }

    /// Method spellings to try in order: snake_case, camelCase, aliases
    pub fn method_names(&self) -> Vec<String> {
        let mut names = vec![self.method.to_string()];
        let camel = to_camel_case(self.method);
        if !names.contains(&camel) {
            names.push(camel);
        }
        for alias in self.method_aliases {
            if !names.iter().any(|n| n == alias) {
                names.push(alias.to_string());
            }
        }
        names
    }

    pub fn supports(&self, language: Language) -> bool {
        self.languages.contains(&language)
    }
}

const LOCAL: &[Language] = &[Language::Python, Language::Java, Language::JavaScript, Language::Cpp];
const DYNAMIC: &[Language] = &[Language::Python, Language::JavaScript];
const LOCAL_AND_APEX: &[Language] = &[
    Language::Python,
    Language::Java,
    Language::JavaScript,
    Language::Cpp,
    Language::Apex,
];

pub static CATALOG: &[ProblemDef] = &[
    ProblemDef {
        id: "twosum",
        title: "Two Sum",
        classes: &["TwoSum"],
        method: "two_sum",
        method_aliases: &[],
        input: InputShape::IntArrayThenInt,
        output: OutputShape::SpaceJoined,
        sniff: &["two_sum", "twoSum"],
        languages: LOCAL_AND_APEX,
    },
    ProblemDef {
        id: "threesum",
        title: "3Sum",
        classes: &["ThreeSum"],
        method: "three_sum",
        method_aliases: &[],
        input: InputShape::IntArray,
        output: OutputShape::SortedNestedJson,
        sniff: &["three_sum", "threeSum"],
        languages: LOCAL,
    },
    ProblemDef {
        id: "reversestring",
        title: "Reverse String",
        classes: &["ReverseString"],
        method: "reverse_string",
        method_aliases: &[],
        input: InputShape::Chars,
        output: OutputShape::InPlaceTokens,
        sniff: &["reverse_string", "reverseString"],
        languages: LOCAL,
    },
    ProblemDef {
        id: "validanagram",
        title: "Valid Anagram",
        classes: &["ValidAnagram"],
        method: "is_anagram",
        method_aliases: &[],
        input: InputShape::TwoLines,
        output: OutputShape::Bool,
        sniff: &["is_anagram", "isAnagram"],
        languages: LOCAL,
    },
    ProblemDef {
        id: "permutationinstring",
        title: "Permutation in String",
        classes: &["PermutationInString"],
        method: "check_inclusion",
        method_aliases: &[],
        input: InputShape::TwoLines,
        output: OutputShape::Bool,
        sniff: &["check_inclusion", "checkInclusion"],
        languages: LOCAL,
    },
    ProblemDef {
        id: "fruitintobaskets",
        title: "Fruit Into Baskets",
        classes: &["FruitIntoBaskets"],
        method: "total_fruit",
        method_aliases: &[],
        input: InputShape::SizedIntArray,
        output: OutputShape::Scalar,
        sniff: &["total_fruit", "totalFruit"],
        languages: LOCAL,
    },
    ProblemDef {
        id: "closestvalueinrotatedarray",
        title: "Find Closest Value in Rotated Sorted Array",
        classes: &["ClosestValueFinder"],
        method: "find_closest_element",
        method_aliases: &[],
        input: InputShape::SizedIntArrayThenInt,
        output: OutputShape::Scalar,
        sniff: &["find_closest_element", "findClosestElement"],
        languages: LOCAL,
    },
    ProblemDef {
        id: "countconsecutive",
        title: "Count Consecutive Characters",
        classes: &["CountConsecutive"],
        method: "count_consecutive_chars",
        method_aliases: &[],
        input: InputShape::Line,
        output: OutputShape::ListLiteral,
        sniff: &["count_consecutive_chars", "countConsecutiveChars"],
        languages: LOCAL,
    },
    ProblemDef {
        id: "diagonaltraversal",
        title: "Binary Tree Diagonal Traversal",
        classes: &["DiagonalTraversal"],
        method: "diagonal_traversal",
        method_aliases: &[],
        input: InputShape::LevelOrderTree,
        output: OutputShape::JsonCompact,
        sniff: &["diagonal_traversal", "diagonalTraversal"],
        languages: LOCAL,
    },
    ProblemDef {
        id: "longestincreasing",
        title: "Longest Increasing Subsequence",
        classes: &["LengthOfLIS"],
        method: "length_of_lis",
        method_aliases: &["lengthOfLIS"],
        input: InputShape::SizedIntArray,
        output: OutputShape::Scalar,
        sniff: &["length_of_lis", "lengthOfLIS", "lengthOfLis"],
        languages: LOCAL,
    },
    ProblemDef {
        id: "minimumpathsum",
        title: "Minimum Path Sum",
        classes: &["MinPathSum"],
        method: "min_path_sum",
        method_aliases: &[],
        input: InputShape::IntGrid,
        output: OutputShape::Scalar,
        sniff: &["min_path_sum", "minPathSum"],
        languages: LOCAL,
    },
    ProblemDef {
        id: "longestcommonprefix",
        title: "Longest Common Prefix",
        classes: &["LongestCommonPrefix", "LongestPrefix"],
        method: "longest_common_prefix",
        method_aliases: &[],
        input: InputShape::Tokens,
        output: OutputShape::Scalar,
        sniff: &["longest_common_prefix", "longestCommonPrefix"],
        languages: LOCAL,
    },
    ProblemDef {
        id: "gpuresourceoptimizer",
        title: "GPU Resource Optimizer",
        classes: &["GPUResourceOptimizer"],
        method: "minimum_gpu_capacity",
        method_aliases: &["minimumGPUCapacity"],
        input: InputShape::TwoIntArraysThenInt,
        output: OutputShape::Scalar,
        sniff: &["minimum_gpu_capacity", "minimumGpuCapacity", "minimumGPUCapacity"],
        languages: LOCAL,
    },
    ProblemDef {
        id: "trafficflow",
        title: "Traffic Flow Analyzer",
        classes: &["TrafficFlowAnalyzer"],
        method: "longest_balanced_stretch",
        method_aliases: &[],
        input: InputShape::IntArray,
        output: OutputShape::Scalar,
        sniff: &["longest_balanced_stretch", "longestBalancedStretch"],
        languages: LOCAL,
    },
    ProblemDef {
        id: "findactivityrange",
        title: "Find Activity Range",
        classes: &["FindActivityRange"],
        method: "find_activity_range",
        method_aliases: &[],
        input: InputShape::IntArrayWithTrailingInt,
        output: OutputShape::JsonCompact,
        sniff: &["find_activity_range", "findActivityRange"],
        languages: LOCAL,
    },
    ProblemDef {
        id: "removenthfromend",
        title: "Remove Nth Node From End of List",
        classes: &[],
        method: "remove_nth_from_end",
        method_aliases: &[],
        input: InputShape::LinkedListThenInt,
        output: OutputShape::SpaceJoined,
        sniff: &["removeNthFromEnd", "remove_nth_from_end"],
        languages: LOCAL,
    },
    ProblemDef {
        id: "pairswithsum",
        title: "Pairs With Sum",
        classes: &["PairSum"],
        method: "find_pairs",
        method_aliases: &[],
        input: InputShape::IntArrayThenInt,
        output: OutputShape::SortedPairsFlat,
        sniff: &["find_pairs", "findPairs"],
        languages: LOCAL,
    },
    ProblemDef {
        id: "arraychunk",
        title: "Array Chunk",
        classes: &[],
        method: "chunk",
        method_aliases: &[],
        input: InputShape::JsonArrayThenInt,
        output: OutputShape::Json,
        sniff: &["function chunk", "def chunk"],
        languages: DYNAMIC,
    },
    ProblemDef {
        id: "flattenobject",
        title: "Flatten Object",
        classes: &[],
        method: "flatten_object",
        method_aliases: &[],
        input: InputShape::JsonValue,
        output: OutputShape::Json,
        sniff: &["flatten_object", "flattenObject"],
        languages: DYNAMIC,
    },
];

/// `"Two-Sum"`, `"two_sum"` and `"twosum"` all name the same problem
pub fn normalize_problem_id(id: &str) -> String {
    id.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

pub fn find(problem_id: &str) -> Option<&'static ProblemDef> {
    let normalized = normalize_problem_id(problem_id);
    CATALOG.iter().find(|p| p.id == normalized)
}

/// First problem for `language` whose sniff tokens occur in `code`
pub fn sniff(language: Language, code: &str) -> Option<&'static ProblemDef> {
    CATALOG
        .iter()
        .filter(|p| p.supports(language))
        .find(|p| p.sniff.iter().any(|token| code.contains(token)))
}

pub fn to_camel_case(snake: &str) -> String {
    let mut out = String::with_capacity(snake.len());
    let mut upper_next = false;
    for c in snake.chars() {
        if c == '_' {
            upper_next = !out.is_empty();
        } else if upper_next {
            out.push(c.to_ascii_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}
