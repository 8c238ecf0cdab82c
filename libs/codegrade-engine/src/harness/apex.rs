//! Anonymous Apex programs for the remote runner. There is no stdin, so the
//! test input is embedded into the program once per test case.

use super::catalog::ProblemDef;
use super::entry::{describe_tried, missing_entry_message, resolve_static, StaticEntry};
use super::template::render;
use super::Harness;
use crate::error::{EngineError, EngineResult};
use codegrade_common::types::Language;
use serde_json::json;

pub(super) const TEMPLATES: &[(&str, &str)] = &[
    ("apex_raw", RAW),
    ("apex_missing", MISSING),
    ("apex_two_sum", TWO_SUM),
];

const RAW: &str = "{{code}}\n\n{{input}}\n";

const MISSING: &str = r#"{{code}}

class HarnessException extends Exception {}
throw new HarnessException('{{message}}');
"#;

const TWO_SUM: &str = r#"{{code}}

List<Integer> nums = new List<Integer>{ {{nums}} };
Integer target = {{target}};
List<Integer> result = {{call}};
List<String> cgOut = new List<String>();
for (Integer v : result) { cgOut.add(String.valueOf(v)); }
System.debug(String.join(cgOut, ' '));
"#;

#[derive(Debug, Clone)]
enum Driver {
    /// `List<Integer>` plus `Integer` target, result printed space joined
    TwoSum { call: Option<String>, tried: String },
    /// Submitted code followed by the raw test input
    Raw,
}

#[derive(Debug, Clone)]
pub struct ApexProgram {
    code: String,
    driver: Driver,
}

impl ApexProgram {
    /// Produce the anonymous Apex body for one test input
    pub fn render(&self, input: &str) -> EngineResult<String> {
        match &self.driver {
            Driver::Raw => render(
                Language::Apex,
                None,
                "apex_raw",
                &json!({ "code": self.code, "input": input }),
            ),
            Driver::TwoSum { call: None, tried } => render(
                Language::Apex,
                Some("twosum"),
                "apex_missing",
                &json!({
                    "code": self.code,
                    "message": apex_escape(&missing_entry_message(tried)),
                }),
            ),
            Driver::TwoSum { call: Some(call), .. } => {
                let mut lines = input.trim().lines();
                let nums = parse_ints(lines.next().unwrap_or(""))?;
                let target = parse_ints(lines.next().unwrap_or(""))?;
                let target = target.first().copied().ok_or_else(|| EngineError::Runtime {
                    detail: "test input is missing the target line".to_string(),
                })?;
                let nums: Vec<String> = nums.iter().map(i64::to_string).collect();

                render(
                    Language::Apex,
                    Some("twosum"),
                    "apex_two_sum",
                    &json!({
                        "code": self.code,
                        "nums": nums.join(", "),
                        "target": target,
                        "call": call,
                    }),
                )
            }
        }
    }
}

fn parse_ints(line: &str) -> EngineResult<Vec<i64>> {
    line.split_whitespace()
        .map(|t| {
            t.parse::<i64>().map_err(|_| EngineError::Runtime {
                detail: format!("test input token {:?} is not an integer", t),
            })
        })
        .collect()
}

fn apex_escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('\'', "\\'")
}

fn call_expression(entry: &StaticEntry) -> String {
    match (&entry.class, entry.is_static) {
        (Some(class), true) => format!("{}.{}(nums, target)", class, entry.method),
        (Some(class), false) => format!("new {}().{}(nums, target)", class, entry.method),
        (None, _) => format!("{}(nums, target)", entry.method),
    }
}

/// Registered generator for `twosum`
pub fn generate_two_sum(problem: &ProblemDef, code: &str) -> EngineResult<Harness> {
    let classes = problem.class_names();
    let methods = problem.method_names();
    let call = resolve_static(code, &classes, &methods, true).map(|e| call_expression(&e));
    Ok(Harness::Remote(ApexProgram {
        code: code.to_string(),
        driver: Driver::TwoSum {
            call,
            tried: describe_tried(&classes, &methods, true),
        },
    }))
}

pub fn generate_generic(code: &str) -> EngineResult<Harness> {
    if code.trim().is_empty() {
        return Err(EngineError::HarnessGeneration {
            language: Language::Apex,
            problem_id: None,
            reason: "submitted code is empty".to_string(),
        });
    }
    Ok(Harness::Remote(ApexProgram {
        code: code.to_string(),
        driver: Driver::Raw,
    }))
}
