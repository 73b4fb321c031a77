//! End-to-end tests: scripted model, real Python sandbox, evaluation driver.
//!
//! Tests that need `python3` skip themselves when it is not installed.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use patchloop::dataset::Problem;
use patchloop::evaluation::{Evaluator, EvaluatorConfig, FencedBlockExtractor, ProblemStatus};
use patchloop::llm::{
    Choice, FunctionCall, GenerationRequest, GenerationResponse, LlmProvider, Message,
    ToolCallInfo, Usage,
};
use patchloop::sandbox::{CodeSandbox, SandboxConfig};
use patchloop::scaffold::{AgentConfig, Message as TranscriptMessage};
use patchloop::LlmError;
use tempfile::TempDir;

struct ScriptedLlm {
    responses: Mutex<VecDeque<GenerationResponse>>,
    seen: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedLlm {
    fn new(responses: Vec<GenerationResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            seen: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, LlmError> {
        self.seen.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or(LlmError::EmptyResponse)
    }
}

fn reply(message: Message) -> GenerationResponse {
    GenerationResponse {
        id: "resp".to_string(),
        model: "scripted".to_string(),
        choices: vec![Choice {
            index: 0,
            message,
            finish_reason: "stop".to_string(),
        }],
        usage: Usage::default(),
    }
}

fn tool_call(id: &str, name: &str, code: &str) -> GenerationResponse {
    let call = ToolCallInfo {
        id: id.to_string(),
        call_type: "function".to_string(),
        function: FunctionCall {
            name: name.to_string(),
            arguments: serde_json::json!({ "code": code }).to_string(),
        },
    };
    reply(Message::assistant_with_tool_calls("", vec![call]))
}

fn final_answer(text: &str) -> GenerationResponse {
    reply(Message::assistant(text))
}

fn python_available() -> bool {
    std::process::Command::new("python3")
        .arg("--version")
        .output()
        .is_ok_and(|o| o.status.success())
}

fn add_problem(test: &str) -> Problem {
    Problem {
        task_id: "Python/add".to_string(),
        prompt: "def add(a, b):\n    \"\"\"Return the sum of a and b.\"\"\"\n".to_string(),
        buggy_solution: "    return a - b\n".to_string(),
        test: test.to_string(),
    }
}

fn evaluator(dir: &TempDir, llm: Arc<ScriptedLlm>, max_turns: usize) -> Evaluator {
    let sandbox = CodeSandbox::new(SandboxConfig::new("python3").with_scratch_dir(dir.path()));
    Evaluator::new(
        llm,
        Arc::new(sandbox),
        Arc::new(FencedBlockExtractor::python().unwrap()),
        EvaluatorConfig::new().with_agent(AgentConfig::default().with_max_turns(max_turns)),
    )
}

const FIXED_ADD: &str = "Here is the fix:\n```python\ndef add(a, b):\n    return a + b\n```";

#[tokio::test]
async fn test_agent_tests_then_fixes_add() {
    if !python_available() {
        eprintln!("python3 not found, skipping");
        return;
    }
    let dir = TempDir::new().unwrap();
    let llm = Arc::new(ScriptedLlm::new(vec![
        tool_call(
            "call_1",
            "python_interpreter",
            "def add(a, b):\n    return a + b\nprint(add(1, 2))",
        ),
        final_answer(FIXED_ADD),
    ]));
    let eval = evaluator(&dir, llm.clone(), 25);

    let outcome = eval
        .evaluate(&add_problem("assert add(1, 2) == 3\nassert add(-1, 1) == 0\n"))
        .await
        .unwrap();

    assert_eq!(outcome.status, ProblemStatus::Passed);
    assert_eq!(outcome.turns, 2);
    assert_eq!(outcome.tool_calls, 1);

    // The interpreter output reached the model before its final answer.
    let seen = llm.seen.lock().unwrap();
    let tool_message = seen[1]
        .messages
        .iter()
        .find(|m| m.role == "tool")
        .expect("tool result in second request");
    assert_eq!(tool_message.tool_call_id.as_deref(), Some("call_1"));
    assert!(tool_message
        .content
        .starts_with("Execution successful:\n[STDOUT]:\n3\n"));

    assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
}

#[tokio::test]
async fn test_failing_tool_run_is_fed_back() {
    if !python_available() {
        eprintln!("python3 not found, skipping");
        return;
    }
    let dir = TempDir::new().unwrap();
    let llm = Arc::new(ScriptedLlm::new(vec![
        tool_call(
            "call_1",
            "python_interpreter",
            "def add(a, b):\n    return a - b\nassert add(1, 2) == 3",
        ),
        final_answer(FIXED_ADD),
    ]));
    let eval = evaluator(&dir, llm.clone(), 25);

    let outcome = eval.evaluate(&add_problem("assert add(2, 2) == 4\n")).await.unwrap();
    assert_eq!(outcome.status, ProblemStatus::Passed);

    let seen = llm.seen.lock().unwrap();
    let tool_message = seen[1].messages.iter().find(|m| m.role == "tool").unwrap();
    assert!(tool_message.content.starts_with("Execution failed with errors:"));
    assert!(tool_message.content.contains("AssertionError"));
}

#[tokio::test]
async fn test_unknown_tool_then_fix() {
    if !python_available() {
        eprintln!("python3 not found, skipping");
        return;
    }
    let dir = TempDir::new().unwrap();
    let llm = Arc::new(ScriptedLlm::new(vec![
        tool_call("call_1", "shell_exec", "ls"),
        final_answer(FIXED_ADD),
    ]));
    let eval = evaluator(&dir, llm.clone(), 25);

    let outcome = eval.evaluate(&add_problem("assert add(1, 2) == 3\n")).await.unwrap();
    assert_eq!(outcome.status, ProblemStatus::Passed);

    let seen = llm.seen.lock().unwrap();
    let tool_message = seen[1].messages.iter().find(|m| m.role == "tool").unwrap();
    assert_eq!(tool_message.content, "Error: Unknown tool shell_exec");
}

#[tokio::test]
async fn test_stderr_warning_fails_validation() {
    if !python_available() {
        eprintln!("python3 not found, skipping");
        return;
    }
    let dir = TempDir::new().unwrap();
    let llm = Arc::new(ScriptedLlm::new(vec![final_answer(FIXED_ADD)]));
    let eval = evaluator(&dir, llm, 25);

    let test = "import sys\nassert add(1, 2) == 3\nsys.stderr.write('DeprecationWarning: old api\\n')\n";
    let outcome = eval.evaluate(&add_problem(test)).await.unwrap();

    assert_eq!(outcome.status, ProblemStatus::Failed);
    let validation = outcome.validation.unwrap();
    assert_eq!(validation.exit_code, Some(0));
    assert!(validation.stderr.contains("DeprecationWarning"));
}

#[tokio::test]
async fn test_infinite_loop_fix_times_out() {
    if !python_available() {
        eprintln!("python3 not found, skipping");
        return;
    }
    let dir = TempDir::new().unwrap();
    let llm = Arc::new(ScriptedLlm::new(vec![final_answer(
        "```python\ndef add(a, b):\n    while True:\n        pass\n```",
    )]));
    let eval = evaluator(&dir, llm, 25);

    let outcome = eval.evaluate(&add_problem("assert add(1, 2) == 3\n")).await.unwrap();

    assert_eq!(outcome.status, ProblemStatus::Failed);
    assert_eq!(
        outcome.validation.unwrap().status,
        patchloop::ExecutionStatus::TimedOut
    );
    assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
}

#[tokio::test]
async fn test_exhausted_budget_is_reported() {
    if !python_available() {
        eprintln!("python3 not found, skipping");
        return;
    }
    let dir = TempDir::new().unwrap();
    let llm = Arc::new(ScriptedLlm::new(vec![
        tool_call("call_1", "python_interpreter", "print(1)"),
        tool_call("call_2", "python_interpreter", "print(2)"),
        tool_call("call_3", "python_interpreter", "print(3)"),
    ]));
    let eval = evaluator(&dir, llm, 2);

    let summary = eval.run(&[add_problem("assert add(1, 2) == 3\n")]).await;

    assert_eq!(summary.exhausted, 1);
    assert_eq!(summary.passed, 0);
    assert_eq!(
        summary.outcomes[0].status,
        ProblemStatus::Exhausted { max_turns: 2 }
    );
}

#[tokio::test]
async fn test_transcript_pairs_every_request() {
    if !python_available() {
        eprintln!("python3 not found, skipping");
        return;
    }
    let llm: Arc<ScriptedLlm> = Arc::new(ScriptedLlm::new(vec![
        reply(Message::assistant_with_tool_calls(
            "two checks",
            vec![
                ToolCallInfo {
                    id: "a".to_string(),
                    call_type: "function".to_string(),
                    function: FunctionCall {
                        name: "python_interpreter".to_string(),
                        arguments: r#"{"code": "print('first')"}"#.to_string(),
                    },
                },
                ToolCallInfo {
                    id: "b".to_string(),
                    call_type: "function".to_string(),
                    function: FunctionCall {
                        name: "python_interpreter".to_string(),
                        arguments: r#"{"code": "print('second')"}"#.to_string(),
                    },
                },
            ],
        )),
        final_answer("done"),
    ]));
    let tools = Arc::new(patchloop::scaffold::ToolRegistry::with_sandbox(Arc::new(
        CodeSandbox::default(),
    )));
    let agent = patchloop::AgentLoop::with_tools(llm, AgentConfig::default(), tools);

    let run = agent.run("task").await.unwrap();
    assert!(run.transcript.is_resolved());

    let results: Vec<(&str, bool)> = run
        .transcript
        .messages()
        .iter()
        .filter_map(|m| match m {
            TranscriptMessage::ToolResult { request_id, content } => {
                Some((request_id.as_str(), content.contains("first")))
            }
            _ => None,
        })
        .collect();
    assert_eq!(results, vec![("a", true), ("b", false)]);
}
