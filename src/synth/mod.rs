//! Code synthesis: prompt the backend for a transform routine, then
//! extract and compile it.

pub mod extract;

use crate::domain::{ExampleSet, TransformationType};
use crate::error::{AppError, ErrorKind};
use crate::llm::GenerativeBackend;
use crate::script::{self, Function};

const SYNTH_MAX_TOKENS: u32 = 512;
const PROMPT_EXAMPLE_LIMIT: usize = 10;

/// Ask the backend for a transform routine and compile it.
///
/// Algorithmic and general transformations always go to the remote
/// tier; local models are not reliable enough for multi-step logic or
/// lookup tables.
pub fn synthesize_script(
    examples: &ExampleSet,
    kind: TransformationType,
    backend: &GenerativeBackend,
    force_remote: bool,
) -> Result<(String, Function), AppError> {
    let force_remote = force_remote
        || matches!(
            kind,
            TransformationType::Algorithmic | TransformationType::General
        );
    let prompt = synthesis_prompt(kind, examples);
    let raw = backend.generate(&prompt, SYNTH_MAX_TOKENS, force_remote)?;
    let code = extract::extract_function(&raw)?;
    compile(&code)
}

/// Parse extracted code, applying one indentation-repair pass before
/// giving up. Returns the code that actually parsed alongside the
/// routine.
pub fn compile(code: &str) -> Result<(String, Function), AppError> {
    let first_err = match parse_code(code) {
        Ok(func) => return Ok((code.to_string(), func)),
        Err(err) => err,
    };

    let repaired = extract::repair_indentation(code);
    if let Ok(func) = parse_code(&repaired) {
        log::debug!("generated code parsed after indentation repair");
        return Ok((repaired, func));
    }

    Err(AppError::new(
        ErrorKind::SynthesisSyntaxError,
        format!("{first_err}\n--- generated code ---\n{code}"),
    ))
}

fn parse_code(code: &str) -> Result<Function, AppError> {
    script::parse(script::tokenize(code)?)
}

fn synthesis_prompt(kind: TransformationType, examples: &ExampleSet) -> String {
    let guidance = match kind {
        TransformationType::Text => {
            "The transformation reworks text: casing, spacing, ordering, or formatting."
        }
        TransformationType::Numeric => {
            "The transformation is a mathematical function of a numeric input. \
             Convert x with int() or float() before computing."
        }
        TransformationType::Algorithmic => {
            "The transformation follows a rule, such as parsing codes or reformatting \
             dates. Only the datetime and math modules are available."
        }
        TransformationType::General => {
            "The transformation may be an arbitrary mapping with no single rule. \
             Build a lookup dict from the examples and return the mapped value."
        }
    };

    let mut prompt = format!(
        "Write a Python function named transform that takes a single argument x \
         and returns the transformed value.\n{guidance}\n\nExamples:\n"
    );
    for pair in examples.pairs().iter().take(PROMPT_EXAMPLE_LIMIT) {
        prompt.push_str(&format!(
            "Input: {}\nOutput: {}\n",
            pair.source, pair.target
        ));
    }
    prompt.push_str(
        "\nReply with only the function definition, no explanation and no usage example.\n",
    );
    prompt
}
