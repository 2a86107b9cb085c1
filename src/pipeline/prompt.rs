//! Prompts sent to the reasoning collaborators

use crate::report::{StageResult, StageStatus, FLAG_MARKER};

/// Used when the caller gives no instruction
pub const DEFAULT_INSTRUCTION: &str = "Scan for fraud artifacts.";

/// Fixed directive appended to every image scan
pub const IMAGE_DIRECTIVE: &str =
    "Identify edits, font mismatches, and lighting or shadow inconsistencies.";

/// Fixed directive for text evidence
pub const DOCUMENT_DIRECTIVE: &str = "Perform the requested task over this document.";

pub const AUDITOR_SYSTEM_PROMPT: &str = "You are a fraud auditor on a forensic jury. You receive \
the findings of other examiners and deliver the final judgment. Be brief and concrete.";

fn verdict_format() -> String {
    format!(
        "Reply with a short verdict and a line of the form \"Risk score: N\" where N is 0-100. \
         Use the phrase \"{}\" only when the evidence is likely fraudulent or manipulated.",
        FLAG_MARKER.to_uppercase()
    )
}

pub fn vision_prompt(instruction: &str) -> String {
    format!(
        "You are a forensic image examiner.\nTask: {}\n{}\nDescribe each suspicious region and what makes it suspicious. Say so plainly if nothing looks altered.",
        instruction.trim(),
        IMAGE_DIRECTIVE
    )
}

/// Document scan for text evidence; its answer is also the final verdict
pub fn document_prompt(instruction: &str) -> String {
    format!(
        "You are a forensic document examiner.\nTask: {}\n{}\n{}\nThe document follows.",
        instruction.trim(),
        DOCUMENT_DIRECTIVE,
        verdict_format()
    )
}

/// Final audit prompt
///
/// Embeds the vision payload verbatim, and the metadata and deepfake
/// findings when those stages ran.
pub fn logic_prompt(
    instruction: &str,
    vision: Option<&StageResult>,
    metadata: Option<&StageResult>,
    deepfake: Option<&StageResult>,
) -> String {
    let mut prompt = format!("Audit this evidence.\nOriginal request: {}\n", instruction.trim());

    match vision {
        Some(result) if result.status == StageStatus::Ok => {
            prompt.push_str("\nVision examiner findings:\n");
            prompt.push_str(&result.payload.summary());
            prompt.push('\n');
        }
        Some(result) => {
            prompt.push_str(&format!(
                "\nVision examiner findings: unavailable ({})\n",
                result.payload.summary()
            ));
        }
        None => prompt.push_str("\nVision examiner findings: not requested\n"),
    }

    if let Some(result) = metadata {
        prompt.push_str(&format!("\nCamera metadata: {}\n", finding(result)));
    }

    if let Some(result) = deepfake {
        prompt.push_str(&format!("\nDeepfake detector: {}\n", finding(result)));
    }

    prompt.push('\n');
    prompt.push_str(&verdict_format());
    prompt
}

fn finding(result: &StageResult) -> String {
    match result.status {
        StageStatus::Ok => result.payload.summary(),
        StageStatus::Unavailable => "pending (model still loading)".to_string(),
        StageStatus::Error => format!("unavailable ({})", result.payload.summary()),
    }
}
