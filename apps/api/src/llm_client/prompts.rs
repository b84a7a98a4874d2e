// Shared prompt fragments used by every structured call.
// Stage-specific instructions live in course::prompts.

/// System prompt that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured assistant \
    that designs educational course material. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies outside the JSON object.";

/// Appended to every structured prompt. Asks for reasoning first, result second.
/// Replace `{output_name}` before sending.
pub const CHAIN_OF_THOUGHT_INSTRUCTION: &str = "\
    Think step by step before answering. Put your step-by-step reasoning in the \
    \"reasoning\" field as a single string, then put the final answer in the \
    \"{output_name}\" field. Return exactly one JSON object with these two keys.";
