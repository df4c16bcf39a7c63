//! Grounded prompt assembly for a downstream language model.
//!
//! Retrieval only produces context; answering is left to whatever model the
//! caller pairs it with. This module renders the instructions that keep that
//! model inside the retrieved material.

const PREAMBLE: &str = "You are MediExplain AI.

STRICT MEDICAL SAFETY RULES:
- Educational information only
- No diagnosis or prescriptions
- Use ONLY the provided context
- If information is insufficient, say so
- Recommend professional care if symptoms sound serious";

/// Render the prompt for `query` grounded in retrieved `context`.
pub fn build_rag_prompt(query: &str, context: &str) -> String {
    format!(
        "{}\n\nMedical Reference Context:\n{}\n\nUser Question:\n{}\n\nRespond clearly, cautiously, and factually.\n",
        PREAMBLE,
        context.trim_end(),
        query.trim()
    )
}
