//! Prompt templates: one per concrete level, plus the level compressor.

use rag_store::RagHit;

use crate::level::ResolvedLevel;

const GENERAL_TEMPLATE: &str = "You are a helpful assistant answering questions about Jharkhand government policies.
Use ONLY the provided sources. If the answer is not contained, say you don't know.
Cite sources inline as [Source N] where N corresponds to the source block.

Question: {question}

Sources:
{sources}

Answer:";

const SUMMARY_TEMPLATE: &str = "You are a helpful assistant giving short overviews of Jharkhand government policies.
Use ONLY the provided sources. If the answer is not contained, say you don't know.
Answer in a few sentences or a short bullet list of the key points.
Cite sources inline as [Source N] where N corresponds to the source block.

Question: {question}

Sources:
{sources}

Summary:";

const TECHNICAL_TEMPLATE: &str = "You are an expert assistant answering detailed questions about Jharkhand government policies.
Use ONLY the provided sources. If the answer is not contained, say you don't know.
Quote exact figures, eligibility conditions, amounts, deadlines and section numbers where the sources give them.
Cite every statement inline as [Source N] where N corresponds to the source block.

Question: {question}

Sources:
{sources}

Detailed answer:";

/// Template for a concrete level.
pub fn template(level: ResolvedLevel) -> &'static str {
    match level {
        ResolvedLevel::General => GENERAL_TEMPLATE,
        ResolvedLevel::Summary => SUMMARY_TEMPLATE,
        ResolvedLevel::Technical => TECHNICAL_TEMPLATE,
    }
}

/// Header line of one numbered source block.
fn block_header(n: usize, hit: &RagHit) -> String {
    format!(
        "[Source {n}] file: {} pages: {}-{} (score={:.3})",
        hit.chunk.source_file, hit.chunk.page_start, hit.chunk.page_end, hit.score
    )
}

/// Renders retrieved chunks as numbered source blocks within `max_chars`.
///
/// Blocks keep retrieval order and are numbered from 1. The block that
/// crosses the budget is truncated; later blocks are dropped.
pub fn render_sources(hits: &[RagHit], max_chars: usize) -> String {
    let mut out = String::new();
    for (i, hit) in hits.iter().enumerate() {
        let sep = if out.is_empty() { "" } else { "\n\n" };
        let header = block_header(i + 1, hit);
        let fixed = sep.len() + header.len() + 1;
        if out.len() + fixed >= max_chars {
            break;
        }
        out.push_str(sep);
        out.push_str(&header);
        out.push('\n');

        let left = max_chars - out.len();
        let text = hit.chunk.text.trim();
        if text.len() > left {
            out.push_str(safe_truncate(text, left));
            break;
        }
        out.push_str(text);
    }
    out
}

/// Builds the final prompt for `level`. Pure: same inputs, same string.
pub fn build_prompt(
    level: ResolvedLevel,
    question: &str,
    hits: &[RagHit],
    max_ctx_chars: usize,
) -> String {
    template(level)
        .replace("{question}", question.trim())
        .replace("{sources}", &render_sources(hits, max_ctx_chars))
}

/// Prompt asking the completion service to compress a document for a
/// lower level.
pub fn compress_prompt(text: &str, target_chars: usize, level_to: ResolvedLevel) -> String {
    format!(
        "You are an assistant compressing government scheme documents.\n\
         Summarize the following text to approximately {target_chars} characters. \
         Preserve the key details needed for answering queries at the {level_to} level.\n\
         ---\n{text}\n---\n\n\
         Now provide the compressed summary:"
    )
}

/// Cuts `s` to at most `max` bytes on a char boundary.
pub(crate) fn safe_truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rag_store::Chunk;

    use super::*;

    fn hit(file: &str, pages: (u32, u32), text: &str, score: f32) -> RagHit {
        RagHit {
            chunk: Arc::new(Chunk {
                id: format!("{file}-{}", pages.0),
                seq: 0,
                source_file: file.into(),
                page_start: pages.0,
                page_end: pages.1,
                text: text.into(),
                embedding: vec![],
            }),
            score,
        }
    }

    #[test]
    fn general_prompt_has_numbered_blocks() {
        let hits = vec![
            hit("a.pdf", (1, 2), "Housing for all.", 0.91234),
            hit("b.pdf", (3, 3), "Solar rooftops.", 0.5),
        ];
        let p = build_prompt(ResolvedLevel::General, "  What is covered? ", &hits, 10_000);
        assert!(p.starts_with("You are a helpful assistant answering questions"));
        assert!(p.contains("Question: What is covered?\n"));
        assert!(p.contains(
            "[Source 1] file: a.pdf pages: 1-2 (score=0.912)\nHousing for all.\n\n[Source 2] file: b.pdf pages: 3-3 (score=0.500)\nSolar rooftops."
        ));
        assert!(p.ends_with("Answer:"));
    }

    #[test]
    fn each_level_has_its_own_template() {
        let prompts: Vec<String> = ResolvedLevel::ALL
            .iter()
            .map(|l| build_prompt(*l, "q", &[], 100))
            .collect();
        assert_ne!(prompts[0], prompts[1]);
        assert_ne!(prompts[1], prompts[2]);
        assert!(prompts.iter().all(|p| p.contains("Question: q")));
    }

    #[test]
    fn context_respects_budget_on_char_boundaries() {
        let long = "é".repeat(400);
        let hits = vec![hit("a.pdf", (1, 1), &long, 1.0), hit("b.pdf", (2, 2), "x", 0.9)];
        let ctx = render_sources(&hits, 120);
        assert!(ctx.len() <= 120);
        assert!(ctx.starts_with("[Source 1]"));
        assert!(!ctx.contains("[Source 2]"));
    }

    #[test]
    fn compress_prompt_names_target() {
        let p = compress_prompt("body", 42, ResolvedLevel::Summary);
        assert!(p.contains("approximately 42 characters"));
        assert!(p.contains("at the summary level"));
        assert!(p.contains("---\nbody\n---"));
    }
}
