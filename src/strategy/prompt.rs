use crate::catalog::TaskDefinition;
use crate::provenance::SourceFlags;

use super::GenerationContext;

/// Subject used when the local corpus has no usable first line.
pub const DEFAULT_SUBJECT: &str = "the company";

/// Builds the generator prompt for one task.
///
/// Output is a pure function of the task profile, the corpora and the
/// source flags.
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptBuilder;

impl PromptBuilder {
    pub fn new() -> Self {
        Self
    }

    pub fn build(&self, ctx: &GenerationContext) -> String {
        self.build_parts(&ctx.task, &ctx.local_corpus, &ctx.reference_corpus, ctx.flags)
    }

    pub fn build_parts(
        &self,
        task: &TaskDefinition,
        local_corpus: &str,
        reference_corpus: &str,
        flags: SourceFlags,
    ) -> String {
        let profile = &task.profile;
        let mut prompt = format!(
            "You are a {}. Write the \"{}\" section of a proposal for {}: {}.",
            profile.role,
            task.name,
            subject(local_corpus),
            task.description.to_lowercase()
        );

        if flags.use_local {
            let local = excerpt(local_corpus, profile.local_excerpt_chars);
            if !local.is_empty() {
                prompt.push_str("\n\nCompany Information:\n");
                prompt.push_str(local);
            }
            let reference = excerpt(reference_corpus, profile.reference_excerpt_chars);
            if !reference.is_empty() {
                prompt.push_str("\n\nReference Information:\n");
                prompt.push_str(reference);
            }
        } else {
            prompt.push_str("\n\nDo not rely on any supplied company documents.");
        }

        if flags.use_world {
            prompt.push_str(&format!(
                "\n\nUse your knowledge of {}.",
                profile.expertise
            ));
        }

        if flags.use_online {
            prompt.push_str("\n\nInclude recent developments from online research where relevant.");
        }

        if !profile.requirements.is_empty() {
            prompt.push_str("\n\nRequirements:");
            for (i, requirement) in profile.requirements.iter().enumerate() {
                prompt.push_str(&format!("\n{}. {}", i + 1, requirement));
            }
        }

        prompt
    }
}

/// First non-blank line of the corpus with heading markers removed.
fn subject(corpus: &str) -> &str {
    corpus
        .lines()
        .map(|line| line.trim().trim_start_matches('#').trim())
        .find(|line| !line.is_empty())
        .unwrap_or(DEFAULT_SUBJECT)
}

/// At most `max_chars` characters, cut on a char boundary.
fn excerpt(text: &str, max_chars: usize) -> &str {
    let cut = match text.char_indices().nth(max_chars) {
        Some((end, _)) => &text[..end],
        None => text,
    };
    cut.trim()
}
