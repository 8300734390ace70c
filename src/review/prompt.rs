use crate::chunk::Chunk;

pub const SYSTEM_PROMPT: &str = "You are an expert code reviewer. Focus on critical issues and provide clear, actionable feedback.";

const REVIEW_INSTRUCTIONS: &str = "\
Please review the code for:
1. Critical issues (syntax errors, security vulnerabilities)
2. Performance concerns
3. Code quality issues
4. Best practice violations

Format each issue as:
Type: (line number) - Description - Suggested fix
";

/// User prompt for chunk `index` (zero-based) of `total`.
pub fn build_chunk_prompt(chunk: &Chunk, index: usize, total: usize) -> String {
    let mut prompt = format!(
        "Analyze these changes (part {}/{}):\nPR Title: {}\n\nChanges to analyze:\n",
        index + 1,
        total,
        chunk.title
    );

    for file in &chunk.files {
        prompt.push_str(&format!("\nFile: {}\nChanges:\n{}\n", file.name, file.patch));
    }

    prompt.push('\n');
    prompt.push_str(REVIEW_INSTRUCTIONS);
    prompt
}
