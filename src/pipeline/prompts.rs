// src/pipeline/prompts.rs

//! Versioned prompts for the content pipeline stages.

/// A system prompt plus a user prompt with `{name}` placeholders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptTemplate {
    pub name: &'static str,
    pub version: &'static str,
    pub system: &'static str,
    pub user: &'static str,
}

impl PromptTemplate {
    /// Fill the user prompt. Unknown placeholders are left untouched.
    pub fn render(&self, vars: &[(&str, &str)]) -> String {
        vars.iter().fold(self.user.to_string(), |acc, (key, value)| {
            acc.replace(&format!("{{{key}}}"), value)
        })
    }
}

pub const ANALYZE: PromptTemplate = PromptTemplate {
    name: "analyze",
    version: "2025-04.1",
    system: "あなたはSNS投稿の拡散要因を分析する編集者です。",
    user: "次のThreads投稿が多くの反応を集めた理由を分析してください。\n\
冒頭の一文のフック、展開の型、改行や記号などの見た目、共感を生む要素、\
口調と語彙、締め方、具体性の七つの観点でそれぞれ具体的に書いてください。\n\n\
【投稿】\n{post}",
};

pub const TEMPLATE: PromptTemplate = PromptTemplate {
    name: "template",
    version: "2025-04.1",
    system: "あなたは分析結果を再利用可能な文章テンプレートに落とし込むライターです。",
    user: "以下の投稿と分析をもとに、話題を差し替えるだけで同じ効果が出る投稿テンプレートを作ってください。\n\
各パートの役割と目安の文字数、差し替える箇所を【】で示してください。\n\n\
【投稿】\n{post}\n\n【分析】\n{analysis}",
};

pub const COMBINED: PromptTemplate = PromptTemplate {
    name: "combined",
    version: "2025-04.1",
    system: "あなたはSNS投稿の拡散要因を分析し、そのまま使えるテンプレートに変換する編集者です。",
    user: "次のThreads投稿について、まず反応を集めた理由を観点ごとに分析し、\
続けてその分析を活かした投稿テンプレートを作ってください。\n\
テンプレートでは差し替える箇所を【】で示し、各パートの目安の文字数も書いてください。\n\n\
【投稿】\n{post}",
};

pub const GENERATE: PromptTemplate = PromptTemplate {
    name: "generate",
    version: "2025-04.1",
    system: "あなたはThreadsで一般ユーザーとして自然に投稿するプロのライターです。",
    user: "次のテンプレートに忠実に従い、ターゲットに向けたThreads投稿を一つ書いてください。\n\
出力は投稿本文のみとし、前置きや説明、ハッシュタグは付けないでください。\n\n\
【ターゲット】\n{target}\n\n【テンプレート】\n{template}",
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_fills_placeholders() {
        let rendered = TEMPLATE.render(&[("post", "本文"), ("analysis", "分析結果")]);
        assert!(rendered.contains("【投稿】\n本文"));
        assert!(rendered.contains("【分析】\n分析結果"));
        assert!(!rendered.contains("{post}"));
    }

    #[test]
    fn test_stage_system_prompts_are_distinct() {
        let systems = [ANALYZE.system, TEMPLATE.system, COMBINED.system, GENERATE.system];
        for (i, a) in systems.iter().enumerate() {
            for b in &systems[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
