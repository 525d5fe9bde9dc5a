//! Prompt templates for feature analysis and copy optimization.
//!
//! Each operation uses a fixed persona **system message** that spells out the
//! exact JSON shape expected back, and a **user message** built from the
//! caller's data. The pair maps directly onto the two-message request sent by
//! [`super::client::LlmClient::invoke`].
//!
//! Every template exists in Chinese and English. The JSON keys and the score
//! rubric are identical in both; only the wording the model reads changes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::samples::ContentSample;

use super::FeatureAnalysisResult;

/// English system message for [`super::LlmClient::analyze_features`].
pub const ANALYSIS_SYSTEM_PROMPT_EN: &str = r#"You are an expert in ad copy conversion analysis. Analyze the provided high-converting and low-converting copy samples and extract their key features and differences.

Return the analysis strictly as JSON in the following format:
{
  "highFeatures": ["feature of high-converting copy 1", "feature 2", "feature 3"],
  "lowFeatures": ["feature of low-converting copy 1", "feature 2", "feature 3"],
  "keyDifferences": ["key difference 1", "difference 2", "difference 3"],
  "recommendations": ["optimization recommendation 1", "recommendation 2", "recommendation 3"]
}

Dimensions to analyze include, but are not limited to:
- Emotional color and tone
- Use of keywords and phrases
- Sentence structure and length
- Strength of the call to action
- Expression of urgency and scarcity
- How the value proposition is presented"#;

/// English system message for [`super::LlmClient::optimize_content`].
pub const OPTIMIZATION_SYSTEM_PROMPT_EN: &str = r#"You are an expert ad copy optimizer. Using an existing conversion feature analysis, evaluate new copy and suggest how to optimize it.

Return the result strictly as JSON in the following format:
{
  "score": 75,
  "strengths": ["strength of the current copy 1", "strength 2"],
  "weaknesses": ["problem to improve 1", "problem 2"],
  "suggestions": ["concrete optimization suggestion 1", "suggestion 2", "suggestion 3"],
  "optimizedVersion": "the optimized version of the copy"
}

Scoring rubric (0-100):
- 80-100: excellent, very high conversion potential
- 60-79: good, some conversion potential
- 40-59: fair, needs some optimization
- 0-39: poor, needs substantial improvement"#;

/// Language the prompts are written in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PromptLanguage {
    #[default]
    #[serde(rename = "zh")]
    Chinese,
    #[serde(rename = "en")]
    English,
}

impl fmt::Display for PromptLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Chinese => write!(f, "zh"),
            Self::English => write!(f, "en"),
        }
    }
}

impl FromStr for PromptLanguage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "zh" | "chinese" => Ok(Self::Chinese),
            "en" | "english" => Ok(Self::English),
            other => Err(format!("unknown prompt language '{other}' (expected 'zh' or 'en')")),
        }
    }
}

impl PromptLanguage {
    pub fn analysis_system_prompt(self) -> &'static str {
        match self {
            Self::Chinese => ANALYSIS_SYSTEM_PROMPT_ZH,
            Self::English => ANALYSIS_SYSTEM_PROMPT_EN,
        }
    }

    pub fn optimization_system_prompt(self) -> &'static str {
        match self {
            Self::Chinese => OPTIMIZATION_SYSTEM_PROMPT_ZH,
            Self::English => OPTIMIZATION_SYSTEM_PROMPT_EN,
        }
    }
}

/// Chinese system message for [`super::LlmClient::analyze_features`].
pub const ANALYSIS_SYSTEM_PROMPT_ZH: &str = r#"你是一个专业的文案转化率分析专家。请分析提供的高转化和低转化文案样本，提取关键特征和差异。

请按照以下JSON格式返回分析结果：
{
  "highFeatures": ["高转化文案的特征1", "特征2", "特征3"],
  "lowFeatures": ["低转化文案的特征1", "特征2", "特征3"],
  "keyDifferences": ["关键差异1", "差异2", "差异3"],
  "recommendations": ["优化建议1", "建议2", "建议3"]
}

分析维度包括但不限于：
- 情感色彩和语调
- 关键词和短语使用
- 句式结构和长度
- 行动召唤的强度
- 紧迫感和稀缺性表达
- 价值主张的呈现方式"#;

/// Chinese system message for [`super::LlmClient::optimize_content`].
pub const OPTIMIZATION_SYSTEM_PROMPT_ZH: &str = r#"你是一个专业的文案优化专家。基于已有的转化率特征分析，为新文案提供优化建议。

请按照以下JSON格式返回分析结果：
{
  "score": 75,
  "strengths": ["当前文案的优势1", "优势2"],
  "weaknesses": ["需要改进的问题1", "问题2"],
  "suggestions": ["具体优化建议1", "建议2", "建议3"],
  "optimizedVersion": "优化后的文案版本"
}

评分标准（0-100分）：
- 80-100分：优秀，转化潜力很高
- 60-79分：良好，有一定转化潜力
- 40-59分：一般，需要一些优化
- 0-39分：较差，需要大幅改进"#;

/// Build the `(system, user)` pair for a feature analysis.
///
/// Samples are listed per label with 1-based indices, high-converting first.
pub fn build_analysis_messages(
    language: PromptLanguage,
    high_samples: &[ContentSample],
    low_samples: &[ContentSample],
) -> (String, String) {
    let high = numbered(high_samples);
    let low = numbered(low_samples);
    let user = match language {
        PromptLanguage::Chinese => format!(
            "请分析以下文案样本：\n\n\
             高转化率文案样本：\n{high}\n\n\
             低转化率文案样本：\n{low}\n\n\
             请提供详细的特征分析和优化建议。"
        ),
        PromptLanguage::English => format!(
            "Analyze the following copy samples:\n\n\
             High-converting copy samples:\n{high}\n\n\
             Low-converting copy samples:\n{low}\n\n\
             Provide a detailed feature analysis and optimization recommendations."
        ),
    };

    (language.analysis_system_prompt().to_string(), user)
}

/// Build the `(system, user)` pair for optimizing one piece of copy.
///
/// The candidate is quoted verbatim; the analysis contributes its high
/// features, low features and key differences, one per line.
pub fn build_optimization_messages(
    language: PromptLanguage,
    content: &str,
    analysis: &FeatureAnalysisResult,
) -> (String, String) {
    let high = analysis.high_features.join("\n");
    let low = analysis.low_features.join("\n");
    let differences = analysis.key_differences.join("\n");
    let user = match language {
        PromptLanguage::Chinese => format!(
            "基于以下特征分析结果，请评估并优化这段文案：\n\n\
             待优化文案：\n\"{content}\"\n\n\
             高转化特征参考：\n{high}\n\n\
             低转化特征（需避免）：\n{low}\n\n\
             关键差异：\n{differences}\n\n\
             请提供详细的评分、优势、问题分析、具体优化建议和改进版本。"
        ),
        PromptLanguage::English => format!(
            "Based on the following feature analysis, evaluate and optimize this copy:\n\n\
             Copy to optimize:\n\"{content}\"\n\n\
             High-converting features for reference:\n{high}\n\n\
             Low-converting features (avoid these):\n{low}\n\n\
             Key differences:\n{differences}\n\n\
             Provide a detailed score, strengths, problem analysis, concrete suggestions and an improved version."
        ),
    };

    (language.optimization_system_prompt().to_string(), user)
}

fn numbered(samples: &[ContentSample]) -> String {
    samples
        .iter()
        .enumerate()
        .map(|(i, s)| format!("{}. {}", i + 1, s.content))
        .collect::<Vec<_>>()
        .join("\n")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
