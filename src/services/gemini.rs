//! Gemini 推荐服务
//! 调用 Gemini generateContent 接口，根据用户做题情况推荐下一批题目

use anyhow::{anyhow, bail, Context, Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::OnceLock;
use std::time::Duration;

use crate::models::{Difficulty, Question, RecommendedQuestion};

/// Gemini 配置
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub max_output_tokens: u32,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-2.0-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            timeout: Duration::from_secs(30),
            temperature: 0.7,
            top_k: 40,
            top_p: 0.95,
            max_output_tokens: 1024,
        }
    }
}

// ==================== 接口数据结构 ====================

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_k: u32,
    top_p: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

/// 模型给出的一条推荐
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AiRecommendation {
    pub title: String,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Deserialize)]
struct AiRecommendationList {
    recommendations: Vec<AiRecommendation>,
}

/// Gemini 客户端，启动时创建一次，放在共享状态中
#[derive(Clone)]
pub struct GeminiClient {
    config: GeminiConfig,
    http_client: reqwest::Client,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            config,
            http_client,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.config
            .api_key
            .as_deref()
            .map(|key| !key.is_empty())
            .unwrap_or(false)
    }

    /// 单次生成，返回第一个候选的全部文本
    pub async fn generate(&self, prompt: &str) -> Result<String, Error> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| anyhow!("GEMINI_API_KEY is not set"))?;

        let url = format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        );

        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: self.config.temperature,
                top_k: self.config.top_k,
                top_p: self.config.top_p,
                max_output_tokens: self.config.max_output_tokens,
            },
        };

        let response = self
            .http_client
            .post(&url)
            .query(&[("key", api_key)])
            .json(&request)
            .send()
            .await
            .context("Gemini request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Gemini API returned {}: {}", status, body);
        }

        let body = response
            .json::<GenerateContentResponse>()
            .await
            .context("Invalid Gemini response body")?;

        let text: String = body
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            bail!("Gemini returned no text");
        }

        Ok(text)
    }

    /// 请求模型推荐并与题库匹配
    ///
    /// 任何一步失败（包括没有匹配到题目）都返回错误，由调用方决定兜底。
    pub async fn recommend(
        &self,
        questions: &[Question],
        solved: &HashSet<&str>,
    ) -> Result<Vec<RecommendedQuestion>> {
        let prompt = RecommendationPrompt::build(questions, solved)?;

        log::info!("Sending request to Gemini ({})", self.config.model);
        let text = self.generate(&prompt).await?;
        log::debug!("Gemini response: {}", text);

        let picks = parse_recommendations(&text)?;
        let matched = match_recommendations(questions, &picks);
        if matched.is_empty() {
            bail!("No questions matched the AI recommendations");
        }

        Ok(matched)
    }
}

// ==================== 提示词 ====================

#[derive(Serialize)]
struct PromptQuestion<'a> {
    title: &'a str,
    difficulty: Difficulty,
    topics: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
}

/// 推荐提示词
pub struct RecommendationPrompt;

impl RecommendationPrompt {
    pub fn build(questions: &[Question], solved: &HashSet<&str>) -> Result<String> {
        let (done, todo): (Vec<&Question>, Vec<&Question>) = questions
            .iter()
            .partition(|q| solved.contains(q.id.as_str()));

        let solved_json = serde_json::to_string_pretty(
            &done
                .iter()
                .map(|q| PromptQuestion {
                    title: &q.title,
                    difficulty: q.difficulty,
                    topics: &q.topics,
                    description: None,
                })
                .collect::<Vec<_>>(),
        )?;

        let unsolved_json = serde_json::to_string_pretty(
            &todo
                .iter()
                .map(|q| PromptQuestion {
                    title: &q.title,
                    difficulty: q.difficulty,
                    topics: &q.topics,
                    description: q.description.as_deref(),
                })
                .collect::<Vec<_>>(),
        )?;

        Ok(format!(
            r#"As an AI coding mentor, analyze the following data and recommend the next 3 questions to solve:

Solved Questions:
{}

Available Unsolved Questions:
{}

Please recommend 3 questions that would be most beneficial to solve next, considering:
1. The user's current progress and skill level
2. Topic progression and learning path
3. Difficulty progression
4. Prerequisites and dependencies

Return only a JSON object in this format:
{{
  "recommendations": [
    {{
      "title": "Question Title 1",
      "reason": "Brief explanation why this question is recommended"
    }},
    {{
      "title": "Question Title 2",
      "reason": "Brief explanation why this question is recommended"
    }},
    {{
      "title": "Question Title 3",
      "reason": "Brief explanation why this question is recommended"
    }}
  ]
}}"#,
            solved_json, unsolved_json
        ))
    }
}

/// 从模型输出中解析推荐列表，支持 ```json 代码块包裹
pub fn parse_recommendations(text: &str) -> Result<Vec<AiRecommendation>> {
    static FENCED: OnceLock<Option<Regex>> = OnceLock::new();

    let fenced = FENCED
        .get_or_init(|| Regex::new(r"```(?:json)?\s*([\s\S]*?)```").ok())
        .as_ref()
        .and_then(|re| re.captures(text))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str());

    let json = fenced.unwrap_or(text).trim();
    let list: AiRecommendationList =
        serde_json::from_str(json).context("Invalid response format from Gemini API")?;

    Ok(list.recommendations)
}

/// 按模型给出的顺序匹配题目标题，重复标题只取一次
pub fn match_recommendations(
    questions: &[Question],
    picks: &[AiRecommendation],
) -> Vec<RecommendedQuestion> {
    let mut seen = HashSet::new();

    picks
        .iter()
        .filter(|pick| seen.insert(pick.title.as_str()))
        .filter_map(|pick| {
            questions
                .iter()
                .find(|q| q.title == pick.title)
                .map(|q| RecommendedQuestion {
                    question: q.clone(),
                    reason: pick.reason.clone(),
                })
        })
        .collect()
}
