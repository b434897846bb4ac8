//! 基于关键词重叠的导师匹配
//!
//! 学员的 interests 与导师的 expertise 都是自由文本。两边先切成关键词，
//! 再统计学员关键词中被导师关键词命中的个数。两个关键词相等或一方包含
//! 另一方时视为命中（"rust" 命中 "rustlang"）。

use std::cmp::Ordering;

use serde::Serialize;

const STOP_WORDS: &[&str] = &[
    "and", "or", "the", "of", "in", "on", "for", "to", "with", "a", "an", "at", "by", "my", "i",
];

const MIN_KEYWORD_LEN: usize = 2;

/// 切分关键词：小写、按非字母数字切开（保留 `+` `#`，照顾 c++ / c#）、去停用词、去重
pub fn tokenize(text: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for raw in text
        .to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '+' || c == '#'))
    {
        if raw.chars().count() < MIN_KEYWORD_LEN || STOP_WORDS.contains(&raw) {
            continue;
        }
        if !out.iter().any(|k| k == raw) {
            out.push(raw.to_string());
        }
    }
    out
}

/// 规范化逗号分隔的标签列表（写入档案前调用）
pub fn normalize_tags(text: &str) -> String {
    let mut tags: Vec<String> = Vec::new();
    for tag in text.split(',') {
        let tag = tag.trim().to_lowercase();
        if !tag.is_empty() && !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    tags.join(", ")
}

fn keywords_match(a: &str, b: &str) -> bool {
    a == b || a.contains(b) || b.contains(a)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchScore {
    pub score: usize,
    pub matched: Vec<String>,
}

pub fn score(interests: &str, expertise: &str) -> MatchScore {
    let wanted = tokenize(interests);
    let offered = tokenize(expertise);

    let matched: Vec<String> = wanted
        .into_iter()
        .filter(|w| offered.iter().any(|o| keywords_match(w, o)))
        .collect();

    MatchScore {
        score: matched.len(),
        matched,
    }
}

/// 参与排序的候选项
pub trait Candidate {
    fn expertise(&self) -> &str;
    fn average_rating(&self) -> f64;
    fn display_name(&self) -> &str;
}

/// 为候选人打分并排序：分数降序、评分降序、姓名升序（不区分大小写）；零分的直接丢弃
pub fn rank<C: Candidate>(interests: &str, candidates: Vec<C>, limit: usize) -> Vec<(C, MatchScore)> {
    let mut scored: Vec<(C, MatchScore)> = candidates
        .into_iter()
        .map(|c| {
            let s = score(interests, c.expertise());
            (c, s)
        })
        .filter(|(_, s)| s.score > 0)
        .collect();

    scored.sort_by(|(a, sa), (b, sb)| {
        sb.score
            .cmp(&sa.score)
            .then_with(|| {
                b.average_rating()
                    .partial_cmp(&a.average_rating())
                    .unwrap_or(Ordering::Equal)
            })
            .then_with(|| {
                a.display_name()
                    .to_lowercase()
                    .cmp(&b.display_name().to_lowercase())
            })
    });
    scored.truncate(limit);
    scored
}
