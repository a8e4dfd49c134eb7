use std::collections::HashMap;

/// 评论文本 -> [-1, 1] 的情感标量。空文本必须返回 0。
pub trait SentimentScorer: Send + Sync {
    fn score(&self, text: &str) -> f64;
}

/// 服务质量短语表（固定词表，小写子串匹配）
pub const SERVICE_LEXICON: &[&str] = &[
    "great service",
    "excellent service",
    "friendly staff",
    "attentive",
    "helpful",
    "good service",
];

/// 每条评论最多记一次：命中第一个短语即停止扫描
pub fn mentions_service(text: &str) -> bool {
    if text.is_empty() {
        return false;
    }
    let lower = text.to_lowercase();
    SERVICE_LEXICON.iter().any(|phrase| lower.contains(phrase))
}

// 词表打分器: 词价求和 + 否定翻转 + s/sqrt(s^2+15) 归一化。
// 分值尺度沿用常见情感词典的 [-4, 4] 约定。
static VALENCE: &[(&str, f64)] = &[
    ("good", 1.9),
    ("great", 3.1),
    ("excellent", 2.7),
    ("amazing", 2.8),
    ("awesome", 3.1),
    ("delicious", 2.9),
    ("tasty", 2.2),
    ("fresh", 1.3),
    ("friendly", 2.2),
    ("love", 3.2),
    ("loved", 2.9),
    ("best", 3.2),
    ("fantastic", 2.6),
    ("wonderful", 2.7),
    ("perfect", 2.7),
    ("nice", 1.8),
    ("happy", 2.7),
    ("enjoyed", 2.3),
    ("recommend", 1.5),
    ("attentive", 1.7),
    ("helpful", 1.8),
    ("clean", 1.4),
    ("polite", 1.7),
    ("cozy", 1.4),
    ("favorite", 2.0),
    ("generous", 1.9),
    ("superb", 3.0),
    ("outstanding", 3.1),
    ("bad", -2.5),
    ("terrible", -3.0),
    ("awful", -2.9),
    ("horrible", -2.9),
    ("disgusting", -3.1),
    ("gross", -2.1),
    ("rude", -2.4),
    ("slow", -1.2),
    ("bland", -1.8),
    ("stale", -1.9),
    ("dirty", -2.0),
    ("overpriced", -2.0),
    ("mediocre", -1.5),
    ("disappointing", -2.2),
    ("disappointed", -2.1),
    ("worst", -3.1),
    ("hate", -2.7),
    ("hated", -2.6),
    ("nasty", -2.6),
    ("poor", -2.0),
    ("greasy", -1.3),
    ("burnt", -1.8),
    ("soggy", -1.6),
    ("unfriendly", -2.0),
];

static NEGATORS: &[&str] = &[
    "not", "no", "never", "isn't", "wasn't", "don't", "didn't", "can't", "won't", "isnt",
    "wasnt", "dont", "didnt", "cant", "wont",
];

const NEGATION_SCALAR: f64 = -0.74;
const NORM_ALPHA: f64 = 15.0;

pub struct LexiconScorer {
    valence: HashMap<&'static str, f64>,
}

impl LexiconScorer {
    pub fn new() -> Self {
        Self {
            valence: VALENCE.iter().copied().collect(),
        }
    }

    fn tokenize(text: &str) -> Vec<String> {
        let mut tokens = Vec::new();
        let mut cur = String::new();
        for ch in text.chars() {
            if ch.is_alphanumeric() || ch == '\'' {
                cur.extend(ch.to_lowercase());
            } else if !cur.is_empty() {
                tokens.push(std::mem::take(&mut cur));
            }
        }
        if !cur.is_empty() {
            tokens.push(cur);
        }
        tokens
    }
}

impl Default for LexiconScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl SentimentScorer for LexiconScorer {
    fn score(&self, text: &str) -> f64 {
        if text.trim().is_empty() {
            return 0.0;
        }
        let tokens = Self::tokenize(text);
        let mut sum = 0.0;
        for (i, token) in tokens.iter().enumerate() {
            let Some(&valence) = self.valence.get(token.as_str()) else {
                continue;
            };
            // 否定词出现在前两个 token 内则翻转
            let negated = tokens[i.saturating_sub(2)..i]
                .iter()
                .any(|t| NEGATORS.contains(&t.as_str()));
            sum += if negated {
                valence * NEGATION_SCALAR
            } else {
                valence
            };
        }
        sum / (sum * sum + NORM_ALPHA).sqrt()
    }
}
