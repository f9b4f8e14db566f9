//! Query completeness classifier / 查询完整性判断
//!
//! Decides, from text alone, whether a query reads as a finished search
//! intent. Pure CPU, no I/O, deterministic / 纯函数，无副作用.
//!
//! The heuristic is an ordered decision list: each rule either produces a
//! verdict or passes to the next. Rule order is part of the behavior, so the
//! rules live in one auditable table instead of nested conditionals.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;

/// Minimum characters before a query can carry intent / 最短字符数
const MIN_CHARS: usize = 5;
/// Minimum whitespace-delimited words / 最少词数
const MIN_WORDS: usize = 3;
/// Fallback: anything longer than this is assumed complete / 兜底长度阈值
const FALLBACK_CHARS: usize = 20;

/// Prepositions that rarely end a complete query / 悬挂介词
static NON_TERMINAL_PREPOSITIONS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    HashSet::from([
        "in", "on", "at", "by", "with", "for", "from", "to", "of", "about", "into",
    ])
});

/// Articles never end a complete query / 冠词
static NON_TERMINAL_ARTICLES: Lazy<HashSet<&'static str>> =
    Lazy::new(|| HashSet::from(["a", "an", "the"]));

/// Coordinating conjunctions left dangling / 并列连词
static NON_TERMINAL_CONJUNCTIONS: Lazy<HashSet<&'static str>> =
    Lazy::new(|| HashSet::from(["and", "or", "nor"]));

/// Content nouns that commonly end a complete search intent / 终结性名词
static TERMINAL_CONTENT_NOUNS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    HashSet::from([
        "guide",
        "tutorial",
        "example",
        "examples",
        "documentation",
        "reference",
        "manual",
        "info",
        "information",
        "steps",
        "instructions",
        "process",
        "method",
        "algorithm",
        "strategy",
        "approach",
        "basics",
        "fundamentals",
        "cheatsheet",
    ])
});

/// Question openers / 疑问词
static QUESTION_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    HashSet::from(["who", "what", "where", "when", "why", "how", "which", "whose"])
});

/// Auxiliary verbs that start a question / 助动词开头
static AUX_QUESTION_STARTERS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    HashSet::from([
        "is", "are", "was", "were", "do", "does", "did", "can", "could", "will", "would",
        "should", "shall", "may", "might",
    ])
});

/// Imperative sentence starters / 祈使句开头
static IMPERATIVE_STARTERS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    HashSet::from([
        "please", "find", "search", "look", "show", "tell", "give", "go", "make", "explain",
        "compare", "list",
    ])
});

/// Interior words that imply a fuller clause already exists / 从句标记词
static COMPLETENESS_INDICATORS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    HashSet::from([
        "because",
        "since",
        "although",
        "though",
        "while",
        "if",
        "when",
        "unless",
        "until",
        "however",
        "therefore",
        "thus",
        "nevertheless",
        "whereas",
    ])
});

/// Programming language names / 编程语言名
static PROGRAMMING_LANGUAGES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    HashSet::from([
        "ruby",
        "python",
        "javascript",
        "typescript",
        "java",
        "rust",
        "go",
        "golang",
        "php",
        "swift",
        "kotlin",
        "scala",
        "perl",
        "haskell",
        "elixir",
        "erlang",
        "lua",
        "sql",
        "c",
        "cpp",
        "csharp",
        "dart",
        "julia",
    ])
});

/// Technical-domain words that can close out a short query / 技术领域词
static TECHNICAL_DOMAIN_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    HashSet::from([
        "rails",
        "django",
        "flask",
        "react",
        "vue",
        "angular",
        "docker",
        "kubernetes",
        "linux",
        "unix",
        "windows",
        "macos",
        "android",
        "ios",
        "git",
        "github",
        "gitlab",
        "api",
        "rest",
        "graphql",
        "database",
        "frontend",
        "backend",
        "devops",
        "regex",
        "json",
        "xml",
        "html",
        "css",
        "webpack",
        "nodejs",
        "postgres",
        "mysql",
        "sqlite",
        "redis",
        "mongodb",
        "nginx",
    ])
});

/// Incomplete two-word fragments like "The Best" / “the X” 两词片段
static ARTICLE_FRAGMENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^the\s+[a-z]+$").unwrap());

/// Pre-computed token view of a normalized query / 查询的分词视图
#[derive(Debug)]
struct QueryShape {
    normalized: String,
    words: Vec<String>,
    word_count: usize,
    char_length: usize,
    first_word: String,
    last_word: String,
}

impl QueryShape {
    fn new(text: &str) -> Self {
        // Trim and collapse internal whitespace runs to single spaces
        let words: Vec<String> = text.split_whitespace().map(|w| w.to_string()).collect();
        let normalized = words.join(" ");
        let word_count = words.len();
        let char_length = normalized.chars().count();
        let first_word = words
            .first()
            .map(|w| w.to_lowercase())
            .unwrap_or_default();
        let last_word = words.last().map(|w| clean_word(w)).unwrap_or_default();

        Self {
            normalized,
            words,
            word_count,
            char_length,
            first_word,
            last_word,
        }
    }

    fn ends_with_terminator(&self) -> bool {
        self.normalized.ends_with('.')
            || self.normalized.ends_with('!')
            || self.normalized.ends_with('?')
    }
}

/// Lower-case a token and strip non-word characters / 清洗词元
fn clean_word(word: &str) -> String {
    word.to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_')
        .collect()
}

fn is_non_terminal(word: &str) -> bool {
    NON_TERMINAL_PREPOSITIONS.contains(word)
        || NON_TERMINAL_ARTICLES.contains(word)
        || NON_TERMINAL_CONJUNCTIONS.contains(word)
}

fn is_terminal_topic_word(word: &str) -> bool {
    PROGRAMMING_LANGUAGES.contains(word) || TECHNICAL_DOMAIN_WORDS.contains(word)
}

/// One entry of the decision list: a named predicate that either rules
/// (Some verdict) or passes (None) / 规则表条目
struct Rule {
    name: &'static str,
    eval: fn(&QueryShape) -> Option<bool>,
}

/// The ordered rule cascade. First verdict wins; the final length fallback
/// lives in `analyze` so every path yields a decision.
static RULES: &[Rule] = &[
    Rule {
        name: "too_short",
        eval: |s: &QueryShape| {
            if s.char_length < MIN_CHARS || s.word_count < MIN_WORDS {
                Some(false)
            } else {
                None
            }
        },
    },
    Rule {
        name: "terminal_punctuation",
        eval: |s: &QueryShape| {
            if s.ends_with_terminator() {
                Some(true)
            } else {
                None
            }
        },
    },
    Rule {
        name: "dangling_function_word",
        eval: |s: &QueryShape| {
            if is_non_terminal(&s.last_word) {
                Some(false)
            } else {
                None
            }
        },
    },
    Rule {
        name: "terminal_content_noun",
        eval: |s: &QueryShape| {
            if TERMINAL_CONTENT_NOUNS.contains(s.last_word.as_str())
                || is_terminal_topic_word(&s.last_word)
            {
                Some(true)
            } else {
                None
            }
        },
    },
    Rule {
        // A question needs at least subject and verb after the opener
        name: "question_structure",
        eval: |s: &QueryShape| {
            if QUESTION_WORDS.contains(s.first_word.as_str())
                || AUX_QUESTION_STARTERS.contains(s.first_word.as_str())
            {
                Some(s.word_count >= 4)
            } else {
                None
            }
        },
    },
    Rule {
        // An imperative needs an object
        name: "imperative_structure",
        eval: |s: &QueryShape| {
            if IMPERATIVE_STARTERS.contains(s.first_word.as_str()) {
                Some(s.word_count >= 3)
            } else {
                None
            }
        },
    },
    Rule {
        // Subordination in the middle implies a fuller clause already exists
        name: "interior_clause_marker",
        eval: |s: &QueryShape| {
            let interior = &s.words[1..s.word_count.saturating_sub(1)];
            if interior
                .iter()
                .any(|w| COMPLETENESS_INDICATORS.contains(clean_word(w).as_str()))
            {
                Some(true)
            } else {
                None
            }
        },
    },
    Rule {
        name: "five_word_minimum",
        eval: |s: &QueryShape| {
            if s.word_count >= 5 {
                Some(true)
            } else {
                None
            }
        },
    },
    Rule {
        name: "four_word_phrase",
        eval: |s: &QueryShape| {
            if s.word_count == 4 && !NON_TERMINAL_PREPOSITIONS.contains(s.last_word.as_str()) {
                Some(true)
            } else {
                None
            }
        },
    },
    Rule {
        name: "short_phrase",
        eval: |s: &QueryShape| {
            if s.word_count <= 3 {
                if NON_TERMINAL_PREPOSITIONS.contains(s.last_word.as_str()) {
                    return Some(false);
                }
                if s.word_count == 2 && ARTICLE_FRAGMENT_RE.is_match(&s.normalized) {
                    return Some(false);
                }
                if is_terminal_topic_word(&s.last_word) {
                    return Some(true);
                }
            }
            None
        },
    },
];

/// Detailed classification outcome, for logging and auditability / 判定明细
#[derive(Debug, Clone, Serialize)]
pub struct CompletenessAnalysis {
    pub normalized: String,
    pub word_count: usize,
    pub char_length: usize,
    pub first_word: String,
    pub last_word: String,
    pub ends_with_terminator: bool,
    pub matched_rule: &'static str,
    pub complete: bool,
}

/// Run the rule cascade and report which rule decided / 运行规则级联
pub fn analyze(text: &str) -> CompletenessAnalysis {
    let shape = QueryShape::new(text);

    let (matched_rule, complete) = RULES
        .iter()
        .find_map(|rule| (rule.eval)(&shape).map(|verdict| (rule.name, verdict)))
        .unwrap_or(("length_fallback", shape.char_length > FALLBACK_CHARS));

    CompletenessAnalysis {
        ends_with_terminator: shape.ends_with_terminator(),
        normalized: shape.normalized,
        word_count: shape.word_count,
        char_length: shape.char_length,
        first_word: shape.first_word,
        last_word: shape.last_word,
        matched_rule,
        complete,
    }
}

/// Does the text read as a finished search intent? / 是否像完整的搜索意图
pub fn appears_complete(text: &str) -> bool {
    analyze(text).complete
}
