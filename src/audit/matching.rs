/// Text similarity used to decide whether a claim tag triggers a
/// conditional coefficient. Injectable so the algorithm can be swapped
/// without touching resolution logic; the applicability threshold lives
/// on [`super::policy::AuditPolicy`], not in here.
pub trait SimilarityScorer: Send + Sync {
    /// Similarity between a claim tag and a coefficient condition on a
    /// 0-100 scale.
    fn score(&self, tag: &str, condition: &str) -> u8;
}

/// Default scorer: token-order-insensitive partial match. A tag fully
/// contained in the condition scores 100; otherwise the best
/// sorted-token window of the longer text is compared to the shorter
/// one with normalized Levenshtein distance.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokenSimilarity;

fn normalize(text: &str) -> String {
    text.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn sorted_tokens(text: &str) -> Vec<&str> {
    let mut tokens: Vec<&str> = text.split(' ').filter(|t| !t.is_empty()).collect();
    tokens.sort_unstable();
    tokens
}

impl SimilarityScorer for TokenSimilarity {
    fn score(&self, tag: &str, condition: &str) -> u8 {
        let tag = normalize(tag);
        let condition = normalize(condition);
        if tag.is_empty() || condition.is_empty() {
            return 0;
        }
        if condition.contains(&tag) || tag.contains(&condition) {
            return 100;
        }

        let tag_tokens = sorted_tokens(&tag);
        let condition_tokens: Vec<&str> = condition.split(' ').collect();

        let (needle, haystack) = if tag_tokens.len() <= condition_tokens.len() {
            (tag_tokens, condition_tokens)
        } else {
            (sorted_tokens(&condition), tag.split(' ').collect())
        };
        let needle_joined = needle.join(" ");

        let mut best = 0.0f64;
        for window in haystack.windows(needle.len().max(1)) {
            let mut window: Vec<&str> = window.to_vec();
            window.sort_unstable();
            let candidate = window.join(" ");
            let similarity = strsim::normalized_levenshtein(&needle_joined, &candidate);
            if similarity > best {
                best = similarity;
            }
        }

        (best * 100.0).round().clamp(0.0, 100.0) as u8
    }
}
