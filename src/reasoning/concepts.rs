//! Query-to-concept resolution.

/// Turns query text into the concept strings used to search for seed nodes.
pub trait ConceptResolver: Send + Sync {
    fn extract_concepts(&self, query: &str) -> Vec<String>;
}

/// Keyword tokenizer: lowercased whitespace tokens with surrounding
/// punctuation trimmed, de-duplicated in first-seen order.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordResolver;

impl ConceptResolver for KeywordResolver {
    fn extract_concepts(&self, query: &str) -> Vec<String> {
        let mut concepts: Vec<String> = Vec::new();
        for token in query.split_whitespace() {
            let token = token
                .trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase();
            if !token.is_empty() && !concepts.contains(&token) {
                concepts.push(token);
            }
        }
        concepts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_extraction() {
        let concepts = KeywordResolver.extract_concepts("What is Rust? rust, (ownership)!");
        assert_eq!(concepts, vec!["what", "is", "rust", "ownership"]);
    }

    #[test]
    fn test_blank_query_has_no_concepts() {
        assert!(KeywordResolver.extract_concepts("   \t ").is_empty());
        assert!(KeywordResolver.extract_concepts("?? !!").is_empty());
    }
}
