//! Topic pattern matching.
//!
//! Binding keys use the topic-exchange conventions: words separated by
//! dots, `*` matches exactly one word, `#` matches zero or more words.

/// Returns true if `routing_key` matches the binding `pattern`.
pub fn matches(pattern: &str, routing_key: &str) -> bool {
    let pattern: Vec<&str> = pattern.split('.').collect();
    let key: Vec<&str> = routing_key.split('.').collect();
    match_words(&pattern, &key)
}

fn match_words(pattern: &[&str], key: &[&str]) -> bool {
    match pattern.split_first() {
        None => key.is_empty(),
        Some((&"#", rest)) => (0..=key.len()).any(|skip| match_words(rest, &key[skip..])),
        Some((word, rest)) => match key.split_first() {
            Some((first, key_rest)) => (*word == "*" || word == first) && match_words(rest, key_rest),
            None => false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match() {
        assert!(matches("piece.produced", "piece.produced"));
        assert!(!matches("piece.produced", "piece.needed"));
        assert!(!matches("piece.produced", "piece.produced.again"));
    }

    #[test]
    fn star_matches_exactly_one_word() {
        assert!(matches("order.*", "order.produced"));
        assert!(matches("*.checked", "delivery.checked"));
        assert!(!matches("order.*", "order"));
        assert!(!matches("order.*", "order.produced.eu"));
    }

    #[test]
    fn hash_matches_zero_or_more_words() {
        assert!(matches("#", "anything.at.all"));
        assert!(matches("order.#", "order"));
        assert!(matches("order.#", "order.produced.eu"));
        assert!(matches("#.error", "order.create.error"));
        assert!(!matches("order.#.error", "payment.check.error"));
    }

    #[test]
    fn mixed_wildcards() {
        assert!(matches("order.*.#", "order.produced.eu.west"));
        assert!(!matches("order.*.#", "order"));
    }
}
