//! Genre normalization.
//!
//! Tags often pack several genres into one field (`"Rock, Pop"`,
//! `"Jazz/Fusion"`). Each field is split into atomic tokens before it is
//! attached to an album.

/// Characters separating genres inside a single tag value.
pub const GENRE_DELIMITERS: &[char] = &[',', '/'];

/// Split a raw genre field into trimmed, non-empty tokens, in order.
///
/// Duplicates are kept; the store's uniqueness constraint collapses them.
pub fn split_genres(raw: &str) -> Vec<String> {
    raw.split(GENRE_DELIMITERS)
        .map(str::trim)
        .filter(|g| !g.is_empty())
        .map(str::to_string)
        .collect()
}

/// Normalize an edited genre list: split, trim and drop duplicates.
pub fn normalize_genre_list(genres: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for genre in genres.iter().flat_map(|g| split_genres(g)) {
        if !out.contains(&genre) {
            out.push(genre);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_split_simple() {
        assert_eq!(split_genres("Rock"), vec!["Rock"]);
        assert_eq!(split_genres("Rock, Jazz"), vec!["Rock", "Jazz"]);
        assert_eq!(split_genres("Jazz/Fusion"), vec!["Jazz", "Fusion"]);
    }

    #[test]
    fn test_split_drops_empty_tokens() {
        assert_eq!(split_genres(" , Rock,, /Pop/ "), vec!["Rock", "Pop"]);
        assert!(split_genres("").is_empty());
        assert!(split_genres(" ,/ ").is_empty());
    }

    #[test]
    fn test_split_keeps_inner_whitespace() {
        assert_eq!(split_genres("Hip Hop , Drum and Bass"), vec!["Hip Hop", "Drum and Bass"]);
    }

    #[test]
    fn test_normalize_genre_list_dedups() {
        let input = vec!["Rock, Pop".to_string(), " Rock ".to_string(), "".to_string()];
        assert_eq!(normalize_genre_list(&input), vec!["Rock", "Pop"]);
    }

    proptest! {
        #[test]
        fn tokens_are_trimmed_and_delimiter_free(raw in ".{0,64}") {
            for token in split_genres(&raw) {
                prop_assert!(!token.is_empty());
                prop_assert_eq!(token.trim(), token.as_str());
                prop_assert!(!token.contains(GENRE_DELIMITERS));
            }
        }

        #[test]
        fn joined_tokens_split_back(tokens in prop::collection::vec("[A-Za-z][A-Za-z ]{0,10}[A-Za-z]", 0..6)) {
            let joined = tokens.join(", ");
            prop_assert_eq!(split_genres(&joined), tokens);
        }

        #[test]
        fn splitting_is_idempotent(raw in ".{0,64}") {
            let once = split_genres(&raw);
            let twice: Vec<String> = once.iter().flat_map(|t| split_genres(t)).collect();
            prop_assert_eq!(once, twice);
        }
    }
}
