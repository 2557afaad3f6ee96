//! Featured-asset tagging
//!
//! Marks records whose symbol or social links match a configured keyword
//! list (AI/mining themes by default). Featured records are exempt from
//! the low-liquidity cleanup rule, so tagging runs before lifecycle.

use crate::record::TokenRecord;
use regex::Regex;

pub struct FeaturedTagger {
    patterns: Vec<(String, Regex)>,
}

impl FeaturedTagger {
    pub fn new(keywords: &[String]) -> Self {
        let patterns = keywords
            .iter()
            .filter_map(|kw| {
                let kw = kw.trim().to_lowercase();
                if kw.is_empty() {
                    return None;
                }
                Regex::new(&format!(r"\b{}\b", regex::escape(&kw)))
                    .ok()
                    .map(|re| (kw, re))
            })
            .collect();
        Self { patterns }
    }

    /// Keywords matching the record's symbol or link text.
    ///
    /// The symbol is word-matched directly; website and twitter are
    /// tokenized on URL separators first so path segments match whole
    /// words too.
    pub fn matches(&self, record: &TokenRecord) -> Vec<String> {
        let symbol = record.symbol.to_lowercase();
        let links = tokenize_links(&record.website, &record.twitter);

        self.patterns
            .iter()
            .filter(|(kw, re)| {
                re.is_match(&symbol) || *kw == symbol || (!links.is_empty() && re.is_match(&links))
            })
            .map(|(kw, _)| kw.clone())
            .collect()
    }

    pub fn tag(&self, record: &mut TokenRecord) {
        let matched = self.matches(record);
        record.featured = !matched.is_empty();
        record.featured_keywords = matched;
    }

    pub fn tag_all(&self, records: &mut [TokenRecord]) {
        for record in records {
            self.tag(record);
        }
    }
}

fn tokenize_links(website: &str, twitter: &str) -> String {
    let joined = format!("{} {}", website, twitter).to_lowercase();
    joined
        .chars()
        .map(|c| match c {
            '/' | '-' | '_' | '.' | ':' => ' ',
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tagger() -> FeaturedTagger {
        FeaturedTagger::new(&[
            "mining".to_string(),
            "ai".to_string(),
            "botcoin".to_string(),
        ])
    }

    fn make_record(symbol: &str, website: &str, twitter: &str) -> TokenRecord {
        TokenRecord {
            address: "0xaa".to_string(),
            symbol: symbol.to_string(),
            website: website.to_string(),
            twitter: twitter.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_symbol_whole_word_match() {
        let t = tagger();
        let mut record = make_record("AI", "", "");
        t.tag(&mut record);
        assert!(record.featured);
        assert_eq!(record.featured_keywords, vec!["ai"]);
    }

    #[test]
    fn test_symbol_substring_does_not_match() {
        let t = tagger();
        // "RAID" contains "ai" but not as a whole word.
        let mut record = make_record("RAID", "", "");
        t.tag(&mut record);
        assert!(!record.featured);
    }

    #[test]
    fn test_url_path_segments_match() {
        let t = tagger();
        let mut record = make_record("XYZ", "https://base-mining.xyz/app", "");
        t.tag(&mut record);
        assert!(record.featured);
        assert_eq!(record.featured_keywords, vec!["mining"]);
    }

    #[test]
    fn test_multiple_keywords_collected() {
        let t = tagger();
        let mut record = make_record("BOTCOIN", "https://ai.botcoin.io", "");
        t.tag(&mut record);
        assert!(record.featured);
        assert!(record.featured_keywords.contains(&"ai".to_string()));
        assert!(record.featured_keywords.contains(&"botcoin".to_string()));
    }

    #[test]
    fn test_no_links_no_symbol_match() {
        let t = tagger();
        let mut record = make_record("PLAIN", "", "");
        t.tag(&mut record);
        assert!(!record.featured);
        assert!(record.featured_keywords.is_empty());
    }
}
