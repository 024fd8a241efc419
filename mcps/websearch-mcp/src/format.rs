//! Markdown rendering for tool output

use std::fmt::Write;

use crate::types::{InstantAnswer, RelatedTopic, SearchResults, TopicLink};

/// Render web search results as Markdown
pub fn format_results_markdown(results: &SearchResults) -> String {
    let mut out = format!("## Web Search Results for \"{}\"\n\n", results.query);

    if results.results.is_empty() {
        out.push_str("No results found.\n\n");
    }

    for (i, result) in results.results.iter().enumerate() {
        let _ = writeln!(out, "### {}. {}", i + 1, result.title);
        let _ = writeln!(out, "**URL:** {}", result.url);
        if !result.snippet.is_empty() {
            let _ = write!(out, "\n{}\n", result.snippet);
        }
        out.push_str("\n---\n\n");
    }

    let _ = write!(
        out,
        "_Source: DuckDuckGo ({} results{})_",
        results.results.len(),
        if results.cached { ", cached" } else { "" }
    );
    out
}

/// Render an instant answer as Markdown
pub fn format_instant_answer(query: &str, answer: &InstantAnswer) -> String {
    let mut out = format!("## Instant Answer for \"{query}\"\n\n");

    if answer.is_empty() {
        out.push_str("No instant answer available for this query.\n\n");
        out.push_str("_Source: DuckDuckGo Instant Answer API_");
        return out;
    }

    if !answer.heading.is_empty() {
        let _ = writeln!(out, "**{}**\n", answer.heading);
    }

    if !answer.answer.is_empty() {
        let _ = writeln!(out, "### Answer\n\n{}\n", answer.answer);
    }

    if !answer.abstract_text.is_empty() {
        let _ = writeln!(out, "### Abstract\n\n{}\n", answer.abstract_text);
        push_attribution(&mut out, &answer.abstract_source, &answer.abstract_url);
    }

    if !answer.definition.is_empty() {
        let _ = writeln!(out, "### Definition\n\n{}\n", answer.definition);
        push_attribution(&mut out, &answer.definition_source, &answer.definition_url);
    }

    if !answer.related.is_empty() {
        out.push_str("### Related Topics\n\n");
        for topic in &answer.related {
            match topic {
                RelatedTopic::Topic(link) => push_topic(&mut out, link),
                RelatedTopic::Category { name, topics } => {
                    let _ = writeln!(out, "\n**{name}**\n");
                    for link in topics {
                        push_topic(&mut out, link);
                    }
                }
            }
        }
        out.push('\n');
    }

    out.push_str("_Source: DuckDuckGo Instant Answer API_");
    out
}

fn push_attribution(out: &mut String, source: &str, url: &str) {
    if !source.is_empty() {
        let _ = writeln!(out, "**Source:** {source}");
    }
    if !url.is_empty() {
        let _ = writeln!(out, "**URL:** {url}");
    }
    out.push('\n');
}

fn push_topic(out: &mut String, link: &TopicLink) {
    if link.url.is_empty() {
        let _ = writeln!(out, "- **{}**", link.text);
    } else {
        let _ = writeln!(out, "- **{}** ({})", link.text, link.url);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SearchResult;

    fn results(items: Vec<SearchResult>) -> SearchResults {
        SearchResults {
            query: "rust".to_string(),
            backend: "duckduckgo".to_string(),
            results: items,
            cached: false,
        }
    }

    fn item(title: &str, url: &str, snippet: &str) -> SearchResult {
        SearchResult {
            title: title.to_string(),
            url: url.to_string(),
            snippet: snippet.to_string(),
        }
    }

    #[test]
    fn test_format_results() {
        let output = format_results_markdown(&results(vec![
            item("First", "https://a.example/", "Snippet one"),
            item("Second", "https://b.example/", ""),
        ]));

        assert!(output.starts_with("## Web Search Results for \"rust\""));
        assert!(output.contains("### 1. First\n**URL:** https://a.example/\n\nSnippet one\n"));
        assert!(output.contains("### 2. Second\n**URL:** https://b.example/\n"));
        assert_eq!(output.matches("---").count(), 2);
        assert!(output.ends_with("_Source: DuckDuckGo (2 results)_"));
    }

    #[test]
    fn test_format_empty_results() {
        let output = format_results_markdown(&results(vec![]));
        assert!(output.contains("No results found."));
        assert!(output.ends_with("_Source: DuckDuckGo (0 results)_"));
    }

    #[test]
    fn test_format_cached_results() {
        let mut cached = results(vec![item("Only", "https://a.example/", "")]);
        cached.cached = true;
        assert!(format_results_markdown(&cached).ends_with("(1 results, cached)_"));
    }

    #[test]
    fn test_format_instant_answer() {
        let answer = InstantAnswer {
            heading: "Rust".to_string(),
            abstract_text: "A systems language.".to_string(),
            abstract_source: "Wikipedia".to_string(),
            abstract_url: "https://en.wikipedia.org/wiki/Rust".to_string(),
            related: vec![
                RelatedTopic::Topic(TopicLink {
                    text: "Cargo - package manager".to_string(),
                    url: "https://example.com/cargo".to_string(),
                }),
                RelatedTopic::Category {
                    name: "Science".to_string(),
                    topics: vec![TopicLink {
                        text: "Physics - Study of matter".to_string(),
                        url: String::new(),
                    }],
                },
            ],
            ..Default::default()
        };

        let output = format_instant_answer("rust", &answer);
        assert!(output.contains("## Instant Answer for \"rust\""));
        assert!(output.contains("### Abstract\n\nA systems language."));
        assert!(output.contains("**Source:** Wikipedia"));
        assert!(output.contains("**URL:** https://en.wikipedia.org/wiki/Rust"));
        assert!(output.contains("### Related Topics"));
        assert!(output.contains("- **Cargo - package manager** (https://example.com/cargo)"));
        assert!(output.contains("**Science**"));
        assert!(output.contains("- **Physics - Study of matter**\n"));
        assert!(!output.contains("### Definition"));
        assert!(output.ends_with("_Source: DuckDuckGo Instant Answer API_"));
    }

    #[test]
    fn test_format_empty_instant_answer() {
        let output = format_instant_answer("xyzzy", &InstantAnswer::default());
        assert!(output.contains("No instant answer available for this query."));
        assert!(!output.contains("### Abstract"));
        assert!(output.ends_with("_Source: DuckDuckGo Instant Answer API_"));
    }
}
